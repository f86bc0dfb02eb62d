/*!
# Namespace bindings

This module tracks which namespace prefixes are bound to which namespace
names (URIs) while walking a document. [`BijectiveNsMap`] answers lookups
in both directions, prefix to URI and URI to prefix, taking into account
that an inner scope may rebind (mask) a prefix declared further out.

The default namespace is represented by the empty prefix.

Lookups hand out [`Symbol`] handles; cloning one only bumps a reference
count.
*/
use std::collections::HashMap;
use std::fmt;
use std::mem;

#[cfg(not(feature = "mt"))]
use std::cell::{Ref, RefCell, RefMut};
#[cfg(feature = "mt")]
use std::sync::{Mutex, MutexGuard};

use log::trace;

use crate::symbols::{RcPtr, Symbol, SymbolTable};

/// XML core namespace URI (for the `xml:` prefix)
pub const XMLNS_XML: &str = "http://www.w3.org/XML/1998/namespace";
/// XML namespace URI (for the `xmlns:` prefix)
pub const XMLNS_XMLNS: &str = "http://www.w3.org/2000/xmlns/";

type Binding = (Symbol, Symbol);

fn fixed_bindings() -> [Binding; 2] {
	[
		(Symbol::new("xml"), Symbol::new(XMLNS_XML)),
		(Symbol::new("xmlns"), Symbol::new(XMLNS_XMLNS)),
	]
}

fn fixed_uri(fixed: &[Binding], prefix: &str) -> Option<Symbol> {
	fixed
		.iter()
		.find(|(p, _)| p.as_str() == prefix)
		.map(|(_, uri)| uri.clone())
}

fn fixed_prefix(fixed: &[Binding], uri: &str) -> Option<Symbol> {
	fixed
		.iter()
		.find(|(_, u)| u.as_str() == uri)
		.map(|(prefix, _)| prefix.clone())
}

/**
# Namespace lookups

Read-only view on a set of namespace bindings. The `xml` and `xmlns`
prefixes are always bound to [`XMLNS_XML`] and [`XMLNS_XMLNS`]
respectively, no matter what the implementation stores.
*/
pub trait NamespaceContext {
	/// Return the URI the prefix is bound to, if any.
	///
	/// The empty prefix refers to the default namespace.
	fn namespace_uri(&self, prefix: &str) -> Option<Symbol>;

	/// Return a prefix which is bound to the URI, if any.
	fn prefix(&self, uri: &str) -> Option<Symbol>;

	/// Return all prefixes bound to the URI.
	fn prefixes(&self, uri: &str) -> Vec<Symbol>;
}

/// Context without any bindings except for the fixed `xml`/`xmlns` ones.
#[derive(Debug, Clone)]
pub struct EmptyNamespaceContext {
	fixed: [Binding; 2],
}

impl EmptyNamespaceContext {
	pub fn new() -> EmptyNamespaceContext {
		EmptyNamespaceContext {
			fixed: fixed_bindings(),
		}
	}
}

impl Default for EmptyNamespaceContext {
	fn default() -> Self {
		Self::new()
	}
}

impl NamespaceContext for EmptyNamespaceContext {
	fn namespace_uri(&self, prefix: &str) -> Option<Symbol> {
		fixed_uri(&self.fixed, prefix)
	}

	fn prefix(&self, uri: &str) -> Option<Symbol> {
		fixed_prefix(&self.fixed, uri)
	}

	fn prefixes(&self, uri: &str) -> Vec<Symbol> {
		fixed_prefix(&self.fixed, uri).into_iter().collect()
	}
}

/// Flat, unscoped set of bindings.
///
/// Useful as the root context handed to a writer, or as fallback context
/// for [`BijectiveNsMap::add_generated_mapping`].
#[derive(Debug, Clone)]
pub struct SimpleNamespaceContext {
	fixed: [Binding; 2],
	bindings: HashMap<Symbol, Symbol>,
}

impl SimpleNamespaceContext {
	pub fn new() -> SimpleNamespaceContext {
		SimpleNamespaceContext {
			fixed: fixed_bindings(),
			bindings: HashMap::new(),
		}
	}

	/// Bind `prefix` to `uri`, returning the URI it was bound to before.
	pub fn bind<P: Into<String>, U: Into<String>>(&mut self, prefix: P, uri: U) -> Option<Symbol> {
		self.bindings
			.insert(Symbol::new(prefix.into()), Symbol::new(uri.into()))
	}

	pub fn len(&self) -> usize {
		self.bindings.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bindings.is_empty()
	}
}

impl Default for SimpleNamespaceContext {
	fn default() -> Self {
		Self::new()
	}
}

impl NamespaceContext for SimpleNamespaceContext {
	fn namespace_uri(&self, prefix: &str) -> Option<Symbol> {
		match fixed_uri(&self.fixed, prefix) {
			Some(uri) => Some(uri),
			None => self.bindings.get(prefix).cloned(),
		}
	}

	/// If several prefixes are bound to the URI, the lexicographically
	/// smallest one is returned.
	fn prefix(&self, uri: &str) -> Option<Symbol> {
		if let Some(prefix) = fixed_prefix(&self.fixed, uri) {
			return Some(prefix);
		}
		self.bindings
			.iter()
			.filter(|(_, v)| v.as_str() == uri)
			.map(|(k, _)| k)
			.min()
			.cloned()
	}

	fn prefixes(&self, uri: &str) -> Vec<Symbol> {
		if let Some(prefix) = fixed_prefix(&self.fixed, uri) {
			return vec![prefix];
		}
		let mut result: Vec<Symbol> = self
			.bindings
			.iter()
			.filter(|(_, v)| v.as_str() == uri)
			.map(|(k, _)| k.clone())
			.collect();
		result.sort_unstable();
		result
	}
}

/// Binding array shared by all scopes of one chain.
struct Chain {
	bindings: Vec<Binding>,
	/// number of live scopes ending at each position; no trailing zeroes
	ends: Vec<usize>,
}

impl Chain {
	fn new(bindings: Vec<Binding>) -> Chain {
		let end = bindings.len();
		let mut ends = vec![0; end + 1];
		ends[end] = 1;
		Chain { bindings, ends }
	}

	fn retain(&mut self, end: usize) {
		if self.ends.len() <= end {
			self.ends.resize(end + 1, 0);
		}
		self.ends[end] += 1;
	}

	fn release(&mut self, end: usize) {
		match self.ends.get_mut(end) {
			Some(n) if *n > 0 => *n -= 1,
			_ => panic!(
				"internal error on BijectiveNsMap::release(): no live scope ends at {}",
				end
			),
		}
		while self.ends.last() == Some(&0) {
			self.ends.pop();
		}
	}

	/// Return whether the scope ending at `own_end` is the only live scope
	/// which can see position `at`.
	fn is_private(&self, at: usize, own_end: usize) -> bool {
		self.ends
			.iter()
			.enumerate()
			.skip(at + 1)
			.all(|(pos, n)| *n == if pos == own_end { 1 } else { 0 })
	}
}

#[cfg(feature = "mt")]
type ChainLock = Mutex<Chain>;
#[cfg(not(feature = "mt"))]
type ChainLock = RefCell<Chain>;

#[cfg(feature = "mt")]
fn wrap_chain(chain: Chain) -> ChainLock {
	Mutex::new(chain)
}

#[cfg(not(feature = "mt"))]
fn wrap_chain(chain: Chain) -> ChainLock {
	RefCell::new(chain)
}

#[cfg(feature = "mt")]
fn read_chain<'a>(chain: &'a ChainLock) -> MutexGuard<'a, Chain> {
	// the lock is never held across user code
	match chain.lock() {
		Ok(guard) => guard,
		Err(poisoned) => poisoned.into_inner(),
	}
}

#[cfg(feature = "mt")]
fn write_chain<'a>(chain: &'a ChainLock) -> MutexGuard<'a, Chain> {
	read_chain(chain)
}

#[cfg(not(feature = "mt"))]
fn read_chain<'a>(chain: &'a ChainLock) -> Ref<'a, Chain> {
	chain.borrow()
}

#[cfg(not(feature = "mt"))]
fn write_chain<'a>(chain: &'a ChainLock) -> RefMut<'a, Chain> {
	chain.borrow_mut()
}

fn is_masked(bindings: &[Binding], index: usize, scope_start: usize) -> bool {
	if index >= scope_start {
		return false;
	}
	let prefix = &bindings[index].0;
	bindings[index + 1..].iter().any(|(p, _)| p == prefix)
}

/**
# Scoped prefix/URI bindings

Each element of a document gets its own `BijectiveNsMap` scope, created
from the scope of its parent with [`BijectiveNsMap::create_child`]. All
scopes of a chain share one append-only binding array: a scope owns the
entries from its start up to its end, everything before belongs to the
enclosing scopes. A scope appends in place, overwriting whatever closed
sibling scopes left behind. Only if another live scope (an open child, a
sibling with bindings of its own, or a clone) could observe the write does
the scope move to a private copy of the entries it can see.

Within a scope a prefix is bound at most once; binding it again replaces
the URI. Across scopes the innermost binding wins.

## Example

```
use rxml_core::{BijectiveNsMap, SymbolTable};
let mut symbols = SymbolTable::default();
let root = BijectiveNsMap::create_empty();
let mut outer = root.create_child();
outer.add_mapping(symbols.find_symbol_str("a"), symbols.find_symbol_str("urn:one"));
let mut inner = outer.create_child();
inner.add_mapping(symbols.find_symbol_str("a"), symbols.find_symbol_str("urn:two"));
assert_eq!(inner.find_uri_by_prefix("a").unwrap(), "urn:two");
assert!(inner.find_prefix_by_uri("urn:one").is_none());
assert_eq!(outer.find_uri_by_prefix("a").unwrap(), "urn:one");
```
*/
pub struct BijectiveNsMap {
	chain: RcPtr<ChainLock>,
	scope_start: usize,
	scope_end: usize,
}

impl BijectiveNsMap {
	/// Create a root scope.
	///
	/// The `xml` and `xmlns` prefixes are pre-bound outside of the root
	/// scope; they are found by lookups but never reported as local
	/// bindings.
	pub fn create_empty() -> BijectiveNsMap {
		let bindings = fixed_bindings().to_vec();
		let end = bindings.len();
		BijectiveNsMap {
			chain: RcPtr::new(wrap_chain(Chain::new(bindings))),
			scope_start: end,
			scope_end: end,
		}
	}

	/// Create a nested scope, initially without local bindings.
	pub fn create_child(&self) -> BijectiveNsMap {
		write_chain(&self.chain).retain(self.scope_end);
		BijectiveNsMap {
			chain: self.chain.clone(),
			scope_start: self.scope_end,
			scope_end: self.scope_end,
		}
	}

	/// Move to a private copy of the visible entries unless position `at`
	/// is invisible to all other live scopes.
	fn make_private(&mut self, at: usize) {
		let end = self.scope_end;
		if read_chain(&self.chain).is_private(at, end) {
			return;
		}
		trace!(
			"namespace scope at {} copies {} shared bindings",
			self.scope_start,
			end
		);
		let visible = read_chain(&self.chain).bindings[..end].to_vec();
		let old = mem::replace(&mut self.chain, RcPtr::new(wrap_chain(Chain::new(visible))));
		write_chain(&old).release(end);
	}

	fn push(&mut self, prefix: Symbol, uri: Symbol) {
		let end = self.scope_end;
		self.make_private(end);
		{
			let mut chain = write_chain(&self.chain);
			// drop entries of closed scopes
			chain.bindings.truncate(end);
			chain.bindings.push((prefix, uri));
			chain.retain(end + 1);
			chain.release(end);
		}
		self.scope_end = end + 1;
	}

	/// Bind `prefix` to `uri` in the current scope.
	///
	/// If the prefix is already bound in the current scope, the binding is
	/// replaced and the previous URI returned. Bindings of enclosing scopes
	/// are masked, not modified.
	pub fn add_mapping(&mut self, prefix: Symbol, uri: Symbol) -> Option<Symbol> {
		let (start, end) = (self.scope_start, self.scope_end);
		let existing = read_chain(&self.chain).bindings[start..end]
			.iter()
			.position(|(p, _)| *p == prefix);
		match existing {
			Some(index) => {
				let at = start + index;
				self.make_private(at);
				let mut chain = write_chain(&self.chain);
				let old = mem::replace(&mut chain.bindings[at].1, uri);
				Some(old)
			}
			None => {
				self.push(prefix, uri);
				None
			}
		}
	}

	/// Bind `uri` to a freshly generated prefix in the current scope.
	///
	/// Candidate prefixes are `base` followed by the value of `counter`,
	/// which is incremented for every candidate tried. A candidate is
	/// rejected if it appears anywhere in the scope chain (masked or not)
	/// or if `fallback` binds it. The accepted prefix is interned in
	/// `symbols` and returned.
	pub fn add_generated_mapping(
		&mut self,
		symbols: &mut SymbolTable,
		base: &str,
		fallback: Option<&dyn NamespaceContext>,
		uri: Symbol,
		counter: &mut u32,
	) -> Symbol {
		let candidate = loop {
			let candidate = format!("{}{}", base, *counter);
			*counter = counter.wrapping_add(1);
			let taken = read_chain(&self.chain).bindings[..self.scope_end]
				.iter()
				.any(|(p, _)| p.as_str() == candidate);
			if taken {
				continue;
			}
			if let Some(ctx) = fallback {
				if ctx.namespace_uri(&candidate).is_some() {
					continue;
				}
			}
			break candidate;
		};
		let prefix = symbols.find_symbol_str(&candidate);
		self.push(prefix.clone(), uri);
		prefix
	}

	/// Return the URI the prefix is bound to, if any.
	///
	/// The newest binding wins.
	pub fn find_uri_by_prefix(&self, prefix: &str) -> Option<Symbol> {
		let chain = read_chain(&self.chain);
		let found = chain.bindings[..self.scope_end]
			.iter()
			.rev()
			.find(|(p, _)| p.as_str() == prefix)
			.map(|(_, uri)| uri.clone());
		found
	}

	/// Return the most recently bound, unmasked prefix for `uri`.
	///
	/// Only entries of enclosing scopes need the masking check, as a prefix
	/// is unique within a scope.
	pub fn find_prefix_by_uri(&self, uri: &str) -> Option<Symbol> {
		let chain = read_chain(&self.chain);
		let visible = &chain.bindings[..self.scope_end];
		let found = (0..visible.len())
			.rev()
			.filter(|&i| visible[i].1.as_str() == uri)
			.find(|&i| !is_masked(visible, i, self.scope_start))
			.map(|i| visible[i].0.clone());
		found
	}

	/// Return all unmasked prefixes bound to `uri`, newest first.
	pub fn prefixes_bound_to_uri(&self, uri: &str) -> Vec<Symbol> {
		let chain = read_chain(&self.chain);
		let visible = &chain.bindings[..self.scope_end];
		let found: Vec<Symbol> = (0..visible.len())
			.rev()
			.filter(|&i| visible[i].1.as_str() == uri)
			.filter(|&i| !is_masked(visible, i, self.scope_start))
			.map(|i| visible[i].0.clone())
			.collect();
		found
	}

	/// Number of bindings visible from this scope, including masked ones
	/// and the predefined `xml`/`xmlns` bindings.
	pub fn size(&self) -> usize {
		self.scope_end
	}

	/// Number of bindings declared in this scope.
	pub fn local_size(&self) -> usize {
		self.scope_end - self.scope_start
	}

	/// Return the `(prefix, uri)` pairs declared in this scope, in order of
	/// declaration.
	pub fn local_bindings(&self) -> Vec<(Symbol, Symbol)> {
		read_chain(&self.chain).bindings[self.scope_start..self.scope_end].to_vec()
	}
}

impl Clone for BijectiveNsMap {
	/// The clone shares storage with `self`; whichever of the two writes
	/// first while the other can still see the affected entry copies.
	fn clone(&self) -> Self {
		write_chain(&self.chain).retain(self.scope_end);
		BijectiveNsMap {
			chain: self.chain.clone(),
			scope_start: self.scope_start,
			scope_end: self.scope_end,
		}
	}
}

impl Drop for BijectiveNsMap {
	fn drop(&mut self) {
		write_chain(&self.chain).release(self.scope_end);
	}
}

impl NamespaceContext for BijectiveNsMap {
	fn namespace_uri(&self, prefix: &str) -> Option<Symbol> {
		let fixed = fixed_uri(&read_chain(&self.chain).bindings[..2], prefix);
		match fixed {
			Some(uri) => Some(uri),
			None => self.find_uri_by_prefix(prefix),
		}
	}

	fn prefix(&self, uri: &str) -> Option<Symbol> {
		let fixed = fixed_prefix(&read_chain(&self.chain).bindings[..2], uri);
		match fixed {
			Some(prefix) => Some(prefix),
			None => self.find_prefix_by_uri(uri),
		}
	}

	fn prefixes(&self, uri: &str) -> Vec<Symbol> {
		let fixed = fixed_prefix(&read_chain(&self.chain).bindings[..2], uri);
		match fixed {
			Some(prefix) => vec![prefix],
			None => self.prefixes_bound_to_uri(uri),
		}
	}
}

impl fmt::Display for BijectiveNsMap {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(
			f,
			"[BijectiveNsMap; {} entries; of which {} local]",
			self.size(),
			self.local_size()
		)
	}
}

impl fmt::Debug for BijectiveNsMap {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		let chain = read_chain(&self.chain);
		let result = f
			.debug_struct("BijectiveNsMap")
			.field("scope_start", &self.scope_start)
			.field("scope_end", &self.scope_end)
			.field("bindings", &&chain.bindings[..self.scope_end])
			.finish();
		result
	}
}
