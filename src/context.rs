use std::fmt;

#[cfg(not(feature = "mt"))]
use std::cell::{RefCell, RefMut};
#[cfg(feature = "mt")]
use std::sync::{Mutex, MutexGuard};

#[cfg(all(feature = "shared_intern", feature = "mt"))]
use std::sync::Weak;
#[cfg(all(feature = "shared_intern", not(feature = "mt")))]
use std::rc::Weak;

use log::debug;

use crate::symbols::{RcPtr, Symbol, SymbolTable};

#[cfg(feature = "shared_intern")]
use weak_table;

#[cfg(feature = "shared_intern")]
type StringWeakSet = weak_table::WeakHashSet<Weak<String>>;

const ROOT_TABLE_SIZE: usize = 128;

/// Names which show up in almost every document and are worth having in
/// the root table from the start.
const DEFAULT_XML_SYMBOLS: &[&str] = &[
	"xml", "xmlns", "id", "name", "xsd", "xsi", "type", "soap", "SOAP-ENC", "SOAP-ENV", "Body",
	"Envelope",
];

/// Process-wide pool of canonical strings.
///
/// With the `shared_intern` feature, equal strings interned through the
/// pool share one allocation for as long as any handle to it is alive.
/// Without the feature, interning only allocates a fresh handle.
pub(crate) struct InternPool {
	#[cfg(all(feature = "shared_intern", feature = "mt"))]
	strings: Mutex<StringWeakSet>,
	#[cfg(all(feature = "shared_intern", not(feature = "mt")))]
	strings: RefCell<StringWeakSet>,
}

impl InternPool {
	fn new() -> InternPool {
		InternPool {
			#[cfg(all(feature = "shared_intern", feature = "mt"))]
			strings: Mutex::new(weak_table::WeakHashSet::new()),
			#[cfg(all(feature = "shared_intern", not(feature = "mt")))]
			strings: RefCell::new(weak_table::WeakHashSet::new()),
		}
	}

	#[cfg(all(feature = "shared_intern", feature = "mt"))]
	fn lock_strings<'a>(&'a self) -> MutexGuard<'a, StringWeakSet> {
		// a poisoned set is still structurally intact
		match self.strings.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}

	#[cfg(all(feature = "shared_intern", not(feature = "mt")))]
	fn lock_strings<'a>(&'a self) -> RefMut<'a, StringWeakSet> {
		self.strings.borrow_mut()
	}

	pub(crate) fn intern(&self, s: &str) -> Symbol {
		#[cfg(feature = "shared_intern")]
		{
			let mut strings = self.lock_strings();
			return match strings.get(s) {
				Some(ptr) => Symbol::from_ptr(ptr),
				None => {
					let ptr = RcPtr::new(s.to_string());
					strings.insert(ptr.clone());
					Symbol::from_ptr(ptr)
				}
			};
		}
		#[cfg(not(feature = "shared_intern"))]
		Symbol::new(s)
	}

	fn release_temporaries(&self) {
		#[cfg(feature = "shared_intern")]
		{
			let mut strings = self.lock_strings();
			strings.remove_expired();
			strings.shrink_to_fit();
		}
	}

	fn len(&self) -> usize {
		#[cfg(feature = "shared_intern")]
		{
			let strings = self.lock_strings();
			strings.len()
		}
		#[cfg(not(feature = "shared_intern"))]
		0
	}
}

/**
# Shared context for multiple parsers

The context owns the root [`SymbolTable`] which parsers derive their
per-document tables from, and the intern pool which tables created with
interning enabled canonicalize their symbols through.

A typical application creates one context at startup, hands out a child
table to every parse via [`Context::make_child`] and, once a parse is done,
folds the child back in with [`Context::merge_child`] so that later parses
start out with the vocabulary already known.

All methods take `&self`; the root table sits behind a guard which is
held only while a child is snapshotted or merged, never while a parse
runs. Building with `mt` turns that guard into a mutex and makes the
context `Send` and `Sync`, so parsers on several threads can draw from
one root.
*/
pub struct Context {
	#[cfg(feature = "mt")]
	root: Mutex<SymbolTable>,
	#[cfg(not(feature = "mt"))]
	root: RefCell<SymbolTable>,
	pool: RcPtr<InternPool>,
	xml_prefix: Symbol,
	xmlns_prefix: Symbol,
}

impl Context {
	#[cfg(feature = "mt")]
	fn wrap_root(root: SymbolTable) -> Mutex<SymbolTable> {
		return Mutex::new(root);
	}

	#[cfg(not(feature = "mt"))]
	fn wrap_root(root: SymbolTable) -> RefCell<SymbolTable> {
		return RefCell::new(root);
	}

	/// Create a new context with a root table holding the common XML names.
	pub fn new() -> Context {
		let pool = RcPtr::new(InternPool::new());
		let mut root = match SymbolTable::with_capacity(ROOT_TABLE_SIZE) {
			Ok(v) => v,
			Err(e) => unreachable!("default root table configuration rejected: {}", e),
		};
		root.attach_pool(pool.clone());
		for name in DEFAULT_XML_SYMBOLS {
			root.find_symbol_str(name);
		}
		let xml_prefix = root.find_symbol_str("xml");
		let xmlns_prefix = root.find_symbol_str("xmlns");
		Context {
			root: Self::wrap_root(root),
			pool,
			xml_prefix,
			xmlns_prefix,
		}
	}

	#[cfg(feature = "mt")]
	fn lock_root<'a>(&'a self) -> MutexGuard<'a, SymbolTable> {
		// the root table is only ever replaced wholesale under the lock
		match self.root.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}

	#[cfg(not(feature = "mt"))]
	fn lock_root<'a>(&'a self) -> RefMut<'a, SymbolTable> {
		self.root.borrow_mut()
	}

	/// Create a per-document table derived from the root table.
	pub fn make_child(&self) -> SymbolTable {
		self.lock_root().make_child()
	}

	/// Fold a per-document table back into the root table.
	///
	/// This only has an effect if `child` holds more symbols than the root
	/// table. `child` may continue to be used afterwards; it copies its
	/// storage before its next insertion.
	pub fn merge_child(&self, child: &mut SymbolTable) {
		let mut root = self.lock_root();
		let before = root.size();
		root.merge_child(child);
		if root.size() != before {
			debug!("root symbol table now holds {} symbols", root.size());
		}
	}

	/// Number of symbols in the root table.
	pub fn root_size(&self) -> usize {
		self.lock_root().size()
	}

	/// Version of the root table.
	pub fn root_version(&self) -> u32 {
		self.lock_root().version()
	}

	/// Return the canonical handle for `s` from the context's intern pool.
	///
	/// This is meant for strings which are not names, most notably
	/// namespace URIs.
	///
	/// With `shared_intern`, every live handle for the same text obtained
	/// here (or through a table attached to this context) points to the
	/// same allocation, so URIs compare by identity just like names. The
	/// pool only holds weak references; dropped strings linger as expired
	/// slots until [`Context::release_temporaries`] or a pool resize.
	pub fn intern<T: AsRef<str>>(&self, s: T) -> Symbol {
		self.pool.intern(s.as_ref())
	}

	/// Purge expired slots from the intern pool and release its spare
	/// capacity.
	///
	/// The root table is not touched: symbols merged into it stay alive for
	/// the lifetime of the context. A long-running process may call this
	/// between batches of documents whose URIs are not expected again.
	pub fn release_temporaries(&self) {
		self.pool.release_temporaries();
	}

	/// Return the number of strings in the intern pool.
	///
	/// Always zero without `shared_intern`. Expired slots are counted until
	/// they are purged.
	pub fn interned(&self) -> usize {
		self.pool.len()
	}

	/// The `xml` prefix as stored in the root table.
	pub fn xml_prefix(&self) -> &Symbol {
		&self.xml_prefix
	}

	/// The `xmlns` prefix as stored in the root table.
	pub fn xmlns_prefix(&self) -> &Symbol {
		&self.xmlns_prefix
	}
}

impl Default for Context {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Context {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		let mut f = f.debug_struct("Context");
		f.field("instance", &(self as *const Context));
		{
			let root = self.lock_root();
			f.field("root.size()", &root.size())
				.field("root.version()", &root.version());
		}
		f.field("interned", &self.pool.len());
		f.finish()
	}
}
