/*!
# Symbol tables for element and attribute names

A [`SymbolTable`] maps character sequences to canonical [`Symbol`] handles.
Interning the same text twice through the same table (or through a child
table which has not diverged from it) yields the very same handle, which
allows cheap identity comparisons with [`Symbol::ptr_eq`] further down the
pipeline.

Tables are versioned and copy-on-write: [`SymbolTable::make_child`] returns
a table which shares its storage with the parent until the first insertion,
and [`SymbolTable::merge_child`] folds a grown child back into the parent so
that the next parse starts with a warmed-up vocabulary.

The table is meant to be written by one owner at a time. Mutating a parent
while children still share its storage is safe (the parent copies its
arrays before writing), but the children will not observe the new symbols.
*/
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
#[cfg(not(feature = "mt"))]
use std::rc::Rc;
#[cfg(feature = "mt")]
use std::sync::Arc;

use log::{debug, trace};

use crate::context::InternPool;
use crate::error::{ConfigError, Result, MAX_FILL_FACTOR, MIN_FILL_FACTOR};

/// Wrapper pointer around shared strings and storage
///
/// In builds with the `mt` feature, this is a [`Arc`]. In non-`mt` builds,
/// this is a [`std::rc::Rc`]
#[cfg(feature = "mt")]
pub type RcPtr<T> = Arc<T>;
/// Wrapper pointer around shared strings and storage
///
/// In builds with the `mt` feature, this is a [`std::sync::Arc`].
/// In non-`mt` builds, this is a [`Rc`].
#[cfg(not(feature = "mt"))]
pub type RcPtr<T> = Rc<T>;

const DEFAULT_TABLE_SIZE: usize = 128;
const DEFAULT_FILL_FACTOR: f32 = 0.75;

/// Compute the rolling hash used by [`SymbolTable`] and
/// [`ElementIdMap`](crate::ElementIdMap).
///
/// The first byte seeds the hash, every following byte is folded in as
/// `h * 31 + b` with wrapping arithmetic. Tokenizers are expected to compute
/// this incrementally while scanning a name and pass it along.
///
/// The hash of the empty string is zero.
pub fn calc_hash<T: AsRef<[u8]>>(data: T) -> u32 {
	let data = data.as_ref();
	let (first, rest) = match data.split_first() {
		None => return 0,
		Some(v) => v,
	};
	let mut hash = *first as u32;
	for b in rest {
		hash = hash.wrapping_mul(31).wrapping_add(*b as u32);
	}
	hash
}

/// Canonical handle for an interned piece of text.
///
/// Handles are issued by a [`SymbolTable`] (or by a
/// [`Context`](crate::Context)). Two handles issued for equal text by the
/// same table are identical, which can be checked in O(1) with
/// [`Symbol::ptr_eq`].
///
/// Equality first compares the handles and only falls back to comparing
/// the text when they differ, so symbols from unrelated tables still
/// compare correctly. Hashing is content based and agrees with the hashing
/// of [`str`].
#[derive(Clone)]
pub struct Symbol(RcPtr<String>);

impl Symbol {
	pub(crate) fn new<T: Into<String>>(s: T) -> Symbol {
		Symbol(RcPtr::new(s.into()))
	}

	pub(crate) fn from_ptr(ptr: RcPtr<String>) -> Symbol {
		Symbol(ptr)
	}

	/// Return whether both handles refer to the same interned string.
	#[inline]
	pub fn ptr_eq(a: &Symbol, b: &Symbol) -> bool {
		RcPtr::ptr_eq(&a.0, &b.0)
	}

	/// Access the text of the symbol.
	#[inline]
	pub fn as_str(&self) -> &str {
		self.0.as_str()
	}
}

impl PartialEq for Symbol {
	fn eq(&self, other: &Symbol) -> bool {
		Symbol::ptr_eq(self, other) || self.0.as_str() == other.0.as_str()
	}
}

impl Eq for Symbol {}

impl PartialEq<str> for Symbol {
	fn eq(&self, other: &str) -> bool {
		self.as_str() == other
	}
}

impl PartialEq<&str> for Symbol {
	fn eq(&self, other: &&str) -> bool {
		self.as_str() == *other
	}
}

impl PartialEq<Symbol> for &str {
	fn eq(&self, other: &Symbol) -> bool {
		*self == other.as_str()
	}
}

impl Hash for Symbol {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.as_str().hash(state)
	}
}

impl PartialOrd for Symbol {
	fn partial_cmp(&self, other: &Symbol) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Symbol {
	fn cmp(&self, other: &Symbol) -> std::cmp::Ordering {
		self.as_str().cmp(other.as_str())
	}
}

impl Deref for Symbol {
	type Target = str;

	fn deref(&self) -> &str {
		self.as_str()
	}
}

impl AsRef<str> for Symbol {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}

impl Borrow<str> for Symbol {
	fn borrow(&self) -> &str {
		self.as_str()
	}
}

impl fmt::Debug for Symbol {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(self.as_str(), f)
	}
}

impl fmt::Display for Symbol {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

// Overflow entries are immutable once linked, so a cloned bucket array can
// keep pointing at the same chains.
struct Bucket {
	symbol: Symbol,
	next: Option<RcPtr<Bucket>>,
}

impl Bucket {
	fn find(&self, name: &str) -> Option<&Symbol> {
		let mut curr = Some(self);
		while let Some(b) = curr {
			if b.symbol.as_str() == name {
				return Some(&b.symbol);
			}
			curr = b.next.as_deref();
		}
		None
	}
}

type SymbolSlots = Vec<Option<Symbol>>;
type BucketSlots = Vec<Option<RcPtr<Bucket>>>;

/**
# Copy-on-write symbol table

Primary slots are addressed by `hash & mask`. When a slot is taken by a
different string, the new symbol goes into an overflow chain indexed by
`(hash & mask) >> 1`. The table doubles once the number of symbols reaches
the fill-factor threshold.

## Example

```
use rxml_core::{SymbolTable, calc_hash};
let mut table = SymbolTable::default();
let buf = "<foo:bar>";
let name = &buf[1..8];
let a = table.find_symbol(name, calc_hash(name));
let b = table.find_symbol_str("foo:bar");
assert!(rxml_core::Symbol::ptr_eq(&a, &b));
```
*/
pub struct SymbolTable {
	intern: bool,
	pool: Option<RcPtr<InternPool>>,
	symbols: RcPtr<SymbolSlots>,
	buckets: RcPtr<BucketSlots>,
	size: usize,
	size_threshold: usize,
	index_mask: usize,
	version: u32,
	dirty: bool,
	empty: Symbol,
}

impl SymbolTable {
	/// Create a new root table.
	///
	/// `initial_size` is rounded up to the next power of two (and to at
	/// least 4). The table grows once it holds
	/// `initial_size * fill_factor` symbols.
	///
	/// If `intern` is true and the table is attached to a
	/// [`Context`](crate::Context), new symbols are canonicalized through
	/// the context's intern pool.
	///
	/// # Errors
	///
	/// A zero `initial_size` or a `fill_factor` outside of `(0.01, 10.0]` is
	/// rejected with [`Error::Config`](crate::Error::Config).
	pub fn new(intern: bool, initial_size: usize, fill_factor: f32) -> Result<SymbolTable> {
		if initial_size < 1 {
			return Err(ConfigError::ZeroInitialSize.into());
		}
		if !(fill_factor > MIN_FILL_FACTOR && fill_factor <= MAX_FILL_FACTOR) {
			return Err(ConfigError::FillFactorOutOfRange(fill_factor).into());
		}
		let mut size = 4usize;
		while size < initial_size {
			size += size;
		}
		Ok(SymbolTable {
			intern,
			pool: None,
			symbols: RcPtr::new(vec![None; size]),
			buckets: RcPtr::new(vec![None; size >> 1]),
			size: 0,
			size_threshold: (size as f32 * fill_factor + 0.5) as usize,
			index_mask: size - 1,
			version: 1,
			dirty: true,
			empty: Symbol::new(""),
		})
	}

	/// Create a new root table with the default fill factor.
	pub fn with_capacity(initial_size: usize) -> Result<SymbolTable> {
		Self::new(true, initial_size, DEFAULT_FILL_FACTOR)
	}

	pub(crate) fn attach_pool(&mut self, pool: RcPtr<InternPool>) {
		self.pool = Some(pool);
	}

	/// Create a derived table sharing storage with this one.
	///
	/// The child copies the storage on its first insertion; until then,
	/// lookups in the child return the parent's handles.
	pub fn make_child(&self) -> SymbolTable {
		SymbolTable {
			intern: self.intern,
			pool: self.pool.clone(),
			symbols: self.symbols.clone(),
			buckets: self.buckets.clone(),
			size: self.size,
			size_threshold: self.size_threshold,
			index_mask: self.index_mask,
			version: self.version + 1,
			dirty: false,
			empty: self.empty.clone(),
		}
	}

	/// Adopt the contents of a child table if it has grown beyond this one.
	///
	/// After merging, both tables share storage and neither is dirty: the
	/// next one to insert a symbol makes a private copy first. The version
	/// of this table is bumped so that siblings created before the merge
	/// are no longer direct children.
	pub fn merge_child(&mut self, child: &mut SymbolTable) {
		if child.size <= self.size {
			trace!(
				"not merging child symbol table: {} <= {} symbols",
				child.size,
				self.size
			);
			return;
		}
		debug!(
			"merging child symbol table: {} -> {} symbols (version {})",
			self.size,
			child.size,
			self.version + 1
		);
		self.symbols = child.symbols.clone();
		self.buckets = child.buckets.clone();
		self.size = child.size;
		self.size_threshold = child.size_threshold;
		self.index_mask = child.index_mask;
		self.version += 1;
		self.dirty = false;
		child.dirty = false;
	}

	/// Enable or disable canonicalization through the intern pool.
	pub fn set_intern_strings(&mut self, state: bool) {
		self.intern = state;
	}

	/// Number of symbols in the table.
	pub fn size(&self) -> usize {
		self.size
	}

	pub fn version(&self) -> u32 {
		self.version
	}

	/// Return whether this table owns its storage privately.
	///
	/// A fresh child is not dirty; it becomes dirty with its first
	/// insertion.
	pub fn is_dirty(&self) -> bool {
		self.dirty
	}

	/// Return whether this table was created by `make_child` on `other`.
	///
	/// This compares version numbers only and is therefore a heuristic for
	/// tables which are known to be related.
	pub fn is_direct_child_of(&self, other: &SymbolTable) -> bool {
		self.version == other.version + 1
	}

	/// Return the canonical symbol for `name`, inserting it if necessary.
	///
	/// `hash` must be [`calc_hash`] of `name`. An empty `name` returns the
	/// shared empty symbol without touching the table.
	pub fn find_symbol(&mut self, name: &str, hash: u32) -> Symbol {
		if name.is_empty() {
			return self.empty.clone();
		}
		if let Some(sym) = self.lookup(name, hash) {
			return sym.clone();
		}

		if self.size >= self.size_threshold {
			self.rehash();
		} else if !self.dirty {
			self.copy_arrays();
		}
		self.size += 1;
		let symbol = self.make_symbol(name);
		let index = hash as usize & self.index_mask;
		let symbols = RcPtr::make_mut(&mut self.symbols);
		if symbols[index].is_none() {
			symbols[index] = Some(symbol.clone());
		} else {
			let buckets = RcPtr::make_mut(&mut self.buckets);
			let bix = index >> 1;
			let next = buckets[bix].take();
			buckets[bix] = Some(RcPtr::new(Bucket {
				symbol: symbol.clone(),
				next,
			}));
		}
		symbol
	}

	/// Like [`SymbolTable::find_symbol`], computing the hash itself.
	pub fn find_symbol_str(&mut self, name: &str) -> Symbol {
		self.find_symbol(name, calc_hash(name))
	}

	/// Return the canonical symbol for `name` if it is in the table.
	pub fn find_symbol_if_exists(&self, name: &str, hash: u32) -> Option<Symbol> {
		if name.is_empty() {
			return Some(self.empty.clone());
		}
		self.lookup(name, hash).cloned()
	}

	fn lookup(&self, name: &str, hash: u32) -> Option<&Symbol> {
		let index = hash as usize & self.index_mask;
		let sym = self.symbols[index].as_ref()?;
		if sym.as_str() == name {
			return Some(sym);
		}
		self.buckets[index >> 1].as_ref()?.find(name)
	}

	fn make_symbol(&self, name: &str) -> Symbol {
		match self.pool.as_ref() {
			Some(pool) if self.intern => pool.intern(name),
			_ => Symbol::new(name),
		}
	}

	fn copy_arrays(&mut self) {
		trace!(
			"symbol table version {} diverges from parent ({} symbols)",
			self.version,
			self.size
		);
		self.symbols = RcPtr::new((*self.symbols).clone());
		self.buckets = RcPtr::new((*self.buckets).clone());
		self.dirty = true;
	}

	fn rehash(&mut self) {
		let old_len = self.symbols.len();
		let new_len = old_len + old_len;
		let mask = new_len - 1;
		let mut symbols: SymbolSlots = vec![None; new_len];
		let mut buckets: BucketSlots = vec![None; new_len >> 1];
		debug!(
			"rehashing symbol table version {}: {} -> {} slots for {} symbols",
			self.version, old_len, new_len, self.size
		);

		let mut count = 0;
		for sym in self.symbols.iter().flatten() {
			count += 1;
			place(&mut symbols, &mut buckets, mask, sym.clone());
		}
		for chain in self.buckets.iter().flatten() {
			let mut curr = Some(&**chain);
			while let Some(b) = curr {
				count += 1;
				place(&mut symbols, &mut buckets, mask, b.symbol.clone());
				curr = b.next.as_deref();
			}
		}
		if count != self.size {
			panic!(
				"internal error on SymbolTable::rehash(): had {} entries; now have {}",
				self.size, count
			);
		}

		self.symbols = RcPtr::new(symbols);
		self.buckets = RcPtr::new(buckets);
		self.index_mask = mask;
		self.size_threshold += self.size_threshold;
		self.dirty = true;
	}

	/// Average number of probes needed to find a stored symbol.
	///
	/// Symbols in a primary slot cost one probe; the n-th entry of an
	/// overflow chain costs `n + 1`.
	pub fn calc_avg_seek(&self) -> f64 {
		if self.size == 0 {
			return 0.0;
		}
		let mut count = self.symbols.iter().filter(|x| x.is_some()).count();
		for chain in self.buckets.iter() {
			let mut cost = 2;
			let mut curr = chain.as_deref();
			while let Some(b) = curr {
				count += cost;
				cost += 1;
				curr = b.next.as_deref();
			}
		}
		count as f64 / self.size as f64
	}
}

fn place(symbols: &mut SymbolSlots, buckets: &mut BucketSlots, mask: usize, symbol: Symbol) {
	let index = calc_hash(symbol.as_str()) as usize & mask;
	if symbols[index].is_none() {
		symbols[index] = Some(symbol);
	} else {
		let bix = index >> 1;
		let next = buckets[bix].take();
		buckets[bix] = Some(RcPtr::new(Bucket { symbol, next }));
	}
}

impl Default for SymbolTable {
	fn default() -> Self {
		Self {
			intern: true,
			pool: None,
			symbols: RcPtr::new(vec![None; DEFAULT_TABLE_SIZE]),
			buckets: RcPtr::new(vec![None; DEFAULT_TABLE_SIZE >> 1]),
			size: 0,
			size_threshold: (DEFAULT_TABLE_SIZE as f32 * DEFAULT_FILL_FACTOR + 0.5) as usize,
			index_mask: DEFAULT_TABLE_SIZE - 1,
			version: 1,
			dirty: true,
			empty: Symbol::new(""),
		}
	}
}

impl fmt::Debug for SymbolTable {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("SymbolTable")
			.field("size", &self.size)
			.field("slots", &self.symbols.len())
			.field("version", &self.version)
			.field("dirty", &self.dirty)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn intern(t: &mut SymbolTable, s: &str) -> Symbol {
		t.find_symbol(s, calc_hash(s))
	}

	#[test]
	fn calc_hash_folds_bytes_like_a_polynomial() {
		assert_eq!(calc_hash(""), 0);
		assert_eq!(calc_hash("a"), 97);
		assert_eq!(calc_hash("ab"), 97 * 31 + 98);
		assert_eq!(calc_hash(b"ab"), calc_hash("ab"));
	}

	#[test]
	fn rejects_invalid_configuration() {
		assert!(matches!(
			SymbolTable::new(true, 0, 0.75),
			Err(crate::Error::Config(ConfigError::ZeroInitialSize))
		));
		assert!(matches!(
			SymbolTable::new(true, 16, 0.01),
			Err(crate::Error::Config(ConfigError::FillFactorOutOfRange(_)))
		));
		assert!(matches!(
			SymbolTable::new(true, 16, 10.5),
			Err(crate::Error::Config(ConfigError::FillFactorOutOfRange(_)))
		));
		assert!(SymbolTable::new(true, 16, 10.0).is_ok());
	}

	#[test]
	fn rounds_initial_size_up_to_power_of_two() {
		let t = SymbolTable::new(true, 5, 0.75).unwrap();
		assert_eq!(t.symbols.len(), 8);
		assert_eq!(t.buckets.len(), 4);
		assert_eq!(t.size_threshold, 6);
		let t = SymbolTable::new(true, 1, 0.75).unwrap();
		assert_eq!(t.symbols.len(), 4);
	}

	#[test]
	fn repeated_lookups_return_identical_handle() {
		let mut t = SymbolTable::default();
		let buf = "xx:foo:bar";
		let a = t.find_symbol(&buf[3..6], calc_hash(&buf[3..6]));
		let b = intern(&mut t, "foo");
		assert!(Symbol::ptr_eq(&a, &b));
		assert_eq!(a, "foo");
		assert_eq!(t.size(), 1);
	}

	#[test]
	fn empty_name_is_shared_and_not_counted() {
		let mut t = SymbolTable::default();
		let a = intern(&mut t, "");
		let b = t.find_symbol_if_exists("", 0).unwrap();
		assert!(Symbol::ptr_eq(&a, &b));
		assert_eq!(t.size(), 0);
	}

	#[test]
	fn find_if_exists_does_not_insert() {
		let mut t = SymbolTable::default();
		assert!(t.find_symbol_if_exists("foo", calc_hash("foo")).is_none());
		assert_eq!(t.size(), 0);
		let a = intern(&mut t, "foo");
		let b = t.find_symbol_if_exists("foo", calc_hash("foo")).unwrap();
		assert!(Symbol::ptr_eq(&a, &b));
	}

	#[test]
	fn colliding_names_go_to_overflow_chain() {
		let mut t = SymbolTable::new(true, 4, 10.0).unwrap();
		// all of these land in the same primary slot with a mask of 3
		let names = ["a", "e", "i", "m", "q"];
		let syms: Vec<Symbol> = names.iter().map(|n| intern(&mut t, n)).collect();
		assert_eq!(t.size(), 5);
		for (name, sym) in names.iter().zip(syms.iter()) {
			let again = intern(&mut t, name);
			assert!(Symbol::ptr_eq(sym, &again));
		}
		assert!(t.calc_avg_seek() > 1.0);
	}

	#[test]
	fn growth_keeps_all_symbols_identical() {
		let mut t = SymbolTable::new(true, 4, 0.75).unwrap();
		let syms: Vec<Symbol> = (0..200)
			.map(|i| intern(&mut t, &format!("name{}", i)))
			.collect();
		assert_eq!(t.size(), 200);
		assert!(t.symbols.len() >= 256);
		for (i, sym) in syms.iter().enumerate() {
			let again = intern(&mut t, &format!("name{}", i));
			assert!(Symbol::ptr_eq(sym, &again));
		}
	}

	#[test]
	#[should_panic(expected = "internal error on SymbolTable::rehash()")]
	fn rehash_detects_lost_entries() {
		let mut t = SymbolTable::new(true, 4, 0.75).unwrap();
		intern(&mut t, "a");
		intern(&mut t, "b");
		t.size += 1;
		t.rehash();
	}

	#[test]
	fn child_shares_parent_symbols_until_it_diverges() {
		let mut parent = SymbolTable::default();
		let foo = intern(&mut parent, "foo");
		let mut child = parent.make_child();
		assert!(!child.is_dirty());
		assert!(child.is_direct_child_of(&parent));
		assert!(RcPtr::ptr_eq(&parent.symbols, &child.symbols));

		let foo2 = intern(&mut child, "foo");
		assert!(Symbol::ptr_eq(&foo, &foo2));
		assert!(!child.is_dirty());

		let bar = intern(&mut child, "bar");
		assert!(child.is_dirty());
		assert!(!RcPtr::ptr_eq(&parent.symbols, &child.symbols));
		assert!(parent.find_symbol_if_exists("bar", calc_hash("bar")).is_none());
		assert_eq!(parent.size(), 1);
		assert_eq!(child.size(), 2);
		assert_eq!(bar, "bar");
	}

	#[test]
	fn writing_parent_does_not_leak_into_child() {
		let mut parent = SymbolTable::default();
		intern(&mut parent, "foo");
		let child = parent.make_child();
		intern(&mut parent, "bar");
		assert!(child.find_symbol_if_exists("bar", calc_hash("bar")).is_none());
	}

	#[test]
	fn merge_adopts_larger_child() {
		let mut parent = SymbolTable::default();
		let foo = intern(&mut parent, "foo");
		let mut child = parent.make_child();
		let bar = intern(&mut child, "bar");
		let v = parent.version();

		parent.merge_child(&mut child);
		assert_eq!(parent.size(), 2);
		assert_eq!(parent.version(), v + 1);
		assert!(!parent.is_dirty());
		assert!(!child.is_dirty());
		let bar2 = parent.find_symbol_if_exists("bar", calc_hash("bar")).unwrap();
		let foo2 = parent.find_symbol_if_exists("foo", calc_hash("foo")).unwrap();
		assert!(Symbol::ptr_eq(&bar, &bar2));
		assert!(Symbol::ptr_eq(&foo, &foo2));

		// the child copies before writing again
		intern(&mut child, "baz");
		assert!(parent.find_symbol_if_exists("baz", calc_hash("baz")).is_none());
	}

	#[test]
	fn merge_ignores_smaller_child() {
		let mut parent = SymbolTable::default();
		intern(&mut parent, "foo");
		intern(&mut parent, "bar");
		let mut child = parent.make_child();
		let v = parent.version();
		parent.merge_child(&mut child);
		assert_eq!(parent.version(), v);
		assert_eq!(parent.size(), 2);
	}

	#[test]
	fn symbols_from_different_tables_compare_by_content() {
		let mut t1 = SymbolTable::default();
		let mut t2 = SymbolTable::default();
		let a = intern(&mut t1, "foo");
		let b = intern(&mut t2, "foo");
		assert!(!Symbol::ptr_eq(&a, &b));
		assert_eq!(a, b);
	}
}
