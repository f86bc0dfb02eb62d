/*!
# ID/IDREF cross-referencing

[`ElementIdMap`] records every value of an ID-typed attribute (definitions)
and every value of an IDREF/IDREFS-typed attribute (references) seen while
validating a document. Once the document is done, the ids which were
referenced but never defined can be enumerated in the order they were first
referenced.

Records live in an arena inside the map and are addressed by [`IdRef`].
Two chains are threaded through the arena: the collision chains of the hash
table and the list of ids which were referenced before (or without) being
defined.
*/
use std::cmp;
use std::fmt;

use log::debug;
use smartstring::alias::String as SmartString;

use crate::location::Location;
use crate::name::PrefixedName;
use crate::symbols::calc_hash;

const DEFAULT_SIZE: usize = 128;
const MIN_SIZE: usize = 16;
const FILL_PCT: usize = 80;

/// Stable index of an [`ElementId`] within its [`ElementIdMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdRef(usize);

/**
# Record for a single id value

Created either by the first reference to an id (undefined placeholder) or
by its definition. A placeholder is upgraded in place when the definition
shows up.
*/
#[derive(Debug, Clone)]
pub struct ElementId {
	id: SmartString,
	hash: u32,
	this: IdRef,
	location: Location,
	defined: bool,
	element_name: PrefixedName,
	attribute_name: PrefixedName,
	next_undefined: Option<IdRef>,
	next_colliding: Option<IdRef>,
}

impl ElementId {
	/// The id value.
	pub fn id(&self) -> &str {
		self.id.as_str()
	}

	pub fn id_ref(&self) -> IdRef {
		self.this
	}

	/// Location of the definition if defined, else of the first reference.
	pub fn location(&self) -> &Location {
		&self.location
	}

	/// Name of the element carrying the definition (or first reference).
	pub fn element_name(&self) -> &PrefixedName {
		&self.element_name
	}

	/// Name of the attribute carrying the definition (or first reference).
	pub fn attribute_name(&self) -> &PrefixedName {
		&self.attribute_name
	}

	pub fn is_defined(&self) -> bool {
		self.defined
	}

	pub fn is_undefined(&self) -> bool {
		!self.defined
	}

	fn link_undefined(&mut self, next: IdRef) {
		if self.next_undefined.is_some() {
			panic!(
				"internal error on ElementId::link_undefined(): id '{}' is already linked",
				self.id
			);
		}
		self.next_undefined = Some(next);
	}

	fn mark_defined(
		&mut self,
		location: Location,
		element_name: PrefixedName,
		attribute_name: PrefixedName,
	) {
		if self.defined {
			panic!(
				"internal error on ElementId::mark_defined(): id '{}' is already defined",
				self.id
			);
		}
		self.defined = true;
		self.location = location;
		self.element_name = element_name;
		self.attribute_name = attribute_name;
	}
}

impl fmt::Display for ElementId {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(
			f,
			"{} ({} at {})",
			self.id,
			if self.defined { "defined" } else { "undefined" },
			self.location
		)
	}
}

/**
# Hash map from id values to [`ElementId`] records

The table grows by a factor of four once it is 80% full. The map is meant
to live for a single pass over a single document.

## Example

```
use rxml_core::{ElementIdMap, Location, PrefixedName, SymbolTable};
let mut symbols = SymbolTable::default();
let elem = PrefixedName::parse(&mut symbols, "section");
let attr = PrefixedName::parse(&mut symbols, "ref");
let mut ids = ElementIdMap::new();
ids.add_referenced_str("intro", Location::new(1, 10, 9), elem.clone(), attr.clone());
assert_eq!(ids.first_undefined().unwrap().id(), "intro");
ids.add_defined_str("intro", Location::new(7, 3, 120), elem, attr);
assert!(ids.first_undefined().is_none());
```
*/
pub struct ElementIdMap {
	ids: Vec<ElementId>,
	table: Vec<Option<IdRef>>,
	index_mask: usize,
	size_threshold: usize,
	head: Option<IdRef>,
	tail: Option<IdRef>,
}

impl ElementIdMap {
	pub fn new() -> ElementIdMap {
		Self::with_capacity(DEFAULT_SIZE)
	}

	/// Create a map with at least `initial_size` slots.
	///
	/// The slot count is rounded up to a power of two, and to at least 16.
	pub fn with_capacity(initial_size: usize) -> ElementIdMap {
		let actual = cmp::max(initial_size, MIN_SIZE).next_power_of_two();
		ElementIdMap {
			ids: Vec::new(),
			table: vec![None; actual],
			index_mask: actual - 1,
			size_threshold: (actual * FILL_PCT) / 100,
			head: None,
			tail: None,
		}
	}

	/// Number of distinct ids, defined or not.
	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn get(&self, r: IdRef) -> Option<&ElementId> {
		self.ids.get(r.0)
	}

	pub fn find(&self, id: &str) -> Option<&ElementId> {
		self.lookup(id, calc_hash(id)).map(|r| &self.ids[r.0])
	}

	/// The id which was referenced earliest and is still undefined.
	pub fn first_undefined(&self) -> Option<&ElementId> {
		self.head.map(|r| &self.ids[r.0])
	}

	/// Iterate over all still undefined ids, in order of first reference.
	pub fn undefined(&self) -> Undefined<'_> {
		Undefined {
			map: self,
			next: self.head,
		}
	}

	fn lookup(&self, id: &str, hash: u32) -> Option<IdRef> {
		let mut cur = self.table[hash as usize & self.index_mask];
		while let Some(r) = cur {
			let entry = &self.ids[r.0];
			if entry.hash == hash && entry.id.as_str() == id {
				return Some(r);
			}
			cur = entry.next_colliding;
		}
		None
	}

	/// Create a new record and hook it into its collision chain.
	fn insert(
		&mut self,
		id: &str,
		hash: u32,
		defined: bool,
		location: Location,
		element_name: PrefixedName,
		attribute_name: PrefixedName,
	) -> IdRef {
		if self.ids.len() >= self.size_threshold {
			self.rehash();
		}
		let index = hash as usize & self.index_mask;
		let r = IdRef(self.ids.len());
		self.ids.push(ElementId {
			id: SmartString::from(id),
			hash,
			this: r,
			location,
			defined,
			element_name,
			attribute_name,
			next_undefined: None,
			next_colliding: self.table[index],
		});
		self.table[index] = Some(r);
		r
	}

	/// Record a reference to `id`, whose [`calc_hash`] is `hash`.
	///
	/// If the id is already known (defined or not), the existing record is
	/// returned unchanged. Otherwise an undefined placeholder is created and
	/// appended to the list of undefined ids.
	pub fn add_referenced(
		&mut self,
		id: &str,
		hash: u32,
		location: Location,
		element_name: PrefixedName,
		attribute_name: PrefixedName,
	) -> &ElementId {
		if let Some(r) = self.lookup(id, hash) {
			return &self.ids[r.0];
		}
		let r = self.insert(id, hash, false, location, element_name, attribute_name);
		match self.tail {
			None => self.head = Some(r),
			Some(tail) => self.ids[tail.0].link_undefined(r),
		}
		self.tail = Some(r);
		&self.ids[r.0]
	}

	/// Like [`ElementIdMap::add_referenced`], hashing `id` itself.
	pub fn add_referenced_str(
		&mut self,
		id: &str,
		location: Location,
		element_name: PrefixedName,
		attribute_name: PrefixedName,
	) -> &ElementId {
		self.add_referenced(id, calc_hash(id), location, element_name, attribute_name)
	}

	/// Record the definition of `id`, whose [`calc_hash`] is `hash`.
	///
	/// If the id is already defined, the existing record is returned
	/// unchanged; detecting the duplicate is up to the caller, who can
	/// check [`ElementId::is_defined`] on [`ElementIdMap::find`] beforehand.
	/// An undefined placeholder is upgraded in place.
	pub fn add_defined(
		&mut self,
		id: &str,
		hash: u32,
		location: Location,
		element_name: PrefixedName,
		attribute_name: PrefixedName,
	) -> &ElementId {
		let r = match self.lookup(id, hash) {
			None => {
				let r = self.insert(id, hash, true, location, element_name, attribute_name);
				return &self.ids[r.0];
			}
			Some(r) => r,
		};
		if self.ids[r.0].defined {
			return &self.ids[r.0];
		}
		self.ids[r.0].mark_defined(location, element_name, attribute_name);
		if self.head == Some(r) {
			self.advance_head();
		}
		&self.ids[r.0]
	}

	/// Like [`ElementIdMap::add_defined`], hashing `id` itself.
	pub fn add_defined_str(
		&mut self,
		id: &str,
		location: Location,
		element_name: PrefixedName,
		attribute_name: PrefixedName,
	) -> &ElementId {
		self.add_defined(id, calc_hash(id), location, element_name, attribute_name)
	}

	/// Move the head past all leading defined entries.
	fn advance_head(&mut self) {
		let mut cur = self.head;
		while let Some(r) = cur {
			let entry = &self.ids[r.0];
			if !entry.defined {
				break;
			}
			cur = entry.next_undefined;
		}
		self.head = cur;
		if self.head.is_none() {
			self.tail = None;
		}
	}

	fn rehash(&mut self) {
		let old_len = self.table.len();
		let new_len = old_len << 2;
		let mask = new_len - 1;
		let old_table = std::mem::replace(&mut self.table, vec![None; new_len]);
		let mut count = 0;
		for slot in old_table {
			let mut cur = slot;
			while let Some(r) = cur {
				count += 1;
				let entry = &mut self.ids[r.0];
				cur = entry.next_colliding;
				let index = entry.hash as usize & mask;
				entry.next_colliding = self.table[index];
				self.table[index] = Some(r);
			}
		}
		if count != self.ids.len() {
			panic!(
				"internal error on ElementIdMap::rehash(): had {} entries; now have {}",
				self.ids.len(),
				count
			);
		}
		self.index_mask = mask;
		self.size_threshold = (new_len * FILL_PCT) / 100;
		debug!(
			"element id map grew from {} to {} slots ({} ids)",
			old_len,
			new_len,
			count
		);
	}
}

impl Default for ElementIdMap {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for ElementIdMap {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("ElementIdMap")
			.field("len", &self.ids.len())
			.field("slots", &self.table.len())
			.field("first_undefined", &self.first_undefined().map(|e| e.id()))
			.finish()
	}
}

/// Iterator over the undefined ids of an [`ElementIdMap`].
pub struct Undefined<'a> {
	map: &'a ElementIdMap,
	next: Option<IdRef>,
}

impl<'a> Iterator for Undefined<'a> {
	type Item = &'a ElementId;

	fn next(&mut self) -> Option<&'a ElementId> {
		while let Some(r) = self.next {
			let entry = &self.map.ids[r.0];
			self.next = entry.next_undefined;
			if !entry.defined {
				return Some(entry);
			}
		}
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::symbols::SymbolTable;

	struct Names {
		elem: PrefixedName,
		attr: PrefixedName,
	}

	impl Names {
		fn new() -> Names {
			let mut t = SymbolTable::default();
			Names {
				elem: PrefixedName::parse(&mut t, "item"),
				attr: PrefixedName::parse(&mut t, "xml:id"),
			}
		}

		fn reference(&self, m: &mut ElementIdMap, id: &str, line: u64) -> IdRef {
			m.add_referenced_str(id, Location::new(line, 1, 0), self.elem.clone(), self.attr.clone())
				.id_ref()
		}

		fn define(&self, m: &mut ElementIdMap, id: &str, line: u64) -> IdRef {
			m.add_defined_str(id, Location::new(line, 1, 0), self.elem.clone(), self.attr.clone())
				.id_ref()
		}
	}

	fn undefined_ids(m: &ElementIdMap) -> Vec<&str> {
		m.undefined().map(|e| e.id()).collect()
	}

	#[test]
	fn capacity_is_rounded_up() {
		assert_eq!(ElementIdMap::with_capacity(0).table.len(), 16);
		assert_eq!(ElementIdMap::with_capacity(100).table.len(), 128);
		assert_eq!(ElementIdMap::new().size_threshold, 102);
	}

	#[test]
	fn first_undefined_follows_reference_order() {
		let n = Names::new();
		let mut m = ElementIdMap::new();
		n.reference(&mut m, "x", 1);
		n.reference(&mut m, "y", 2);
		n.reference(&mut m, "z", 3);
		assert_eq!(m.first_undefined().unwrap().id(), "x");
		n.define(&mut m, "x", 4);
		assert_eq!(m.first_undefined().unwrap().id(), "y");
		n.define(&mut m, "y", 5);
		n.define(&mut m, "z", 6);
		assert!(m.first_undefined().is_none());
		assert!(m.tail.is_none());
	}

	#[test]
	fn head_skips_entries_defined_out_of_order() {
		let n = Names::new();
		let mut m = ElementIdMap::new();
		n.reference(&mut m, "a", 1);
		n.reference(&mut m, "b", 2);
		n.reference(&mut m, "c", 3);
		n.define(&mut m, "b", 4);
		assert_eq!(undefined_ids(&m), vec!["a", "c"]);
		n.define(&mut m, "a", 5);
		assert_eq!(m.first_undefined().unwrap().id(), "c");
		n.reference(&mut m, "d", 6);
		assert_eq!(undefined_ids(&m), vec!["c", "d"]);
	}

	#[test]
	fn list_restarts_after_running_empty() {
		let n = Names::new();
		let mut m = ElementIdMap::new();
		n.reference(&mut m, "a", 1);
		n.define(&mut m, "a", 2);
		assert!(m.first_undefined().is_none());
		n.reference(&mut m, "b", 3);
		assert_eq!(undefined_ids(&m), vec!["b"]);
	}

	#[test]
	fn repeated_reference_returns_existing_record() {
		let n = Names::new();
		let mut m = ElementIdMap::new();
		let a = n.reference(&mut m, "a", 1);
		let b = n.reference(&mut m, "a", 9);
		assert_eq!(a, b);
		assert_eq!(m.len(), 1);
		assert_eq!(m.get(a).unwrap().location().line, 1);
	}

	#[test]
	fn definition_without_reference_skips_undefined_list() {
		let n = Names::new();
		let mut m = ElementIdMap::new();
		n.define(&mut m, "a", 1);
		assert!(m.first_undefined().is_none());
		let r = n.reference(&mut m, "a", 2);
		assert!(m.get(r).unwrap().is_defined());
		assert!(m.first_undefined().is_none());
	}

	#[test]
	fn duplicate_definition_is_detectable() {
		let n = Names::new();
		let mut m = ElementIdMap::new();
		assert!(m.find("dup").is_none());
		n.define(&mut m, "dup", 1);
		let was_defined = m.find("dup").map_or(false, ElementId::is_defined);
		assert!(was_defined);
		let r = n.define(&mut m, "dup", 2);
		let e = m.get(r).unwrap();
		assert!(e.is_defined());
		// first definition wins
		assert_eq!(e.location().line, 1);
	}

	#[test]
	fn definition_updates_placeholder_location() {
		let n = Names::new();
		let mut m = ElementIdMap::new();
		let r = n.reference(&mut m, "a", 1);
		assert!(m.get(r).unwrap().is_undefined());
		let mut t = SymbolTable::default();
		let elem = PrefixedName::parse(&mut t, "target");
		m.add_defined_str("a", Location::new(8, 2, 50), elem.clone(), n.attr.clone());
		let e = m.get(r).unwrap();
		assert!(e.is_defined());
		assert_eq!(e.location().line, 8);
		assert_eq!(e.element_name(), &elem);
		assert_eq!(e.attribute_name().to_string(), "xml:id");
		assert_eq!(e.to_string(), "a (defined at line 8, column 2)");
	}

	#[test]
	fn growth_is_fourfold_and_keeps_everything() {
		let n = Names::new();
		let mut m = ElementIdMap::with_capacity(16);
		for i in 0..200 {
			n.reference(&mut m, &format!("id{}", i), i);
		}
		assert_eq!(m.table.len(), 256);
		assert_eq!(m.len(), 200);
		for i in 0..200 {
			assert_eq!(m.find(&format!("id{}", i)).unwrap().location().line, i);
		}
		assert_eq!(m.undefined().count(), 200);
	}

	#[test]
	#[should_panic(expected = "internal error on ElementIdMap::rehash(): had 12 entries; now have 11")]
	fn rehash_detects_lost_entries() {
		let n = Names::new();
		let mut m = ElementIdMap::with_capacity(16);
		for i in 0..12 {
			n.reference(&mut m, &format!("id{}", i), i);
		}
		let slot = m.table.iter().position(|s| s.is_some()).unwrap();
		let first = m.table[slot].unwrap();
		m.table[slot] = m.ids[first.0].next_colliding;
		for i in 12..20 {
			n.reference(&mut m, &format!("id{}", i), i);
		}
	}

	#[test]
	#[should_panic(expected = "is already defined")]
	fn marking_defined_twice_panics() {
		let n = Names::new();
		let mut m = ElementIdMap::new();
		let r = n.define(&mut m, "a", 1);
		m.ids[r.0].mark_defined(Location::default(), n.elem.clone(), n.attr.clone());
	}

	#[test]
	#[should_panic(expected = "is already linked")]
	fn linking_twice_panics() {
		let n = Names::new();
		let mut m = ElementIdMap::new();
		let a = n.reference(&mut m, "a", 1);
		let b = n.reference(&mut m, "b", 2);
		m.ids[a.0].link_undefined(b);
	}
}
