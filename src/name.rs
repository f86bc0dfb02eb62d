/*!
# Prefixed names

[`PrefixedName`] is the key under which element and attribute names are
tracked before (or without) namespace resolution: an optional prefix plus a
local name, both interned [`Symbol`]s.
*/
use std::cmp::Ordering;
use std::fmt;

use crate::symbols::{Symbol, SymbolTable};

/// Name consisting of an optional prefix and a local name.
///
/// An empty prefix is normalized to no prefix. Equality and hashing
/// operate on the symbols, so names built from handles of the same table
/// compare by identity first.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PrefixedName {
	prefix: Option<Symbol>,
	local_name: Symbol,
}

impl PrefixedName {
	/// Create a name from already interned parts.
	pub fn new(prefix: Option<Symbol>, local_name: Symbol) -> PrefixedName {
		PrefixedName {
			prefix: prefix.filter(|p| !p.is_empty()),
			local_name,
		}
	}

	/// Split a qualified name at its first colon and intern both parts.
	///
	/// No validation against the XML name productions is performed; a
	/// leading colon results in an unprefixed name.
	pub fn parse(symbols: &mut SymbolTable, qname: &str) -> PrefixedName {
		match qname.find(':') {
			None => PrefixedName::new(None, symbols.find_symbol_str(qname)),
			Some(pos) => {
				let prefix = symbols.find_symbol_str(&qname[..pos]);
				let local_name = symbols.find_symbol_str(&qname[pos + 1..]);
				PrefixedName::new(Some(prefix), local_name)
			}
		}
	}

	/// Replace both parts, reusing this instance as a lookup key.
	pub fn reset(&mut self, prefix: Option<Symbol>, local_name: Symbol) -> &mut PrefixedName {
		self.prefix = prefix.filter(|p| !p.is_empty());
		self.local_name = local_name;
		self
	}

	pub fn prefix(&self) -> Option<&Symbol> {
		self.prefix.as_ref()
	}

	pub fn local_name(&self) -> &Symbol {
		&self.local_name
	}

	/// Return whether this is the name of a namespace declaration
	/// attribute (`xmlns` or `xmlns:*`).
	pub fn is_ns_declaration(&self) -> bool {
		match self.prefix.as_ref() {
			None => self.local_name == "xmlns",
			Some(prefix) => *prefix == "xmlns",
		}
	}

	/// Return whether this is the reserved attribute `xml:{local_name}`.
	///
	/// In namespace-aware mode the prefix must be `xml`. Otherwise the whole
	/// name was stored as local name and is compared as `xml:` followed by
	/// `local_name`.
	pub fn is_xml_reserved_attr(&self, ns_aware: bool, local_name: &str) -> bool {
		if ns_aware {
			match self.prefix.as_ref() {
				Some(prefix) if *prefix == "xml" => self.local_name == local_name,
				_ => false,
			}
		} else {
			match self.local_name.strip_prefix("xml:") {
				Some(rest) => rest == local_name,
				None => false,
			}
		}
	}
}

impl PartialOrd for PrefixedName {
	fn partial_cmp(&self, other: &PrefixedName) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for PrefixedName {
	/// Unprefixed names sort first; then by prefix, then by local name.
	fn cmp(&self, other: &PrefixedName) -> Ordering {
		match (self.prefix.as_ref(), other.prefix.as_ref()) {
			(None, Some(_)) => Ordering::Less,
			(Some(_), None) => Ordering::Greater,
			(Some(a), Some(b)) if a != b => a.cmp(b),
			_ => self.local_name.cmp(&other.local_name),
		}
	}
}

impl fmt::Display for PrefixedName {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self.prefix.as_ref() {
			Some(prefix) => write!(f, "{}:{}", prefix, self.local_name),
			None => f.write_str(&self.local_name),
		}
	}
}

impl fmt::Debug for PrefixedName {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "PrefixedName({})", self)
	}
}
