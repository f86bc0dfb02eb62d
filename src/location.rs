use std::fmt;

use crate::symbols::RcPtr;

/// Position in a source document, attached to ID definitions and
/// references for error reporting.
///
/// Lines and columns are one-based; `offset` counts bytes from the start of
/// the input.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Location {
	pub line: u64,
	pub column: u64,
	pub offset: u64,
	pub system_id: Option<RcPtr<str>>,
}

impl Location {
	pub fn new(line: u64, column: u64, offset: u64) -> Location {
		Location {
			line,
			column,
			offset,
			system_id: None,
		}
	}

	/// Attach the identifier of the source (usually a file name or URL).
	pub fn with_system_id<T: Into<RcPtr<str>>>(mut self, system_id: T) -> Location {
		self.system_id = Some(system_id.into());
		self
	}
}

impl fmt::Display for Location {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self.system_id.as_ref() {
			Some(id) => write!(f, "{}: line {}, column {}", id, self.line, self.column),
			None => write!(f, "line {}, column {}", self.line, self.column),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_includes_system_id_when_known() {
		let loc = Location::new(3, 14, 40);
		assert_eq!(loc.to_string(), "line 3, column 14");
		let loc = loc.with_system_id("doc.xml");
		assert_eq!(loc.to_string(), "doc.xml: line 3, column 14");
	}
}
