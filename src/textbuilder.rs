/*!
# Multi-value text accumulation

[`TextBuilder`] collects several short values (typically the values of all
attributes of one element) back to back in a single buffer and remembers
where each one ends. This avoids one allocation per value.
*/
use std::cmp;

use log::trace;

const CHARS_PER_VALUE: usize = 16;
const MIN_INITIAL_LEN: usize = 60;
const MAX_INITIAL_LEN: usize = 120;

/**
# Contiguous accumulator for several values

## Example

```
use rxml_core::TextBuilder;
let mut tb = TextBuilder::new(2);
tb.append_str("first");
assert_eq!(tb.end_value(), 0);
tb.append_str("sec");
tb.append_char('ö');
assert_eq!(tb.end_value(), 1);
assert_eq!(tb.value(0), Some("first"));
assert_eq!(tb.value(1), Some("secö"));
assert_eq!(tb.all_values(), "firstsecö");
```
*/
#[derive(Debug, Clone)]
pub struct TextBuilder {
	buf: String,
	limit: usize,
	/// end offset of each closed value
	value_ends: Vec<usize>,
	all_values: Option<String>,
}

impl TextBuilder {
	/// Create a builder sized for roughly `expected_values` values.
	pub fn new(expected_values: usize) -> TextBuilder {
		let limit = cmp::min(
			cmp::max(expected_values.saturating_mul(CHARS_PER_VALUE), MIN_INITIAL_LEN),
			MAX_INITIAL_LEN,
		);
		TextBuilder {
			buf: String::with_capacity(limit),
			limit,
			value_ends: Vec::with_capacity(expected_values),
			all_values: None,
		}
	}

	/// Drop all values, keeping the allocation.
	pub fn reset(&mut self) {
		self.buf.clear();
		self.value_ends.clear();
		self.all_values = None;
	}

	/// Return whether no value has been closed yet.
	pub fn is_empty(&self) -> bool {
		self.value_ends.is_empty()
	}

	fn reserve(&mut self, needed: usize) {
		let room = self.limit - self.buf.len();
		if needed <= room {
			return;
		}
		let new_limit = cmp::max(self.limit + (self.limit >> 1), self.buf.len() + needed);
		trace!("text builder grows from {} to {} bytes", self.limit, new_limit);
		self.buf.reserve_exact(new_limit - self.buf.len());
		self.limit = new_limit;
	}

	pub fn append_char(&mut self, c: char) {
		self.reserve(c.len_utf8());
		self.buf.push(c);
	}

	pub fn append_str(&mut self, s: &str) {
		self.reserve(s.len());
		self.buf.push_str(s);
	}

	/// Close the value currently being built and return its index.
	pub fn end_value(&mut self) -> usize {
		self.all_values = None;
		self.value_ends.push(self.buf.len());
		self.value_ends.len() - 1
	}

	/// Return the value with the given index, if it has been closed.
	pub fn value(&self, index: usize) -> Option<&str> {
		let end = *self.value_ends.get(index)?;
		let start = match index {
			0 => 0,
			_ => self.value_ends[index - 1],
		};
		Some(&self.buf[start..end])
	}

	pub fn value_count(&self) -> usize {
		self.value_ends.len()
	}

	/// Concatenation of all closed values.
	///
	/// Text appended after the last [`TextBuilder::end_value`] is not
	/// included. The result is cached until the next value is closed.
	pub fn all_values(&mut self) -> &str {
		if self.all_values.is_none() {
			let end = self.value_ends.last().copied().unwrap_or(0);
			self.all_values = Some(self.buf[..end].to_string());
		}
		match self.all_values.as_deref() {
			Some(v) => v,
			None => "",
		}
	}

	/// The raw buffer, including any unclosed trailing value.
	pub fn char_buffer(&self) -> &str {
		&self.buf
	}

	/// Number of bytes in [`TextBuilder::char_buffer`].
	pub fn char_size(&self) -> usize {
		self.buf.len()
	}
}

impl Default for TextBuilder {
	fn default() -> Self {
		Self::new(4)
	}
}
