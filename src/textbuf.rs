/*!
# Segmented text accumulation

[`TextBuffer`] collects the character data of a single token (text node,
attribute value, comment, ...) while the tokenizer walks its input. It has
two modes:

- **shared**: the buffer merely points into the tokenizer's input
  ([`TextBuffer::reset_with_shared`]); nothing is copied.
- **owned**: text is appended into a list of filled segments plus one
  current segment. Segments are never moved or reallocated once filled, so
  appending to a long text costs no re-copying of what was appended before.

Appending to a shared buffer first copies the shared text into an owned
segment ("unsharing").

Contiguous views of the whole contents are produced on demand and cached
until the next mutation.
*/
use std::cmp;
use std::io;
use std::mem;

use bytes::BufMut;
use log::trace;

use crate::error::{ConfigError, Result};

const DEFAULT_INITIAL_SEGMENT_LEN: usize = 500;
const DEFAULT_MAX_SEGMENT_LEN: usize = 256 * 1024;

/// Configuration for a [`TextBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBufferOptions {
	/// Size in bytes of the first owned segment.
	pub initial_segment_len: usize,

	/// Upper bound for the size of newly allocated segments.
	///
	/// Segments grow by 50% each time the current one is exhausted, until
	/// this size is reached. A single append larger than this limit still
	/// gets a segment large enough to hold it.
	pub max_segment_len: usize,
}

impl TextBufferOptions {
	/// Set the [`TextBufferOptions::initial_segment_len`] value.
	///
	/// # Example
	///
	/// ```
	/// use rxml_core::{TextBuffer, TextBufferOptions};
	/// let buf = TextBuffer::with_options(TextBufferOptions::default().initial_segment_len(64)).unwrap();
	/// ```
	pub fn initial_segment_len(mut self, v: usize) -> TextBufferOptions {
		self.initial_segment_len = v;
		self
	}

	/// Set the [`TextBufferOptions::max_segment_len`] value.
	pub fn max_segment_len(mut self, v: usize) -> TextBufferOptions {
		self.max_segment_len = v;
		self
	}

	fn validate(&self) -> std::result::Result<(), ConfigError> {
		if self.initial_segment_len == 0 {
			return Err(ConfigError::InvalidSegmentLength(self.initial_segment_len));
		}
		if self.max_segment_len < self.initial_segment_len {
			return Err(ConfigError::InvalidSegmentLength(self.max_segment_len));
		}
		Ok(())
	}
}

impl Default for TextBufferOptions {
	/// Constructs default options.
	///
	/// The defaults are implementation-defined and should not be relied upon.
	fn default() -> Self {
		Self {
			initial_segment_len: DEFAULT_INITIAL_SEGMENT_LEN,
			max_segment_len: DEFAULT_MAX_SEGMENT_LEN,
		}
	}
}

struct Shared<'x> {
	buf: &'x str,
	start: usize,
	len: usize,
}

impl<'x> Shared<'x> {
	fn text(&self) -> &'x str {
		&self.buf[self.start..self.start + self.len]
	}
}

/**
# Growable, segmented text buffer

The lifetime `'x` is the lifetime of input buffers adopted with
[`TextBuffer::reset_with_shared`]. Use [`TextBuffer::detach`] to end that
borrow without giving up the buffer's allocations.

## Example

```
use rxml_core::TextBuffer;
let input = "<a>hello</a>";
let mut buf = TextBuffer::new();
buf.reset_with_shared(input, 3, 5);
assert_eq!(buf.contents_as_string(), "hello");
buf.append_str(" world");
assert_eq!(buf.contents_as_string(), "hello world");
```
*/
pub struct TextBuffer<'x> {
	opts: TextBufferOptions,
	shared: Option<Shared<'x>>,
	/// filled segments, in order
	segments: Vec<String>,
	/// total length of `segments`
	segment_size: usize,
	current: String,
	/// the current segment counts as full once it reaches this length
	current_limit: usize,
	result: Option<String>,
}

impl<'x> TextBuffer<'x> {
	/// Create an empty buffer with default options.
	///
	/// No memory is allocated until the first owned append.
	pub fn new() -> TextBuffer<'x> {
		Self::build(TextBufferOptions::default())
	}

	/// Create an empty buffer with the given options.
	///
	/// # Errors
	///
	/// A zero initial segment length, or a maximum segment length below
	/// the initial one, is rejected.
	pub fn with_options(opts: TextBufferOptions) -> Result<TextBuffer<'x>> {
		opts.validate()?;
		Ok(Self::build(opts))
	}

	fn build(opts: TextBufferOptions) -> TextBuffer<'x> {
		TextBuffer {
			opts,
			shared: None,
			segments: Vec::new(),
			segment_size: 0,
			current: String::new(),
			current_limit: 0,
			result: None,
		}
	}

	/// Discard all contents, keeping the current segment's allocation.
	pub fn reset_with_empty(&mut self) {
		self.shared = None;
		self.result = None;
		self.clear_segments();
	}

	/// Adopt `buf[start..start+len]` as contents without copying.
	///
	/// The caller is responsible for `start` and `len` lying on char
	/// boundaries within `buf`.
	pub fn reset_with_shared(&mut self, buf: &'x str, start: usize, len: usize) {
		self.result = None;
		self.clear_segments();
		self.shared = Some(Shared { buf, start, len });
	}

	/// Replace the contents with an owned copy of `buf[start..start+len]`.
	pub fn reset_with_copy(&mut self, buf: &str, start: usize, len: usize) {
		self.reset_initialized();
		self.append_slice(buf, start, len);
	}

	/// Discard all contents and make sure an owned segment is allocated.
	pub fn reset_initialized(&mut self) {
		self.reset_with_empty();
		if self.current_limit == 0 {
			self.allocate_current(self.opts.initial_segment_len);
		}
	}

	/// Rebind the buffer to a new input lifetime, keeping its contents and
	/// allocations.
	///
	/// Shared contents are copied into an owned segment first, so the
	/// returned buffer no longer borrows the input it was reset with. A
	/// tokenizer which refills its input keeps a `TextBuffer<'static>` and
	/// hands it back through this method at the end of every token:
	///
	/// ```
	/// use rxml_core::TextBuffer;
	/// let mut kept: TextBuffer<'static> = TextBuffer::new();
	/// let mut input = String::from("<a>first</a>");
	///
	/// let mut text = std::mem::take(&mut kept);
	/// text.reset_with_shared(&input, 3, 5);
	/// kept = text.detach();
	///
	/// input.clear();
	/// kept.append_str("!");
	/// assert_eq!(kept.contents_as_string(), "first!");
	/// ```
	pub fn detach<'y>(mut self) -> TextBuffer<'y> {
		if self.shared.is_some() {
			self.unshare(0);
		}
		TextBuffer {
			opts: self.opts,
			shared: None,
			segments: self.segments,
			segment_size: self.segment_size,
			current: self.current,
			current_limit: self.current_limit,
			result: self.result,
		}
	}

	/// Discard all contents and free all owned memory.
	///
	/// This is sensible to call when it is expected that the buffer will
	/// not be used for a while.
	pub fn release_temporaries(&mut self) {
		self.reset_with_empty();
		self.segments = Vec::new();
		self.current = String::new();
		self.current_limit = 0;
	}

	fn clear_segments(&mut self) {
		self.segments.clear();
		self.segment_size = 0;
		self.current.clear();
	}

	fn allocate_current(&mut self, len: usize) {
		self.current = String::with_capacity(len);
		self.current_limit = len;
	}

	/// Copy shared contents into an owned segment with room for
	/// `need_extra` more bytes.
	fn unshare(&mut self, need_extra: usize) {
		let shared = match self.shared.take() {
			Some(v) => v,
			None => return,
		};
		let needed = shared.len + need_extra;
		if needed > self.current_limit {
			self.allocate_current(cmp::max(needed, self.opts.initial_segment_len));
		}
		self.segments.clear();
		self.segment_size = 0;
		self.current.clear();
		self.current.push_str(shared.text());
	}

	fn calc_new_size(&self, latest: usize) -> usize {
		if latest == 0 {
			return self.opts.initial_segment_len;
		}
		cmp::min(latest + (latest >> 1), self.opts.max_segment_len)
	}

	/// Retire the current segment and start a new one which can hold at
	/// least `room_needed` bytes.
	fn expand(&mut self, room_needed: usize) {
		let new_len = cmp::max(room_needed, self.calc_new_size(self.current_limit));
		trace!(
			"text buffer segment full ({} bytes), next segment {} bytes",
			self.current.len(),
			new_len
		);
		let old = mem::replace(&mut self.current, String::with_capacity(new_len));
		self.current_limit = new_len;
		if !old.is_empty() {
			self.segment_size += old.len();
			self.segments.push(old);
		}
	}

	#[inline]
	fn room(&self) -> usize {
		self.current_limit - self.current.len()
	}

	/// Append a single character.
	pub fn append_char(&mut self, c: char) {
		let mut tmp = [0u8; 4];
		self.append_str(c.encode_utf8(&mut tmp));
	}

	/// Append `buf[start..start+len]`.
	pub fn append_slice(&mut self, buf: &str, start: usize, len: usize) {
		self.append_str(&buf[start..start + len]);
	}

	/// Append a string.
	///
	/// If the current segment cannot hold all of `s`, as much as fits (up
	/// to a char boundary) goes into it and the rest into a new segment.
	pub fn append_str(&mut self, s: &str) {
		if self.shared.is_some() {
			self.unshare(s.len());
		} else if self.current_limit == 0 {
			self.allocate_current(self.opts.initial_segment_len);
		}
		self.result = None;
		let room = self.room();
		if s.len() <= room {
			self.current.push_str(s);
			return;
		}
		let mut split = room;
		while !s.is_char_boundary(split) {
			split -= 1;
		}
		self.current.push_str(&s[..split]);
		let rest = &s[split..];
		self.expand(rest.len());
		self.current.push_str(rest);
	}

	/// Length of the contents in bytes.
	pub fn size(&self) -> usize {
		match self.shared.as_ref() {
			Some(shared) => shared.len,
			None => self.segment_size + self.current.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.size() == 0
	}

	/// Offset of the contents within [`TextBuffer::text_buffer`].
	pub fn text_start(&self) -> usize {
		match self.shared.as_ref() {
			Some(shared) => shared.start,
			None => 0,
		}
	}

	/// Return a contiguous buffer holding the contents at
	/// `text_start()..text_start() + size()`.
	///
	/// In shared mode this is the caller's entire input buffer. Otherwise it
	/// is either the single owned segment or the materialized contents.
	pub fn text_buffer(&mut self) -> &str {
		if let Some(shared) = self.shared.as_ref() {
			return shared.buf;
		}
		if self.segments.is_empty() {
			return &self.current;
		}
		self.contents_as_string()
	}

	/// Return the contents as one contiguous string.
	///
	/// The result is cached: calling this again without an intervening
	/// mutation returns the same string without copying.
	pub fn contents_as_string(&mut self) -> &str {
		if let Some(shared) = self.shared.as_ref() {
			return shared.text();
		}
		if self.segments.is_empty() {
			return &self.current;
		}
		if self.result.is_none() {
			let mut result = String::with_capacity(self.size());
			self.append_contents_to(&mut result);
			self.result = Some(result);
		}
		match self.result.as_deref() {
			Some(v) => v,
			None => "",
		}
	}

	/// Return the contents as contiguous UTF-8 bytes.
	///
	/// This shares its cache with [`TextBuffer::contents_as_string`].
	pub fn contents_as_array(&mut self) -> &[u8] {
		self.contents_as_string().as_bytes()
	}

	/// Copy the contents, starting at byte offset `src_start`, into `dst`.
	///
	/// Returns the number of bytes copied, which is the smaller of
	/// `dst.len()` and the number of bytes after `src_start`.
	pub fn contents_to_array(&self, src_start: usize, dst: &mut [u8]) -> usize {
		let mut skip = src_start;
		let mut copied = 0;
		for seg in self.segments() {
			if copied == dst.len() {
				break;
			}
			let seg = seg.as_bytes();
			if skip >= seg.len() {
				skip -= seg.len();
				continue;
			}
			let avail = &seg[skip..];
			skip = 0;
			let n = cmp::min(avail.len(), dst.len() - copied);
			dst[copied..copied + n].copy_from_slice(&avail[..n]);
			copied += n;
		}
		copied
	}

	/// Append the contents to `out`.
	pub fn append_contents_to(&self, out: &mut String) {
		for seg in self.segments() {
			out.push_str(seg);
		}
	}

	/// Write all segments in order to `w`.
	///
	/// Returns the number of bytes written.
	pub fn raw_contents_to<W: io::Write>(&self, w: &mut W) -> io::Result<usize> {
		let mut total = 0;
		for seg in self.segments() {
			w.write_all(seg.as_bytes())?;
			total += seg.len();
		}
		Ok(total)
	}

	/// Put all segments in order into `out`.
	pub fn put_contents<B: BufMut>(&self, out: &mut B) {
		for seg in self.segments() {
			out.put_slice(seg.as_bytes());
		}
	}

	/// Iterate over the contents in chunks, without copying.
	///
	/// In shared mode this yields exactly one chunk.
	pub fn segments(&self) -> Segments<'_> {
		let no_segments: &[String] = &[];
		match self.shared.as_ref() {
			Some(shared) => Segments {
				shared: Some(shared.text()),
				filled: no_segments.iter(),
				current: None,
			},
			None => Segments {
				shared: None,
				filled: self.segments.iter(),
				current: Some(&self.current),
			},
		}
	}

	/// Return a reader over the contents which does not copy them.
	pub fn reader(&self) -> SegmentReader<'_> {
		SegmentReader {
			chunks: self.segments(),
			front: &[],
		}
	}

	/// Number of owned segments in use, including the current one.
	///
	/// Zero in shared mode.
	pub fn segment_count(&self) -> usize {
		match self.shared {
			Some(_) => 0,
			None => self.segments.len() + 1,
		}
	}

	/// Return whether the contents consist of XML whitespace only.
	///
	/// The empty buffer counts as whitespace.
	pub fn is_all_whitespace(&self) -> bool {
		self.segments()
			.all(|seg| seg.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n')))
	}

	pub fn ends_with(&self, suffix: &str) -> bool {
		let size = self.size();
		suffix.len() <= size && self.matches_at(size - suffix.len(), suffix.as_bytes())
	}

	/// Compare the contents with `other` without materializing them.
	pub fn equals_str(&self, other: &str) -> bool {
		other.len() == self.size() && self.matches_at(0, other.as_bytes())
	}

	fn matches_at(&self, offset: usize, mut expected: &[u8]) -> bool {
		let mut skip = offset;
		for seg in self.segments() {
			if expected.is_empty() {
				break;
			}
			let seg = seg.as_bytes();
			if skip >= seg.len() {
				skip -= seg.len();
				continue;
			}
			let avail = &seg[skip..];
			skip = 0;
			let n = cmp::min(avail.len(), expected.len());
			if avail[..n] != expected[..n] {
				return false;
			}
			expected = &expected[n..];
		}
		expected.is_empty()
	}
}

impl Default for TextBuffer<'_> {
	fn default() -> Self {
		Self::new()
	}
}

/// Iterator over the chunks of a [`TextBuffer`].
pub struct Segments<'a> {
	shared: Option<&'a str>,
	filled: std::slice::Iter<'a, String>,
	current: Option<&'a str>,
}

impl<'a> Iterator for Segments<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<&'a str> {
		if let Some(shared) = self.shared.take() {
			return Some(shared);
		}
		if let Some(seg) = self.filled.next() {
			return Some(seg.as_str());
		}
		self.current.take()
	}
}

/// Sequential, zero-copy reader over the contents of a [`TextBuffer`].
pub struct SegmentReader<'a> {
	chunks: Segments<'a>,
	front: &'a [u8],
}

impl<'a> io::Read for SegmentReader<'a> {
	fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
		let src = io::BufRead::fill_buf(self)?;
		let n = cmp::min(src.len(), dst.len());
		dst[..n].copy_from_slice(&src[..n]);
		io::BufRead::consume(self, n);
		Ok(n)
	}
}

impl<'a> io::BufRead for SegmentReader<'a> {
	fn fill_buf(&mut self) -> io::Result<&[u8]> {
		while self.front.is_empty() {
			match self.chunks.next() {
				Some(chunk) => self.front = chunk.as_bytes(),
				None => break,
			}
		}
		Ok(self.front)
	}

	fn consume(&mut self, amt: usize) {
		if amt > self.front.len() {
			panic!("attempt to consume beyond end of buffer");
		}
		self.front = &self.front[amt..];
	}
}
