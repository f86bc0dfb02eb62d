use std::fmt;

use log::debug;

use super::builder::{walk, LeafStyle, Step, TrieBuilder};
use super::collect_words;
use crate::error::{Error, Result};

/// Leaf headers start here; branch offsets must stay below.
const NEGATIVE_OFFSET: u16 = 0xC000;

/**
# Membership test for a fixed vocabulary

## Example

```
use rxml_core::WordSet;
let ws = WordSet::new(&["CDATA", "ID", "IDREF", "IDREFS"]).unwrap();
assert!(ws.contains_str("IDREF"));
assert!(!ws.contains_str("IDREFSX"));
assert!(ws.contains_range(b"<!ATTLIST a b ID #IMPLIED>", 14, 16));
```
*/
#[derive(Clone)]
pub struct WordSet {
	data: Vec<u16>,
	len: usize,
}

impl WordSet {
	/// Build the set from a vocabulary.
	///
	/// Duplicates are ignored and the order of the input does not matter.
	///
	/// # Errors
	///
	/// Returns [`Error::EmptyVocabulary`] if `words` yields nothing and
	/// [`Error::VocabularyTooLarge`] if the encoding does not fit into the
	/// compact representation.
	pub fn new<I, S>(words: I) -> Result<WordSet>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let words = collect_words(words);
		if words.is_empty() {
			return Err(Error::EmptyVocabulary);
		}
		let bytes: Vec<&[u8]> = words.iter().map(|w| w.as_bytes()).collect();
		let data = TrieBuilder::build(&bytes, LeafStyle::InlineSuffix, NEGATIVE_OFFSET)
			.map_err(Error::VocabularyTooLarge)?;
		debug!("built word set of {} words in {} cells", bytes.len(), data.len());
		Ok(WordSet {
			data,
			len: bytes.len(),
		})
	}

	/// Number of distinct words in the set.
	pub fn len(&self) -> usize {
		self.len
	}

	/// Always false; a word set can not be built from an empty vocabulary.
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn contains(&self, word: &[u8]) -> bool {
		match walk(&self.data, word, NEGATIVE_OFFSET) {
			Step::Miss => false,
			Step::Runt(_) => true,
			Step::Leaf { header, pos, depth } => {
				let suffix_len = (header - NEGATIVE_OFFSET) as usize;
				let rest = &word[depth..];
				let suffix = &self.data[pos + 1..pos + 1 + suffix_len];
				rest.len() == suffix_len
					&& rest.iter().zip(suffix.iter()).all(|(b, c)| *b as u16 == *c)
			}
		}
	}

	pub fn contains_str(&self, word: &str) -> bool {
		self.contains(word.as_bytes())
	}

	/// Test `buf[start..end]` for membership.
	pub fn contains_range(&self, buf: &[u8], start: usize, end: usize) -> bool {
		self.contains(&buf[start..end])
	}
}

impl fmt::Debug for WordSet {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("WordSet")
			.field("len", &self.len)
			.field("cells", &self.data.len())
			.finish()
	}
}
