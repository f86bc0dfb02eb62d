use std::fmt;

use log::debug;

use super::builder::{walk, LeafStyle, Step, TrieBuilder};
use super::collect_words;
use crate::error::{Error, Result};
use crate::symbols::Symbol;

/// Maximum number of words a resolver can hold.
pub const MAX_WORDS: usize = 0x2000;

/// Leaf headers and runt links encode word indices from here on.
const NEGATIVE_OFFSET: u16 = (0x10000 - MAX_WORDS) as u16;

/**
# Canonicalizing lookup for a fixed vocabulary

Like [`WordSet`](super::WordSet), but [`WordResolver::find`] returns the
canonical [`Symbol`] of the matched word, so that every occurrence of a
well-known name maps to the same handle.

## Example

```
use rxml_core::WordResolver;
let wr = WordResolver::new(&["id", "identifier", "name"]).unwrap().unwrap();
assert_eq!(wr.find_str("id").unwrap(), "id");
assert!(wr.find_str("identifi").is_none());
assert_eq!(wr.find_str("identifier").unwrap(), "identifier");
```
*/
#[derive(Clone)]
pub struct WordResolver {
	words: Vec<Symbol>,
	/// absent for single-word vocabularies
	data: Option<Vec<u16>>,
}

impl WordResolver {
	/// Build a resolver for a vocabulary.
	///
	/// Returns `Ok(None)` if the vocabulary has more than [`MAX_WORDS`]
	/// words or its encoding does not fit; the caller then needs to fall
	/// back to a general purpose structure.
	///
	/// # Errors
	///
	/// Returns [`Error::EmptyVocabulary`] if `words` yields nothing.
	pub fn new<I, S>(words: I) -> Result<Option<WordResolver>>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let words = collect_words(words);
		if words.is_empty() {
			return Err(Error::EmptyVocabulary);
		}
		if words.len() > MAX_WORDS {
			debug!(
				"vocabulary of {} words is too large for a word resolver",
				words.len()
			);
			return Ok(None);
		}
		let data = if words.len() == 1 {
			None
		} else {
			let bytes: Vec<&[u8]> = words.iter().map(|w| w.as_bytes()).collect();
			match TrieBuilder::build(&bytes, LeafStyle::WordIndex, NEGATIVE_OFFSET) {
				Ok(data) => Some(data),
				Err(needed) => {
					debug!(
						"word resolver for {} words would need {} cells",
						words.len(),
						needed
					);
					return Ok(None);
				}
			}
		};
		let words: Vec<Symbol> = words.into_iter().map(Symbol::new).collect();
		debug!(
			"built word resolver of {} words in {} cells",
			words.len(),
			data.as_ref().map(|d| d.len()).unwrap_or(0)
		);
		Ok(Some(WordResolver { words, data }))
	}

	/// Number of words in the vocabulary.
	pub fn size(&self) -> usize {
		self.words.len()
	}

	/// Return the canonical symbol for `word`, if it is part of the
	/// vocabulary.
	pub fn find(&self, word: &[u8]) -> Option<&Symbol> {
		let data = match self.data.as_ref() {
			Some(data) => data,
			None => {
				let only = &self.words[0];
				return if only.as_bytes() == word {
					Some(only)
				} else {
					None
				};
			}
		};
		match walk(data, word, NEGATIVE_OFFSET) {
			Step::Miss => None,
			Step::Runt(link) => Some(&self.words[(link - NEGATIVE_OFFSET) as usize]),
			Step::Leaf { header, depth, .. } => {
				let candidate = &self.words[(header - NEGATIVE_OFFSET) as usize];
				if candidate.as_bytes()[depth..] == word[depth..] {
					Some(candidate)
				} else {
					None
				}
			}
		}
	}

	pub fn find_str(&self, word: &str) -> Option<&Symbol> {
		self.find(word.as_bytes())
	}

	/// Look up `buf[start..end]`.
	pub fn find_range(&self, buf: &[u8], start: usize, end: usize) -> Option<&Symbol> {
		self.find(&buf[start..end])
	}
}

impl fmt::Display for WordResolver {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str("[")?;
		for (i, word) in self.words.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			f.write_str(word)?;
		}
		f.write_str("]")
	}
}

impl fmt::Debug for WordResolver {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "WordResolver{}", self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn build(words: &[&str]) -> WordResolver {
		WordResolver::new(words).unwrap().unwrap()
	}

	#[test]
	fn resolves_runts_and_leaves() {
		let wr = build(&["id", "identifier", "name"]);
		assert_eq!(wr.size(), 3);
		assert_eq!(wr.find_str("id").unwrap(), "id");
		assert!(wr.find_str("identifi").is_none());
		assert_eq!(wr.find_str("identifier").unwrap(), "identifier");
		assert_eq!(wr.find_str("name").unwrap(), "name");
		for miss in ["", "i", "ids", "identifiers", "nam", "namex", "x"].iter() {
			assert!(wr.find_str(miss).is_none(), "{} was found", miss);
		}
	}

	#[test]
	fn returns_the_same_symbol_every_time() {
		let wr = build(&["xmlns", "xml"]);
		let a = wr.find_str("xml").unwrap();
		let b = wr.find(b"xml").unwrap();
		assert!(Symbol::ptr_eq(a, b));
		let c = wr.find_range(b"<xmlns:a>", 1, 6).unwrap();
		assert_eq!(c, "xmlns");
	}

	#[test]
	fn single_word_needs_no_trie() {
		let wr = build(&["only"]);
		assert!(wr.data.is_none());
		assert_eq!(wr.find_str("only").unwrap(), "only");
		assert!(wr.find_str("onl").is_none());
	}

	#[test]
	fn rejects_empty_vocabulary() {
		let words: [&str; 0] = [];
		assert_eq!(WordResolver::new(&words).unwrap_err(), Error::EmptyVocabulary);
	}

	#[test]
	fn too_many_words_can_not_be_resolved() {
		let words: Vec<String> = (0..=MAX_WORDS).map(|i| format!("w{}", i)).collect();
		assert!(WordResolver::new(&words).unwrap().is_none());
		let words: Vec<String> = (0..MAX_WORDS).map(|i| format!("w{}", i)).collect();
		let wr = WordResolver::new(&words).unwrap().unwrap();
		for w in words.iter() {
			assert_eq!(wr.find_str(w).unwrap(), w.as_str());
		}
	}

	#[test]
	fn too_many_cells_can_not_be_resolved() {
		let words: Vec<String> = (0..300).map(|i| format!("{:03}{}", i, "x".repeat(200))).collect();
		let wr = WordResolver::new(&words).unwrap();
		assert!(wr.is_some());
		// single-branch chains cost three cells per byte
		let words: Vec<String> = (0..100)
			.flat_map(|i| {
				vec![
					format!("{:03}{}", i, "a".repeat(200)),
					format!("{:03}{}", i, "a".repeat(201)),
				]
			})
			.collect();
		assert!(WordResolver::new(&words).unwrap().is_none());
	}

	#[test]
	fn display_lists_vocabulary() {
		let wr = build(&["b", "a"]);
		assert_eq!(wr.to_string(), "[a, b]");
		assert_eq!(format!("{:?}", wr), "WordResolver[a, b]");
	}
}
