/*!
# Fixed vocabularies

[`WordSet`] and [`WordResolver`] answer "is this one of the well-known
names?" for a vocabulary which is fixed at construction time. Both encode
the sorted vocabulary as a compact, flattened trie over the UTF-8 bytes of
the words.

The word set only answers membership. The word resolver additionally hands
out a canonical [`Symbol`](crate::Symbol) for each member, at the price of
keeping the words themselves around.
*/
use std::collections::BTreeSet;

mod builder;
mod resolver;
mod set;

pub use resolver::{WordResolver, MAX_WORDS};
pub use set::WordSet;

/// Sort and deduplicate the input vocabulary.
fn collect_words<I, S>(words: I) -> BTreeSet<String>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	words.into_iter().map(|w| w.as_ref().to_string()).collect()
}
