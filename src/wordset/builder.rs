/*!
Construction and traversal of the flattened trie shared by
[`WordSet`](super::WordSet) and [`WordResolver`](super::WordResolver).

The trie is stored as a single `u16` array. Every node starts with a header
cell:

- A header below the *negative offset* marks a branch node; it is the number
  of branches `n`, followed by `n` pairs of `(branch char, link)`. Branch
  chars are the input byte plus one, so that [`CHAR_NULL`] can denote the end
  of a word which is also the prefix of longer words (a *runt*). Branches
  are sorted by char, hence a runt always comes first. The link of a regular
  branch is the offset of the child node.
- A header at or above the negative offset marks a leaf: the only word left
  below this point. How the remainder of the word is stored depends on the
  [`LeafStyle`].

The root node is at offset zero.
*/

/// Branch char of the runt entry.
pub(crate) const CHAR_NULL: u16 = 0;

/// Branch tables with at least this many entries are binary searched.
pub(crate) const MIN_BINARY_SEARCH: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LeafStyle {
	/// The leaf header is `negative_offset + suffix length`, followed by the
	/// remaining bytes of the word, one per cell. Runt links are unused.
	InlineSuffix,
	/// Leaf headers and runt links are `negative_offset + word index`.
	WordIndex,
}

fn branch_char(word: &[u8], depth: usize) -> u32 {
	match word.get(depth) {
		None => CHAR_NULL as u32,
		Some(b) => *b as u32 + 1,
	}
}

pub(crate) struct TrieBuilder<'w> {
	words: &'w [&'w [u8]],
	style: LeafStyle,
	negative_offset: u32,
	cells: Vec<u32>,
}

impl<'w> TrieBuilder<'w> {
	/// Encode `words`, which must be sorted and free of duplicates.
	///
	/// Returns the number of cells which would have been needed if the
	/// encoding does not fit.
	pub(crate) fn build(
		words: &'w [&'w [u8]],
		style: LeafStyle,
		negative_offset: u16,
	) -> Result<Vec<u16>, usize> {
		let mut builder = TrieBuilder {
			words,
			style,
			negative_offset: negative_offset as u32,
			cells: Vec::new(),
		};
		builder.node(0, words.len(), 0);
		builder.finish()
	}

	fn node(&mut self, start: usize, end: usize, depth: usize) {
		if end - start == 1 {
			self.leaf(start, depth);
			return;
		}

		let mut groups = Vec::new();
		let mut i = start;
		while i < end {
			let ch = branch_char(self.words[i], depth);
			let mut j = i + 1;
			while j < end && branch_char(self.words[j], depth) == ch {
				j += 1;
			}
			groups.push((ch, i, j));
			i = j;
		}

		let pos = self.cells.len();
		self.cells.resize(pos + 1 + 2 * groups.len(), 0);
		self.cells[pos] = groups.len() as u32;
		for (g, (ch, group_start, group_end)) in groups.into_iter().enumerate() {
			let link = if ch == CHAR_NULL as u32 {
				// only one word can end right here
				match self.style {
					LeafStyle::InlineSuffix => 0,
					LeafStyle::WordIndex => self.negative_offset + group_start as u32,
				}
			} else {
				let child = self.cells.len() as u32;
				self.node(group_start, group_end, depth + 1);
				child
			};
			self.cells[pos + 1 + 2 * g] = ch;
			self.cells[pos + 2 + 2 * g] = link;
		}
	}

	fn leaf(&mut self, index: usize, depth: usize) {
		match self.style {
			LeafStyle::InlineSuffix => {
				let suffix = &self.words[index][depth..];
				self.cells.push(self.negative_offset + suffix.len() as u32);
				self.cells.extend(suffix.iter().map(|b| *b as u32));
			}
			LeafStyle::WordIndex => self.cells.push(self.negative_offset + index as u32),
		}
	}

	fn finish(self) -> Result<Vec<u16>, usize> {
		let needed = self.cells.len();
		if needed > self.negative_offset as usize
			|| self.cells.iter().any(|c| *c > u16::MAX as u32)
		{
			return Err(needed);
		}
		Ok(self.cells.into_iter().map(|c| c as u16).collect())
	}
}

/// Result of walking the trie along a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
	/// No branch matches.
	Miss,
	/// The word ended on a runt entry with the given link.
	Runt(u16),
	/// A leaf was reached after consuming `depth` bytes of the word.
	Leaf { header: u16, pos: usize, depth: usize },
}

fn find_branch(data: &[u16], pos: usize, count: usize, ch: u16) -> Option<usize> {
	let entries = pos + 1;
	if count < MIN_BINARY_SEARCH {
		return (0..count).find(|i| data[entries + 2 * i] == ch);
	}
	let (mut lo, mut hi) = (0, count);
	while lo < hi {
		let mid = (lo + hi) / 2;
		let probe = data[entries + 2 * mid];
		if probe == ch {
			return Some(mid);
		} else if probe < ch {
			lo = mid + 1;
		} else {
			hi = mid;
		}
	}
	None
}

/// Follow `word` through the trie until it misses, ends on a runt or
/// reaches a leaf.
pub(crate) fn walk(data: &[u16], word: &[u8], negative_offset: u16) -> Step {
	let mut pos = 0;
	let mut depth = 0;
	loop {
		let header = data[pos];
		if header >= negative_offset {
			return Step::Leaf { header, pos, depth };
		}
		let ch = branch_char(word, depth) as u16;
		let entry = match find_branch(data, pos, header as usize, ch) {
			Some(i) => pos + 1 + 2 * i,
			None => return Step::Miss,
		};
		let link = data[entry + 1];
		if ch == CHAR_NULL {
			return Step::Runt(link);
		}
		pos = link as usize;
		depth += 1;
	}
}
