#[macro_use]
extern crate afl;
extern crate rxml_core;

use std::io::Read;

use rxml_core::{TextBuffer, TextBufferOptions, WordResolver, WordSet};

fn main() {
	fuzz!(|data: &[u8]| {
		let text = match std::str::from_utf8(data) {
			Ok(v) => v,
			Err(_) => return,
		};

		// feed the input in odd-sized pieces through a tiny buffer
		let mut buf = TextBuffer::with_options(
			TextBufferOptions::default()
				.initial_segment_len(3)
				.max_segment_len(17),
		)
		.unwrap();
		let mut rest = text;
		let mut step = 1;
		while !rest.is_empty() {
			let mut end = std::cmp::min(step, rest.len());
			while !rest.is_char_boundary(end) {
				end += 1;
			}
			buf.append_str(&rest[..end]);
			rest = &rest[end..];
			step = step % 7 + 1;
		}
		let mut read = String::new();
		buf.reader().read_to_string(&mut read).unwrap();
		assert_eq!(read, text);
		assert!(buf.equals_str(text));
		assert_eq!(buf.contents_as_string(), text);

		// every line is a word
		let words: Vec<&str> = text.split('\n').collect();
		if let Ok(ws) = WordSet::new(&words) {
			for w in words.iter() {
				assert!(ws.contains_str(w));
				let mut longer = w.to_string();
				longer.push('\n');
				assert!(!ws.contains_str(&longer));
			}
		}
		if let Some(wr) = WordResolver::new(&words).unwrap() {
			for w in words.iter() {
				assert_eq!(wr.find_str(w).unwrap(), *w);
			}
		}
	});
}
