/*!
# Building blocks for allocation-light XML tokenizers

This crate provides the data structures a streaming XML tokenizer and
validator lean on to avoid allocations in their per-token loops. It does
not parse XML by itself.

- [`SymbolTable`]: copy-on-write, versioned interning of element and
  attribute names. A process-wide [`Context`] holds the warmed-up root
  table which per-document tables are derived from.
- [`TextBuffer`]: segmented accumulation of character data, with zero-copy
  adoption of input slices and zero-copy readers over the result.
  [`TextBuilder`] packs several short values (attribute values) into one
  buffer.
- [`BijectiveNsMap`]: scoped prefix/URI bindings with lookups in both
  directions, honouring masking by inner scopes.
- [`ElementIdMap`]: ID/IDREF cross-referencing for validation.
- [`WordSet`] and [`WordResolver`]: compact tries for matching against a
  fixed vocabulary of well-known names.

All of these are meant to be owned by a single parse at a time. The only
state shared between parses is the [`Context`].

## Example

```
use rxml_core::{BijectiveNsMap, Context, NamespaceContext, TextBuffer};

let ctx = Context::new();
let mut symbols = ctx.make_child();

let input = "<doc xmlns:a='urn:example'>text</doc>";
let prefix = symbols.find_symbol_str("a");
let uri = ctx.intern("urn:example");
let mut scope = BijectiveNsMap::create_empty().create_child();
scope.add_mapping(prefix, uri);
assert_eq!(scope.namespace_uri("a").as_deref(), Some("urn:example"));

let mut text = TextBuffer::new();
text.reset_with_shared(input, 27, 4);
assert_eq!(text.contents_as_string(), "text");

ctx.merge_child(&mut symbols);
```

## Features

- `mt`: use [`std::sync::Arc`] for shared data and guard the [`Context`]
  with a mutex, making it `Send` and `Sync`.
- `shared_intern`: canonicalize strings across tables through a weak
  intern pool in the [`Context`].

## Logging

The crate logs through the [`log`](https://docs.rs/log) facade: table
growth and merges at debug level, copy-on-write divergence and buffer
growth at trace level. It never installs a logger.
*/

pub mod context;
pub mod error;
pub mod idmap;
pub mod location;
pub mod name;
pub mod namespaces;
pub mod symbols;
pub mod textbuf;
pub mod textbuilder;
pub mod wordset;

#[doc(inline)]
pub use context::Context;
#[doc(inline)]
pub use error::{ConfigError, Error, Result};
#[doc(inline)]
pub use idmap::{ElementId, ElementIdMap, IdRef};
#[doc(inline)]
pub use location::Location;
#[doc(inline)]
pub use name::PrefixedName;
#[doc(inline)]
pub use namespaces::{
	BijectiveNsMap, EmptyNamespaceContext, NamespaceContext, SimpleNamespaceContext, XMLNS_XML,
	XMLNS_XMLNS,
};
#[doc(inline)]
pub use symbols::{calc_hash, RcPtr, Symbol, SymbolTable};
#[doc(inline)]
pub use textbuf::{SegmentReader, Segments, TextBuffer, TextBufferOptions};
#[doc(inline)]
pub use textbuilder::TextBuilder;
#[doc(inline)]
pub use wordset::{WordResolver, WordSet};

#[cfg(test)]
mod tests;
