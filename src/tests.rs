use super::*;

// smoke tests wiring the components together the way a tokenizer would;
// the components themselves are tested extensively in their modules.

const DOC: &str = "<catalog xmlns='urn:catalog' xmlns:x='urn:ext'>\
	<item xml:id='a1' x:ref='b2'>first</item>\
	<x:item xml:id='b2' x:ref='a1 c3' xmlns:x='urn:other'>second &amp; more</x:item>\
	</catalog>";

enum Token {
	Start(&'static str, &'static [(&'static str, &'static str)]),
	/// text, given by its position in DOC and the entity it is followed by
	Text(&'static str, Option<char>, &'static str),
	End,
}

const TOKENS: &[Token] = &[
	Token::Start("catalog", &[("xmlns", "urn:catalog"), ("xmlns:x", "urn:ext")]),
	Token::Start("item", &[("xml:id", "a1"), ("x:ref", "b2")]),
	Token::Text("first", None, ""),
	Token::End,
	Token::Start(
		"x:item",
		&[("xml:id", "b2"), ("x:ref", "a1 c3"), ("xmlns:x", "urn:other")],
	),
	Token::Text("second ", Some('&'), " more"),
	Token::End,
	Token::End,
];

#[derive(Default)]
struct Outcome {
	elements: Vec<(Option<String>, String)>,
	texts: Vec<(String, usize)>,
	undefined: Vec<String>,
	element_names: Vec<PrefixedName>,
	attribute_values: Vec<String>,
}

fn run(ctx: &Context) -> Outcome {
	let mut symbols = ctx.make_child();
	let id_attrs = WordSet::new(&["xml:id"]).unwrap();
	let ref_attrs = WordResolver::new(&["x:ref", "ref"]).unwrap().unwrap();
	let mut scopes = vec![BijectiveNsMap::create_empty()];
	let mut ids = ElementIdMap::new();
	let mut text = TextBuffer::new();
	let mut values = TextBuilder::new(4);
	let mut out = Outcome::default();

	for token in TOKENS {
		match token {
			Token::Start(qname, attrs) => {
				let name = PrefixedName::parse(&mut symbols, qname);
				let mut scope = scopes[scopes.len() - 1].create_child();
				values.reset();
				for (attr, value) in attrs.iter() {
					let attr_name = PrefixedName::parse(&mut symbols, attr);
					values.append_str(value);
					values.end_value();
					if attr_name.is_ns_declaration() {
						let prefix = match attr_name.prefix() {
							Some(_) => attr_name.local_name().clone(),
							None => symbols.find_symbol_str(""),
						};
						scope.add_mapping(prefix, ctx.intern(value));
					} else if id_attrs.contains_str(attr) {
						let loc = Location::new(1, 1, 0).with_system_id("catalog.xml");
						ids.add_defined_str(value, loc, name.clone(), attr_name);
					} else if ref_attrs.find_str(attr).is_some() {
						for id in value.split(' ') {
							ids.add_referenced(
								id,
								calc_hash(id),
								Location::default(),
								name.clone(),
								attr_name.clone(),
							);
						}
					}
				}
				let prefix = name.prefix().map(|p| p.as_str()).unwrap_or("");
				let uri = scope.namespace_uri(prefix).map(|v| v.to_string());
				out.elements.push((uri, name.local_name().to_string()));
				out.attribute_values.push(values.all_values().to_string());
				out.element_names.push(name);
				scopes.push(scope);
			}
			Token::Text(head, entity, tail) => {
				let start = DOC.find(head).unwrap();
				text.reset_with_shared(DOC, start, head.len());
				if let Some(c) = entity {
					text.append_char(*c);
					text.append_str(tail);
				}
				let segments = text.segment_count();
				out.texts.push((text.contents_as_string().to_string(), segments));
			}
			Token::End => {
				scopes.pop();
			}
		}
	}
	assert_eq!(scopes.len(), 1);
	out.undefined = ids.undefined().map(|e| e.id().to_string()).collect();
	ctx.merge_child(&mut symbols);
	out
}

#[test]
fn components_process_a_document() {
	let ctx = Context::new();
	let out = run(&ctx);

	assert_eq!(
		out.elements,
		vec![
			(Some("urn:catalog".to_string()), "catalog".to_string()),
			(Some("urn:catalog".to_string()), "item".to_string()),
			(Some("urn:other".to_string()), "item".to_string()),
		]
	);
	assert_eq!(
		out.texts,
		vec![
			("first".to_string(), 0),
			("second & more".to_string(), 1),
		]
	);
	assert_eq!(out.undefined, vec!["c3".to_string()]);
	assert_eq!(out.attribute_values[2], "b2a1 c3urn:other");

	// both "item" local names come from the same table
	let a = out.element_names[1].local_name();
	let b = out.element_names[2].local_name();
	assert!(Symbol::ptr_eq(a, b));
}

#[test]
fn context_carries_vocabulary_to_next_document() {
	let ctx = Context::new();
	let before = ctx.root_size();
	let first = run(&ctx);
	assert!(ctx.root_size() > before);
	let version = ctx.root_version();

	let second = run(&ctx);
	// nothing new to learn the second time around
	assert_eq!(ctx.root_version(), version);
	let a = first.element_names[0].local_name();
	let b = second.element_names[0].local_name();
	assert!(Symbol::ptr_eq(a, b));
}

#[test]
fn text_can_be_streamed_without_materializing() {
	use std::io::Read;

	let mut text = TextBuffer::with_options(
		TextBufferOptions::default()
			.initial_segment_len(8)
			.max_segment_len(16),
	)
	.unwrap();
	for _ in 0..10 {
		text.append_str("0123456789");
	}
	assert!(text.segment_count() > 1);

	let mut sink = bytes::BytesMut::new();
	text.put_contents(&mut sink);
	let mut read = Vec::new();
	text.reader().read_to_end(&mut read).unwrap();
	let mut written = Vec::new();
	text.raw_contents_to(&mut written).unwrap();

	assert_eq!(&sink[..], &read[..]);
	assert_eq!(read, written);
	assert_eq!(text.contents_as_array(), &read[..]);
}
