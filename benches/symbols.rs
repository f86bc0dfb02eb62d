use std::collections::HashSet;
use std::io::Read;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rxml_core::{calc_hash, Context, SymbolTable, TextBuffer};

static NAMES: &'static [&'static str] = &[
	"iq", "to", "id", "type", "jingle", "xmlns", "action", "initiator", "sid", "content",
	"creator", "name", "senders", "description", "media", "maxptime", "payload-type",
	"clockrate", "channels", "parameter", "value", "rtcp-fb", "rtp-hdrext", "uri", "rtcp-mux",
	"source", "ssrc", "ssrc-info", "owner", "transport", "pwd", "ufrag", "web-socket", "url",
	"fingerprint", "hash", "required", "setup", "candidate", "network", "protocol", "component",
	"priority", "port", "ip", "generation", "foundation", "rel-port", "rel-addr", "subtype",
	"ssrc-group", "semantics", "bundle", "group",
];

fn intern_perf(c: &mut Criterion) {
	let mut group = c.benchmark_group("name interning");
	let hashes: Vec<u32> = NAMES.iter().map(|n| calc_hash(n)).collect();

	group.bench_function("SymbolTable (cold)", |b| {
		b.iter(|| {
			let mut t = SymbolTable::default();
			for _ in 0..10 {
				for (name, hash) in NAMES.iter().zip(hashes.iter()) {
					black_box(t.find_symbol(name, *hash));
				}
			}
			t.size()
		});
	});

	group.bench_function("SymbolTable (warm child)", |b| {
		let ctx = Context::new();
		let mut warmup = ctx.make_child();
		for name in NAMES.iter() {
			warmup.find_symbol_str(name);
		}
		ctx.merge_child(&mut warmup);
		b.iter(|| {
			let mut t = ctx.make_child();
			for _ in 0..10 {
				for (name, hash) in NAMES.iter().zip(hashes.iter()) {
					black_box(t.find_symbol(name, *hash));
				}
			}
			t.is_dirty()
		});
	});

	group.bench_function("HashSet<String>", |b| {
		b.iter(|| {
			let mut t = HashSet::<String>::new();
			for _ in 0..10 {
				for name in NAMES.iter() {
					if !t.contains(*name) {
						t.insert(name.to_string());
					}
					black_box(t.get(*name));
				}
			}
			t.len()
		});
	});
}

fn text_perf(c: &mut Criterion) {
	let mut group = c.benchmark_group("text accumulation");
	let chunk = "AE:D4:A8:99:38:9A:9A:D7:63:7E:CE:12:A9:90:B1:49:3D:C9:3C:E0:DF:66:87:D6";

	group.bench_function("TextBuffer", |b| {
		let mut buf = TextBuffer::new();
		b.iter(|| {
			buf.reset_with_empty();
			for _ in 0..1000 {
				buf.append_str(black_box(chunk));
			}
			buf.size()
		});
	});

	group.bench_function("TextBuffer+SegmentReader", |b| {
		let mut buf = TextBuffer::new();
		for _ in 0..1000 {
			buf.append_str(chunk);
		}
		let mut out = Vec::with_capacity(buf.size());
		b.iter(|| {
			out.clear();
			buf.reader().read_to_end(&mut out).unwrap()
		});
	});

	group.bench_function("String", |b| {
		let mut buf = String::new();
		b.iter(|| {
			buf.clear();
			buf.shrink_to_fit();
			for _ in 0..1000 {
				buf.push_str(black_box(chunk));
			}
			buf.len()
		});
	});
}

criterion_group!(benches, intern_perf, text_perf);
criterion_main!(benches);
