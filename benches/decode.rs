//! Benchmark: decode a synthetic record file (length-prefixed records of a tag, a
//! big-endian length and a payload) with and without per-element invariant checks,
//! and render the result.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dsector::{
    format_value, Decoder, DecoderOptions, Element, Endian, Grammar, ReaderSource, Reference,
    ResolvedGrammar,
};

const RECORDS: usize = 10_000;

fn records_grammar() -> ResolvedGrammar {
    let mut g = Grammar::new("Records");
    let rec = g.add(
        Element::structure("Record")
            .endian(Endian::Big)
            .signed(false)
            .repeat(1, Reference::Unlimited),
    );
    g.add_children(
        rec,
        [
            Element::number("Tag", 1).value("data", 1).value("note", 2),
            Element::number("Len", 2),
            Element::binary("Payload", Reference::Prev("Len".to_string())),
        ],
    )
    .expect("record fields");
    g.set_start(rec);
    ResolvedGrammar::resolve(g).expect("resolve")
}

fn records_file() -> Vec<u8> {
    let mut data = Vec::new();
    for i in 0..RECORDS {
        let len = (i % 32) as u16;
        data.push(1 + (i % 2) as u8);
        data.extend_from_slice(&len.to_be_bytes());
        data.extend((0..len).map(|b| b as u8));
    }
    data
}

fn bench_decode(c: &mut Criterion) {
    let grammar = records_grammar();
    let data = records_file();

    c.bench_function("decode_records", |b| {
        b.iter(|| {
            let mut d = Decoder::new(&grammar, ReaderSource::from_bytes(black_box(&data[..])));
            let root = d.decode().expect("decode");
            black_box(root.children.len())
        });
    });

    c.bench_function("decode_records_unchecked", |b| {
        let options = DecoderOptions::default().with_check_invariants(false);
        b.iter(|| {
            let source = ReaderSource::from_bytes(black_box(&data[..]));
            let mut d = Decoder::with_options(&grammar, source, options.clone());
            let root = d.decode().expect("decode");
            black_box(root.children.len())
        });
    });

    let mut d = Decoder::new(&grammar, ReaderSource::from_bytes(&data[..]));
    let root = d.decode().expect("decode");
    c.bench_function("format_records", |b| {
        b.iter(|| {
            let text = format_value(&grammar, d.source_mut(), black_box(&root)).expect("format");
            black_box(text.len())
        });
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
