//! Decoder fuzz target: decode arbitrary bytes against a small grammar that uses
//! variable order, `prev.` lengths, strings and recursion.
//! The decoder must not panic; it should return Ok(Value) or Err(DecodeError).
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
use dsector::{
    format_value, Decoder, Element, Grammar, Order, ReaderSource, Reference, ResolvedGrammar,
    StringKind,
};

#[cfg(fuzzing)]
fn grammar() -> ResolvedGrammar {
    let mut g = Grammar::new("Fuzz");
    let chunk = g.add(Element::structure("Chunk").order(Order::Variable).repeat(0, Reference::Unlimited));
    let _ = g.add_children(
        chunk,
        [
            Element::number("Len", 1).value("small", 1).must_match(false),
            Element::binary("Data", Reference::Prev("Len".to_string())),
            Element::string("Name", StringKind::ZeroTerminated),
            Element::struct_ref("Nested", "Chunk").repeat(0, 1),
        ],
    );
    g.set_start(chunk);
    match ResolvedGrammar::resolve(g) {
        Ok(g) => g,
        Err(errs) => panic!("fuzz grammar: {}", errs),
    }
}

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let grammar = grammar();
    let mut d = Decoder::new(&grammar, ReaderSource::from_bytes(data));
    if let Ok(root) = d.decode() {
        let _ = format_value(&grammar, d.source_mut(), &root);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
