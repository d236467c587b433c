//! Script elements and the script bridge.

use anyhow::anyhow;
use dsector::grammar::Script;
use dsector::{
    DecodeError, Decoder, Element, Endian, Endianness, Grammar, ReaderSource, ResolvedGrammar,
    ScriptContext,
};

/// Pin a closure to the bridge signature.
fn bridge<F>(f: F) -> F
where
    F: FnMut(&Script, &mut ScriptContext<'_>) -> anyhow::Result<()>,
{
    f
}

fn source(bytes: &[u8]) -> ReaderSource<std::io::Cursor<Vec<u8>>> {
    ReaderSource::from_bytes(bytes.to_vec())
}

/// `File { SetOrder -> script "Order"; N: u16 dynamic }`
fn dynamic_grammar() -> ResolvedGrammar {
    let mut g = Grammar::new("Dynamic");
    g.add(Element::script("Order", "Python", "big"));
    let file = g.add(Element::structure("File"));
    g.add_children(
        file,
        [
            Element::script_element("SetOrder", "Order"),
            Element::number("N", 2).endian(Endian::Dynamic).signed(false),
        ],
    )
    .expect("fields");
    g.set_start(file);
    ResolvedGrammar::resolve(g).expect("resolve")
}

#[test]
fn test_script_sets_dynamic_endian() {
    let _ = env_logger::builder().is_test(true).try_init();
    let grammar = dynamic_grammar();

    let set_order = bridge(|script, ctx| {
        assert_eq!(script.language, "Python");
        assert_eq!(ctx.element().name, "SetOrder");
        if script.text == "big" {
            ctx.set_dynamic_endian(Endianness::Big);
        }
        Ok(())
    });
    let mut d = Decoder::new(&grammar, source(&[1, 2])).with_bridge(set_order);
    let root = d.decode().expect("decode");
    assert_eq!(d.dynamic_endian(), Endianness::Big);

    let file = &root.children[0];
    assert_eq!(file.children.len(), 2);
    assert_eq!(file.children[0].len, 0);
    assert_eq!(file.children[1].byte_order, Some(Endianness::Big));
    let n = d.last_value().cloned().expect("N");
    assert_eq!(n.offset, 0);
}

#[test]
fn test_no_bridge_is_a_no_op() {
    let grammar = dynamic_grammar();
    let mut d = Decoder::new(&grammar, source(&[1, 2]));
    let root = d.decode().expect("decode");
    assert_eq!(d.dynamic_endian(), Endianness::Little);
    assert_eq!(root.children[0].children[1].byte_order, Some(Endianness::Little));
}

#[test]
fn test_script_sees_decoded_values() {
    let mut g = Grammar::new("Counts");
    g.add(Element::script("Inspect", "Lua", "inspect()"));
    let rec = g.add(Element::structure("Rec"));
    g.add_children(
        rec,
        [
            Element::number("Count", 2).endian(Endian::Big),
            Element::script_element("Check", "Inspect"),
        ],
    )
    .expect("fields");
    g.set_start(rec);
    let grammar = ResolvedGrammar::resolve(g).expect("resolve");

    let mut seen = Vec::new();
    {
        let inspect = bridge(|_, ctx| {
            let last = ctx.last_value().cloned().expect("a decoded value");
            let count = ctx.value_by_name("Count").cloned().expect("Count");
            assert_eq!(last, count);
            seen.push((ctx.name_of(&last).to_string(), ctx.unsigned_number(&last)?));
            Ok(())
        });
        let mut d = Decoder::new(&grammar, source(&[0x01, 0x00])).with_bridge(inspect);
        d.decode().expect("decode");
    }
    assert_eq!(seen, vec![("Count".to_string(), 256)]);
}

#[test]
fn test_script_failure_aborts_decode() {
    let grammar = dynamic_grammar();
    let failing = bridge(|_, _| Err(anyhow!("boom")));
    let mut d = Decoder::new(&grammar, source(&[1, 2])).with_bridge(failing);

    match d.decode().unwrap_err() {
        DecodeError::Script { language, location, source } => {
            assert_eq!(language, "Python");
            assert!(location.contains("SetOrder"), "{}", location);
            assert_eq!(source.to_string(), "boom");
        }
        other => panic!("want a script error, got {:?}", other),
    }
}

#[test]
fn test_custom_element_runs_script_on_its_bytes() {
    let mut g = Grammar::new("Custom");
    g.add(Element::script("Sum", "Python", "sum(bytes)"));
    let blob = g.add(Element::custom("Blob", 3).with_script("Sum"));
    g.set_start(blob);
    let grammar = ResolvedGrammar::resolve(g).expect("resolve");

    let mut sum = 0u32;
    {
        let add = bridge(|_, ctx| {
            let current = ctx.current().cloned().expect("current value");
            sum = ctx.bytes(&current)?.iter().map(|&b| b as u32).sum();
            Ok(())
        });
        let mut d = Decoder::new(&grammar, source(&[1, 2, 3, 4])).with_bridge(add);
        let root = d.decode().expect("decode");
        assert_eq!(root.children[0].len, 3);
    }
    assert_eq!(sum, 6);
}
