//! Building and resolving grammars: inheritance, references, validation.

use dsector::grammar::Number;
use dsector::{
    Element, ElementKind, ElementRef, Endian, GrammarError, Grammar, Reference, ResolvedGrammar,
};

fn errors(g: Grammar) -> Vec<GrammarError> {
    match ResolvedGrammar::resolve(g) {
        Ok(_) => panic!("grammar resolved, want errors"),
        Err(errs) => errs.0,
    }
}

#[test]
fn test_inheritance_merge() {
    let mut g = Grammar::new("Merge");
    let a = g.add(Element::structure("A").endian(Endian::Big));
    let a_fields = g
        .add_children(
            a,
            [
                Element::number("x", 1),
                Element::number("y", 2).value("one", 1).value("two", 2),
                Element::number("z", 1),
            ],
        )
        .expect("A fields");
    let b = g.add(Element::structure("B").extends("A"));
    let b_y = g
        .add_child(b, Element::number("y", 2).value("one", 1))
        .expect("B.y");
    g.set_start(b);
    let grammar = ResolvedGrammar::resolve(g).expect("resolve");

    assert_eq!(grammar.effective_elements(b), &[a_fields[0], b_y, a_fields[2]]);
    assert_eq!(grammar.effective_elements(a), a_fields.as_slice());

    // B.y implicitly extends A.y and keeps its own, narrower fixed values.
    let attrs = grammar.attrs(b_y);
    assert_eq!(attrs.extends, Some(a_fields[1]));
    assert_eq!(attrs.parent, Some(b));
    assert_eq!(grammar.fixed_values(b_y).len(), 1);
    assert_eq!(grammar.fixed_values(a_fields[1]).len(), 2);

    // B inherits A's byte order, and so do its children.
    assert_eq!(grammar.attrs(b).endian, Endian::Big);
    assert_eq!(grammar.attrs(b_y).endian, Endian::Big);
}

#[test]
fn test_extends_chain_overrides() {
    let mut g = Grammar::new("Packets");
    let eth = g.add(Element::structure("eth"));
    let eth_fields = g
        .add_children(eth, [Element::number("dst", 6), Element::number("type", 2)])
        .expect("eth");
    let ip = g.add(Element::structure("ip").extends("eth"));
    let ip_type = g
        .add_child(ip, Element::number("type", 2).value("ipv4", 0x0800))
        .expect("ip.type");
    let ip_proto = g.add_child(ip, Element::number("proto", 1)).expect("ip.proto");
    let tcp = g.add(Element::structure("tcp").extends("ip"));
    let tcp_proto = g
        .add_child(tcp, Element::number("proto", 1).value("tcp", 6))
        .expect("tcp.proto");
    g.set_start(tcp);
    let grammar = ResolvedGrammar::resolve(g).expect("resolve");

    assert_eq!(grammar.effective_elements(ip), &[eth_fields[0], ip_type, ip_proto]);
    assert_eq!(grammar.effective_elements(tcp), &[eth_fields[0], ip_type, tcp_proto]);
    assert_eq!(grammar.attrs(tcp_proto).extends, Some(ip_proto));
    assert_eq!(grammar.attrs(ip_type).extends, Some(eth_fields[1]));
}

#[test]
fn test_duplicate_names_without_extends_are_kept() {
    let mut g = Grammar::new("Dups");
    let s = g.add(Element::structure("S"));
    let fields = g
        .add_children(s, [Element::number("pad", 1), Element::number("pad", 1)])
        .expect("fields");
    g.set_start(s);
    let grammar = ResolvedGrammar::resolve(g).expect("resolve");
    assert_eq!(grammar.effective_elements(s), fields.as_slice());
}

#[test]
fn test_attributes_come_from_enclosing_structure() {
    let mut g = Grammar::new("Attrs");
    let s = g.add(
        Element::structure("S")
            .endian(Endian::Big)
            .signed(false)
            .encoding("ISO-8859-1"),
    );
    let n = g.add_child(s, Element::number("n", 2)).expect("n");
    let m = g
        .add_child(s, Element::number("m", 2).endian(Endian::Little))
        .expect("m");
    g.set_start(s);
    let grammar = ResolvedGrammar::resolve(g).expect("resolve");

    let attrs = grammar.attrs(n);
    assert_eq!(attrs.endian, Endian::Big);
    assert!(!attrs.signed);
    assert_eq!(attrs.encoding, "ISO-8859-1");
    assert_eq!(attrs.repeat_min, Reference::Literal(1));
    assert_eq!(attrs.repeat_max, Reference::Literal(1));
    assert_eq!(grammar.attrs(m).endian, Endian::Little);
}

#[test]
fn test_incompatible_extends() {
    let mut g = Grammar::new("Bad");
    let s = g.add(Element::structure("S"));
    let n = g.add(Element::number("n", 1));
    assert!(matches!(
        g.set_extends(n, "S"),
        Err(GrammarError::IncompatibleExtends { .. })
    ));

    g.element_mut(n).expect("n").extends = Some(ElementRef::from("S"));
    g.set_start(s);
    let errs = errors(g);
    assert!(errs
        .iter()
        .any(|e| matches!(e, GrammarError::IncompatibleExtends { .. })), "{:?}", errs);
}

#[test]
fn test_unresolved_references() {
    let mut g = Grammar::new("Refs");
    let s = g.add(Element::structure("S"));
    g.add_child(s, Element::struct_ref("r", "Nope")).expect("r");
    g.add_child(s, Element::number("n", 1).extends("id:42")).expect("n");
    g.set_start(s);

    let errs = errors(g);
    assert_eq!(errs.len(), 2, "{:?}", errs);
    assert!(errs
        .iter()
        .all(|e| matches!(e, GrammarError::UnresolvedReference { .. })));
}

#[test]
fn test_struct_ref_to_wrong_kind() {
    let mut g = Grammar::new("Refs");
    let s = g.add(Element::structure("S"));
    g.add(Element::number("n", 1));
    g.add_child(s, Element::struct_ref("r", "n")).expect("r");
    g.set_start(s);

    let errs = errors(g);
    assert!(matches!(errs.as_slice(), [GrammarError::WrongTarget { expected: "Structure", .. }]), "{:?}", errs);
}

#[test]
fn test_duplicate_ids() {
    let mut g = Grammar::new("Ids");
    let s = g.add(Element::structure("S").id(1));
    g.add_child(s, Element::number("a", 1).id(5)).expect("a");
    g.add_child(s, Element::number("b", 1).id(5)).expect("b");
    g.set_start("id:1");

    let errs = errors(g);
    assert!(matches!(errs.as_slice(), [GrammarError::DuplicateId { id: 5, .. }]), "{:?}", errs);
}

#[test]
fn test_extends_cycle_reported_once() {
    let mut g = Grammar::new("Cycle");
    let a = g.add(Element::structure("A").extends("B"));
    g.add(Element::structure("B").extends("A"));
    g.set_start(a);

    let errs = errors(g);
    assert!(matches!(errs.as_slice(), [GrammarError::ExtendsCycle(_)]), "{:?}", errs);
}

#[test]
fn test_missing_start() {
    let mut g = Grammar::new("Empty");
    g.add(Element::structure("S"));
    assert_eq!(errors(g), vec![GrammarError::MissingStart]);
}

#[test]
fn test_missing_length() {
    let mut g = Grammar::new("Lengths");
    let s = g.add(Element::structure("S"));
    g.add_child(s, Element::new("n", ElementKind::Number(Number::default())))
        .expect("n");
    g.set_start(s);

    let errs = errors(g);
    assert!(matches!(errs.as_slice(), [GrammarError::MissingLength(_)]), "{:?}", errs);
}

#[test]
fn test_inherited_length_satisfies_validation() {
    let mut g = Grammar::new("Lengths");
    let base = g.add(Element::number("base", 4));
    let s = g.add(Element::structure("S"));
    let n = g
        .add_child(s, Element::new("n", ElementKind::Number(Number::default())).extends(base))
        .expect("n");
    g.set_start(s);

    let grammar = ResolvedGrammar::resolve(g).expect("resolve");
    assert_eq!(grammar.attrs(n).length, Some(Reference::Literal(4)));
}

#[test]
fn test_add_child_needs_structure() {
    let mut g = Grammar::new("Children");
    let n = g.add(Element::number("n", 1));
    assert!(matches!(
        g.add_child(n, Element::number("m", 1)),
        Err(GrammarError::NotAStructure(_))
    ));
}

#[test]
fn test_references_parse() {
    assert_eq!("16".parse::<Reference>(), Ok(Reference::Literal(16)));
    assert_eq!("0x10".parse::<Reference>(), Ok(Reference::Literal(16)));
    assert_eq!("-1".parse::<Reference>(), Ok(Reference::Literal(-1)));
    assert_eq!("Remaining".parse::<Reference>(), Ok(Reference::Remaining));
    assert_eq!("unlimited".parse::<Reference>(), Ok(Reference::Unlimited));
    assert_eq!(
        "prev.Length".parse::<Reference>(),
        Ok(Reference::Prev("Length".to_string()))
    );
    assert!(matches!(
        "twelve".parse::<Reference>(),
        Err(GrammarError::InvalidReference { .. })
    ));
}

#[test]
fn test_find_by_id_and_name() {
    let mut g = Grammar::new("Find");
    let s = g.add(Element::structure("S").id(7));
    let n = g.add_child(s, Element::number("n", 1).id(8)).expect("n");
    g.set_start(s);
    let grammar = ResolvedGrammar::resolve(g).expect("resolve");

    assert_eq!(grammar.find("id:7"), Some(s));
    assert_eq!(grammar.find("n"), Some(n));
    assert_eq!(grammar.find("id:0"), None);
    assert_eq!(grammar.start(), s);
}
