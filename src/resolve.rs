//! Grammar resolution: link references, apply inheritance, compute defaults.
//!
//! [`ResolvedGrammar::resolve`] runs once, after the grammar is built:
//!
//! 1. Link `extends`, StructRef targets and script links to element ids.
//! 2. Children of a structure that extends another implicitly extend the ancestor's
//!    same-named element, recursively.
//! 3. Compute each structure's effective element list: the ancestor's list with
//!    same-named elements replaced in place and new ones appended.
//! 4. Compute every element's attributes: own value, else the `extends` element's
//!    resolved value, else the enclosing structure's (endianness, signedness, encoding,
//!    display, length unit), else the global default.
//! 5. Check the result (see [`crate::validate`]).
//!
//! All problems are collected and returned together.

use crate::codec::Display;
use crate::error::{GrammarError, GrammarErrors};
use crate::grammar::{
    Element, ElementId, ElementKind, ElementRef, Endian, FixedBinaryValue, FixedStringValue,
    FixedValue, Grammar, LengthUnit, Order, Script, StringKind,
};
use crate::reference::Reference;
use crate::validate;
use std::collections::HashSet;

/// Effective attributes of one element after inheritance and defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Attrs {
    /// Enclosing structure.
    pub parent: Option<ElementId>,
    /// Explicit or implicit `extends` element.
    pub extends: Option<ElementId>,
    pub repeat_min: Reference,
    pub repeat_max: Reference,
    pub length: Option<Reference>,
    pub length_unit: LengthUnit,
    pub endian: Endian,
    pub signed: bool,
    pub encoding: String,
    pub display: Display,
    pub order: Order,
    pub must_match: bool,
    pub string_kind: StringKind,
    /// StructRef target structure, or the script run by a ScriptElement or Custom.
    pub target: Option<ElementId>,
    /// Element whose fixed-value list applies to this one.
    pub values_from: ElementId,
}

pub const DEFAULT_ENCODING: &str = "UTF-8";

#[derive(Debug, Clone)]
pub struct ResolvedGrammar {
    grammar: Grammar,
    start: ElementId,
    padding: ElementId,
    attrs: Vec<Attrs>,
    effective: Vec<Vec<ElementId>>,
}

impl ResolvedGrammar {
    pub fn resolve(mut grammar: Grammar) -> Result<Self, GrammarErrors> {
        let padding = grammar.push_synthetic(Element::padding());
        let mut resolver = Resolver::new(&grammar);

        let start = match grammar.start() {
            None => {
                resolver.errors.push(GrammarError::MissingStart);
                None
            }
            Some(r) => {
                let found = grammar.find(r);
                if found.is_none() {
                    resolver.errors.push(GrammarError::UnresolvedReference {
                        element: grammar.element(Grammar::ROOT).id_string(),
                        reference: r.to_string(),
                    });
                }
                found
            }
        };

        for i in 0..grammar.len() {
            resolver.extends_of(ElementId(i));
        }
        resolver.check_cycles();
        let effective = (0..grammar.len())
            .map(|i| resolver.effective(ElementId(i)))
            .collect();
        let targets: Vec<Option<ElementId>> = (0..grammar.len())
            .map(|i| resolver.target(ElementId(i)))
            .collect();
        let mut attrs: Vec<Attrs> = (0..grammar.len())
            .map(|i| resolver.attrs(ElementId(i)))
            .collect();
        for (a, t) in attrs.iter_mut().zip(targets) {
            a.target = t;
        }
        // A StructRef without its own length takes the target structure's.
        for i in 0..attrs.len() {
            if let (ElementKind::StructRef(_), Some(t)) = (&grammar.element(ElementId(i)).kind, attrs[i].target) {
                if attrs[i].length.is_none() {
                    attrs[i].length = attrs[t.0].length.clone();
                    attrs[i].length_unit = attrs[t.0].length_unit;
                }
            }
        }

        let mut errors = std::mem::take(&mut resolver.errors);
        let resolved = ResolvedGrammar {
            start: start.unwrap_or(Grammar::ROOT),
            padding,
            attrs,
            effective,
            grammar,
        };
        for err in validate::validate(&resolved).0 {
            errors.push(err);
        }
        errors.into_result()?;
        Ok(resolved)
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn name(&self) -> &str {
        &self.grammar.name
    }

    /// The element the root value repeats.
    pub fn start(&self) -> ElementId {
        self.start
    }

    pub fn root(&self) -> ElementId {
        Grammar::ROOT
    }

    /// The synthetic element labelling padding values.
    pub fn padding(&self) -> ElementId {
        self.padding
    }

    pub fn element(&self, id: ElementId) -> &Element {
        self.grammar.element(id)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.grammar.get(id)
    }

    pub fn len(&self) -> usize {
        self.grammar.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammar.is_empty()
    }

    pub fn attrs(&self, id: ElementId) -> &Attrs {
        &self.attrs[id.0]
    }

    pub fn id_string(&self, id: ElementId) -> String {
        match self.grammar.get(id) {
            Some(e) => e.id_string(),
            None => format!("<unknown {}>", id),
        }
    }

    pub fn find(&self, r: impl Into<ElementRef>) -> Option<ElementId> {
        self.grammar.find(&r.into())
    }

    /// A structure's children merged with those of the structures it extends.
    /// Empty for anything but a structure.
    pub fn effective_elements(&self, id: ElementId) -> &[ElementId] {
        &self.effective[id.0]
    }

    pub fn fixed_values(&self, id: ElementId) -> &[FixedValue] {
        match &self.element(self.attrs(id).values_from).kind {
            ElementKind::Number(n) => &n.values,
            _ => &[],
        }
    }

    pub fn fixed_binary_values(&self, id: ElementId) -> &[FixedBinaryValue] {
        match &self.element(self.attrs(id).values_from).kind {
            ElementKind::Binary(b) => &b.values,
            _ => &[],
        }
    }

    pub fn fixed_string_values(&self, id: ElementId) -> &[FixedStringValue] {
        match &self.element(self.attrs(id).values_from).kind {
            ElementKind::String(s) => &s.values,
            _ => &[],
        }
    }

    /// The script an element runs: itself for a Script, its link for a ScriptElement or Custom.
    pub fn script(&self, id: ElementId) -> Option<&Script> {
        let id = match self.element(id).kind {
            ElementKind::Script(_) => id,
            ElementKind::ScriptElement(_) | ElementKind::Custom(_) => self.attrs(id).target?,
            _ => return None,
        };
        match &self.element(id).kind {
            ElementKind::Script(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Memo<T> {
    Todo,
    Busy,
    Done(T),
}

struct Resolver<'g> {
    grammar: &'g Grammar,
    parent: Vec<Option<ElementId>>,
    explicit: Vec<Option<ElementId>>,
    extends: Vec<Memo<Option<ElementId>>>,
    effective: Vec<Memo<Vec<ElementId>>>,
    attrs: Vec<Memo<Attrs>>,
    errors: GrammarErrors,
}

impl<'g> Resolver<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        let n = grammar.len();
        let mut parent = vec![None; n];
        for (i, e) in grammar.elements().iter().enumerate() {
            if let Some(s) = e.as_structure() {
                for &child in &s.elements {
                    parent[child.0] = Some(ElementId(i));
                }
            }
        }

        let mut errors = GrammarErrors::default();
        let mut explicit = vec![None; n];
        for (i, e) in grammar.elements().iter().enumerate() {
            let Some(r) = &e.extends else { continue };
            match grammar.find(r) {
                None => errors.push(GrammarError::UnresolvedReference {
                    element: e.id_string(),
                    reference: r.to_string(),
                }),
                Some(t) if !grammar.element(t).kind.same_kind(&e.kind) => {
                    errors.push(GrammarError::IncompatibleExtends {
                        element: e.id_string(),
                        target: grammar.element(t).id_string(),
                    })
                }
                Some(t) => explicit[i] = Some(t),
            }
        }

        Resolver {
            grammar,
            parent,
            explicit,
            extends: vec![Memo::Todo; n],
            effective: vec![Memo::Todo; n],
            attrs: vec![Memo::Todo; n],
            errors,
        }
    }

    fn element(&self, id: ElementId) -> &'g Element {
        self.grammar.element(id)
    }

    /// Explicit `extends`, or the same-named element of the enclosing structure's ancestor.
    fn extends_of(&mut self, id: ElementId) -> Option<ElementId> {
        match &self.extends[id.0] {
            Memo::Done(v) => return *v,
            Memo::Busy => return None,
            Memo::Todo => {}
        }
        self.extends[id.0] = Memo::Busy;

        let result = if let Some(t) = self.explicit[id.0] {
            Some(t)
        } else if let Some(p) = self.parent[id.0] {
            let element = self.element(id);
            match self.extends_of(p) {
                Some(ancestor) => match self.child_by_name(ancestor, &element.name) {
                    Some(c) if c == id => None,
                    Some(c) if !self.element(c).kind.same_kind(&element.kind) => {
                        self.errors.push(GrammarError::IncompatibleExtends {
                            element: element.id_string(),
                            target: self.element(c).id_string(),
                        });
                        None
                    }
                    other => other,
                },
                None => None,
            }
        } else {
            None
        };

        self.extends[id.0] = Memo::Done(result);
        result
    }

    /// A child named `name` of `structure` or of the structures it extends.
    fn child_by_name(&mut self, structure: ElementId, name: &str) -> Option<ElementId> {
        let mut seen = HashSet::new();
        let mut current = Some(structure);
        while let Some(s) = current {
            if !seen.insert(s) {
                break;
            }
            if let Some(st) = self.element(s).as_structure() {
                if let Some(&found) = st.elements.iter().find(|&&c| self.element(c).name == name) {
                    return Some(found);
                }
            }
            current = self.extends_of(s);
        }
        None
    }

    fn check_cycles(&mut self) {
        for i in 0..self.grammar.len() {
            let start = ElementId(i);
            let mut seen = HashSet::new();
            let mut current = self.extends_of(start);
            while let Some(c) = current {
                if c == start {
                    // Report each cycle once, on its lowest member.
                    if seen.iter().all(|s: &ElementId| s.0 > i) {
                        self.errors.push(GrammarError::ExtendsCycle(self.element(start).id_string()));
                    }
                    break;
                }
                if !seen.insert(c) {
                    break;
                }
                current = self.extends_of(c);
            }
        }
    }

    fn effective(&mut self, id: ElementId) -> Vec<ElementId> {
        let own = match self.element(id).as_structure() {
            Some(s) => &s.elements,
            None => return Vec::new(),
        };
        match &self.effective[id.0] {
            Memo::Done(v) => return v.clone(),
            Memo::Busy => return own.clone(),
            Memo::Todo => {}
        }
        self.effective[id.0] = Memo::Busy;

        let Some(ancestor) = self.extends_of(id) else {
            self.effective[id.0] = Memo::Done(own.clone());
            return own.clone();
        };
        let mut merged = self.effective(ancestor);
        for &child in own {
            let name = &self.element(child).name;
            match merged.iter().position(|&m| self.element(m).name == *name) {
                Some(pos) => merged[pos] = child,
                None => merged.push(child),
            }
        }

        self.effective[id.0] = Memo::Done(merged.clone());
        merged
    }

    fn target(&mut self, id: ElementId) -> Option<ElementId> {
        let element = self.element(id);
        let (r, expected) = match &element.kind {
            ElementKind::StructRef(s) => (
                s.structure.clone().unwrap_or_else(|| ElementRef::Name(element.name.clone())),
                "Structure",
            ),
            ElementKind::ScriptElement(s) => match &s.script {
                Some(r) => (r.clone(), "Script"),
                None => return None,
            },
            ElementKind::Custom(c) => match &c.script {
                Some(r) => (r.clone(), "Script"),
                None => return None,
            },
            ElementKind::Offset(o) => {
                for r in [&o.relative_to, &o.references].into_iter().flatten() {
                    if self.grammar.find(r).is_none() {
                        self.errors.push(GrammarError::UnresolvedReference {
                            element: element.id_string(),
                            reference: r.to_string(),
                        });
                    }
                }
                return None;
            }
            _ => return None,
        };

        // Names prefer an element of the expected kind; a StructRef named after its
        // target must not find itself.
        let found = match &r {
            ElementRef::Name(name) => {
                let wanted = |t: ElementId| {
                    let e = self.element(t);
                    t != id && e.name == *name && e.kind.name() == expected
                };
                self.grammar
                    .top_level()
                    .iter()
                    .copied()
                    .find(|&t| wanted(t))
                    .or_else(|| (0..self.grammar.len()).map(ElementId).find(|&t| wanted(t)))
                    .or_else(|| self.grammar.find(&r).filter(|&t| t != id))
            }
            _ => self.grammar.find(&r),
        };
        match found {
            None => {
                self.errors.push(GrammarError::UnresolvedReference {
                    element: element.id_string(),
                    reference: r.to_string(),
                });
                None
            }
            Some(t) if self.element(t).kind.name() != expected => {
                self.errors.push(GrammarError::WrongTarget {
                    element: element.id_string(),
                    reference: r.to_string(),
                    expected,
                    found: self.element(t).id_string(),
                });
                None
            }
            Some(t) => Some(t),
        }
    }

    fn attrs(&mut self, id: ElementId) -> Attrs {
        match &self.attrs[id.0] {
            Memo::Done(a) => return a.clone(),
            Memo::Busy => return self.defaults(id, None),
            Memo::Todo => {}
        }
        self.attrs[id.0] = Memo::Busy;

        let extends = self.extends_of(id);
        let inherited = extends.map(|e| self.attrs(e));
        let parent = self.parent[id.0].map(|p| self.attrs(p));
        let own = Own::of(self.element(id));

        let attrs = match inherited {
            Some(base) => Attrs {
                parent: self.parent[id.0],
                extends,
                repeat_min: own.repeat_min.unwrap_or(base.repeat_min),
                repeat_max: own.repeat_max.unwrap_or(base.repeat_max),
                length: own.length.or(base.length),
                length_unit: own.length_unit.unwrap_or(base.length_unit),
                endian: own.endian.unwrap_or(base.endian),
                signed: own.signed.unwrap_or(base.signed),
                encoding: own.encoding.unwrap_or(base.encoding),
                display: own.display.unwrap_or(base.display),
                order: own.order.unwrap_or(base.order),
                must_match: own.must_match.unwrap_or(base.must_match),
                string_kind: own.string_kind.unwrap_or(base.string_kind),
                target: None,
                values_from: if own.has_values { id } else { base.values_from },
            },
            None => {
                let mut a = self.defaults(id, parent.as_ref());
                a.extends = extends;
                a
            }
        };

        self.attrs[id.0] = Memo::Done(attrs.clone());
        attrs
    }

    /// Own values over the enclosing structure's over the global defaults.
    fn defaults(&self, id: ElementId, parent: Option<&Attrs>) -> Attrs {
        let own = Own::of(self.element(id));
        Attrs {
            parent: self.parent[id.0],
            extends: None,
            repeat_min: own.repeat_min.unwrap_or(Reference::Literal(1)),
            repeat_max: own.repeat_max.unwrap_or(Reference::Literal(1)),
            length: own.length,
            length_unit: own
                .length_unit
                .or(parent.map(|p| p.length_unit))
                .unwrap_or(LengthUnit::Byte),
            endian: own.endian.or(parent.map(|p| p.endian)).unwrap_or(Endian::Little),
            signed: own.signed.or(parent.map(|p| p.signed)).unwrap_or(true),
            encoding: own
                .encoding
                .or(parent.map(|p| p.encoding.clone()))
                .unwrap_or_else(|| DEFAULT_ENCODING.to_string()),
            display: own.display.or(parent.map(|p| p.display)).unwrap_or(Display::Dec),
            order: own.order.unwrap_or(Order::Fixed),
            must_match: own.must_match.unwrap_or(true),
            string_kind: own.string_kind.unwrap_or(StringKind::ZeroTerminated),
            target: None,
            values_from: id,
        }
    }
}

/// The attributes an element sets itself.
#[derive(Default)]
struct Own {
    repeat_min: Option<Reference>,
    repeat_max: Option<Reference>,
    length: Option<Reference>,
    length_unit: Option<LengthUnit>,
    endian: Option<Endian>,
    signed: Option<bool>,
    encoding: Option<String>,
    display: Option<Display>,
    order: Option<Order>,
    must_match: Option<bool>,
    string_kind: Option<StringKind>,
    has_values: bool,
}

impl Own {
    fn of(e: &Element) -> Own {
        let mut own = Own {
            repeat_min: e.repeat_min.clone(),
            repeat_max: e.repeat_max.clone(),
            length: e.length.clone(),
            length_unit: e.length_unit,
            ..Own::default()
        };
        match &e.kind {
            ElementKind::Structure(s) => {
                own.endian = s.endian;
                own.signed = s.signed;
                own.encoding = s.encoding.clone();
                own.display = s.display;
                own.order = s.order;
            }
            ElementKind::Number(n) => {
                own.endian = n.endian;
                own.signed = n.signed;
                own.display = n.display;
                own.must_match = n.must_match;
                own.has_values = !n.values.is_empty();
            }
            ElementKind::String(s) => {
                own.encoding = s.encoding.clone();
                own.must_match = s.must_match;
                own.string_kind = s.kind;
                own.has_values = !s.values.is_empty();
            }
            ElementKind::Binary(b) => {
                own.must_match = b.must_match;
                own.has_values = !b.values.is_empty();
            }
            ElementKind::Offset(o) => {
                own.endian = o.endian;
                own.display = o.display;
            }
            ElementKind::Script(_) | ElementKind::ScriptElement(_) => {
                own.length = Some(Reference::Literal(0));
            }
            _ => {}
        }
        own
    }
}
