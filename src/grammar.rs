//! In-memory grammar model: an arena of typed elements.
//!
//! A [`Grammar`] owns every [`Element`]; elements refer to each other by [`ElementId`]
//! (arena index) once built, or by [`ElementRef`] (index, numeric id or name) while the
//! grammar is being assembled. [`crate::resolve::ResolvedGrammar`] links the references,
//! applies inheritance and defaults, and is what the decoder consumes.
//!
//! Element attributes left as `None` are inherited: from the `extends` element if there
//! is one, else (for endianness, signedness, encoding, display and length unit) from the
//! enclosing structure, else from the global default.

use crate::codec::Display;
use crate::error::GrammarError;
use crate::reference::{parse_bytes, parse_integer, Reference};
use std::fmt;

/// Index of an element in its grammar's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An unresolved pointer to an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementRef {
    Index(ElementId),
    /// Numeric element id (as written `id:N`).
    Id(u32),
    Name(String),
}

impl From<ElementId> for ElementRef {
    fn from(id: ElementId) -> Self {
        ElementRef::Index(id)
    }
}

impl From<&str> for ElementRef {
    /// `id:N` refers to a numeric id, anything else to a name.
    fn from(s: &str) -> Self {
        match s.strip_prefix("id:").map(|n| n.trim().parse::<u32>()) {
            Some(Ok(id)) => ElementRef::Id(id),
            _ => ElementRef::Name(s.to_string()),
        }
    }
}

impl From<String> for ElementRef {
    fn from(s: String) -> Self {
        ElementRef::from(s.as_str())
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::Index(id) => write!(f, "{}", id),
            ElementRef::Id(id) => write!(f, "id:{}", id),
            ElementRef::Name(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
    /// Whatever the decoder's dynamic endianness is when the element is read.
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthUnit {
    Bit,
    Byte,
}

/// How a structure's children may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    /// In declaration order, each repeated within its bounds.
    Fixed,
    /// Any interleaving; at each position the first element that decodes wins.
    Variable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    ZeroTerminated,
    /// Terminated by the given byte.
    Delimited(u8),
    FixedLength,
    /// One length byte followed by that many bytes.
    Pascal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedValue {
    pub name: String,
    pub value: i128,
    pub description: String,
}

impl FixedValue {
    pub fn new(name: impl Into<String>, value: impl Into<i128>) -> Self {
        FixedValue {
            name: name.into(),
            value: value.into(),
            description: String::new(),
        }
    }

    /// Build from a textual literal such as `0x0800` or `-1`.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, GrammarError> {
        Ok(FixedValue::new(name, parse_integer(text)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedBinaryValue {
    pub name: String,
    pub value: Vec<u8>,
    pub description: String,
}

impl FixedBinaryValue {
    pub fn new(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        FixedBinaryValue {
            name: name.into(),
            value: value.into(),
            description: String::new(),
        }
    }

    /// Build from hex text such as `0x89504e47`.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, GrammarError> {
        Ok(FixedBinaryValue::new(name, parse_bytes(text)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedStringValue {
    pub name: String,
    pub value: String,
    pub description: String,
}

impl FixedStringValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        FixedStringValue {
            name: name.into(),
            value: value.into(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    pub elements: Vec<ElementId>,
    pub order: Option<Order>,
    pub endian: Option<Endian>,
    pub signed: Option<bool>,
    pub encoding: Option<String>,
    pub display: Option<Display>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Number {
    pub endian: Option<Endian>,
    pub signed: Option<bool>,
    pub display: Option<Display>,
    pub must_match: Option<bool>,
    pub values: Vec<FixedValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringElement {
    pub kind: Option<StringKind>,
    pub encoding: Option<String>,
    pub must_match: Option<bool>,
    pub values: Vec<FixedStringValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binary {
    pub must_match: Option<bool>,
    pub values: Vec<FixedBinaryValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructRef {
    /// Target structure; when unset the structure with the StructRef's own name.
    pub structure: Option<ElementRef>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrammarRef {
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Custom {
    pub script: Option<ElementRef>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Offset {
    pub endian: Option<Endian>,
    pub display: Option<Display>,
    pub relative_to: Option<ElementRef>,
    pub references: Option<ElementRef>,
}

/// Script text in a named language, run by a [`crate::script::ScriptBridge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub name: String,
    pub kind: String,
    pub language: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptElement {
    pub script: Option<ElementRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// The grammar itself; labels the root value.
    Grammar,
    Structure(Structure),
    Number(Number),
    String(StringElement),
    Binary(Binary),
    StructRef(StructRef),
    GrammarRef(GrammarRef),
    Custom(Custom),
    Offset(Offset),
    Script(Script),
    ScriptElement(ScriptElement),
    /// Filler between a structure's children and its declared length.
    Padding,
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Grammar => "Grammar",
            ElementKind::Structure(_) => "Structure",
            ElementKind::Number(_) => "Number",
            ElementKind::String(_) => "String",
            ElementKind::Binary(_) => "Binary",
            ElementKind::StructRef(_) => "StructRef",
            ElementKind::GrammarRef(_) => "GrammarRef",
            ElementKind::Custom(_) => "Custom",
            ElementKind::Offset(_) => "Offset",
            ElementKind::Script(_) => "Script",
            ElementKind::ScriptElement(_) => "ScriptElement",
            ElementKind::Padding => "Padding",
        }
    }

    pub fn same_kind(&self, other: &ElementKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Numeric id, unique within the grammar; 0 means unset.
    pub id: u32,
    pub name: String,
    pub description: String,
    pub repeat_min: Option<Reference>,
    pub repeat_max: Option<Reference>,
    pub length: Option<Reference>,
    pub length_unit: Option<LengthUnit>,
    pub extends: Option<ElementRef>,
    pub kind: ElementKind,
}

impl Element {
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        Element {
            id: 0,
            name: name.into(),
            description: String::new(),
            repeat_min: None,
            repeat_max: None,
            length: None,
            length_unit: None,
            extends: None,
            kind,
        }
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Element::new(name, ElementKind::Structure(Structure::default()))
    }

    /// A number of `length` bytes.
    pub fn number(name: impl Into<String>, length: impl Into<Reference>) -> Self {
        Element::new(name, ElementKind::Number(Number::default())).length(length)
    }

    pub fn string(name: impl Into<String>, kind: StringKind) -> Self {
        Element::new(
            name,
            ElementKind::String(StringElement {
                kind: Some(kind),
                ..StringElement::default()
            }),
        )
    }

    pub fn binary(name: impl Into<String>, length: impl Into<Reference>) -> Self {
        Element::new(name, ElementKind::Binary(Binary::default())).length(length)
    }

    pub fn struct_ref(name: impl Into<String>, structure: impl Into<ElementRef>) -> Self {
        Element::new(
            name,
            ElementKind::StructRef(StructRef {
                structure: Some(structure.into()),
            }),
        )
    }

    pub fn grammar_ref(name: impl Into<String>, filename: impl Into<String>) -> Self {
        Element::new(
            name,
            ElementKind::GrammarRef(GrammarRef {
                filename: filename.into(),
            }),
        )
    }

    pub fn custom(name: impl Into<String>, length: impl Into<Reference>) -> Self {
        Element::new(name, ElementKind::Custom(Custom::default())).length(length)
    }

    pub fn offset(name: impl Into<String>, length: impl Into<Reference>) -> Self {
        Element::new(name, ElementKind::Offset(Offset::default())).length(length)
    }

    pub fn script(
        name: impl Into<String>,
        language: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Element::new(
            name.clone(),
            ElementKind::Script(Script {
                name,
                kind: "Generic".to_string(),
                language: language.into(),
                text: text.into(),
            }),
        )
    }

    pub fn script_element(name: impl Into<String>, script: impl Into<ElementRef>) -> Self {
        Element::new(
            name,
            ElementKind::ScriptElement(ScriptElement {
                script: Some(script.into()),
            }),
        )
    }

    pub fn padding() -> Self {
        Element::new("padding", ElementKind::Padding)
    }

    /// `Kind<id name>`, used to identify elements in errors and logs.
    pub fn id_string(&self) -> String {
        format!("{}<{:02} {}>", self.kind.name(), self.id, self.name)
    }

    pub fn is_structure(&self) -> bool {
        matches!(self.kind, ElementKind::Structure(_))
    }

    pub fn as_structure(&self) -> Option<&Structure> {
        match &self.kind {
            ElementKind::Structure(s) => Some(s),
            _ => None,
        }
    }

    // Builder setters. Attributes an element kind does not carry are left untouched.

    pub fn id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn length(mut self, length: impl Into<Reference>) -> Self {
        self.length = Some(length.into());
        self
    }

    pub fn length_unit(mut self, unit: LengthUnit) -> Self {
        self.length_unit = Some(unit);
        self
    }

    pub fn repeat_min(mut self, min: impl Into<Reference>) -> Self {
        self.repeat_min = Some(min.into());
        self
    }

    pub fn repeat_max(mut self, max: impl Into<Reference>) -> Self {
        self.repeat_max = Some(max.into());
        self
    }

    /// Shorthand for `repeat_min(min).repeat_max(max)`.
    pub fn repeat(self, min: impl Into<Reference>, max: impl Into<Reference>) -> Self {
        self.repeat_min(min).repeat_max(max)
    }

    pub fn extends(mut self, parent: impl Into<ElementRef>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        match &mut self.kind {
            ElementKind::Structure(s) => s.endian = Some(endian),
            ElementKind::Number(n) => n.endian = Some(endian),
            ElementKind::Offset(o) => o.endian = Some(endian),
            _ => {}
        }
        self
    }

    pub fn signed(mut self, signed: bool) -> Self {
        match &mut self.kind {
            ElementKind::Structure(s) => s.signed = Some(signed),
            ElementKind::Number(n) => n.signed = Some(signed),
            _ => {}
        }
        self
    }

    pub fn display(mut self, display: Display) -> Self {
        match &mut self.kind {
            ElementKind::Structure(s) => s.display = Some(display),
            ElementKind::Number(n) => n.display = Some(display),
            ElementKind::Offset(o) => o.display = Some(display),
            _ => {}
        }
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        match &mut self.kind {
            ElementKind::Structure(s) => s.encoding = Some(encoding.into()),
            ElementKind::String(s) => s.encoding = Some(encoding.into()),
            _ => {}
        }
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        if let ElementKind::Structure(s) = &mut self.kind {
            s.order = Some(order);
        }
        self
    }

    pub fn must_match(mut self, must_match: bool) -> Self {
        match &mut self.kind {
            ElementKind::Number(n) => n.must_match = Some(must_match),
            ElementKind::String(s) => s.must_match = Some(must_match),
            ElementKind::Binary(b) => b.must_match = Some(must_match),
            _ => {}
        }
        self
    }

    pub fn value(mut self, name: impl Into<String>, value: impl Into<i128>) -> Self {
        if let ElementKind::Number(n) = &mut self.kind {
            n.values.push(FixedValue::new(name, value));
        }
        self
    }

    pub fn bytes_value(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        if let ElementKind::Binary(b) = &mut self.kind {
            b.values.push(FixedBinaryValue::new(name, value));
        }
        self
    }

    pub fn string_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let ElementKind::String(s) = &mut self.kind {
            s.values.push(FixedStringValue::new(name, value));
        }
        self
    }

    /// Script for a Custom element.
    pub fn with_script(mut self, script: impl Into<ElementRef>) -> Self {
        match &mut self.kind {
            ElementKind::Custom(c) => c.script = Some(script.into()),
            ElementKind::ScriptElement(s) => s.script = Some(script.into()),
            _ => {}
        }
        self
    }

    pub fn relative_to(mut self, target: impl Into<ElementRef>) -> Self {
        if let ElementKind::Offset(o) = &mut self.kind {
            o.relative_to = Some(target.into());
        }
        self
    }

    pub fn references(mut self, target: impl Into<ElementRef>) -> Self {
        if let ElementKind::Offset(o) = &mut self.kind {
            o.references = Some(target.into());
        }
        self
    }
}

/// A grammar under construction.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub name: String,
    pub author: String,
    pub ext: String,
    pub email: String,
    pub uti: String,
    pub complete: bool,
    elements: Vec<Element>,
    top_level: Vec<ElementId>,
    start: Option<ElementRef>,
}

impl Grammar {
    /// The grammar pseudo-element that labels the root value.
    pub const ROOT: ElementId = ElementId(0);

    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Grammar {
            elements: vec![Element::new(name.clone(), ElementKind::Grammar)],
            name,
            author: String::new(),
            ext: String::new(),
            email: String::new(),
            uti: String::new(),
            complete: false,
            top_level: Vec::new(),
            start: None,
        }
    }

    /// Add a top-level element.
    pub fn add(&mut self, element: Element) -> ElementId {
        let id = self.push(element);
        self.top_level.push(id);
        id
    }

    /// Append `element` to the children of the structure `parent`.
    pub fn add_child(&mut self, parent: ElementId, element: Element) -> Result<ElementId, GrammarError> {
        let p = self
            .elements
            .get(parent.0)
            .ok_or_else(|| GrammarError::NotAStructure(parent.to_string()))?;
        if !p.is_structure() {
            return Err(GrammarError::NotAStructure(p.id_string()));
        }
        let id = self.push(element);
        if let ElementKind::Structure(s) = &mut self.elements[parent.0].kind {
            s.elements.push(id);
        }
        Ok(id)
    }

    /// Add several children at once.
    pub fn add_children(
        &mut self,
        parent: ElementId,
        elements: impl IntoIterator<Item = Element>,
    ) -> Result<Vec<ElementId>, GrammarError> {
        elements
            .into_iter()
            .map(|e| self.add_child(parent, e))
            .collect()
    }

    fn push(&mut self, element: Element) -> ElementId {
        self.elements.push(element);
        ElementId(self.elements.len() - 1)
    }

    pub fn set_start(&mut self, start: impl Into<ElementRef>) {
        self.start = Some(start.into());
    }

    pub fn start(&self) -> Option<&ElementRef> {
        self.start.as_ref()
    }

    /// Make `element` inherit from `parent`. Fails if `parent` can be found and is of
    /// another kind; unresolvable parents are reported when the grammar is resolved.
    pub fn set_extends(&mut self, element: ElementId, parent: impl Into<ElementRef>) -> Result<(), GrammarError> {
        let parent = parent.into();
        let child = self
            .elements
            .get(element.0)
            .ok_or_else(|| GrammarError::UnresolvedReference {
                element: element.to_string(),
                reference: element.to_string(),
            })?;
        if let Some(target) = self.find(&parent).map(|id| &self.elements[id.0]) {
            if !target.kind.same_kind(&child.kind) {
                return Err(GrammarError::IncompatibleExtends {
                    element: child.id_string(),
                    target: target.id_string(),
                });
            }
        }
        self.elements[element.0].extends = Some(parent);
        Ok(())
    }

    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn top_level(&self) -> &[ElementId] {
        &self.top_level
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.top_level.is_empty()
    }

    /// Find the element `r` points to. Names are looked up among top-level elements
    /// first, then anywhere in the grammar.
    pub fn find(&self, r: &ElementRef) -> Option<ElementId> {
        match r {
            ElementRef::Index(id) => (id.0 < self.elements.len()).then_some(*id),
            ElementRef::Id(0) => None,
            ElementRef::Id(n) => self
                .elements
                .iter()
                .position(|e| e.id == *n && !matches!(e.kind, ElementKind::Grammar))
                .map(ElementId),
            ElementRef::Name(name) => self
                .top_level
                .iter()
                .copied()
                .find(|id| self.elements[id.0].name == *name)
                .or_else(|| {
                    self.elements
                        .iter()
                        .skip(1)
                        .position(|e| e.name == *name)
                        .map(|i| ElementId(i + 1))
                }),
        }
    }

    pub(crate) fn push_synthetic(&mut self, element: Element) -> ElementId {
        self.push(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_refs_from_text() {
        assert_eq!(ElementRef::from("id:12"), ElementRef::Id(12));
        assert_eq!(ElementRef::from("Header"), ElementRef::Name("Header".to_string()));
        assert_eq!(ElementRef::from("id:x"), ElementRef::Name("id:x".to_string()));
    }

    #[test]
    fn id_string() {
        let e = Element::number("Red", 1).id(3);
        assert_eq!(e.id_string(), "Number<03 Red>");
    }

    #[test]
    fn children_only_on_structures() {
        let mut g = Grammar::new("g");
        let n = g.add(Element::number("n", 1));
        let err = g.add_child(n, Element::number("m", 1)).unwrap_err();
        assert!(matches!(err, GrammarError::NotAStructure(_)));
    }

    #[test]
    fn find_prefers_top_level() {
        let mut g = Grammar::new("g");
        let outer = g.add(Element::structure("outer"));
        let inner = g.add_child(outer, Element::number("x", 1).id(7)).expect("child");
        let top = g.add(Element::number("x", 2));
        assert_eq!(g.find(&ElementRef::from("x")), Some(top));
        assert_eq!(g.find(&ElementRef::Id(7)), Some(inner));
        assert_eq!(g.find(&ElementRef::from("missing")), None);
    }

    #[test]
    fn set_extends_checks_kind() {
        let mut g = Grammar::new("g");
        let s = g.add(Element::structure("s"));
        let n = g.add(Element::number("n", 1));
        let err = g.set_extends(n, s).unwrap_err();
        assert!(matches!(err, GrammarError::IncompatibleExtends { .. }));

        let m = g.add(Element::number("m", 2));
        g.set_extends(m, "n").expect("same kind");
        assert_eq!(g.element(m).extends, Some(ElementRef::Name("n".to_string())));
    }
}
