//! Decoded values: offset/length spans over the input, labelled with their element.

use crate::codec::Endianness;
use crate::grammar::{ElementId, ElementKind};
use crate::resolve::ResolvedGrammar;
use crate::walk::walk_values;

/// One decoded element instance.
///
/// A value holds no decoded data, only where it is; [`crate::format`] re-reads the bytes
/// to display it. Children, when present, are contiguous and cover exactly
/// `[offset, offset + len)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    /// In bytes from the start of the input.
    pub offset: u64,
    /// In bytes.
    pub len: u64,
    pub element: ElementId,
    pub children: Vec<Value>,
    /// Byte order the value was read with (Numbers and Offsets).
    pub byte_order: Option<Endianness>,
    /// Index of the fixed value the content matched.
    pub matched: Option<usize>,
}

impl Value {
    pub fn leaf(element: ElementId, offset: u64, len: u64) -> Self {
        Value {
            offset,
            len,
            element,
            children: Vec::new(),
            byte_order: None,
            matched: None,
        }
    }

    /// A value spanning its children, starting at `offset`.
    pub fn with_children(element: ElementId, offset: u64, children: Vec<Value>) -> Self {
        let len = children.iter().map(|c| c.len).sum();
        Value {
            children,
            ..Value::leaf(element, offset, len)
        }
    }

    pub fn end(&self) -> u64 {
        self.offset + self.len
    }

    pub fn name<'g>(&self, grammar: &'g ResolvedGrammar) -> &'g str {
        grammar
            .get(self.element)
            .map(|e| e.name.as_str())
            .unwrap_or("<unknown>")
    }

    /// `[offset len:N] Kind<id name>`
    pub fn describe(&self, grammar: &ResolvedGrammar) -> String {
        format!("[{} len:{}] {}", self.offset, self.len, grammar.id_string(self.element))
    }

    /// First value named `name`, depth first, including `self`.
    pub fn find<'v>(&'v self, grammar: &ResolvedGrammar, name: &str) -> Option<&'v Value> {
        let mut found = None;
        walk_values(self, |v, _| {
            if found.is_none() && v.name(grammar) == name {
                found = Some(v);
            }
            found.is_none()
        });
        found
    }

    /// This value and all of its descendants.
    pub fn count(&self) -> usize {
        let mut n = 0;
        walk_values(self, |_, _| {
            n += 1;
            true
        });
        n
    }

    /// Check this value alone: element exists, only composite elements have children,
    /// children are contiguous and cover the value exactly.
    pub fn check(&self, grammar: &ResolvedGrammar) -> Result<(), String> {
        let element = grammar
            .get(self.element)
            .ok_or_else(|| format!("[{} len:{}] refers to unknown element {}", self.offset, self.len, self.element))?;

        if self.children.is_empty() {
            return Ok(());
        }
        match element.kind {
            ElementKind::Structure(_) | ElementKind::StructRef(_) | ElementKind::Grammar => {}
            _ => {
                return Err(format!(
                    "{} only structures can have children, got {}",
                    self.describe(grammar),
                    element.kind.name()
                ))
            }
        }

        let mut offset = self.offset;
        for child in &self.children {
            if child.offset != offset {
                return Err(format!(
                    "{} child {} does not start at the correct offset, want {}",
                    self.describe(grammar),
                    child.describe(grammar),
                    offset
                ));
            }
            offset += child.len;
        }
        if offset != self.end() {
            return Err(format!(
                "{} children end at {}, want {}",
                self.describe(grammar),
                offset,
                self.end()
            ));
        }
        Ok(())
    }

    /// [`Value::check`] this value and all its descendants.
    pub fn validate(&self, grammar: &ResolvedGrammar) -> Result<(), String> {
        self.check(grammar)?;
        self.children.iter().try_for_each(|c| c.validate(grammar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Element, Grammar};

    fn grammar() -> (ResolvedGrammar, ElementId, ElementId) {
        let mut g = Grammar::new("g");
        let s = g.add(Element::structure("s"));
        let n = g.add_child(s, Element::number("n", 1)).expect("n");
        g.set_start(s);
        (ResolvedGrammar::resolve(g).expect("resolve"), s, n)
    }

    #[test]
    fn children_span() {
        let (g, s, n) = grammar();
        let v = Value::with_children(s, 4, vec![Value::leaf(n, 4, 1), Value::leaf(n, 5, 1)]);
        assert_eq!((v.len, v.end()), (2, 6));
        assert_eq!(v.name(&g), "s");
        assert_eq!(v.describe(&g), "[4 len:2] Structure<00 s>");
        assert!(v.validate(&g).is_ok());
    }

    #[test]
    fn overlap_is_rejected() {
        let (g, s, n) = grammar();
        let v = Value::with_children(s, 0, vec![Value::leaf(n, 0, 2), Value::leaf(n, 1, 1)]);
        assert!(v.check(&g).is_err());

        let short = Value {
            len: 3,
            ..Value::with_children(s, 0, vec![Value::leaf(n, 0, 1)])
        };
        assert!(short.check(&g).is_err());
    }

    #[test]
    fn unknown_element() {
        let (g, _, _) = grammar();
        assert!(Value::leaf(ElementId(1000), 0, 1).check(&g).is_err());
        assert_eq!(Value::leaf(ElementId(1000), 0, 1).name(&g), "<unknown>");
    }
}
