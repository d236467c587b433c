//! Depth-first traversal of grammars and value trees.

use crate::grammar::{ElementId, Grammar};
use crate::value::Value;

/// Visit every element of `grammar` depth first, starting with the top-level elements,
/// together with its enclosing structure.
pub fn walk_elements<F>(grammar: &Grammar, mut f: F)
where
    F: FnMut(ElementId, Option<ElementId>),
{
    fn element<F: FnMut(ElementId, Option<ElementId>)>(
        grammar: &Grammar,
        id: ElementId,
        parent: Option<ElementId>,
        f: &mut F,
    ) {
        f(id, parent);
        if let Some(s) = grammar.element(id).as_structure() {
            for &child in &s.elements {
                element(grammar, child, Some(id), f);
            }
        }
    }

    for &id in grammar.top_level() {
        element(grammar, id, None, &mut f);
    }
}

/// Visit `value` and its descendants depth first with their depth. Returning false from
/// `f` skips that value's children.
pub fn walk_values<'v, F>(value: &'v Value, mut f: F)
where
    F: FnMut(&'v Value, usize) -> bool,
{
    fn visit<'v, F: FnMut(&'v Value, usize) -> bool>(value: &'v Value, depth: usize, f: &mut F) {
        if f(value, depth) {
            for child in &value.children {
                visit(child, depth + 1, f);
            }
        }
    }
    visit(value, 0, &mut f);
}
