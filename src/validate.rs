//! Checks run on a resolved grammar before any decoding.
//!
//! ## Rules
//!
//! - **Unique ids**: non-zero element ids must be unique.
//! - **Lengths**: Numbers, Binaries, Customs, Offsets and fixed-length Strings need an
//!   effective length (their own or inherited).

use crate::error::{GrammarError, GrammarErrors};
use crate::grammar::{ElementId, ElementKind, StringKind};
use crate::resolve::ResolvedGrammar;
use crate::walk::walk_elements;
use std::collections::HashMap;

/// Run every rule, collecting all problems.
pub fn validate(grammar: &ResolvedGrammar) -> GrammarErrors {
    let mut errors = GrammarErrors::default();
    let mut ids: HashMap<u32, ElementId> = HashMap::new();

    walk_elements(grammar.grammar(), |id, _parent| {
        let element = grammar.element(id);

        if element.id != 0 {
            if let Some(&first) = ids.get(&element.id) {
                errors.push(GrammarError::DuplicateId {
                    id: element.id,
                    first: grammar.id_string(first),
                    second: element.id_string(),
                });
            } else {
                ids.insert(element.id, id);
            }
        }

        let attrs = grammar.attrs(id);
        let needs_length = match &element.kind {
            ElementKind::Number(_)
            | ElementKind::Binary(_)
            | ElementKind::Custom(_)
            | ElementKind::Offset(_) => true,
            ElementKind::String(_) => attrs.string_kind == StringKind::FixedLength,
            _ => false,
        };
        if needs_length && attrs.length.is_none() {
            errors.push(GrammarError::MissingLength(element.id_string()));
        }
    });

    errors
}
