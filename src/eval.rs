//! Evaluate [`Reference`]s against decoder state.
//!
//! - literal: as-is
//! - `unlimited`: `i64::MAX`
//! - `remaining`: declared length of the nearest enclosing structure (evaluated as of
//!   that structure's start) minus what has been read of it so far
//! - `prev.<name>`: integer value of the most recent decoded element called `<name>`,
//!   which must be a Number, re-read from the source without moving the cursor

use crate::codec::{Endianness, Int};
use crate::decoder::ElementBounds;
use crate::error::EvalError;
use crate::grammar::{ElementKind, LengthUnit};
use crate::reference::Reference;
use crate::resolve::ResolvedGrammar;
use crate::source::ByteSource;
use crate::value::Value;

/// Everything a reference may look at.
pub struct EvalContext<'a> {
    pub grammar: &'a ResolvedGrammar,
    /// Bounds frames, innermost last.
    pub stack: &'a [ElementBounds],
    /// Leaf values decoded so far, oldest first.
    pub history: &'a [Value],
    pub source: &'a mut dyn ByteSource,
    /// Cursor position the reference is evaluated at.
    pub pos: u64,
}

impl EvalContext<'_> {
    pub fn eval(&mut self, r: &Reference) -> Result<i64, EvalError> {
        match r {
            Reference::Literal(n) => Ok(*n),
            Reference::Unlimited => Ok(i64::MAX),
            Reference::Remaining => self.remaining(),
            Reference::Prev(name) => self.prev(name),
        }
    }

    fn remaining(&mut self) -> Result<i64, EvalError> {
        let k = self
            .stack
            .iter()
            .rposition(|f| self.grammar.element(f.element).is_structure())
            .ok_or(EvalError::NoEnclosingStructure)?;
        let frame = self.stack[k];
        let attrs = self.grammar.attrs(frame.element);

        let declared = match &attrs.length {
            Some(length) => {
                let mut outer = EvalContext {
                    grammar: self.grammar,
                    stack: &self.stack[..k],
                    history: self.history,
                    source: &mut *self.source,
                    pos: frame.start,
                };
                let n = outer.eval(length)?;
                match attrs.length_unit {
                    LengthUnit::Byte => n,
                    LengthUnit::Bit if n % 8 == 0 => n / 8,
                    LengthUnit::Bit => return Err(EvalError::UnalignedBitLength(n)),
                }
            }
            None => (frame.end - frame.start) as i64,
        };
        let read = self.pos.saturating_sub(frame.start) as i64;
        Ok(declared.saturating_sub(read))
    }

    fn prev(&mut self, name: &str) -> Result<i64, EvalError> {
        let value = self
            .history
            .iter()
            .rev()
            .find(|v| self.grammar.element(v.element).name == name)
            .ok_or_else(|| EvalError::NoSuchPreviousElement(name.to_string()))?;
        if !matches!(self.grammar.element(value.element).kind, ElementKind::Number(_)) {
            return Err(EvalError::NotANumber(name.to_string()));
        }
        Ok(read_int(self.grammar, &mut *self.source, value)?.as_i64())
    }
}

/// Re-read the integer a Number (or Offset) value was decoded from.
pub fn read_int(
    grammar: &ResolvedGrammar,
    source: &mut dyn ByteSource,
    value: &Value,
) -> Result<Int, EvalError> {
    let element = grammar.element(value.element);
    let signed = match element.kind {
        ElementKind::Number(_) => grammar.attrs(value.element).signed,
        ElementKind::Offset(_) => false,
        _ => return Err(EvalError::NotANumber(element.name.clone())),
    };
    let len = value.len as usize;
    if len == 0 || len > 8 {
        return Err(EvalError::Unevaluable(element.id_string()));
    }
    let mut buf = [0u8; 8];
    source.read_at(&mut buf[..len], value.offset)?;
    Int::from_bytes(&buf[..len], value.byte_order.unwrap_or(Endianness::Little), signed)
        .ok_or_else(|| EvalError::Unevaluable(element.id_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Element, Grammar};
    use crate::source::ReaderSource;

    fn remaining_in(bits: i64) -> Result<i64, EvalError> {
        let mut g = Grammar::new("g");
        let s = g.add(Element::structure("s").length(bits).length_unit(LengthUnit::Bit));
        g.add_child(s, Element::binary("body", Reference::Remaining)).expect("body");
        g.set_start(s);
        let grammar = ResolvedGrammar::resolve(g).expect("resolve");
        let mut source = ReaderSource::from_bytes(vec![0u8; 4]);
        let stack = [ElementBounds { element: s, start: 0, end: 4 }];
        let mut ctx = EvalContext {
            grammar: &grammar,
            stack: &stack,
            history: &[],
            source: &mut source,
            pos: 1,
        };
        ctx.eval(&Reference::Remaining)
    }

    #[test]
    fn remaining_in_bits() {
        assert_eq!(remaining_in(32).expect("aligned"), 3);
        assert!(matches!(remaining_in(12), Err(EvalError::UnalignedBitLength(12))));
    }

    #[test]
    fn remaining_outside_structure() {
        let mut g = Grammar::new("g");
        let b = g.add(Element::binary("b", Reference::Remaining));
        g.set_start(b);
        let grammar = ResolvedGrammar::resolve(g).expect("resolve");
        let mut source = ReaderSource::from_bytes(vec![0u8; 2]);
        let mut ctx = EvalContext {
            grammar: &grammar,
            stack: &[],
            history: &[],
            source: &mut source,
            pos: 0,
        };
        assert!(matches!(ctx.eval(&Reference::Remaining), Err(EvalError::NoEnclosingStructure)));
    }
}
