//! Call-out point for script elements.
//!
//! The decoder does not run scripts itself. A [`ScriptBridge`] installed with
//! [`crate::decoder::Decoder::with_bridge`] is handed each Script, ScriptElement and
//! scripted Custom element as it is reached, together with a [`ScriptContext`] giving
//! read access to what has been decoded so far. The only decoder state a script may
//! change is the dynamic endianness used by elements declared `Endian::Dynamic`.

use crate::codec::{Endianness, Int};
use crate::error::{EvalError, SourceError};
use crate::eval::read_int;
use crate::grammar::{Element, ElementId, Script};
use crate::resolve::ResolvedGrammar;
use crate::source::ByteSource;
use crate::value::Value;

/// A scripting runtime.
pub trait ScriptBridge {
    /// Run `script`. Errors abort the decode as [`crate::DecodeError::Script`].
    fn run(&mut self, script: &Script, ctx: &mut ScriptContext<'_>) -> anyhow::Result<()>;
}

impl<F> ScriptBridge for F
where
    F: FnMut(&Script, &mut ScriptContext<'_>) -> anyhow::Result<()>,
{
    fn run(&mut self, script: &Script, ctx: &mut ScriptContext<'_>) -> anyhow::Result<()> {
        self(script, ctx)
    }
}

/// What a running script can see and do.
pub struct ScriptContext<'a> {
    pub(crate) grammar: &'a ResolvedGrammar,
    pub(crate) source: &'a mut dyn ByteSource,
    pub(crate) history: &'a [Value],
    pub(crate) current: Option<&'a Value>,
    pub(crate) element: ElementId,
    pub(crate) dynamic_endian: &'a mut Endianness,
}

impl<'a> ScriptContext<'a> {
    pub fn grammar(&self) -> &'a ResolvedGrammar {
        self.grammar
    }

    /// The element the script is attached to.
    pub fn element(&self) -> &'a Element {
        self.grammar.element(self.element)
    }

    /// The most recently decoded leaf value.
    pub fn last_value(&self) -> Option<&'a Value> {
        self.history.last()
    }

    /// The most recently decoded leaf value named `name`.
    pub fn value_by_name(&self, name: &str) -> Option<&'a Value> {
        let grammar = self.grammar;
        self.history
            .iter()
            .rev()
            .find(|v| grammar.element(v.element).name == name)
    }

    /// The value being decoded, for Custom elements.
    pub fn current(&self) -> Option<&'a Value> {
        self.current
    }

    pub fn name_of(&self, value: &Value) -> &'a str {
        value.name(self.grammar)
    }

    pub fn number(&mut self, value: &Value) -> Result<Int, EvalError> {
        read_int(self.grammar, &mut *self.source, value)
    }

    pub fn unsigned_number(&mut self, value: &Value) -> Result<u64, EvalError> {
        Ok(self.number(value)?.as_u64())
    }

    pub fn signed_number(&mut self, value: &Value) -> Result<i64, EvalError> {
        Ok(self.number(value)?.as_i64())
    }

    /// The raw bytes of `value`.
    pub fn bytes(&mut self, value: &Value) -> Result<Vec<u8>, SourceError> {
        let mut buf = vec![0u8; value.len as usize];
        self.source.read_at(&mut buf, value.offset)?;
        Ok(buf)
    }

    pub fn dynamic_endian(&self) -> Endianness {
        *self.dynamic_endian
    }

    pub fn set_dynamic_endian(&mut self, endian: Endianness) {
        *self.dynamic_endian = endian;
    }
}
