//! Recursive-descent decoder: walks a resolved grammar over a byte source.
//!
//! Every element is read inside a bounds frame `[start, end)` pushed for it: `end` is the
//! parent's end, narrowed to `start + length` when the element declares a length. Reads
//! never leave the current frame.
//!
//! Structures try their effective elements in turn (see [`Order`]): under fixed order a
//! failing element is skipped once its minimum count is met, under variable order any
//! failure just moves on to the next candidate, and every success restarts from the
//! first element. A clean [`DecodeError::Eof`] stops a structure's loop.
//!
//! ```no_run
//! use dsector::{Decoder, Element, Grammar, ReaderSource, ResolvedGrammar};
//!
//! let mut g = Grammar::new("Pixels");
//! let colour = g.add(Element::structure("Colour").repeat(1, dsector::Reference::Unlimited));
//! g.add_children(colour, [
//!     Element::number("Red", 1),
//!     Element::number("Green", 1),
//!     Element::number("Blue", 1),
//! ]).unwrap();
//! g.set_start(colour);
//! let grammar = ResolvedGrammar::resolve(g).unwrap();
//!
//! let mut decoder = Decoder::new(&grammar, ReaderSource::from_bytes(vec![0u8, 1, 2, 3, 4, 5]));
//! let root = decoder.decode().unwrap();
//! assert_eq!(root.children.len(), 2);
//! ```

use crate::codec::{format_int, format_literal, int_matches, Endianness, Int};
use crate::error::DecodeError;
use crate::eval::EvalContext;
use crate::format::{content_bytes, decode_text, format_bytes};
use crate::grammar::{ElementId, ElementKind, Endian, LengthUnit, Order, StringKind};
use crate::reference::Reference;
use crate::resolve::ResolvedGrammar;
use crate::script::{ScriptBridge, ScriptContext};
use crate::source::ByteSource;
use crate::value::Value;
use log::{debug, trace, warn};
use std::io::SeekFrom;

/// The byte range an element being decoded must stay within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementBounds {
    pub element: ElementId,
    pub start: u64,
    pub end: u64,
}

/// Limits and defaults for a [`Decoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Maximum number of nested bounds frames.
    pub max_depth: usize,
    /// Maximum number of values produced by one decoder.
    pub max_values: usize,
    /// Check value and cursor invariants after every element.
    pub check_invariants: bool,
    /// Initial byte order for `Endian::Dynamic` elements.
    pub dynamic_endian: Endianness,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            max_depth: 32,
            max_values: 1_000_000,
            check_invariants: true,
            dynamic_endian: Endianness::Little,
        }
    }
}

impl DecoderOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_values(mut self, max_values: usize) -> Self {
        self.max_values = max_values;
        self
    }

    pub fn with_check_invariants(mut self, check: bool) -> Self {
        self.check_invariants = check;
        self
    }

    pub fn with_dynamic_endian(mut self, endian: Endianness) -> Self {
        self.dynamic_endian = endian;
        self
    }
}

pub struct Decoder<'g, S> {
    grammar: &'g ResolvedGrammar,
    source: S,
    options: DecoderOptions,
    stack: Vec<ElementBounds>,
    history: Vec<Value>,
    dynamic_endian: Endianness,
    values: usize,
    bridge: Option<Box<dyn ScriptBridge + 'g>>,
}

impl<'g, S: ByteSource> Decoder<'g, S> {
    pub fn new(grammar: &'g ResolvedGrammar, source: S) -> Self {
        Decoder::with_options(grammar, source, DecoderOptions::default())
    }

    pub fn with_options(grammar: &'g ResolvedGrammar, source: S, options: DecoderOptions) -> Self {
        Decoder {
            grammar,
            source,
            dynamic_endian: options.dynamic_endian,
            options,
            stack: Vec::new(),
            history: Vec::new(),
            values: 0,
            bridge: None,
        }
    }

    /// Install the runtime that runs script elements.
    pub fn with_bridge(mut self, bridge: impl ScriptBridge + 'g) -> Self {
        self.bridge = Some(Box::new(bridge));
        self
    }

    pub fn grammar(&self) -> &'g ResolvedGrammar {
        self.grammar
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Bounds frames currently pushed, innermost last.
    pub fn stack(&self) -> &[ElementBounds] {
        &self.stack
    }

    /// Leaf values decoded so far, oldest first.
    pub fn history(&self) -> &[Value] {
        &self.history
    }

    pub fn last_value(&self) -> Option<&Value> {
        self.history.last()
    }

    /// The most recent leaf value named `name`.
    pub fn prev_value(&self, name: &str) -> Option<&Value> {
        self.history
            .iter()
            .rev()
            .find(|v| self.grammar.element(v.element).name == name)
    }

    pub fn dynamic_endian(&self) -> Endianness {
        self.dynamic_endian
    }

    /// Number of values produced so far.
    pub fn values_decoded(&self) -> usize {
        self.values
    }

    /// Decode the whole source: the start element, repeated within its bounds.
    /// The root value is labelled with the grammar itself.
    pub fn decode(&mut self) -> Result<Value, DecodeError> {
        self.reset();
        let len = self.source.len()?;
        let root = self.grammar.root();
        let start = self.grammar.start();
        self.source.seek(SeekFrom::Start(0))?;

        debug!("Decoding {} ({} bytes)", self.grammar.name(), len);
        self.stack.push(ElementBounds { element: root, start: 0, end: len });
        let result = self.repeat_start(start, len);
        self.stack.pop();
        let value = result?;

        if self.options.check_invariants {
            value.validate(self.grammar).map_err(DecodeError::Invariant)?;
        }
        Ok(value)
    }

    fn repeat_start(&mut self, start: ElementId, len: u64) -> Result<Value, DecodeError> {
        let root = self.grammar.root();
        let attrs = self.grammar.attrs(start);
        let min = self.eval(start, &attrs.repeat_min)?.max(0) as u64;
        let max = repeat_limit(self.eval(start, &attrs.repeat_max)?);

        let mut children: Vec<Value> = Vec::new();
        let mut consumed = 0u64;
        while (children.len() as u64) < max && consumed < len {
            self.source.seek(SeekFrom::Start(consumed))?;
            let mark = self.history.len();
            match self.read(start) {
                Ok(v) => {
                    let zero = v.len == 0;
                    consumed += v.len;
                    children.push(v);
                    if zero {
                        break;
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) if e.is_eof() => {
                    self.history.truncate(mark);
                    break;
                }
                Err(e) if children.len() as u64 >= min => {
                    debug!("[0x{:x}] Stopping after {} values: {}", consumed, children.len(), e);
                    self.history.truncate(mark);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        if (children.len() as u64) < min {
            if children.is_empty() {
                return Err(DecodeError::Eof);
            }
            return Err(DecodeError::RepeatMinNotMet {
                element: self.grammar.id_string(root),
                child: self.grammar.id_string(start),
                count: children.len() as u64,
                min: min as i64,
            });
        }
        self.source.seek(SeekFrom::Start(consumed))?;
        Ok(Value::with_children(root, 0, children))
    }

    /// Decode a single element at `offset`, bounded only by the end of the source.
    pub fn decode_element(&mut self, id: ElementId, offset: u64) -> Result<Value, DecodeError> {
        self.reset();
        let len = self.source.len()?;
        self.source.seek(SeekFrom::Start(offset))?;
        self.stack.push(ElementBounds { element: self.grammar.root(), start: 0, end: len });
        let result = self.read(id);
        self.stack.pop();
        result
    }

    /// Forget everything a previous decode left behind.
    fn reset(&mut self) {
        self.stack.clear();
        self.history.clear();
        self.values = 0;
        self.dynamic_endian = self.options.dynamic_endian;
    }

    /// Read one element instance at the cursor inside a new bounds frame.
    fn read(&mut self, id: ElementId) -> Result<Value, DecodeError> {
        if self.stack.len() >= self.options.max_depth {
            return Err(DecodeError::StackOverflow(self.options.max_depth));
        }

        let start = self.source.tell()?;
        let parent_end = match self.stack.last() {
            Some(f) => f.end,
            None => self.source.len()?,
        };
        let declared = self.byte_length(id)?;
        let end = match declared {
            Some(len) => parent_end.min(start.saturating_add(len)),
            None => parent_end,
        }
        .max(start);

        debug!("[0x{:x}] Reading: {}", start, self.grammar.id_string(id));
        self.stack.push(ElementBounds { element: id, start, end });
        let result = self.dispatch(id, declared);
        self.stack.pop();

        let value = match result {
            Ok(v) => v,
            Err(e) => {
                debug!("[0x{:x}] Failed: {}: {}", start, self.grammar.id_string(id), e);
                return Err(e);
            }
        };
        debug!("[0x{:x}] Read: {}", start, value.describe(self.grammar));

        if self.options.check_invariants {
            value.check(self.grammar).map_err(DecodeError::Invariant)?;
            let pos = self.source.tell()?;
            if pos != value.end() {
                return Err(DecodeError::Invariant(format!(
                    "decoder left at {} after {}, want {}",
                    pos,
                    value.describe(self.grammar),
                    value.end()
                )));
            }
        }

        self.values += 1;
        if self.values > self.options.max_values {
            return Err(DecodeError::ValueLimitExceeded(self.options.max_values));
        }

        if matches!(
            self.grammar.element(id).kind,
            ElementKind::Number(_)
                | ElementKind::String(_)
                | ElementKind::Binary(_)
                | ElementKind::Offset(_)
                | ElementKind::Custom(_)
        ) {
            self.history.push(value.clone());
        }
        Ok(value)
    }

    fn dispatch(&mut self, id: ElementId, declared: Option<u64>) -> Result<Value, DecodeError> {
        match &self.grammar.element(id).kind {
            ElementKind::Structure(_) => self.read_structure(id, declared),
            ElementKind::Number(_) => self.read_number(id, declared),
            ElementKind::String(_) => self.read_string(id, declared),
            ElementKind::Binary(_) => self.read_binary(id, declared),
            ElementKind::StructRef(_) => self.read_struct_ref(id),
            ElementKind::Offset(_) => self.read_offset(id, declared),
            ElementKind::Custom(_) => self.read_custom(id, declared),
            ElementKind::Script(_) | ElementKind::ScriptElement(_) => self.read_script(id),
            ElementKind::GrammarRef(_) => Err(DecodeError::Unsupported {
                element: self.grammar.id_string(id),
                what: "decoding a referenced grammar",
            }),
            ElementKind::Grammar | ElementKind::Padding => Err(DecodeError::Invariant(format!(
                "{} can't be decoded directly",
                self.grammar.id_string(id)
            ))),
        }
    }

    fn read_structure(&mut self, id: ElementId, declared: Option<u64>) -> Result<Value, DecodeError> {
        let frame = self.frame()?;
        let grammar = self.grammar;
        let elements = grammar.effective_elements(id);
        let order = grammar.attrs(id).order;
        let budget = frame.end - frame.start;

        let mut children: Vec<Value> = Vec::new();
        let mut counts = vec![0u64; elements.len()];
        let mut consumed = 0u64;
        let mut hit_eof = false;
        let mut i = 0;

        // Keeps going once the budget is used up so trailing zero-length elements still
        // run; anything that needs bytes then stops the loop with Eof.
        while i < elements.len() {
            let candidate = elements[i];
            let attrs = grammar.attrs(candidate);
            self.source.seek(SeekFrom::Start(frame.start + consumed))?;
            let max = repeat_limit(self.eval(candidate, &attrs.repeat_max)?);
            if counts[i] >= max {
                i += 1;
                continue;
            }
            let min = self.eval(candidate, &attrs.repeat_min)?.max(0) as u64;

            let mark = self.history.len();
            match self.read(candidate) {
                Ok(v) => {
                    let zero = v.len == 0;
                    consumed += v.len;
                    counts[i] += 1;
                    children.push(v);
                    if zero && counts[i] >= min {
                        // Retrying a zero-length element would never make progress.
                        i += 1;
                    } else if order == Order::Variable {
                        i = 0;
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) if e.is_eof() => {
                    self.history.truncate(mark);
                    hit_eof = true;
                    break;
                }
                Err(e) => {
                    self.history.truncate(mark);
                    match order {
                        Order::Fixed if counts[i] >= min => i += 1,
                        Order::Fixed => return Err(e),
                        Order::Variable => {
                            trace!("[0x{:x}] {} didn't match, trying the next element: {}", frame.start + consumed, grammar.id_string(candidate), e);
                            i += 1;
                        }
                    }
                }
            }
        }

        self.source.seek(SeekFrom::Start(frame.start + consumed))?;
        for (i, &element) in elements.iter().enumerate() {
            let min = self.eval(element, &grammar.attrs(element).repeat_min)?.max(0) as u64;
            if counts[i] < min {
                if children.is_empty() && (hit_eof || budget == 0) {
                    return Err(DecodeError::Eof);
                }
                return Err(DecodeError::RepeatMinNotMet {
                    element: grammar.id_string(id),
                    child: grammar.id_string(element),
                    count: counts[i],
                    min: min as i64,
                });
            }
        }

        if let Some(declared) = declared {
            if consumed < declared {
                if declared > budget {
                    if budget == 0 {
                        return Err(DecodeError::Eof);
                    }
                    return Err(DecodeError::UnexpectedEof {
                        element: grammar.id_string(id),
                        offset: frame.start,
                        wanted: declared,
                        available: budget,
                    });
                }
                children.push(Value::leaf(grammar.padding(), frame.start + consumed, declared - consumed));
                consumed = declared;
            }
        }

        self.source.seek(SeekFrom::Start(frame.start + consumed))?;
        Ok(Value {
            len: consumed,
            children,
            ..Value::leaf(id, frame.start, 0)
        })
    }

    fn read_number(&mut self, id: ElementId, declared: Option<u64>) -> Result<Value, DecodeError> {
        let attrs = self.grammar.attrs(id);
        let len = self.fixed_length(id, declared)?;
        if len == 0 || len > 8 {
            return Err(DecodeError::UnsupportedLength {
                element: self.grammar.id_string(id),
                length: len as i64,
            });
        }

        let start = self.claim(id, len)?;
        let mut buf = [0u8; 8];
        let bytes = &mut buf[..len as usize];
        self.source.read(bytes)?;
        let order = self.byte_order(attrs.endian);
        let int = Int::from_bytes(bytes, order, attrs.signed).ok_or_else(|| DecodeError::UnsupportedLength {
            element: self.grammar.id_string(id),
            length: len as i64,
        })?;

        let mut value = Value::leaf(id, start, len);
        value.byte_order = Some(order);

        let values = self.grammar.fixed_values(id);
        if !values.is_empty() {
            let width = len as usize;
            match values.iter().position(|fv| int_matches(&int, fv.value, width)) {
                Some(m) => value.matched = Some(m),
                None if attrs.must_match => {
                    return Err(DecodeError::NoMatchingFixedValue {
                        element: self.grammar.id_string(id),
                        value: format_int(&int, attrs.display, width),
                        allowed: values
                            .iter()
                            .map(|fv| format_literal(fv.value, attrs.display, width, attrs.signed))
                            .collect(),
                    })
                }
                None => {}
            }
        }
        Ok(value)
    }

    fn read_offset(&mut self, id: ElementId, declared: Option<u64>) -> Result<Value, DecodeError> {
        let attrs = self.grammar.attrs(id);
        let len = self.fixed_length(id, declared)?;
        if len == 0 || len > 8 {
            return Err(DecodeError::UnsupportedLength {
                element: self.grammar.id_string(id),
                length: len as i64,
            });
        }
        let start = self.claim(id, len)?;
        self.source.seek(SeekFrom::Start(start + len))?;
        let mut value = Value::leaf(id, start, len);
        value.byte_order = Some(self.byte_order(attrs.endian));
        Ok(value)
    }

    fn read_string(&mut self, id: ElementId, declared: Option<u64>) -> Result<Value, DecodeError> {
        let attrs = self.grammar.attrs(id);
        let frame = self.frame()?;
        let start = self.source.tell()?;
        let available = frame.end.saturating_sub(start);

        let (len, bytes) = match attrs.string_kind {
            StringKind::ZeroTerminated => self.scan_until(id, 0, available)?,
            StringKind::Delimited(delimiter) => self.scan_until(id, delimiter, available)?,
            StringKind::FixedLength => {
                let len = self.fixed_length(id, declared)?;
                self.claim(id, len)?;
                let mut bytes = vec![0u8; len as usize];
                self.source.read(&mut bytes)?;
                (len, bytes)
            }
            StringKind::Pascal => {
                self.claim(id, 1)?;
                let mut prefix = [0u8; 1];
                self.source.read(&mut prefix)?;
                let len = 1 + prefix[0] as u64;
                if len > available {
                    return Err(self.unexpected_eof(id, start, len, available));
                }
                let mut bytes = vec![0u8; len as usize];
                bytes[0] = prefix[0];
                self.source.read(&mut bytes[1..])?;
                (len, bytes)
            }
        };

        let mut value = Value::leaf(id, start, len);
        let values = self.grammar.fixed_string_values(id);
        if !values.is_empty() {
            let text = decode_text(content_bytes(attrs.string_kind, &bytes), &attrs.encoding);
            match values.iter().position(|fv| fv.value == text) {
                Some(m) => value.matched = Some(m),
                None if attrs.must_match => {
                    return Err(DecodeError::NoMatchingFixedValue {
                        element: self.grammar.id_string(id),
                        value: text,
                        allowed: values.iter().map(|fv| fv.value.clone()).collect(),
                    })
                }
                None => {}
            }
        }
        Ok(value)
    }

    /// Read up to and including `delimiter`, without leaving the frame.
    fn scan_until(&mut self, id: ElementId, delimiter: u8, available: u64) -> Result<(u64, Vec<u8>), DecodeError> {
        let start = self.source.tell()?;
        if available == 0 {
            return Err(DecodeError::Eof);
        }
        let mut bytes = Vec::new();
        let mut chunk = [0u8; 256];
        while (bytes.len() as u64) < available {
            let n = (available - bytes.len() as u64).min(chunk.len() as u64) as usize;
            self.source.read(&mut chunk[..n])?;
            if let Some(pos) = chunk[..n].iter().position(|&b| b == delimiter) {
                bytes.extend_from_slice(&chunk[..=pos]);
                let len = bytes.len() as u64;
                self.source.seek(SeekFrom::Start(start + len))?;
                return Ok((len, bytes));
            }
            bytes.extend_from_slice(&chunk[..n]);
        }
        Err(self.unexpected_eof(id, start, available + 1, available))
    }

    fn read_binary(&mut self, id: ElementId, declared: Option<u64>) -> Result<Value, DecodeError> {
        let attrs = self.grammar.attrs(id);
        let len = self.fixed_length(id, declared)?;
        let start = self.claim(id, len)?;
        let mut value = Value::leaf(id, start, len);

        let values = self.grammar.fixed_binary_values(id);
        if values.is_empty() {
            self.source.seek(SeekFrom::Start(start + len))?;
            return Ok(value);
        }

        let mut bytes = vec![0u8; len as usize];
        self.source.read(&mut bytes)?;
        match values.iter().position(|fv| fv.value == bytes) {
            Some(m) => value.matched = Some(m),
            None if attrs.must_match => {
                return Err(DecodeError::NoMatchingFixedValue {
                    element: self.grammar.id_string(id),
                    value: format_bytes(&bytes),
                    allowed: values.iter().map(|fv| format_bytes(&fv.value)).collect(),
                })
            }
            None => {}
        }
        Ok(value)
    }

    fn read_struct_ref(&mut self, id: ElementId) -> Result<Value, DecodeError> {
        let target = self.grammar.attrs(id).target.ok_or_else(|| {
            DecodeError::Invariant(format!("{} has no target structure", self.grammar.id_string(id)))
        })?;
        let mut value = self.read(target)?;
        value.element = id;
        Ok(value)
    }

    fn read_custom(&mut self, id: ElementId, declared: Option<u64>) -> Result<Value, DecodeError> {
        let len = self.fixed_length(id, declared)?;
        let start = self.claim(id, len)?;
        self.source.seek(SeekFrom::Start(start + len))?;
        let value = Value::leaf(id, start, len);
        if self.grammar.attrs(id).target.is_some() {
            self.run_script(id, Some(&value))?;
            self.source.seek(SeekFrom::Start(start + len))?;
        }
        Ok(value)
    }

    fn read_script(&mut self, id: ElementId) -> Result<Value, DecodeError> {
        let start = self.source.tell()?;
        self.run_script(id, None)?;
        self.source.seek(SeekFrom::Start(start))?;
        Ok(Value::leaf(id, start, 0))
    }

    fn run_script(&mut self, id: ElementId, current: Option<&Value>) -> Result<(), DecodeError> {
        let grammar = self.grammar;
        let script = grammar.script(id).ok_or_else(|| {
            DecodeError::Invariant(format!("{} has no script", grammar.id_string(id)))
        })?;
        let Some(bridge) = self.bridge.as_mut() else {
            warn!("No script bridge installed, skipping {} script {:?}", script.language, script.name);
            return Ok(());
        };

        let offset = self.source.tell()?;
        let mut ctx = ScriptContext {
            grammar,
            source: &mut self.source,
            history: &self.history,
            current,
            element: id,
            dynamic_endian: &mut self.dynamic_endian,
        };
        bridge.run(script, &mut ctx).map_err(|source| DecodeError::Script {
            language: script.language.clone(),
            location: format!("{:?} in {} at offset {}", script.name, grammar.id_string(id), offset),
            source,
        })
    }

    /// The current (innermost) bounds frame.
    fn frame(&self) -> Result<ElementBounds, DecodeError> {
        self.stack
            .last()
            .copied()
            .ok_or_else(|| DecodeError::Invariant("no bounds frame".to_string()))
    }

    /// Check `wanted` bytes are available in the frame at the cursor; returns the cursor.
    fn claim(&mut self, id: ElementId, wanted: u64) -> Result<u64, DecodeError> {
        let frame = self.frame()?;
        let start = self.source.tell()?;
        let available = frame.end.saturating_sub(start);
        if wanted > available {
            if available == 0 {
                return Err(DecodeError::Eof);
            }
            return Err(self.unexpected_eof(id, start, wanted, available));
        }
        Ok(start)
    }

    fn unexpected_eof(&self, id: ElementId, offset: u64, wanted: u64, available: u64) -> DecodeError {
        DecodeError::UnexpectedEof {
            element: self.grammar.id_string(id),
            offset,
            wanted,
            available,
        }
    }

    fn fixed_length(&self, id: ElementId, declared: Option<u64>) -> Result<u64, DecodeError> {
        declared.ok_or_else(|| DecodeError::MissingLength(self.grammar.id_string(id)))
    }

    /// The element's declared length in bytes, if it has one.
    fn byte_length(&mut self, id: ElementId) -> Result<Option<u64>, DecodeError> {
        let attrs = self.grammar.attrs(id);
        let Some(length) = &attrs.length else {
            return Ok(None);
        };
        let n = self.eval(id, length)?;
        if n < 0 {
            return Err(DecodeError::NegativeLength {
                element: self.grammar.id_string(id),
                length: n,
            });
        }
        match attrs.length_unit {
            LengthUnit::Byte => Ok(Some(n as u64)),
            LengthUnit::Bit if n % 8 == 0 => Ok(Some(n as u64 / 8)),
            LengthUnit::Bit => Err(DecodeError::UnsupportedBitLength {
                element: self.grammar.id_string(id),
                bits: n,
            }),
        }
    }

    fn eval(&mut self, id: ElementId, r: &Reference) -> Result<i64, DecodeError> {
        if let Reference::Literal(n) = r {
            return Ok(*n);
        }
        let pos = self.source.tell()?;
        let mut ctx = EvalContext {
            grammar: self.grammar,
            stack: &self.stack,
            history: &self.history,
            source: &mut self.source,
            pos,
        };
        ctx.eval(r).map_err(|source| DecodeError::Eval {
            element: self.grammar.id_string(id),
            source,
        })
    }

    fn byte_order(&self, endian: Endian) -> Endianness {
        match endian {
            Endian::Little => Endianness::Little,
            Endian::Big => Endianness::Big,
            Endian::Dynamic => self.dynamic_endian,
        }
    }
}

/// Repeat maximum as a count; negative means no limit.
fn repeat_limit(max: i64) -> u64 {
    if max < 0 {
        u64::MAX
    } else {
        max as u64
    }
}
