//! Error types for grammar construction, reference evaluation, byte sources and decoding.
//!
//! Decode errors fall into three groups:
//!
//! - **End of data**: [`DecodeError::Eof`] is a clean end (a structure stops its loop on it),
//!   [`DecodeError::UnexpectedEof`] is a span that could only partially be satisfied.
//! - **Validation**: fixed-value mismatch, repeat minimum, length evaluation, unsupported
//!   lengths. Recoverable under variable order, or under fixed order once the minimum is met.
//! - **Fatal**: invariant violations, depth/value limits, script and I/O failures. Never retried.

use std::fmt;

/// Errors raised by a [`crate::source::ByteSource`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Nothing could be read: the cursor is at or past the end of the data.
    #[error("EOF")]
    Eof,
    /// Some, but not all, of the requested bytes were available.
    #[error("unexpected EOF: read {got} of {wanted} bytes")]
    UnexpectedEof { got: usize, wanted: usize },
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

/// A problem with the grammar itself, found while building or resolving it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("{element} can't extend {target}: elements must be of the same kind")]
    IncompatibleExtends { element: String, target: String },
    #[error("{0} is not a structure and can't have children")]
    NotAStructure(String),
    #[error("invalid reference {text:?}: {reason}")]
    InvalidReference { text: String, reason: String },
    #[error("invalid fixed value {text:?}: {reason}")]
    InvalidFixedValue { text: String, reason: String },
    #[error("{element}: unresolved reference to {reference:?}")]
    UnresolvedReference { element: String, reference: String },
    #[error("{element}: {reference:?} must refer to a {expected}, found {found}")]
    WrongTarget {
        element: String,
        reference: String,
        expected: &'static str,
        found: String,
    },
    #[error("duplicate id {id}: {first} and {second}")]
    DuplicateId { id: u32, first: String, second: String },
    #[error("{0}: extends cycle")]
    ExtendsCycle(String),
    #[error("grammar has no start element")]
    MissingStart,
    #[error("{0}: no length specified")]
    MissingLength(String),
}

/// All problems found while resolving a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GrammarErrors(pub Vec<GrammarError>);

impl GrammarErrors {
    pub fn push(&mut self, err: GrammarError) {
        self.0.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GrammarError> {
        self.0.iter()
    }

    /// Ok(()) if nothing was recorded.
    pub fn into_result(self) -> Result<(), GrammarErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for GrammarErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "no errors"),
            [one] => write!(f, "{}", one),
            many => {
                write!(f, "{} grammar errors:", many.len())?;
                for err in many {
                    write!(f, "\n  {}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for GrammarErrors {}

impl From<GrammarError> for GrammarErrors {
    fn from(err: GrammarError) -> Self {
        GrammarErrors(vec![err])
    }
}

/// Failure evaluating a [`crate::reference::Reference`] against decoder state.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("\"remaining\" used outside of any structure")]
    NoEnclosingStructure,
    #[error("no previous element named {0:?} found")]
    NoSuchPreviousElement(String),
    #[error("previous element {0:?} must be a Number")]
    NotANumber(String),
    #[error("bit length {0} of the enclosing structure is not a multiple of 8")]
    UnalignedBitLength(i64),
    #[error("length of {0} can't be evaluated")]
    Unevaluable(String),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Errors produced while decoding a byte source against a resolved grammar.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Clean end of data within the current bounds.
    #[error("EOF")]
    Eof,
    #[error("{element}: unexpected EOF at offset {offset}: wanted {wanted} bytes, {available} available")]
    UnexpectedEof {
        element: String,
        offset: u64,
        wanted: u64,
        available: u64,
    },
    #[error("{element}: {value:?} does not match any of the fixed values {allowed:?}")]
    NoMatchingFixedValue {
        element: String,
        value: String,
        allowed: Vec<String>,
    },
    #[error("{element}: found {count} of {child}, want at least {min}")]
    RepeatMinNotMet {
        element: String,
        child: String,
        count: u64,
        min: i64,
    },
    #[error("{element}: unsupported bit length {bits}, must be a multiple of 8")]
    UnsupportedBitLength { element: String, bits: i64 },
    #[error("{element}: unsupported length {length}")]
    UnsupportedLength { element: String, length: i64 },
    #[error("{element}: negative length {length}")]
    NegativeLength { element: String, length: i64 },
    #[error("{0}: no length specified")]
    MissingLength(String),
    #[error("{element}: {source}")]
    Eval {
        element: String,
        #[source]
        source: EvalError,
    },
    #[error("{language} script {location}: {source}")]
    Script {
        language: String,
        location: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("{element}: {what} is not supported")]
    Unsupported { element: String, what: &'static str },
    #[error("exceeded max decoding depth of {0}")]
    StackOverflow(usize),
    #[error("exceeded max value count of {0}")]
    ValueLimitExceeded(usize),
    #[error("invariant violated: {0}")]
    Invariant(String),
    #[error("source: {0}")]
    Source(SourceError),
}

impl From<SourceError> for DecodeError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Eof => DecodeError::Eof,
            other => DecodeError::Source(other),
        }
    }
}

impl DecodeError {
    /// True for a clean end of data.
    pub fn is_eof(&self) -> bool {
        matches!(self, DecodeError::Eof)
    }

    /// True if the error must abort the whole decode rather than let a structure try
    /// another element.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DecodeError::Invariant(_)
                | DecodeError::StackOverflow(_)
                | DecodeError::ValueLimitExceeded(_)
                | DecodeError::Script { .. }
                | DecodeError::Source(SourceError::Io(_))
        )
    }
}
