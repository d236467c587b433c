//! # dsector: grammar-driven binary decoder
//!
//! Describe a binary file format as a grammar of elements, then decode any file into a
//! tree of values that record where each element instance sits in the input.
//!
//! ## Grammar structure
//!
//! - **Structure**: ordered (or variable-order) children, each with repeat bounds
//! - **Number**: 1 to 8 byte integers, any byte order (including one chosen at decode time)
//! - **String**: zero-terminated, delimiter-terminated, fixed-length or Pascal
//! - **Binary**, **Custom**, **Offset**: raw spans
//! - **StructRef**: decode another structure in place
//! - **Script**, **ScriptElement**: hand control to a [`ScriptBridge`]
//!
//! Elements may `extends` another element of the same kind and inherit everything they
//! don't set themselves. Lengths and repeat counts are [`Reference`]s: a literal,
//! `remaining`, `unlimited`, or `prev.<name>` (the value of an earlier Number).
//!
//! ## Example
//!
//! ```
//! use dsector::{format_value, Decoder, Element, Grammar, ReaderSource, Reference, ResolvedGrammar};
//!
//! let mut g = Grammar::new("Pixels");
//! let colour = g.add(Element::structure("Colour").repeat(1, Reference::Unlimited));
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
//! let text = format_value(&grammar, decoder.source_mut(), &root).unwrap();
//! assert!(text.starts_with("Pixels: (2 children)"));
//! ```

pub mod codec;
pub mod decoder;
pub mod error;
pub mod eval;
pub mod format;
pub mod grammar;
pub mod reference;
pub mod resolve;
pub mod script;
pub mod source;
pub mod validate;
pub mod value;
pub mod walk;

pub use codec::{Display, Endianness, Int};
pub use decoder::{Decoder, DecoderOptions, ElementBounds};
pub use error::{DecodeError, EvalError, GrammarError, GrammarErrors, SourceError};
pub use format::format_value;
pub use grammar::{
    Element, ElementId, ElementKind, ElementRef, Endian, Grammar, LengthUnit, Order, StringKind,
};
pub use reference::Reference;
pub use resolve::{Attrs, ResolvedGrammar};
pub use script::{ScriptBridge, ScriptContext};
pub use source::{ByteSource, ReaderSource};
pub use value::Value;
