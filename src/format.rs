//! Human-readable rendering of value trees.
//!
//! Values only record where they are, so rendering re-reads their bytes from the source.
//! Structures render as an indented list of their children:
//!
//! ```text
//! Pixels: (2 children)
//!   [0] Colour: (3 children)
//!     [0] Red: 0
//!     [1] Green: 1
//!     [2] Blue: 2
//!   [1] Colour: (3 children)
//!     ...
//! ```

use crate::codec::{format_int, Endianness, Int};
use crate::error::SourceError;
use crate::grammar::{ElementKind, StringKind};
use crate::resolve::ResolvedGrammar;
use crate::source::ByteSource;
use crate::value::Value;
use encoding_rs::Encoding;
use std::fmt::Write;

/// Render `value` and its children.
pub fn format_value(
    grammar: &ResolvedGrammar,
    source: &mut dyn ByteSource,
    value: &Value,
) -> Result<String, SourceError> {
    format_at(grammar, source, value, 0)
}

fn format_at(
    grammar: &ResolvedGrammar,
    source: &mut dyn ByteSource,
    value: &Value,
    depth: usize,
) -> Result<String, SourceError> {
    let element = grammar.element(value.element);
    let attrs = grammar.attrs(value.element);
    let s = match &element.kind {
        ElementKind::Grammar => {
            let children = format_children(grammar, source, value, depth + 1)?;
            format!("{}: {}", element.name, children)
        }
        ElementKind::Structure(_) | ElementKind::StructRef(_) => {
            format_children(grammar, source, value, depth + 1)?
        }
        ElementKind::Number(_) | ElementKind::Offset(_) => {
            let signed = matches!(element.kind, ElementKind::Number(_)) && attrs.signed;
            let bytes = read_value(source, value)?;
            let order = value.byte_order.unwrap_or(Endianness::Little);
            let mut s = match Int::from_bytes(&bytes, order, signed) {
                Some(int) => format_int(&int, attrs.display, bytes.len()),
                None => format_bytes(&bytes),
            };
            if let Some(fv) = value.matched.and_then(|m| grammar.fixed_values(value.element).get(m)) {
                if !fv.name.is_empty() {
                    let _ = write!(s, " ({})", fv.name);
                }
            }
            s
        }
        ElementKind::String(_) => {
            let bytes = read_value(source, value)?;
            decode_text(content_bytes(attrs.string_kind, &bytes), &attrs.encoding)
        }
        ElementKind::Binary(_) | ElementKind::Custom(_) => {
            let bytes = read_value(source, value)?;
            let mut s = format_bytes_short(&bytes);
            let _ = match value.matched.and_then(|m| grammar.fixed_binary_values(value.element).get(m)) {
                Some(fv) => write!(s, " ({})", fv.name),
                None => write!(s, " ({} bytes)", bytes.len()),
            };
            s
        }
        ElementKind::Padding => format!("<padding len:{}>", value.len),
        ElementKind::Script(_) | ElementKind::ScriptElement(_) => "<script ran>".to_string(),
        ElementKind::GrammarRef(g) => format!("<grammar {}>", g.filename),
    };
    Ok(s)
}

fn format_children(
    grammar: &ResolvedGrammar,
    source: &mut dyn ByteSource,
    value: &Value,
    indent: usize,
) -> Result<String, SourceError> {
    let pad = "  ".repeat(indent);
    let mut out = format!("({} children)\n", value.children.len());
    for (i, child) in value.children.iter().enumerate() {
        let text = format_at(grammar, source, child, indent)?;
        let _ = writeln!(out, "{}[{}] {}: {}", pad, i, child.name(grammar), text.trim());
    }
    Ok(out)
}

fn read_value(source: &mut dyn ByteSource, value: &Value) -> Result<Vec<u8>, SourceError> {
    let mut buf = vec![0u8; value.len as usize];
    if !buf.is_empty() {
        source.read_at(&mut buf, value.offset)?;
    }
    Ok(buf)
}

/// The text of a string value: without its terminator or length prefix.
pub(crate) fn content_bytes(kind: StringKind, bytes: &[u8]) -> &[u8] {
    match kind {
        StringKind::ZeroTerminated => bytes.strip_suffix(&[0]).unwrap_or(bytes),
        StringKind::Delimited(d) => bytes.strip_suffix(&[d]).unwrap_or(bytes),
        StringKind::Pascal => bytes.get(1..).unwrap_or(&[]),
        StringKind::FixedLength => bytes,
    }
}

/// Decode `bytes` in the encoding named `label` (a WHATWG label such as `UTF-8` or
/// `ISO-8859-1`). Unknown labels fall back to lossy UTF-8.
pub fn decode_text(bytes: &[u8], label: &str) -> String {
    match Encoding::for_label(label.trim().as_bytes()) {
        Some(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Lower-case hex, no separators.
pub fn format_bytes(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{:02x}", b);
        s
    })
}

/// Hex of up to 8 bytes, or the first 6 followed by `...`.
fn format_bytes_short(bytes: &[u8]) -> String {
    if bytes.len() <= 8 {
        format_bytes(bytes)
    } else {
        format_bytes(&bytes[..6]) + "..."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_terminators() {
        assert_eq!(content_bytes(StringKind::ZeroTerminated, b"abc\0"), b"abc");
        assert_eq!(content_bytes(StringKind::ZeroTerminated, b"abc"), b"abc");
        assert_eq!(content_bytes(StringKind::Delimited(b';'), b"ab;"), b"ab");
        assert_eq!(content_bytes(StringKind::Pascal, b"\x02ab"), b"ab");
        assert_eq!(content_bytes(StringKind::Pascal, b""), b"");
        assert_eq!(content_bytes(StringKind::FixedLength, b"ab\0"), b"ab\0");
    }

    #[test]
    fn decodes_with_encoding() {
        assert_eq!(decode_text(b"caf\xc3\xa9", "UTF-8"), "caf\u{e9}");
        assert_eq!(decode_text(b"caf\xe9", "ISO-8859-1"), "caf\u{e9}");
        assert_eq!(decode_text(b"abc", "no-such-encoding"), "abc");
    }

    #[test]
    fn hex_bytes() {
        assert_eq!(format_bytes(&[0xde, 0xad, 0x01]), "dead01");
        assert_eq!(format_bytes_short(&[1, 2, 3, 4, 5, 6, 7, 8]), "0102030405060708");
        assert_eq!(format_bytes_short(&[1, 2, 3, 4, 5, 6, 7, 8, 9]), "010203040506...");
    }
}
