//! Symbolic lengths and repeat counts, parsed with PEST.
//!
//! A [`Reference`] is a literal integer or one of `remaining`, `unlimited`, `prev.<name>`.
//! Parsing happens when the grammar is built; malformed text is a
//! [`GrammarError::InvalidReference`], never a decode error. Evaluation lives in
//! [`crate::eval`].

use crate::error::GrammarError;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;
use std::fmt;
use std::str::FromStr;

#[derive(PestParser)]
#[grammar = "reference.pest"]
struct ReferenceParser;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    Literal(i64),
    /// Bytes left in the nearest enclosing structure.
    Remaining,
    /// No limit.
    Unlimited,
    /// The integer value of the most recently decoded Number with this name.
    Prev(String),
}

impl Reference {
    pub fn is_literal(&self) -> bool {
        matches!(self, Reference::Literal(_))
    }
}

impl From<i64> for Reference {
    fn from(n: i64) -> Self {
        Reference::Literal(n)
    }
}

impl From<i32> for Reference {
    fn from(n: i32) -> Self {
        Reference::Literal(n as i64)
    }
}

impl From<u32> for Reference {
    fn from(n: u32) -> Self {
        Reference::Literal(n as i64)
    }
}

impl FromStr for Reference {
    type Err = GrammarError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| GrammarError::InvalidReference {
            text: text.to_string(),
            reason,
        };
        let pair = ReferenceParser::parse(Rule::reference, text)
            .map_err(|e| invalid(e.variant.message().into_owned()))?
            .next()
            .and_then(|p| p.into_inner().next())
            .ok_or_else(|| invalid("empty reference".to_string()))?;

        match pair.as_rule() {
            Rule::unlimited => Ok(Reference::Unlimited),
            Rule::remaining => Ok(Reference::Remaining),
            Rule::prev => {
                let name = pair
                    .into_inner()
                    .next()
                    .map(|p| p.as_str().trim().to_string())
                    .unwrap_or_default();
                if name.is_empty() {
                    return Err(invalid("missing element name after \"prev.\"".to_string()));
                }
                Ok(Reference::Prev(name))
            }
            Rule::integer => {
                let n = build_integer(pair).map_err(invalid)?;
                i64::try_from(n)
                    .map(Reference::Literal)
                    .map_err(|_| invalid("out of range".to_string()))
            }
            rule => Err(invalid(format!("unexpected {:?}", rule))),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Literal(n) => write!(f, "{}", n),
            Reference::Remaining => write!(f, "remaining"),
            Reference::Unlimited => write!(f, "unlimited"),
            Reference::Prev(name) => write!(f, "prev.{}", name),
        }
    }
}

/// Parse an integer literal: optional sign, then decimal, `0x` hex or `0b` binary.
pub fn parse_integer(text: &str) -> Result<i128, GrammarError> {
    let invalid = |reason: String| GrammarError::InvalidFixedValue {
        text: text.to_string(),
        reason,
    };
    let pair = ReferenceParser::parse(Rule::literal, text)
        .map_err(|e| invalid(e.variant.message().into_owned()))?
        .next()
        .and_then(|p| p.into_inner().next())
        .ok_or_else(|| invalid("empty literal".to_string()))?;
    build_integer(pair).map_err(invalid)
}

/// Parse a hex byte string such as `0x89504e47` or `de ad be ef`.
pub fn parse_bytes(text: &str) -> Result<Vec<u8>, GrammarError> {
    let invalid = |reason: String| GrammarError::InvalidFixedValue {
        text: text.to_string(),
        reason,
    };
    let pair = ReferenceParser::parse(Rule::bytes, text)
        .map_err(|e| invalid(e.variant.message().into_owned()))?
        .next()
        .ok_or_else(|| invalid("empty byte string".to_string()))?;
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::byte)
        .map(|p| u8::from_str_radix(p.as_str(), 16).map_err(|e| invalid(e.to_string())))
        .collect()
}

fn build_integer(pair: Pair<Rule>) -> Result<i128, String> {
    let mut negative = false;
    let mut magnitude = None;
    for inner in pair.into_inner() {
        let s = inner.as_str();
        let parsed = match inner.as_rule() {
            Rule::sign => {
                negative = s == "-";
                continue;
            }
            Rule::hex => i128::from_str_radix(&s[2..], 16),
            Rule::bin => i128::from_str_radix(&s[2..], 2),
            Rule::dec => s.parse::<i128>(),
            _ => continue,
        };
        magnitude = Some(parsed.map_err(|e| e.to_string())?);
    }
    let magnitude = magnitude.ok_or("missing digits")?;
    Ok(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(s: &str) -> Reference {
        s.parse().expect("reference")
    }

    #[test]
    fn symbolic_forms() {
        assert_eq!(r("remaining"), Reference::Remaining);
        assert_eq!(r("Remaining"), Reference::Remaining);
        assert_eq!(r(" unlimited "), Reference::Unlimited);
        assert_eq!(r("prev.length"), Reference::Prev("length".to_string()));
        assert_eq!(r("prev.IP Header Length"), Reference::Prev("IP Header Length".to_string()));
    }

    #[test]
    fn literals() {
        assert_eq!(r("4"), Reference::Literal(4));
        assert_eq!(r("-1"), Reference::Literal(-1));
        assert_eq!(r("0x10"), Reference::Literal(16));
        assert_eq!(r("0b101"), Reference::Literal(5));
        assert_eq!(r("9223372036854775807"), Reference::Literal(i64::MAX));
    }

    #[test]
    fn invalid_references() {
        for text in ["", "abc", "prev.", "4 bytes", "0xzz", "99999999999999999999"] {
            let result: Result<Reference, _> = text.parse();
            assert!(
                matches!(result, Err(GrammarError::InvalidReference { .. })),
                "{:?} should not parse, got {:?}",
                text,
                result
            );
        }
    }

    #[test]
    fn display_round_trips() {
        for text in ["remaining", "unlimited", "prev.x", "12", "-3"] {
            assert_eq!(r(text).to_string(), text);
        }
    }

    #[test]
    fn integer_literals() {
        assert_eq!(parse_integer("0xffffffffffffffff").expect("int"), u64::MAX as i128);
        assert_eq!(parse_integer("-128").expect("int"), -128);
        assert!(parse_integer("remaining").is_err());
    }

    #[test]
    fn byte_strings() {
        assert_eq!(parse_bytes("0x89504e47").expect("bytes"), vec![0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(parse_bytes("de ad").expect("bytes"), vec![0xde, 0xad]);
        assert_eq!(parse_bytes("").expect("bytes"), Vec::<u8>::new());
        assert!(parse_bytes("abc").is_err());
    }
}
