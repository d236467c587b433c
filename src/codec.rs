//! Integer codec: byte order, signedness, native containers and display formatting.
//!
//! Numbers of 1 to 8 bytes are read into the narrowest native container that fits
//! (8/16/32/64-bit). Fixed-value comparison works on the raw bit pattern of the
//! value's width, so `-1` and `0xff` both match the byte `ff`.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Big,
    Little,
}

/// Numeric display base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Display {
    Binary,
    Dec,
    Hex,
}

impl Display {
    pub fn base(self) -> u32 {
        match self {
            Display::Binary => 2,
            Display::Dec => 10,
            Display::Hex => 16,
        }
    }
}

/// A decoded integer in its native container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Int {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
}

impl Int {
    /// Decode `bytes` (1 to 8 of them). Returns None for any other width.
    pub fn from_bytes(bytes: &[u8], order: Endianness, signed: bool) -> Option<Int> {
        let n = bytes.len();
        if n == 0 || n > 8 {
            return None;
        }
        let int = if signed {
            let v = match order {
                Endianness::Big => BigEndian::read_int(bytes, n),
                Endianness::Little => LittleEndian::read_int(bytes, n),
            };
            match n {
                1 => Int::I8(v as i8),
                2 => Int::I16(v as i16),
                3 | 4 => Int::I32(v as i32),
                _ => Int::I64(v),
            }
        } else {
            let v = match order {
                Endianness::Big => BigEndian::read_uint(bytes, n),
                Endianness::Little => LittleEndian::read_uint(bytes, n),
            };
            match n {
                1 => Int::U8(v as u8),
                2 => Int::U16(v as u16),
                3 | 4 => Int::U32(v as u32),
                _ => Int::U64(v),
            }
        };
        Some(int)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Int::I8(_) | Int::I16(_) | Int::I32(_) | Int::I64(_))
    }

    /// Container width in bits.
    pub fn bits(&self) -> u32 {
        match self {
            Int::I8(_) | Int::U8(_) => 8,
            Int::I16(_) | Int::U16(_) => 16,
            Int::I32(_) | Int::U32(_) => 32,
            Int::I64(_) | Int::U64(_) => 64,
        }
    }

    /// The value as i64. Unsigned 64-bit values above `i64::MAX` wrap.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Int::I8(x) => x as i64,
            Int::I16(x) => x as i64,
            Int::I32(x) => x as i64,
            Int::I64(x) => x,
            Int::U8(x) => x as i64,
            Int::U16(x) => x as i64,
            Int::U32(x) => x as i64,
            Int::U64(x) => x as i64,
        }
    }

    /// The value as u64. Negative values are sign-extended.
    pub fn as_u64(&self) -> u64 {
        match *self {
            Int::U8(x) => x as u64,
            Int::U16(x) => x as u64,
            Int::U32(x) => x as u64,
            Int::U64(x) => x,
            _ => self.as_i64() as u64,
        }
    }

    pub fn as_i128(&self) -> i128 {
        if self.is_signed() {
            self.as_i64() as i128
        } else {
            self.as_u64() as i128
        }
    }

    /// The low `width` bytes of the value.
    pub fn pattern(&self, width: usize) -> u64 {
        self.as_u64() & mask(width)
    }
}

fn mask(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (width * 8)) - 1
    }
}

/// The bit pattern of `literal` truncated to `width` bytes, or None if the literal
/// is representable neither as a signed nor as an unsigned integer of that width.
pub fn literal_pattern(literal: i128, width: usize) -> Option<u64> {
    let bits = (width.clamp(1, 8) * 8) as u32;
    let min = -(1i128 << (bits - 1));
    let max = (1i128 << bits) - 1;
    if literal < min || literal > max {
        return None;
    }
    Some((literal as u64) & mask(width))
}

/// True if the fixed value `literal` matches `value` of `width` bytes.
pub fn int_matches(value: &Int, literal: i128, width: usize) -> bool {
    literal_pattern(literal, width) == Some(value.pattern(width))
}

/// Format an integer of `width` bytes.
///
/// Decimal honours signedness; hex is `0x`-prefixed and zero-padded to the width,
/// negative values shown as their two's complement; binary is zero-padded without prefix.
pub fn format_int(value: &Int, display: Display, width: usize) -> String {
    let width = width.clamp(1, 8);
    match display {
        Display::Dec => {
            if value.is_signed() {
                value.as_i64().to_string()
            } else {
                value.as_u64().to_string()
            }
        }
        Display::Hex => format!("0x{:0w$x}", value.pattern(width), w = width * 2),
        Display::Binary => format!("{:0w$b}", value.pattern(width), w = width * 8),
    }
}

/// Format a fixed-value literal the way a decoded value of `width` bytes would be shown.
pub fn format_literal(literal: i128, display: Display, width: usize, signed: bool) -> String {
    match literal_pattern(literal, width) {
        Some(pattern) => {
            let mut bytes = pattern.to_le_bytes();
            let width = width.clamp(1, 8);
            bytes[width..].iter_mut().for_each(|b| *b = 0);
            match Int::from_bytes(&bytes[..width], Endianness::Little, signed) {
                Some(int) => format_int(&int, display, width),
                None => literal.to_string(),
            }
        }
        None => literal.to_string(),
    }
}
