//! Register values and word packing.
//!
//! The PLC stores every word big-endian on the wire, which is the byte-swapped
//! form of the host's little-endian `u16`. 32-bit values occupy two
//! consecutive words, low word first; each word is swapped independently and
//! the two halves are joined as a little-endian 32-bit value.
//!
//! | Value | Words | Wire bytes for D100.. |
//! |-------|-------|-----------------------|
//! | `Word16(0x1234)` | `[0x1234]` | `12 34` |
//! | `Int32(0x1234_5678)` | `[0x5678, 0x1234]` | `56 78 12 34` |
//! | `Float32(1.0)` (`0x3F80_0000`) | `[0x0000, 0x3F80]` | `00 00 3F 80` |
//!
//! # Example
//!
//! ```
//! use omron_fins_driver::{RegisterValue, ValueKind};
//!
//! let words = RegisterValue::Float32(1.5).to_words().unwrap();
//! let back = RegisterValue::from_words(ValueKind::Float32, &words).unwrap();
//! assert_eq!(back, RegisterValue::Float32(1.5));
//! ```

use std::fmt;

use crate::error::{FinsError, Result};

/// Tag of a [`RegisterValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A single bit.
    Bit,
    /// One 16-bit word.
    Word16,
    /// A signed 32-bit integer in two words.
    Int32,
    /// An IEEE-754 single-precision float in two words.
    Float32,
}

impl ValueKind {
    /// Number of words a value of this kind occupies, or `None` for bits.
    pub fn word_count(self) -> Option<u16> {
        match self {
            ValueKind::Bit => None,
            ValueKind::Word16 => Some(1),
            ValueKind::Int32 | ValueKind::Float32 => Some(2),
        }
    }

    /// Maps a type name used by calling code to a value kind.
    ///
    /// Names are case-insensitive: `bool`/`bit`, `int16`/`short`/`uint16`/`word`,
    /// `int32`/`int`/`dint`, `float`/`float32`/`real`.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::UnsupportedType` for any other name.
    ///
    /// # Example
    ///
    /// ```
    /// use omron_fins_driver::ValueKind;
    ///
    /// assert_eq!(ValueKind::from_name("Int32").unwrap(), ValueKind::Int32);
    /// assert!(ValueKind::from_name("double").is_err());
    /// ```
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" | "bit" => Ok(ValueKind::Bit),
            "int16" | "i16" | "short" | "uint16" | "u16" | "word" => Ok(ValueKind::Word16),
            "int32" | "i32" | "int" | "dint" => Ok(ValueKind::Int32),
            "float" | "float32" | "f32" | "single" | "real" => Ok(ValueKind::Float32),
            _ => Err(FinsError::unsupported_type(name)),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bit => write!(f, "bit"),
            ValueKind::Word16 => write!(f, "word16"),
            ValueKind::Int32 => write!(f, "int32"),
            ValueKind::Float32 => write!(f, "float32"),
        }
    }
}

/// A value stored in PLC registers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterValue {
    /// A single bit.
    Bit(bool),
    /// One 16-bit word.
    Word16(u16),
    /// A signed 32-bit integer.
    Int32(i32),
    /// A single-precision float.
    Float32(f32),
}

impl RegisterValue {
    /// Returns the tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            RegisterValue::Bit(_) => ValueKind::Bit,
            RegisterValue::Word16(_) => ValueKind::Word16,
            RegisterValue::Int32(_) => ValueKind::Int32,
            RegisterValue::Float32(_) => ValueKind::Float32,
        }
    }

    /// Encodes a word-level value into register words; `None` for bits.
    pub fn to_words(&self) -> Option<Vec<u16>> {
        match *self {
            RegisterValue::Bit(_) => None,
            RegisterValue::Word16(word) => Some(vec![word]),
            RegisterValue::Int32(value) => Some(encode_i32(value).to_vec()),
            RegisterValue::Float32(value) => Some(encode_f32(value).to_vec()),
        }
    }

    /// Decodes a word-level value of `kind` from register words.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidParameter` for [`ValueKind::Bit`] and
    /// `FinsError::InvalidResponse` if `words` has the wrong length.
    pub fn from_words(kind: ValueKind, words: &[u16]) -> Result<Self> {
        let value = match (kind, words) {
            (ValueKind::Bit, _) => {
                return Err(FinsError::invalid_parameter(
                    "kind",
                    "bits are not stored as whole words",
                ))
            }
            (ValueKind::Word16, &[word]) => RegisterValue::Word16(word),
            (ValueKind::Int32, &[low, high]) => RegisterValue::Int32(decode_i32([low, high])),
            (ValueKind::Float32, &[low, high]) => RegisterValue::Float32(decode_f32([low, high])),
            _ => {
                return Err(FinsError::invalid_response(format!(
                    "{} needs {} words, got {}",
                    kind,
                    kind.word_count().unwrap_or_default(),
                    words.len()
                )))
            }
        };
        Ok(value)
    }
}

/// Rust types that map onto a [`RegisterValue`] kind.
///
/// Implemented for `bool`, `u16`, `i16`, `i32` and `f32`. Other types do not
/// compile; dynamic type names go through [`ValueKind::from_name`].
pub trait RegisterType: Sized {
    /// Register kind of this type.
    const KIND: ValueKind;

    /// Wraps the value.
    fn into_value(self) -> RegisterValue;

    /// Unwraps a value of the matching kind.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::UnsupportedType` if the kind differs.
    fn from_value(value: RegisterValue) -> Result<Self>;
}

fn kind_mismatch(expected: ValueKind, value: RegisterValue) -> FinsError {
    FinsError::unsupported_type(format!("{} (expected {})", value.kind(), expected))
}

impl RegisterType for bool {
    const KIND: ValueKind = ValueKind::Bit;

    fn into_value(self) -> RegisterValue {
        RegisterValue::Bit(self)
    }

    fn from_value(value: RegisterValue) -> Result<Self> {
        match value {
            RegisterValue::Bit(bit) => Ok(bit),
            other => Err(kind_mismatch(Self::KIND, other)),
        }
    }
}

impl RegisterType for u16 {
    const KIND: ValueKind = ValueKind::Word16;

    fn into_value(self) -> RegisterValue {
        RegisterValue::Word16(self)
    }

    fn from_value(value: RegisterValue) -> Result<Self> {
        match value {
            RegisterValue::Word16(word) => Ok(word),
            other => Err(kind_mismatch(Self::KIND, other)),
        }
    }
}

impl RegisterType for i16 {
    const KIND: ValueKind = ValueKind::Word16;

    fn into_value(self) -> RegisterValue {
        RegisterValue::Word16(self as u16)
    }

    fn from_value(value: RegisterValue) -> Result<Self> {
        match value {
            RegisterValue::Word16(word) => Ok(word as i16),
            other => Err(kind_mismatch(Self::KIND, other)),
        }
    }
}

impl RegisterType for i32 {
    const KIND: ValueKind = ValueKind::Int32;

    fn into_value(self) -> RegisterValue {
        RegisterValue::Int32(self)
    }

    fn from_value(value: RegisterValue) -> Result<Self> {
        match value {
            RegisterValue::Int32(v) => Ok(v),
            other => Err(kind_mismatch(Self::KIND, other)),
        }
    }
}

impl RegisterType for f32 {
    const KIND: ValueKind = ValueKind::Float32;

    fn into_value(self) -> RegisterValue {
        RegisterValue::Float32(self)
    }

    fn from_value(value: RegisterValue) -> Result<Self> {
        match value {
            RegisterValue::Float32(v) => Ok(v),
            other => Err(kind_mismatch(Self::KIND, other)),
        }
    }
}

/// Serializes words to wire bytes (big-endian per word).
pub fn words_to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_be_bytes()).collect()
}

/// Parses wire bytes into words (big-endian per word).
///
/// # Errors
///
/// Returns `FinsError::InvalidResponse` if the byte count is odd.
pub fn bytes_to_words(bytes: &[u8]) -> Result<Vec<u16>> {
    if bytes.len() % 2 != 0 {
        return Err(FinsError::invalid_response(
            "data length must be even for word conversion",
        ));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
        .collect())
}

/// Splits a 32-bit pattern into `[low, high]` words.
fn split_u32(value: u32) -> [u16; 2] {
    [(value & 0xFFFF) as u16, (value >> 16) as u16]
}

/// Joins `[low, high]` words into a 32-bit pattern.
fn join_u32(words: [u16; 2]) -> u32 {
    u32::from(words[0]) | (u32::from(words[1]) << 16)
}

/// Encodes an `i32` into two register words, low word first.
pub fn encode_i32(value: i32) -> [u16; 2] {
    split_u32(value as u32)
}

/// Decodes an `i32` from two register words, low word first.
pub fn decode_i32(words: [u16; 2]) -> i32 {
    join_u32(words) as i32
}

/// Encodes an `f32` into two register words, low word first. Bit-exact.
pub fn encode_f32(value: f32) -> [u16; 2] {
    split_u32(value.to_bits())
}

/// Decodes an `f32` from two register words, low word first. Bit-exact.
pub fn decode_f32(words: [u16; 2]) -> f32 {
    f32::from_bits(join_u32(words))
}

/// Wire byte for a bit value.
pub(crate) fn bit_to_byte(value: bool) -> u8 {
    u8::from(value)
}

/// Bit value of a wire byte.
pub(crate) fn byte_to_bit(byte: u8) -> bool {
    byte != 0
}
