//! Register addresses and the textual address syntax.
//!
//! Addresses are written `<prefix><channel>[.<bit>]`, for example `D2202`
//! (data memory word 2202) or `W100.1` (work area word 100, bit 1). The
//! prefix is the first non-space character, case-insensitive:
//!
//! | Prefix | Area |
//! |:------:|------|
//! | `D` | [`MemoryArea::DM`] |
//! | `W` | [`MemoryArea::WR`] |
//! | `H` | [`MemoryArea::HR`] |
//! | `A` | [`MemoryArea::AR`] |
//! | `C` | [`MemoryArea::CNT`] |
//! | `I` | [`MemoryArea::CIO`] |
//! | `T` | [`MemoryArea::TIM`] |
//!
//! After the prefix only digits and the decimal point are kept; every other
//! character is ignored. Range checks happen when a frame is encoded, not here.
//!
//! # Example
//!
//! ```
//! use omron_fins_driver::{MemoryArea, RegisterAddress};
//!
//! let addr: RegisterAddress = "W100.1".parse().unwrap();
//! assert_eq!(addr.area, MemoryArea::WR);
//! assert_eq!(addr.channel, 100);
//! assert_eq!(addr.bit, Some(1));
//!
//! assert!("X100".parse::<RegisterAddress>().is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{FinsError, Result};
use crate::memory::MemoryArea;

/// Highest channel representable in the 15-bit channel field.
pub const MAX_CHANNEL: u16 = 0x7FFF;

/// Highest bit offset within a word.
pub const MAX_BIT: u8 = 15;

/// A register location: memory area, channel (word) and optional bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterAddress {
    /// Memory area.
    pub area: MemoryArea,
    /// Word channel within the area. Validated against [`MAX_CHANNEL`] at encode time.
    pub channel: u32,
    /// Bit offset, present only for bit-level operations.
    pub bit: Option<u8>,
}

impl RegisterAddress {
    /// Creates a word address.
    pub fn word(area: MemoryArea, channel: u16) -> Self {
        Self {
            area,
            channel: u32::from(channel),
            bit: None,
        }
    }

    /// Creates a bit address.
    pub fn bit(area: MemoryArea, channel: u16, bit: u8) -> Self {
        Self {
            area,
            channel: u32::from(channel),
            bit: Some(bit),
        }
    }

    /// Returns the channel as it will be encoded.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidAddressing` if the channel exceeds [`MAX_CHANNEL`].
    pub fn wire_channel(&self) -> Result<u16> {
        u16::try_from(self.channel)
            .ok()
            .filter(|ch| *ch <= MAX_CHANNEL)
            .ok_or_else(|| {
                FinsError::invalid_addressing(format!(
                    "channel {} exceeds {}",
                    self.channel, MAX_CHANNEL
                ))
            })
    }

    /// Checks that this is a word address (no bit offset).
    pub(crate) fn expect_word(&self) -> Result<()> {
        match self.bit {
            None => Ok(()),
            Some(_) => Err(FinsError::invalid_addressing(format!(
                "{} is a bit address; word operations take a channel only",
                self
            ))),
        }
    }

    /// Returns the bit offset of a bit address.
    pub(crate) fn expect_bit(&self) -> Result<u8> {
        match self.bit {
            Some(bit) if bit <= MAX_BIT => Ok(bit),
            Some(bit) => Err(FinsError::invalid_parameter(
                "bit",
                format!("{} is out of range 0-{}", bit, MAX_BIT),
            )),
            None => Err(FinsError::invalid_addressing(format!(
                "{} has no bit offset; bit operations need <channel>.<bit>",
                self
            ))),
        }
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.area.prefix(), self.channel)?;
        if let Some(bit) = self.bit {
            write!(f, ".{}", bit)?;
        }
        Ok(())
    }
}

/// Parses a textual register address.
///
/// # Errors
///
/// - `FinsError::InvalidAddressPrefix` if the first non-space character is not
///   one of `D W H A C I T` (or the text is blank).
/// - `FinsError::InvalidAddress` if the channel or bit fragment is malformed.
///
/// # Example
///
/// ```
/// use omron_fins_driver::{resolve, MemoryArea};
///
/// let addr = resolve("D2202").unwrap();
/// assert_eq!(addr.area, MemoryArea::DM);
/// assert_eq!(addr.channel, 2202);
/// assert_eq!(addr.bit, None);
/// ```
pub fn resolve(text: &str) -> Result<RegisterAddress> {
    let trimmed = text.trim_start();
    let mut chars = trimmed.chars();
    let area = chars
        .next()
        .and_then(MemoryArea::from_prefix)
        .ok_or_else(|| FinsError::InvalidAddressPrefix {
            text: text.to_string(),
        })?;

    let digits: String = chars
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let mut parts = digits.split('.');
    let channel_part = parts.next().unwrap_or_default();
    let bit_part = parts.next();
    if parts.next().is_some() {
        return Err(FinsError::invalid_address(
            text,
            "more than one decimal point",
        ));
    }

    if channel_part.is_empty() {
        return Err(FinsError::invalid_address(text, "missing channel number"));
    }
    let channel = channel_part
        .parse::<u32>()
        .map_err(|_| FinsError::invalid_address(text, "channel number too large"))?;

    let bit = match bit_part {
        None => None,
        Some("") => return Err(FinsError::invalid_address(text, "missing bit number")),
        Some(bit) => Some(
            bit.parse::<u8>()
                .map_err(|_| FinsError::invalid_address(text, "bit number too large"))?,
        ),
    };

    Ok(RegisterAddress { area, channel, bit })
}

impl FromStr for RegisterAddress {
    type Err = FinsError;

    fn from_str(s: &str) -> Result<Self> {
        resolve(s)
    }
}

/// Anything that names a register: address text or an `(area, channel[, bit])` tuple.
///
/// # Example
///
/// ```
/// use omron_fins_driver::{IntoRegisterAddress, MemoryArea, RegisterAddress};
///
/// let a = "W100.1".into_register_address().unwrap();
/// let b = (MemoryArea::WR, 100, 1).into_register_address().unwrap();
/// assert_eq!(a, b);
/// ```
pub trait IntoRegisterAddress {
    /// Resolves `self` to a [`RegisterAddress`].
    ///
    /// # Errors
    ///
    /// Returns an address-parse error for malformed text.
    fn into_register_address(self) -> Result<RegisterAddress>;
}

impl IntoRegisterAddress for RegisterAddress {
    fn into_register_address(self) -> Result<RegisterAddress> {
        Ok(self)
    }
}

impl IntoRegisterAddress for &str {
    fn into_register_address(self) -> Result<RegisterAddress> {
        resolve(self)
    }
}

impl IntoRegisterAddress for &String {
    fn into_register_address(self) -> Result<RegisterAddress> {
        resolve(self)
    }
}

impl IntoRegisterAddress for String {
    fn into_register_address(self) -> Result<RegisterAddress> {
        resolve(&self)
    }
}

impl IntoRegisterAddress for (MemoryArea, u16) {
    fn into_register_address(self) -> Result<RegisterAddress> {
        Ok(RegisterAddress::word(self.0, self.1))
    }
}

impl IntoRegisterAddress for (MemoryArea, u16, u8) {
    fn into_register_address(self) -> Result<RegisterAddress> {
        Ok(RegisterAddress::bit(self.0, self.1, self.2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_resolve_bit_address() {
        let addr = resolve("W100.1").unwrap();
        assert_eq!(
            addr,
            RegisterAddress {
                area: MemoryArea::WR,
                channel: 100,
                bit: Some(1)
            }
        );
    }

    #[test]
    fn test_resolve_word_address() {
        let addr = resolve("D2202").unwrap();
        assert_eq!(addr, RegisterAddress::word(MemoryArea::DM, 2202));
    }

    #[test]
    fn test_resolve_all_prefixes() {
        for (text, area) in [
            ("D1", MemoryArea::DM),
            ("w1", MemoryArea::WR),
            ("H1", MemoryArea::HR),
            ("a1", MemoryArea::AR),
            ("C1", MemoryArea::CNT),
            ("i1", MemoryArea::CIO),
            ("T1", MemoryArea::TIM),
        ] {
            assert_eq!(resolve(text).unwrap().area, area, "{}", text);
        }
    }

    #[test]
    fn test_resolve_unknown_prefix() {
        let err = resolve("X100").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AddressParse);
        assert!(matches!(err, FinsError::InvalidAddressPrefix { ref text } if text == "X100"));
    }

    #[test]
    fn test_resolve_blank() {
        assert!(matches!(
            resolve("   ").unwrap_err(),
            FinsError::InvalidAddressPrefix { .. }
        ));
    }

    #[test]
    fn test_resolve_strips_noise() {
        let addr = resolve("  d 1_000 ").unwrap();
        assert_eq!(addr, RegisterAddress::word(MemoryArea::DM, 1000));

        let addr = resolve("W 12 . 07").unwrap();
        assert_eq!(addr, RegisterAddress::bit(MemoryArea::WR, 12, 7));
    }

    #[test]
    fn test_resolve_malformed() {
        for text in ["D", "D.5", "D1.2.3", "W10.", "D99999999999", "W1.300"] {
            let err = resolve(text).unwrap_err();
            assert!(
                matches!(err, FinsError::InvalidAddress { .. }),
                "{} -> {:?}",
                text,
                err
            );
        }
    }

    #[test]
    fn test_no_range_check_at_parse() {
        let addr = resolve("D40000").unwrap();
        assert_eq!(addr.channel, 40000);
        assert!(addr.wire_channel().is_err());

        let addr = resolve("W1.20").unwrap();
        assert_eq!(addr.bit, Some(20));
        assert!(addr.expect_bit().is_err());
    }

    #[test]
    fn test_wire_channel_limit() {
        assert_eq!(
            RegisterAddress::word(MemoryArea::DM, MAX_CHANNEL)
                .wire_channel()
                .unwrap(),
            MAX_CHANNEL
        );
        assert!(RegisterAddress::word(MemoryArea::DM, 0x8000)
            .wire_channel()
            .is_err());
    }

    #[test]
    fn test_expect_word_and_bit() {
        assert!(RegisterAddress::word(MemoryArea::DM, 1).expect_word().is_ok());
        assert!(RegisterAddress::bit(MemoryArea::WR, 1, 2).expect_word().is_err());
        assert_eq!(
            RegisterAddress::bit(MemoryArea::WR, 1, 2).expect_bit().unwrap(),
            2
        );
        assert!(RegisterAddress::word(MemoryArea::WR, 1).expect_bit().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for text in ["D2202", "W100.1", "C5", "T0.15"] {
            let addr = resolve(text).unwrap();
            assert_eq!(addr.to_string(), text);
        }
    }

    #[test]
    fn test_into_register_address() {
        let owned = String::from("H7");
        assert_eq!(
            (&owned).into_register_address().unwrap(),
            RegisterAddress::word(MemoryArea::HR, 7)
        );
        assert_eq!(
            (MemoryArea::HR, 7).into_register_address().unwrap(),
            RegisterAddress::word(MemoryArea::HR, 7)
        );
    }
}
