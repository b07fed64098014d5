//! PLC memory areas and their FINS area codes.
//!
//! The area code on the wire depends on the [`MemoryArea`] and on whether a
//! word or a single bit is addressed.
//!
//! # Memory Areas Overview
//!
//! | Area | Prefix | Description | Word code | Bit code |
//! |------|:------:|-------------|:---------:|:--------:|
//! | CIO | `I` | Core I/O - inputs, outputs, internal relays | `0xB0` | `0x30` |
//! | WR | `W` | Work area - temporary work bits/words | `0xB1` | `0x31` |
//! | HR | `H` | Holding area - retentive bits/words | `0xB2` | `0x32` |
//! | AR | `A` | Auxiliary Relay - system status/control | `0xB3` | `0x33` |
//! | DM | `D` | Data Memory - numeric data storage | `0x82` | `0x02` |
//! | CNT | `C` | Counter present values / completion flags | `0x89` | `0x09` |
//! | TIM | `T` | Timer present values / completion flags | `0x89` | `0x09` |
//!
//! Counters and timers share one area code; counters are told apart by
//! bit 15 of the channel field (see [`MemoryArea::channel_flag`]).
//!
//! # Example
//!
//! ```
//! use omron_fins_driver::{Access, MemoryArea};
//!
//! assert_eq!(MemoryArea::DM.code(Access::Word), 0x82);
//! assert_eq!(MemoryArea::CIO.code(Access::Bit), 0x30);
//! assert_eq!(MemoryArea::from_prefix('w'), Some(MemoryArea::WR));
//! assert_eq!(MemoryArea::DM.to_string(), "DM");
//! ```

/// Access granularity of a memory operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Whole 16-bit words.
    Word,
    /// Individual bits.
    Bit,
}

/// A PLC memory area reachable through FINS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryArea {
    /// Core I/O, address prefix `I`.
    CIO,
    /// Work relays.
    WR,
    /// Holding relays, kept across power cycles.
    HR,
    /// Auxiliary relays, system flags.
    AR,
    /// DM (Data Memory) area - data storage.
    DM,
    /// CNT (Counter) area.
    CNT,
    /// TIM (Timer) area.
    TIM,
}

impl MemoryArea {
    /// All memory areas, in prefix-table order.
    pub const ALL: [MemoryArea; 7] = [
        MemoryArea::DM,
        MemoryArea::WR,
        MemoryArea::HR,
        MemoryArea::AR,
        MemoryArea::CNT,
        MemoryArea::CIO,
        MemoryArea::TIM,
    ];

    /// Returns the FINS area code for the given access granularity.
    pub fn code(self, access: Access) -> u8 {
        match access {
            Access::Word => self.word_code(),
            Access::Bit => self.bit_code(),
        }
    }

    /// Area code used when addressing whole words.
    pub(crate) fn word_code(self) -> u8 {
        match self {
            MemoryArea::CIO => 0xB0,
            MemoryArea::WR => 0xB1,
            MemoryArea::HR => 0xB2,
            MemoryArea::AR => 0xB3,
            MemoryArea::DM => 0x82,
            MemoryArea::CNT | MemoryArea::TIM => 0x89,
        }
    }

    /// Area code used when addressing single bits.
    pub(crate) fn bit_code(self) -> u8 {
        match self {
            MemoryArea::CIO => 0x30,
            MemoryArea::WR => 0x31,
            MemoryArea::HR => 0x32,
            MemoryArea::AR => 0x33,
            MemoryArea::DM => 0x02,
            MemoryArea::CNT | MemoryArea::TIM => 0x09,
        }
    }

    /// Returns the value added to the high channel byte for this area.
    ///
    /// Counters use bit 15 of the channel field as a type flag, which is
    /// why channels are limited to 15 bits.
    pub(crate) fn channel_flag(self) -> u8 {
        match self {
            MemoryArea::CNT => 0x80,
            _ => 0x00,
        }
    }

    /// Maps an address prefix character (case-insensitive) to a memory area.
    ///
    /// # Example
    ///
    /// ```
    /// use omron_fins_driver::MemoryArea;
    ///
    /// assert_eq!(MemoryArea::from_prefix('D'), Some(MemoryArea::DM));
    /// assert_eq!(MemoryArea::from_prefix('i'), Some(MemoryArea::CIO));
    /// assert_eq!(MemoryArea::from_prefix('X'), None);
    /// ```
    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix.to_ascii_uppercase() {
            'D' => Some(MemoryArea::DM),
            'W' => Some(MemoryArea::WR),
            'H' => Some(MemoryArea::HR),
            'A' => Some(MemoryArea::AR),
            'C' => Some(MemoryArea::CNT),
            'I' => Some(MemoryArea::CIO),
            'T' => Some(MemoryArea::TIM),
            _ => None,
        }
    }

    /// Returns the address prefix character of this area.
    pub fn prefix(self) -> char {
        match self {
            MemoryArea::DM => 'D',
            MemoryArea::WR => 'W',
            MemoryArea::HR => 'H',
            MemoryArea::AR => 'A',
            MemoryArea::CNT => 'C',
            MemoryArea::CIO => 'I',
            MemoryArea::TIM => 'T',
        }
    }
}

impl std::fmt::Display for MemoryArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryArea::CIO => write!(f, "CIO"),
            MemoryArea::WR => write!(f, "WR"),
            MemoryArea::HR => write!(f, "HR"),
            MemoryArea::AR => write!(f, "AR"),
            MemoryArea::DM => write!(f, "DM"),
            MemoryArea::CNT => write!(f, "CNT"),
            MemoryArea::TIM => write!(f, "TIM"),
        }
    }
}
