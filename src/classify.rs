//! Classification of FINS header errors and end codes.
//!
//! A FINS/TCP reply can fail at two levels:
//!
//! | Level | Where | Meaning |
//! |-------|-------|---------|
//! | Header | byte 15 of an error frame (byte 11 == 3) | the envelope itself was rejected |
//! | End code | bytes 28-29 (main, sub) | the command was received but failed |
//!
//! Header errors are never retryable. End codes are grouped by main code into
//! an [`EndCodeCategory`] so callers can tell transient network trouble from
//! configuration mistakes.
//!
//! # Example
//!
//! ```
//! use omron_fins_driver::{EndCode, EndCodeCategory};
//!
//! assert!(EndCode::new(0x00, 0x00).is_success());
//! assert!(EndCode::new(0x00, 0x40).is_success());
//!
//! let code = EndCode::new(0x11, 0x04);
//! assert!(!code.is_success());
//! assert_eq!(code.category(), EndCodeCategory::Parameter);
//! assert!(!code.is_retryable());
//! ```

use std::fmt;

use crate::error::{FinsError, Result};

/// Sub code accepted with main code 0x00: the PLC has an alarm but the data is valid.
pub const SUB_CODE_PLC_ALARM: u8 = 0x40;

/// Header-level error reported by the FINS/TCP envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderError {
    /// 0x01: the header is not FINS.
    NotFins,
    /// 0x02: the data length is too long.
    DataTooLong,
    /// 0x03: the command is not supported.
    UnsupportedCommand,
    /// Any other non-zero code.
    Unknown(u8),
}

impl HeaderError {
    /// Maps a header error byte to a [`HeaderError`]; `0x00` means no error.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => None,
            0x01 => Some(Self::NotFins),
            0x02 => Some(Self::DataTooLong),
            0x03 => Some(Self::UnsupportedCommand),
            other => Some(Self::Unknown(other)),
        }
    }

    /// Returns the wire code of this error.
    pub fn code(self) -> u8 {
        match self {
            Self::NotFins => 0x01,
            Self::DataTooLong => 0x02,
            Self::UnsupportedCommand => 0x03,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotFins => "header is not FINS",
            Self::DataTooLong => "data length too long",
            Self::UnsupportedCommand => "command not supported",
            Self::Unknown(_) => "unknown header error",
        };
        write!(f, "{} (0x{:02X})", text, self.code())
    }
}

/// Checks a header error byte.
///
/// # Errors
///
/// Returns `FinsError::Framing` for any non-zero code.
pub fn check_header(code: u8) -> Result<()> {
    match HeaderError::from_code(code) {
        None => Ok(()),
        Some(error) => Err(FinsError::Framing { error }),
    }
}

/// Group of end codes sharing a main code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndCodeCategory {
    /// 0x00: normal completion, alarm-with-data, or service cancelled.
    Normal,
    /// 0x01: local node error.
    LocalNode,
    /// 0x02: destination node error.
    DestinationNode,
    /// 0x03: communications controller or CPU unit error.
    Controller,
    /// 0x04: command not supported by this unit.
    ServiceUnsupported,
    /// 0x05: routing table error.
    Routing,
    /// 0x10: command format error.
    CommandFormat,
    /// 0x11: parameter or address error.
    Parameter,
    /// 0x20-0x26: command could not be executed in the current PLC state.
    NotExecutable,
    /// 0x30: access right error.
    Access,
    /// 0x40: service aborted.
    Abort,
    /// Any other main code.
    Unknown,
}

impl EndCodeCategory {
    /// Returns the category for a main code. Bit 7 (relay error flag) is ignored.
    pub fn from_main(main: u8) -> Self {
        match main & 0x7F {
            0x00 => Self::Normal,
            0x01 => Self::LocalNode,
            0x02 => Self::DestinationNode,
            0x03 => Self::Controller,
            0x04 => Self::ServiceUnsupported,
            0x05 => Self::Routing,
            0x10 => Self::CommandFormat,
            0x11 => Self::Parameter,
            0x20..=0x26 => Self::NotExecutable,
            0x30 => Self::Access,
            0x40 => Self::Abort,
            _ => Self::Unknown,
        }
    }

    /// Returns whether this category is a network or routing failure (main 0x01-0x05).
    pub fn is_network(self) -> bool {
        matches!(
            self,
            Self::LocalNode
                | Self::DestinationNode
                | Self::Controller
                | Self::ServiceUnsupported
                | Self::Routing
        )
    }
}

/// A (main, sub) end code returned by the PLC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndCode {
    /// Main response code.
    pub main: u8,
    /// Sub response code.
    pub sub: u8,
}

/// Success flag plus category for one end code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorOutcome {
    /// Whether the command can be treated as successful.
    pub succeeded: bool,
    /// Category of the end code.
    pub category: EndCodeCategory,
}

impl EndCode {
    /// Creates a new end code.
    pub fn new(main: u8, sub: u8) -> Self {
        Self { main, sub }
    }

    /// Returns whether the end code means the command succeeded.
    ///
    /// `(0x00, 0x00)` is normal completion. `(0x00, 0x40)` means the PLC has an
    /// active alarm but the command completed and its data is valid.
    pub fn is_success(self) -> bool {
        self.main == 0x00 && (self.sub == 0x00 || self.sub == SUB_CODE_PLC_ALARM)
    }

    /// Returns the category of this end code.
    pub fn category(self) -> EndCodeCategory {
        EndCodeCategory::from_main(self.main)
    }

    /// Returns the success flag together with the category.
    pub fn outcome(self) -> ErrorOutcome {
        ErrorOutcome {
            succeeded: self.is_success(),
            category: self.category(),
        }
    }

    /// Returns whether re-sending the same command may succeed.
    ///
    /// Only network and routing failures qualify, except "command not
    /// supported" which will fail the same way every time.
    pub fn is_retryable(self) -> bool {
        let category = self.category();
        category.is_network() && category != EndCodeCategory::ServiceUnsupported
    }

    /// Returns the human-readable description of this end code.
    pub fn description(self) -> &'static str {
        end_code_description(self.main, self.sub)
    }

    /// Converts a failing end code into `FinsError::PlcError`.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::PlcError` if [`is_success`](Self::is_success) is false.
    pub fn check(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(FinsError::plc_error(self.main, self.sub))
        }
    }
}

impl fmt::Display for EndCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:02X}{:02X} ({})",
            self.main,
            self.sub,
            self.description()
        )
    }
}

/// Returns a human-readable description of a FINS end code.
///
/// # Example
///
/// ```
/// use omron_fins_driver::end_code_description;
///
/// assert_eq!(end_code_description(0x11, 0x04), "address range exceeded");
/// assert_eq!(end_code_description(0x7E, 0x00), "unknown end code");
/// ```
pub fn end_code_description(main: u8, sub: u8) -> &'static str {
    match (main & 0x7F, sub) {
        (0x00, 0x00) => "normal completion",
        (0x00, 0x40) => "normal completion, PLC alarm present",
        (0x00, 0x01) => "service cancelled",

        (0x01, 0x01) => "local node not in network",
        (0x01, 0x02) => "token timeout",
        (0x01, 0x03) => "retries failed",
        (0x01, 0x04) => "too many send frames",
        (0x01, 0x05) => "node address range error",
        (0x01, 0x06) => "node address duplication",

        (0x02, 0x01) => "destination node not in network",
        (0x02, 0x02) => "unit missing",
        (0x02, 0x03) => "third node missing",
        (0x02, 0x04) => "destination node busy",
        (0x02, 0x05) => "response timeout",

        (0x03, 0x01) => "communications controller error",
        (0x03, 0x02) => "CPU unit error",
        (0x03, 0x03) => "controller error",
        (0x03, 0x04) => "unit number error",

        (0x04, 0x01) => "undefined command",
        (0x04, 0x02) => "not supported by model/version",

        (0x05, 0x01) => "destination address setting error",
        (0x05, 0x02) => "no routing tables",
        (0x05, 0x03) => "routing table error",
        (0x05, 0x04) => "too many relays",

        (0x10, 0x01) => "command too long",
        (0x10, 0x02) => "command too short",
        (0x10, 0x03) => "elements/data don't match",
        (0x10, 0x04) => "command format error",
        (0x10, 0x05) => "header error",

        (0x11, 0x01) => "area classification missing",
        (0x11, 0x02) => "access size error",
        (0x11, 0x03) => "address range error",
        (0x11, 0x04) => "address range exceeded",
        (0x11, 0x06) => "program missing",
        (0x11, 0x09) => "relational error",
        (0x11, 0x0A) => "duplicate data access",
        (0x11, 0x0B) => "response too long",
        (0x11, 0x0C) => "parameter error",

        (0x20, 0x02) => "protected",
        (0x20, 0x03) => "table missing",
        (0x20, 0x04) => "data missing",
        (0x20, 0x05) => "program missing",
        (0x20, 0x06) => "file missing",
        (0x20, 0x07) => "data mismatch",

        (0x21, 0x01) => "read-only",
        (0x21, 0x02) => "protected, cannot write data link table",
        (0x21, 0x03) => "cannot register",
        (0x21, 0x05) => "program missing",
        (0x21, 0x06) => "file missing",
        (0x21, 0x07) => "file name already exists",
        (0x21, 0x08) => "cannot change",

        (0x22, 0x01) => "not possible during execution",
        (0x22, 0x02) => "not possible while running",
        (0x22, 0x03) => "wrong PLC mode (program)",
        (0x22, 0x04) => "wrong PLC mode (debug)",
        (0x22, 0x05) => "wrong PLC mode (monitor)",
        (0x22, 0x06) => "wrong PLC mode (run)",
        (0x22, 0x07) => "specified node not polling node",
        (0x22, 0x08) => "step cannot be executed",

        (0x23, 0x01) => "file device missing",
        (0x23, 0x02) => "memory missing",
        (0x23, 0x03) => "clock missing",

        (0x24, 0x01) => "table missing",

        (0x25, 0x02) => "memory error",
        (0x25, 0x03) => "I/O setting error",
        (0x25, 0x04) => "too many I/O points",
        (0x25, 0x05) => "CPU bus error",
        (0x25, 0x06) => "I/O duplication",
        (0x25, 0x07) => "CPU bus error",
        (0x25, 0x09) => "SYSMAC BUS/2 error",
        (0x25, 0x0A) => "CPU bus unit error",
        (0x25, 0x0D) => "SYSMAC BUS number duplication",
        (0x25, 0x0F) => "memory error",
        (0x25, 0x10) => "SYSMAC BUS terminator missing",

        (0x26, 0x01) => "no protection",
        (0x26, 0x02) => "incorrect password",
        (0x26, 0x04) => "protected",
        (0x26, 0x05) => "service already executing",
        (0x26, 0x06) => "service stopped",
        (0x26, 0x07) => "no execution right",
        (0x26, 0x08) => "settings required before execution",
        (0x26, 0x09) => "necessary items not set",
        (0x26, 0x0A) => "number already defined",
        (0x26, 0x0B) => "error will not clear",

        (0x30, 0x01) => "no access right",

        (0x40, 0x01) => "service aborted",

        _ => "unknown end code",
    }
}
