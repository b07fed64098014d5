//! Error types for the FINS driver.
//!
//! Every failure is returned as a [`FinsError`]. Callers that need coarse
//! recovery decisions can use [`FinsError::kind`] and
//! [`FinsError::is_retryable`] instead of matching every variant.

use std::io;
use thiserror::Error;

use crate::classify::{EndCode, EndCodeCategory, HeaderError};

/// Shorthand for results carrying a [`FinsError`].
pub type Result<T> = std::result::Result<T, FinsError>;

/// Coarse classification of a [`FinsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Socket or serial port failure: open, write, read, timeout, closed channel.
    Transport,
    /// The PLC rejected the frame envelope (header error code).
    Framing,
    /// The PLC answered with a failing end code.
    Protocol,
    /// The textual register address could not be parsed.
    AddressParse,
    /// The requested value type is not one of bit, word, int32 or float32.
    UnsupportedType,
    /// A caller-supplied argument is out of range for the wire format.
    InvalidInput,
}

/// Everything that can go wrong between a register address and a PLC reply.
#[derive(Debug, Error)]
pub enum FinsError {
    /// Socket or serial port failure.
    #[error("transport I/O failed: {0}")]
    Io(#[from] io::Error),

    /// No reply within the configured per-call timeout.
    #[error("PLC did not answer in time")]
    Timeout,

    /// No live channel: the transport was closed or is waiting for a reconnect.
    #[error("no live channel to the PLC")]
    NotConnected,

    /// The peer closed the channel before a full frame was received.
    #[error("channel closed after {received} of {expected} bytes")]
    ConnectionClosed {
        /// Bytes the frame still required.
        expected: usize,
        /// Bytes actually received.
        received: usize,
    },

    /// The node-address handshake was rejected or malformed.
    #[error("node handshake failed: {reason}")]
    HandshakeFailed {
        /// Description of the handshake failure.
        reason: String,
    },

    /// The PLC reported a header-level error for the frame.
    #[error("PLC rejected the frame: {error}")]
    Framing {
        /// Header error reported in byte 15 of an error frame.
        error: HeaderError,
    },

    /// The PLC answered with a failing end code.
    #[error("PLC end code {main_code:02X}{sub_code:02X}")]
    PlcError {
        /// End-code main byte (offset 28).
        main_code: u8,
        /// End-code sub byte (offset 29).
        sub_code: u8,
    },

    /// The address text does not start with a known memory-area prefix.
    #[error("unknown memory area in '{text}'")]
    InvalidAddressPrefix {
        /// The offending address text.
        text: String,
    },

    /// The address text has a valid prefix but a malformed channel or bit.
    #[error("bad register address '{text}': {reason}")]
    InvalidAddress {
        /// The offending address text.
        text: String,
        /// Why it could not be parsed.
        reason: String,
    },

    /// The value type is not supported by the driver.
    #[error("unsupported value type '{name}'")]
    UnsupportedType {
        /// Name of the rejected type.
        name: String,
    },

    /// Address valid as text but not usable for the requested access.
    #[error("address not usable here: {reason}")]
    InvalidAddressing {
        /// What is wrong with it.
        reason: String,
    },

    /// Argument out of range for the wire format.
    #[error("bad argument '{parameter}': {reason}")]
    InvalidParameter {
        /// Argument name.
        parameter: String,
        /// Allowed range or shape.
        reason: String,
    },

    /// Reply too short, oversized or otherwise not a FINS frame.
    #[error("malformed reply: {reason}")]
    InvalidResponse {
        /// What failed to decode.
        reason: String,
    },

    /// The reply echoes a different service ID than the request.
    #[error("reply SID 0x{received:02X} does not match request SID 0x{expected:02X}")]
    SidMismatch {
        /// SID sent with the request.
        expected: u8,
        /// SID found in the reply.
        received: u8,
    },
}

impl FinsError {
    /// `PlcError` for an end-code pair.
    ///
    /// # Example
    ///
    /// ```
    /// use omron_fins_driver::{EndCodeCategory, FinsError};
    ///
    /// let err = FinsError::plc_error(0x11, 0x04);
    /// assert_eq!(err.category(), Some(EndCodeCategory::Parameter));
    /// ```
    pub fn plc_error(main_code: u8, sub_code: u8) -> Self {
        Self::PlcError {
            main_code,
            sub_code,
        }
    }

    /// `InvalidAddressing` with a reason.
    pub fn invalid_addressing(reason: impl Into<String>) -> Self {
        Self::InvalidAddressing {
            reason: reason.into(),
        }
    }

    /// `InvalidParameter` naming the argument.
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// `InvalidResponse` with a reason.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// `InvalidAddress` for address text with a malformed channel or bit.
    ///
    /// # Example
    ///
    /// ```
    /// use omron_fins_driver::{ErrorKind, FinsError};
    ///
    /// let err = FinsError::invalid_address("D1.x", "bit is not a number");
    /// assert_eq!(err.kind(), ErrorKind::AddressParse);
    /// ```
    pub fn invalid_address(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            text: text.into(),
            reason: reason.into(),
        }
    }

    /// `HandshakeFailed` when the node-address exchange is refused or garbled.
    ///
    /// # Example
    ///
    /// ```
    /// use omron_fins_driver::FinsError;
    ///
    /// let err = FinsError::handshake("reply error code 0x01");
    /// assert!(err.is_retryable());
    /// ```
    pub fn handshake(reason: impl Into<String>) -> Self {
        Self::HandshakeFailed {
            reason: reason.into(),
        }
    }

    /// `UnsupportedType` for a value type name the driver cannot encode.
    ///
    /// # Example
    ///
    /// ```
    /// use omron_fins_driver::{ErrorKind, FinsError};
    ///
    /// let err = FinsError::unsupported_type("double");
    /// assert_eq!(err.kind(), ErrorKind::UnsupportedType);
    /// ```
    pub fn unsupported_type(name: impl Into<String>) -> Self {
        Self::UnsupportedType { name: name.into() }
    }

    /// `SidMismatch` for a reply that does not echo the request's SID.
    ///
    /// # Example
    ///
    /// ```
    /// use omron_fins_driver::FinsError;
    ///
    /// let err = FinsError::sid_mismatch(0x05, 0x06);
    /// assert_eq!(err.to_string(), "reply SID 0x06 does not match request SID 0x05");
    /// ```
    pub fn sid_mismatch(expected: u8, received: u8) -> Self {
        Self::SidMismatch { expected, received }
    }

    /// Returns the coarse kind of this error.
    ///
    /// # Example
    ///
    /// ```
    /// use omron_fins_driver::{ErrorKind, FinsError};
    ///
    /// assert_eq!(FinsError::Timeout.kind(), ErrorKind::Transport);
    /// assert_eq!(FinsError::plc_error(0x11, 0x04).kind(), ErrorKind::Protocol);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_)
            | Self::Timeout
            | Self::NotConnected
            | Self::ConnectionClosed { .. }
            | Self::HandshakeFailed { .. }
            | Self::SidMismatch { .. }
            | Self::InvalidResponse { .. } => ErrorKind::Transport,
            Self::Framing { .. } => ErrorKind::Framing,
            Self::PlcError { .. } => ErrorKind::Protocol,
            Self::InvalidAddressPrefix { .. } | Self::InvalidAddress { .. } => {
                ErrorKind::AddressParse
            }
            Self::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            Self::InvalidAddressing { .. } | Self::InvalidParameter { .. } => {
                ErrorKind::InvalidInput
            }
        }
    }

    /// Returns the end code carried by a `PlcError`.
    pub fn end_code(&self) -> Option<EndCode> {
        match *self {
            Self::PlcError {
                main_code,
                sub_code,
            } => Some(EndCode::new(main_code, sub_code)),
            _ => None,
        }
    }

    /// Returns the end-code category carried by a `PlcError`.
    pub fn category(&self) -> Option<EndCodeCategory> {
        self.end_code().map(EndCode::category)
    }

    /// Returns whether repeating the same request may succeed.
    ///
    /// Transport failures and network/routing end codes are retryable.
    /// Framing errors, configuration/address end codes and invalid input are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::PlcError { .. } => self.end_code().is_some_and(|c| c.is_retryable()),
            _ => self.kind() == ErrorKind::Transport,
        }
    }
}
