//! FINS/TCP response parsing and validation.
//!
//! # Response Structure
//!
//! | Byte | Field |
//! |------|-------|
//! | 0-15 | Envelope; command 3 marks an error frame with the header error in byte 15 |
//! | 16-25 | FINS header, SID in byte 25 |
//! | 26-27 | Echoed command code |
//! | 28-29 | End code (main, sub) |
//! | 30.. | Response data |
//!
//! A response is accepted when the end code is `00 00`, or `00 40` (PLC alarm
//! active, data still valid). Everything else becomes a `FinsError::PlcError`
//! that can be classified through [`FinsError::category`].
//!
//! # Example
//!
//! ```
//! use omron_fins_driver::FinsResponse;
//!
//! let mut frame = b"FINS".to_vec();
//! frame.extend_from_slice(&[0, 0, 0, 0x18, 0, 0, 0, 0x02, 0, 0, 0, 0]);
//! frame.extend_from_slice(&[0xC0, 0, 0x02, 0, 0x22, 0, 0, 0x01, 0, 0x07]);
//! frame.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x12, 0x34, 0x56, 0x78]);
//!
//! let response = FinsResponse::from_bytes(&frame).unwrap();
//! assert!(response.check_error().is_ok());
//! assert_eq!(response.to_words().unwrap(), vec![0x1234, 0x5678]);
//! ```

use crate::classify::{check_header, EndCode, HeaderError};
use crate::error::{FinsError, Result};
use crate::header::{
    FinsHeader, TcpEnvelope, FINS_HEADER_SIZE, TCP_FRAME_ERROR, TCP_HEADER_SIZE,
    TCP_NODE_RESPONSE,
};
use crate::value::{byte_to_bit, bytes_to_words};

/// Minimum response size: envelope (16) + header (10) + MRC/SRC (2) + end code (2).
pub const MIN_RESPONSE_SIZE: usize = TCP_HEADER_SIZE + FINS_HEADER_SIZE + 4;

/// Size of the handshake reply frame.
pub const HANDSHAKE_RESPONSE_SIZE: usize = 24;

/// Parsed FINS/TCP response.
#[derive(Debug, Clone)]
pub struct FinsResponse {
    /// Response header.
    pub header: FinsHeader,
    /// Main Request Code echoed by the PLC.
    pub mrc: u8,
    /// Sub Request Code echoed by the PLC.
    pub src: u8,
    /// End code.
    pub end_code: EndCode,
    /// Bytes after the end code.
    pub data: Vec<u8>,
}

impl FinsResponse {
    /// Parses a complete FINS/TCP response frame.
    ///
    /// # Errors
    ///
    /// - `FinsError::Framing` if the envelope is an error frame with a header error
    /// - `FinsError::InvalidResponse` if the frame is too short or not FINS
    ///
    /// An error frame whose header code is zero is parsed like any other
    /// reply, so its end code still decides the outcome.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let envelope = TcpEnvelope::from_bytes(data)?;
        if envelope.command == TCP_FRAME_ERROR {
            check_header(data[15])?;
        }

        if data.len() < MIN_RESPONSE_SIZE {
            return Err(FinsError::invalid_response(format!(
                "reply has {1} bytes, a FINS reply needs at least {0}",
                MIN_RESPONSE_SIZE,
                data.len()
            )));
        }

        let body = &data[TCP_HEADER_SIZE..];
        let header = FinsHeader::from_bytes(&body[..FINS_HEADER_SIZE])?;

        Ok(Self {
            header,
            mrc: body[FINS_HEADER_SIZE],
            src: body[FINS_HEADER_SIZE + 1],
            end_code: EndCode::new(body[FINS_HEADER_SIZE + 2], body[FINS_HEADER_SIZE + 3]),
            data: data[MIN_RESPONSE_SIZE..].to_vec(),
        })
    }

    /// Returns whether the end code counts as success.
    pub fn is_success(&self) -> bool {
        self.end_code.is_success()
    }

    /// Validates the end code.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::PlcError` for any end code other than `00 00` or `00 40`.
    pub fn check_error(&self) -> Result<()> {
        self.end_code.check()
    }

    /// Checks the echoed service ID.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::SidMismatch` when the PLC echoed another SID.
    pub fn check_sid(&self, expected: u8) -> Result<()> {
        if self.header.sid == expected {
            Ok(())
        } else {
            Err(FinsError::sid_mismatch(expected, self.header.sid))
        }
    }

    /// Checks that the reply answers the command that was sent.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidResponse` when the echoed command code
    /// differs from `mrc`/`src`.
    pub fn check_command(&self, mrc: u8, src: u8) -> Result<()> {
        if (self.mrc, self.src) == (mrc, src) {
            Ok(())
        } else {
            Err(FinsError::invalid_response(format!(
                "reply to command {:02X}{:02X}, expected {:02X}{:02X}",
                self.mrc, self.src, mrc, src
            )))
        }
    }

    /// Converts response data to words.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidResponse` on an odd byte count.
    pub fn to_words(&self) -> Result<Vec<u16>> {
        bytes_to_words(&self.data)
    }

    /// Converts response data to bit values, one byte per bit.
    pub fn to_bits(&self) -> Vec<bool> {
        self.data.iter().copied().map(byte_to_bit).collect()
    }

    /// First data byte as a bit, nonzero meaning ON.
    ///
    /// # Errors
    ///
    /// Returns an error if there's no data.
    pub fn to_bit(&self) -> Result<bool> {
        self.data
            .first()
            .copied()
            .map(byte_to_bit)
            .ok_or_else(|| FinsError::invalid_response("no data for bit conversion"))
    }
}

/// Parsed node-address reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// Node number assigned to this client (byte 19).
    pub client_node: u8,
    /// Node number of the PLC (byte 23).
    pub server_node: u8,
}

impl HandshakeResponse {
    /// Parses the 24-byte node-address reply.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::HandshakeFailed` if the reply is short, not FINS,
    /// carries a header error or is not a node-address reply.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HANDSHAKE_RESPONSE_SIZE {
            return Err(FinsError::handshake(format!(
                "reply too short: expected {} bytes, got {}",
                HANDSHAKE_RESPONSE_SIZE,
                data.len()
            )));
        }
        let envelope = TcpEnvelope::from_bytes(data)
            .map_err(|e| FinsError::handshake(e.to_string()))?;
        if let Some(error) = HeaderError::from_code(data[15]) {
            return Err(FinsError::handshake(error.to_string()));
        }
        if envelope.command != TCP_NODE_RESPONSE {
            return Err(FinsError::handshake(format!(
                "unexpected envelope command {}",
                envelope.command
            )));
        }
        Ok(Self {
            client_node: data[19],
            server_node: data[23],
        })
    }
}
