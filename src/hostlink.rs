//! Host Link (ASCII) FINS frames for the serial transport.
//!
//! A serial frame is plain ASCII:
//!
//! ```text
//! @00FA0 00000000 0102 31 000004 0001 01 7F * CR
//! |      |        |    |  |      |    |  |  |
//! |      |        |    |  |      |    |  |  terminator
//! |      |        |    |  |      |    |  FCS (XOR of all previous bytes)
//! |      |        |    |  |      |    ON/OFF state (writes only)
//! |      |        |    |  |      bit, 4 hex digits
//! |      |        |    |  channel, 6 hex digits
//! |      |        |    bit area code
//! |      |        0101 read / 0102 write
//! |      ICF, DA2, SA2, SID
//! header (unit 00, FINS command, wait 0)
//! ```
//!
//! The spaces above are for reading only; the frame has none.
//!
//! # Example
//!
//! ```
//! use omron_fins_driver::{HostLinkCommand, MemoryArea, RegisterAddress};
//!
//! let cmd = HostLinkCommand::write_bit(RegisterAddress::bit(MemoryArea::CIO, 8, 1), true)
//!     .unwrap();
//! assert_eq!(cmd.to_bytes(), b"@00FA0000000000102300000080001017F*\r");
//! ```

use std::fmt::Write as _;

use crate::address::RegisterAddress;
use crate::error::Result;
use crate::memory::Access;

/// Fixed frame header: unit 00, FINS command `FA`, response wait 0.
pub const HEADER: &str = "@00FA0";

/// ICF, DA2, SA2 and SID digits.
pub const SERVICE: &str = "00000000";

/// Operation code for a memory read.
pub const OP_READ: &str = "0101";

/// Operation code for a memory write.
pub const OP_WRITE: &str = "0102";

/// Marker between the checksum and the terminator.
pub const FCS_MARKER: u8 = b'*';

/// Frame terminator.
pub const TERMINATOR: u8 = 0x0D;

/// Operation carried by a [`HostLinkCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostLinkOp {
    /// Read one bit.
    Read,
    /// Write one bit to the given state.
    Write(bool),
}

/// A single-bit Host Link command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLinkCommand {
    area_code: u8,
    channel: u16,
    bit: u8,
    op: HostLinkOp,
}

impl HostLinkCommand {
    /// Creates a bit read command.
    ///
    /// # Errors
    ///
    /// Returns an error if the address has no bit, the bit is above 15 or
    /// the channel exceeds 15 bits.
    pub fn read_bit(address: RegisterAddress) -> Result<Self> {
        Self::new(address, HostLinkOp::Read)
    }

    /// Creates a bit write command.
    ///
    /// # Errors
    ///
    /// Same as [`read_bit`](Self::read_bit).
    pub fn write_bit(address: RegisterAddress, value: bool) -> Result<Self> {
        Self::new(address, HostLinkOp::Write(value))
    }

    fn new(address: RegisterAddress, op: HostLinkOp) -> Result<Self> {
        let bit = address.expect_bit()?;
        Ok(Self {
            area_code: address.area.code(Access::Bit),
            channel: address.wire_channel()?,
            bit,
            op,
        })
    }

    /// Returns the frame text before the checksum.
    pub fn body(&self) -> String {
        let mut body = String::with_capacity(32);
        body.push_str(HEADER);
        body.push_str(SERVICE);
        body.push_str(match self.op {
            HostLinkOp::Read => OP_READ,
            HostLinkOp::Write(_) => OP_WRITE,
        });
        // Writing into a String cannot fail.
        let _ = write!(body, "{:02X}{:06X}{:04X}", self.area_code, self.channel, self.bit);
        if let HostLinkOp::Write(value) = self.op {
            body.push_str(if value { "01" } else { "00" });
        }
        body
    }

    /// Serializes the complete frame: body, checksum, `*` and CR.
    pub fn to_bytes(&self) -> Vec<u8> {
        frame(&self.body())
    }
}

/// Computes the Host Link checksum of `text`.
///
/// The result is the XOR of every byte as two uppercase hex digits.
///
/// # Example
///
/// ```
/// use omron_fins_driver::hostlink::checksum;
///
/// assert_eq!(checksum("@00FA000000000010230000008000101"), "7F");
/// assert_eq!(checksum("AB"), "03");
/// ```
pub fn checksum(text: &str) -> String {
    let fcs = text.bytes().fold(0u8, |acc, b| acc ^ b);
    format!("{:02X}", fcs)
}

/// Appends the checksum, `*` and CR to a frame body.
pub fn frame(body: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(body.len() + 4);
    bytes.extend_from_slice(body.as_bytes());
    bytes.extend_from_slice(checksum(body).as_bytes());
    bytes.push(FCS_MARKER);
    bytes.push(TERMINATOR);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FinsError;
    use crate::memory::MemoryArea;

    #[test]
    fn test_checksum_write_on_prefix() {
        assert_eq!(checksum("@00FA000000000010230000008000101"), "7F");
    }

    #[test]
    fn test_checksum_left_padded() {
        assert_eq!(checksum("AB"), "03");
        assert_eq!(checksum(""), "00");
    }

    #[test]
    fn test_write_bit_frame() {
        let cmd =
            HostLinkCommand::write_bit(RegisterAddress::bit(MemoryArea::CIO, 8, 1), true).unwrap();
        assert_eq!(cmd.body(), "@00FA000000000010230000008000101");
        let bytes = cmd.to_bytes();
        assert!(bytes.ends_with(b"7F*\r"));
        assert_eq!(bytes.last(), Some(&0x0D));
    }

    #[test]
    fn test_write_bit_off_uses_work_area() {
        let cmd =
            HostLinkCommand::write_bit(RegisterAddress::bit(MemoryArea::WR, 4, 1), false).unwrap();
        assert_eq!(cmd.body(), "@00FA000000000010231000004000100");
    }

    #[test]
    fn test_read_bit_frame() {
        let cmd = HostLinkCommand::read_bit(RegisterAddress::bit(MemoryArea::CIO, 7, 1)).unwrap();
        assert_eq!(cmd.body(), "@00FA0000000000101300000070001");
        assert_eq!(cmd.to_bytes(), b"@00FA000000000010130000007000172*\r".to_vec());
    }

    #[test]
    fn test_hex_fields() {
        let cmd =
            HostLinkCommand::write_bit(RegisterAddress::bit(MemoryArea::HR, 100, 5), true).unwrap();
        assert_eq!(cmd.body(), "@00FA000000000010232000064000501");
        assert!(cmd.to_bytes().ends_with(b"73*\r"));
    }

    #[test]
    fn test_requires_bit_address() {
        let err = HostLinkCommand::read_bit(RegisterAddress::word(MemoryArea::CIO, 7)).unwrap_err();
        assert!(matches!(err, FinsError::InvalidAddressing { .. }));
    }
}
