//! FINS/TCP command frames.
//!
//! Each command serializes to a complete frame ready for the socket: the
//! 16-byte envelope, the 10-byte FINS header and the command body.
//!
//! | Byte | Field |
//! |------|-------|
//! | 0-15 | Envelope (`FINS`, length from offset 8, command 2, error 0) |
//! | 16-25 | FINS header (ICF 0x80, GCT 0x02, DA1 = PLC node, SA1 = local node, SID) |
//! | 26-27 | Command code: `01 01` memory read, `01 02` memory write |
//! | 28 | Area code (word or bit form) |
//! | 29-30 | Channel, big-endian; counters add 0x80 to the high byte |
//! | 31 | Bit offset (0 for word access) |
//! | 32-33 | Item count, big-endian |
//! | 34.. | Write payload: 2 bytes per word or 1 byte per bit |
//!
//! # Commands
//!
//! - [`ReadWordCommand`] - read consecutive words
//! - [`WriteWordCommand`] - write consecutive words
//! - [`ReadBitCommand`] - read consecutive bits
//! - [`WriteBitCommand`] - write consecutive bits
//! - [`HandshakeCommand`] - node-address request sent once per connection
//!
//! # Example
//!
//! ```
//! use omron_fins_driver::{NodePair, ReadWordCommand, RegisterAddress, MemoryArea};
//!
//! let nodes = NodePair::new(0x22, 0x01);
//! let cmd = ReadWordCommand::new(nodes, 0x07, RegisterAddress::word(MemoryArea::DM, 100), 1)
//!     .unwrap();
//! let frame = cmd.to_bytes();
//! assert_eq!(frame.len(), 34);
//! assert_eq!(&frame[26..34], &[0x01, 0x01, 0x82, 0x00, 0x64, 0x00, 0x00, 0x01]);
//! ```

use crate::address::RegisterAddress;
use crate::error::{FinsError, Result};
use crate::header::{FinsHeader, NodePair, TcpEnvelope, TCP_FRAME_SEND, TCP_NODE_REQUEST};
use crate::memory::Access;
use crate::value::{bit_to_byte, words_to_bytes};

/// Memory area command code (MRC).
pub(crate) const MRC_MEMORY: u8 = 0x01;
/// Memory area read sub-code (SRC).
pub(crate) const SRC_MEMORY_READ: u8 = 0x01;
/// Memory area write sub-code (SRC).
pub(crate) const SRC_MEMORY_WRITE: u8 = 0x02;

/// Maximum number of words or bits in a single read/write command.
pub const MAX_ITEMS_PER_COMMAND: u16 = 999;

/// Size of a memory command frame without write payload.
pub const COMMAND_FRAME_SIZE: usize = 34;

/// Size of the handshake request frame.
pub const HANDSHAKE_REQUEST_SIZE: usize = 20;

/// Area code, channel and bit as encoded in bytes 28-31.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Target([u8; 4]);

impl Target {
    fn encode(address: &RegisterAddress, access: Access) -> Result<Self> {
        let channel = address.wire_channel()?;
        let bit = match access {
            Access::Word => {
                address.expect_word()?;
                0
            }
            Access::Bit => address.expect_bit()?,
        };
        let [high, low] = channel.to_be_bytes();
        Ok(Self([
            address.area.code(access),
            high | address.area.channel_flag(),
            low,
            bit,
        ]))
    }
}

fn check_count(parameter: &str, count: usize) -> Result<u16> {
    if count == 0 {
        return Err(FinsError::invalid_parameter(
            parameter,
            "must be greater than 0",
        ));
    }
    if count > MAX_ITEMS_PER_COMMAND as usize {
        return Err(FinsError::invalid_parameter(
            parameter,
            format!("must not exceed {}", MAX_ITEMS_PER_COMMAND),
        ));
    }
    Ok(count as u16)
}

fn memory_frame(
    nodes: NodePair,
    sid: u8,
    sub_code: u8,
    target: Target,
    count: u16,
    payload: &[u8],
) -> Vec<u8> {
    let len = COMMAND_FRAME_SIZE + payload.len();
    let mut bytes = Vec::with_capacity(len);
    bytes.extend_from_slice(&TcpEnvelope::for_frame(TCP_FRAME_SEND, len).to_bytes());
    bytes.extend_from_slice(&FinsHeader::new_command(nodes, sid).to_bytes());
    bytes.push(MRC_MEMORY);
    bytes.push(sub_code);
    bytes.extend_from_slice(&target.0);
    bytes.extend_from_slice(&count.to_be_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

/// Memory-area read (`0101`) of consecutive words.
#[derive(Debug, Clone)]
pub struct ReadWordCommand {
    nodes: NodePair,
    sid: u8,
    target: Target,
    count: u16,
}

impl ReadWordCommand {
    /// Builds a memory-area read of `count` words.
    ///
    /// # Arguments
    ///
    /// * `nodes` - Node numbers from the handshake
    /// * `sid` - echoed by the PLC, used to pair the reply
    /// * `address` - Starting word address (no bit offset)
    /// * `count` - words to read, 1 to 999
    ///
    /// # Errors
    ///
    /// Returns an error if the address carries a bit, the channel exceeds
    /// 15 bits, or count is 0 or above [`MAX_ITEMS_PER_COMMAND`].
    pub fn new(nodes: NodePair, sid: u8, address: RegisterAddress, count: u16) -> Result<Self> {
        let count = check_count("count", count as usize)?;
        Ok(Self {
            nodes,
            sid,
            target: Target::encode(&address, Access::Word)?,
            count,
        })
    }

    /// Service ID carried in the header.
    pub fn sid(&self) -> u8 {
        self.sid
    }

    /// Returns the number of words requested.
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Serializes the command to a complete frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        memory_frame(
            self.nodes,
            self.sid,
            SRC_MEMORY_READ,
            self.target,
            self.count,
            &[],
        )
    }
}

/// Memory-area write (`0102`) of consecutive words.
#[derive(Debug, Clone)]
pub struct WriteWordCommand {
    nodes: NodePair,
    sid: u8,
    target: Target,
    data: Vec<u16>,
}

impl WriteWordCommand {
    /// Builds a memory-area write of `words`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address carries a bit, the channel exceeds
    /// 15 bits, or `data` is empty or longer than [`MAX_ITEMS_PER_COMMAND`].
    ///
    /// # Example
    ///
    /// ```
    /// use omron_fins_driver::{MemoryArea, NodePair, RegisterAddress, WriteWordCommand};
    ///
    /// let cmd = WriteWordCommand::new(
    ///     NodePair::new(0x22, 0x01),
    ///     0x01,
    ///     RegisterAddress::word(MemoryArea::DM, 100),
    ///     &[0x1234, 0x5678],
    /// ).unwrap();
    /// assert_eq!(cmd.to_bytes().len(), 38);
    /// ```
    pub fn new(nodes: NodePair, sid: u8, address: RegisterAddress, data: &[u16]) -> Result<Self> {
        check_count("data", data.len())?;
        Ok(Self {
            nodes,
            sid,
            target: Target::encode(&address, Access::Word)?,
            data: data.to_vec(),
        })
    }

    /// Service ID carried in the header.
    pub fn sid(&self) -> u8 {
        self.sid
    }

    /// Serializes the command to a complete frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        memory_frame(
            self.nodes,
            self.sid,
            SRC_MEMORY_WRITE,
            self.target,
            self.data.len() as u16,
            &words_to_bytes(&self.data),
        )
    }
}

/// Command for reading bits from PLC memory.
#[derive(Debug, Clone)]
pub struct ReadBitCommand {
    nodes: NodePair,
    sid: u8,
    target: Target,
    count: u16,
}

impl ReadBitCommand {
    /// Creates a new read bit command starting at a bit address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address has no bit, the bit is above 15, the
    /// channel exceeds 15 bits, or count is out of range.
    pub fn new(nodes: NodePair, sid: u8, address: RegisterAddress, count: u16) -> Result<Self> {
        let count = check_count("count", count as usize)?;
        Ok(Self {
            nodes,
            sid,
            target: Target::encode(&address, Access::Bit)?,
            count,
        })
    }

    /// Service ID carried in the header.
    pub fn sid(&self) -> u8 {
        self.sid
    }

    /// Returns the number of bits requested.
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Serializes the command to a complete frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        memory_frame(
            self.nodes,
            self.sid,
            SRC_MEMORY_READ,
            self.target,
            self.count,
            &[],
        )
    }
}

/// Command for writing bits to PLC memory.
#[derive(Debug, Clone)]
pub struct WriteBitCommand {
    nodes: NodePair,
    sid: u8,
    target: Target,
    values: Vec<bool>,
}

impl WriteBitCommand {
    /// Creates a new write bit command starting at a bit address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address has no bit, the bit is above 15, the
    /// channel exceeds 15 bits, or `values` is empty or too long.
    ///
    /// # Example
    ///
    /// ```
    /// use omron_fins_driver::{MemoryArea, NodePair, RegisterAddress, WriteBitCommand};
    ///
    /// let cmd = WriteBitCommand::new(
    ///     NodePair::new(0x22, 0x01),
    ///     0x01,
    ///     RegisterAddress::bit(MemoryArea::WR, 100, 1),
    ///     &[true],
    /// ).unwrap();
    /// let frame = cmd.to_bytes();
    /// assert_eq!(frame.len(), 35);
    /// assert_eq!(frame[34], 0x01);
    /// ```
    pub fn new(
        nodes: NodePair,
        sid: u8,
        address: RegisterAddress,
        values: &[bool],
    ) -> Result<Self> {
        check_count("values", values.len())?;
        Ok(Self {
            nodes,
            sid,
            target: Target::encode(&address, Access::Bit)?,
            values: values.to_vec(),
        })
    }

    /// Service ID carried in the header.
    pub fn sid(&self) -> u8 {
        self.sid
    }

    /// Serializes the command to a complete frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload: Vec<u8> = self.values.iter().map(|v| bit_to_byte(*v)).collect();
        memory_frame(
            self.nodes,
            self.sid,
            SRC_MEMORY_WRITE,
            self.target,
            self.values.len() as u16,
            &payload,
        )
    }
}

/// Node-address request sent right after the TCP connection opens.
///
/// A client node of 0 asks the PLC to assign one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandshakeCommand {
    client_node: u32,
}

impl HandshakeCommand {
    /// Creates a handshake requesting automatic node assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes the request (20 bytes).
    pub fn to_bytes(self) -> [u8; HANDSHAKE_REQUEST_SIZE] {
        let mut bytes = [0u8; HANDSHAKE_REQUEST_SIZE];
        bytes[0..16].copy_from_slice(
            &TcpEnvelope::for_frame(TCP_NODE_REQUEST, HANDSHAKE_REQUEST_SIZE).to_bytes(),
        );
        bytes[16..20].copy_from_slice(&self.client_node.to_be_bytes());
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryArea;

    fn nodes() -> NodePair {
        NodePair::new(0x22, 0x01)
    }

    fn frame_hex(bytes: &[u8]) -> String {
        hex::encode_upper(bytes)
    }

    #[test]
    fn test_read_word_frame() {
        let cmd =
            ReadWordCommand::new(nodes(), 0x07, RegisterAddress::word(MemoryArea::DM, 100), 1)
                .unwrap();
        assert_eq!(
            frame_hex(&cmd.to_bytes()),
            "46494E530000001A0000000200000000\
             80000200010000220007\
             0101820064000001"
        );
        assert_eq!(cmd.sid(), 0x07);
    }

    #[test]
    fn test_read_word_length_field() {
        let cmd =
            ReadWordCommand::new(nodes(), 0x01, RegisterAddress::word(MemoryArea::HR, 5), 2)
                .unwrap();
        let bytes = cmd.to_bytes();
        let length = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        assert_eq!(length, bytes.len() - 8);
        assert_eq!(&bytes[32..34], &[0x00, 0x02]);
        assert_eq!(bytes[28], 0xB2);
    }

    #[test]
    fn test_counter_channel_flag() {
        let cmd = ReadWordCommand::new(nodes(), 1, RegisterAddress::word(MemoryArea::CNT, 5), 1)
            .unwrap();
        assert_eq!(&cmd.to_bytes()[28..32], &[0x89, 0x80, 0x05, 0x00]);

        let cmd = ReadWordCommand::new(nodes(), 1, RegisterAddress::word(MemoryArea::TIM, 5), 1)
            .unwrap();
        assert_eq!(&cmd.to_bytes()[28..32], &[0x89, 0x00, 0x05, 0x00]);
    }

    #[test]
    fn test_read_count_out_of_range() {
        let addr = RegisterAddress::word(MemoryArea::DM, 100);
        assert!(ReadWordCommand::new(nodes(), 1, addr, 0).is_err());
        assert!(ReadWordCommand::new(nodes(), 1, addr, 1000).is_err());
        assert!(ReadWordCommand::new(nodes(), 1, addr, 999).is_ok());
    }

    #[test]
    fn test_word_command_rejects_bit_address() {
        let err = ReadWordCommand::new(nodes(), 1, RegisterAddress::bit(MemoryArea::WR, 1, 2), 1)
            .unwrap_err();
        assert!(matches!(err, FinsError::InvalidAddressing { .. }));
    }

    #[test]
    fn test_channel_out_of_range() {
        let addr = RegisterAddress {
            area: MemoryArea::DM,
            channel: 0x8000,
            bit: None,
        };
        assert!(matches!(
            ReadWordCommand::new(nodes(), 1, addr, 1).unwrap_err(),
            FinsError::InvalidAddressing { .. }
        ));
    }

    #[test]
    fn test_write_word_frame() {
        let cmd = WriteWordCommand::new(
            nodes(),
            0x02,
            RegisterAddress::word(MemoryArea::DM, 100),
            &[0x5678, 0x1234],
        )
        .unwrap();
        assert_eq!(
            frame_hex(&cmd.to_bytes()),
            "46494E530000001E0000000200000000\
             80000200010000220002\
             0102820064000002\
             56781234"
        );
    }

    #[test]
    fn test_write_without_words_rejected() {
        let addr = RegisterAddress::word(MemoryArea::DM, 100);
        assert!(WriteWordCommand::new(nodes(), 1, addr, &[]).is_err());
        assert!(WriteWordCommand::new(nodes(), 1, addr, &[0u16; 1000]).is_err());
    }

    #[test]
    fn test_read_bit_frame() {
        let cmd = ReadBitCommand::new(nodes(), 0x03, RegisterAddress::bit(MemoryArea::CIO, 0, 5), 1)
            .unwrap();
        assert_eq!(&cmd.to_bytes()[26..34], &[0x01, 0x01, 0x30, 0x00, 0x00, 0x05, 0x00, 0x01]);
    }

    #[test]
    fn test_bit_command_requires_bit() {
        let err = ReadBitCommand::new(nodes(), 1, RegisterAddress::word(MemoryArea::WR, 1), 1)
            .unwrap_err();
        assert!(matches!(err, FinsError::InvalidAddressing { .. }));

        let addr = RegisterAddress {
            area: MemoryArea::WR,
            channel: 1,
            bit: Some(16),
        };
        assert!(matches!(
            WriteBitCommand::new(nodes(), 1, addr, &[true]).unwrap_err(),
            FinsError::InvalidParameter { .. }
        ));
    }

    #[test]
    fn test_write_bit_frame() {
        let cmd = WriteBitCommand::new(
            nodes(),
            0x01,
            RegisterAddress::bit(MemoryArea::WR, 100, 1),
            &[true],
        )
        .unwrap();
        assert_eq!(
            frame_hex(&cmd.to_bytes()),
            "46494E530000001B0000000200000000\
             80000200010000220001\
             0102310064010001\
             01"
        );
    }

    #[test]
    fn test_write_bits_payload() {
        let cmd = WriteBitCommand::new(
            nodes(),
            0x01,
            RegisterAddress::bit(MemoryArea::DM, 10, 14),
            &[false, true, true],
        )
        .unwrap();
        let bytes = cmd.to_bytes();
        assert_eq!(bytes[28], 0x02);
        assert_eq!(&bytes[32..], &[0x00, 0x03, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn test_handshake_request() {
        assert_eq!(
            frame_hex(&HandshakeCommand::new().to_bytes()),
            "46494E530000000C000000000000000000000000"
        );
    }
}
