//! FINS/TCP envelope, FINS header and node addressing.
//!
//! Every FINS/TCP frame starts with a 16-byte envelope followed, for command
//! and response frames, by the 10-byte FINS header:
//!
//! | Offset | Content |
//! |--------|---------|
//! | 0-3 | ASCII `FINS` |
//! | 4-7 | big-endian length counted from offset 8 |
//! | 8-11 | envelope command: 0 node request, 1 node reply, 2 frame, 3 error |
//! | 12-15 | envelope error, value in byte 15 |
//! | 16 | ICF `0x80` on commands, `0xC0` on replies |
//! | 18 | gateway count `0x02` |
//! | 20 | PLC node (DA1) |
//! | 23 | client node (SA1) |
//! | 25 | service ID |
//!
//! Offsets 17, 19, 21, 22 and 24 (reserved, networks, units) stay zero.
//!
//! Node numbers are not configured: they are assigned by the PLC during the
//! handshake and carried around as a [`NodePair`].
//!
//! # Example
//!
//! ```
//! use omron_fins_driver::{FinsHeader, NodePair};
//!
//! let nodes = NodePair::new(0x22, 0x01);
//! let routed = FinsHeader::new_command(nodes, 0x07).to_bytes();
//! assert_eq!(routed[4], 0x01); // PLC node
//! assert_eq!(routed[7], 0x22); // local node
//! ```

use crate::error::{FinsError, Result};

/// ASCII magic at the start of every FINS/TCP frame.
pub const FINS_MAGIC: [u8; 4] = *b"FINS";

/// Size of the FINS/TCP envelope (magic, length, command, error).
pub const TCP_HEADER_SIZE: usize = 16;

/// Size of the routing header that follows the envelope.
pub const FINS_HEADER_SIZE: usize = 10;

/// Offset the envelope length field counts from.
pub const LENGTH_OFFSET: usize = 8;

/// Envelope command: client node address request (handshake).
pub const TCP_NODE_REQUEST: u32 = 0x0000_0000;
/// Envelope command: server node address reply (handshake).
pub const TCP_NODE_RESPONSE: u32 = 0x0000_0001;
/// Envelope command: FINS frame send.
pub const TCP_FRAME_SEND: u32 = 0x0000_0002;
/// Envelope command: FINS frame send error notification.
pub const TCP_FRAME_ERROR: u32 = 0x0000_0003;

/// Local and remote node numbers learned during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodePair {
    /// Node number the PLC assigned to this client.
    pub local: u8,
    /// Node number of the PLC.
    pub remote: u8,
}

impl NodePair {
    /// Creates a node pair.
    pub fn new(local: u8, remote: u8) -> Self {
        Self { local, remote }
    }
}

/// The 16-byte FINS/TCP envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpEnvelope {
    /// Byte count from offset 8 to the end of the frame.
    pub length: u32,
    /// Envelope command.
    pub command: u32,
    /// Envelope error code.
    pub error_code: u32,
}

impl TcpEnvelope {
    /// Creates an envelope for a frame whose total size is `frame_len`.
    pub fn for_frame(command: u32, frame_len: usize) -> Self {
        Self {
            length: (frame_len - LENGTH_OFFSET) as u32,
            command,
            error_code: 0,
        }
    }

    /// Serializes the envelope.
    pub fn to_bytes(self) -> [u8; TCP_HEADER_SIZE] {
        let mut bytes = [0u8; TCP_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&FINS_MAGIC);
        bytes[4..8].copy_from_slice(&self.length.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.command.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.error_code.to_be_bytes());
        bytes
    }

    /// Parses an envelope.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidResponse` if the slice is too short or the
    /// magic is not `FINS`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < TCP_HEADER_SIZE {
            return Err(FinsError::invalid_response(format!(
                "envelope too short: expected {} bytes, got {}",
                TCP_HEADER_SIZE,
                data.len()
            )));
        }
        if data[0..4] != FINS_MAGIC {
            return Err(FinsError::invalid_response(format!(
                "bad magic {:02X?}",
                &data[0..4]
            )));
        }
        Ok(Self {
            length: read_u32(&data[4..8]),
            command: read_u32(&data[8..12]),
            error_code: read_u32(&data[12..16]),
        })
    }
}

/// Reads the length field of a FINS/TCP frame prefix (at least 8 bytes).
///
/// # Errors
///
/// Returns `FinsError::InvalidResponse` if the magic is wrong.
pub(crate) fn frame_length(prefix: &[u8; LENGTH_OFFSET]) -> Result<usize> {
    if prefix[0..4] != FINS_MAGIC {
        return Err(FinsError::invalid_response(format!(
            "bad magic {:02X?}",
            &prefix[0..4]
        )));
    }
    Ok(read_u32(&prefix[4..8]) as usize)
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// ICF bit set on frames that expect an answer.
const ICF_NEEDS_REPLY: u8 = 0x80;
/// ICF bit set on frames sent by the PLC.
const ICF_REPLY: u8 = 0x40;
/// Gateway count the PLC expects on locally routed frames.
const GATEWAY_COUNT: u8 = 0x02;

/// Routing part of a FINS frame.
///
/// The driver only talks to the CPU unit on the local network, so network
/// and unit bytes are always zero and only the node numbers vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinsHeader {
    /// Information control field.
    pub icf: u8,
    /// Gateway count.
    pub gct: u8,
    /// Destination node (DA1).
    pub destination: u8,
    /// Source node (SA1).
    pub source: u8,
    /// Service ID, echoed back by the PLC.
    pub sid: u8,
}

impl FinsHeader {
    /// Header for a command from `nodes.local` to `nodes.remote`.
    pub fn new_command(nodes: NodePair, sid: u8) -> Self {
        Self {
            icf: ICF_NEEDS_REPLY,
            gct: GATEWAY_COUNT,
            destination: nodes.remote,
            source: nodes.local,
            sid,
        }
    }

    /// Encodes the ten header bytes.
    pub fn to_bytes(self) -> [u8; FINS_HEADER_SIZE] {
        let mut bytes = [0u8; FINS_HEADER_SIZE];
        bytes[0] = self.icf;
        bytes[2] = self.gct;
        bytes[4] = self.destination;
        bytes[7] = self.source;
        bytes[9] = self.sid;
        bytes
    }

    /// Decodes a header from the start of `data`.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidResponse` when fewer than ten bytes are given.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let Some(bytes) = data.get(..FINS_HEADER_SIZE) else {
            return Err(FinsError::invalid_response(format!(
                "FINS header needs {} bytes, frame has {}",
                FINS_HEADER_SIZE,
                data.len()
            )));
        };
        Ok(Self {
            icf: bytes[0],
            gct: bytes[2],
            destination: bytes[4],
            source: bytes[7],
            sid: bytes[9],
        })
    }

    /// True when the PLC sent this header.
    pub fn is_response(self) -> bool {
        self.icf & ICF_REPLY == ICF_REPLY
    }
}
