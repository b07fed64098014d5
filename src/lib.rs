//! # Omron FINS Register Driver
//!
//! Read and write Omron PLC memory registers with the FINS protocol over
//! TCP, or flip single bits over a Host Link serial line.
//!
//! The driver covers the protocol and the connection lifecycle only:
//!
//! - **Addressing**: `D2202`, `W100.1`, `C5`... parsed into [`RegisterAddress`]
//! - **Framing**: FINS/TCP frames ([`command`], [`response`]) and Host Link ASCII
//!   frames ([`hostlink`])
//! - **Classification**: header errors and end codes grouped into [`EndCodeCategory`]
//! - **Connection**: handshake, per-call timeout, periodic health probe and
//!   reconnect ([`TcpTransport`])
//! - **Typed access**: words, bits, `i32` and `f32` through [`Client`]
//!
//! Every failure is returned as a [`FinsError`]; nothing panics.
//!
//! ## Quick Start
//!
//! ```no_run
//! use omron_fins_driver::{Client, RegisterValue, TcpTransport, TransportConfig};
//!
//! fn main() -> omron_fins_driver::Result<()> {
//!     let transport = TcpTransport::connect(TransportConfig::new([192, 168, 250, 1]))?;
//!     let client = Client::new(&transport);
//!
//!     // One word from data memory
//!     let speed = client.read_word("D2202")?;
//!     println!("D2202 = {speed}");
//!
//!     // Work-area bit
//!     client.write_bit("W100.1", true)?;
//!
//!     // Two-word values, low word first
//!     client.write_f32("D300", 25.5)?;
//!     let total = client.read_i32("D400")?;
//!     println!("D400 = {total}");
//!
//!     // Dynamic kinds for callers that only know a type name
//!     let value = client.get_named("D500", "int16")?;
//!     client.set("D501", RegisterValue::Word16(7))?;
//!     println!("D500 = {value:?}");
//!
//!     transport.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use omron_fins_driver::{Client, ErrorKind, FinsError, TcpTransport, TransportConfig};
//!
//! let transport = TcpTransport::connect(TransportConfig::new([192, 168, 250, 1]))?;
//! let client = Client::new(&transport);
//!
//! match client.read_word("D40000") {
//!     Ok(value) => println!("{value}"),
//!     Err(e) if e.is_retryable() => println!("try again later: {e}"),
//!     Err(e) if e.kind() == ErrorKind::InvalidInput => println!("bad request: {e}"),
//!     Err(FinsError::PlcError { main_code, sub_code }) => {
//!         println!("PLC refused: {main_code:02X}{sub_code:02X}")
//!     }
//!     Err(e) => println!("{e}"),
//! }
//! # Ok::<(), FinsError>(())
//! ```
//!
//! ## Logging
//!
//! The crate logs through [`tracing`]: connects, handshakes and closes at
//! `info`, probe failures and reconnects at `warn`, failed reconnects at
//! `error`, frame sizes at `debug`. Install any subscriber to see them.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod address;
mod classify;
mod client;
pub mod command;
mod error;
mod header;
mod health;
pub mod hostlink;
mod memory;
pub mod response;
mod serial;
mod transport;
mod value;

// Public re-exports
pub use address::{resolve, IntoRegisterAddress, RegisterAddress, MAX_BIT, MAX_CHANNEL};
pub use classify::{
    check_header, end_code_description, EndCode, EndCodeCategory, ErrorOutcome, HeaderError,
    SUB_CODE_PLC_ALARM,
};
pub use client::Client;
pub use command::{
    HandshakeCommand, ReadBitCommand, ReadWordCommand, WriteBitCommand, WriteWordCommand,
    MAX_ITEMS_PER_COMMAND,
};
pub use error::{ErrorKind, FinsError, Result};
pub use header::{FinsHeader, NodePair, TcpEnvelope, FINS_HEADER_SIZE, TCP_HEADER_SIZE};
pub use health::{HealthConfig, Probe, TcpProbe, DEFAULT_PROBE_INTERVAL, DEFAULT_PROBE_TIMEOUT};
pub use hostlink::HostLinkCommand;
pub use memory::{Access, MemoryArea};
pub use response::{FinsResponse, HandshakeResponse};
pub use serial::{available_ports, SerialConfig, SerialTransport};
pub use transport::{
    ConnectionState, TcpTransport, TransportConfig, DEFAULT_FINS_PORT, DEFAULT_TIMEOUT,
};
pub use value::{
    bytes_to_words, decode_f32, decode_i32, encode_f32, encode_i32, words_to_bytes, RegisterType,
    RegisterValue, ValueKind,
};
