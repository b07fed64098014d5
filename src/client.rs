//! Typed register access over a [`TcpTransport`].
//!
//! [`Client`] turns address text and typed values into FINS frames, sends
//! them through the transport and assembles typed results:
//!
//! | Operation | Words | Notes |
//! |-----------|-------|-------|
//! | `read_word` / `write_word` | 1 | raw 16-bit value |
//! | `read_i32` / `write_i32` | 2 | low word first |
//! | `read_f32` / `write_f32` | 2 | low word first, bit-exact |
//! | `read_bit` / `write_bit` | - | address needs `.bit` |
//! | `get` / `set` | any | dynamic [`ValueKind`] / [`RegisterValue`] |
//! | `get_as` / `set_as` | any | static [`RegisterType`] |
//!
//! Every operation is one request and one response. Nothing is retried; a
//! transport failure is returned to the caller and the health monitor takes
//! care of the connection.
//!
//! # Example
//!
//! ```no_run
//! use omron_fins_driver::{Client, TcpTransport, TransportConfig};
//!
//! let transport = TcpTransport::connect(TransportConfig::new([192, 168, 250, 1]))?;
//! let client = Client::new(&transport);
//!
//! let speed = client.read_word("D2202")?;
//! let ready = client.read_bit("W100.1")?;
//! client.write_f32("D300", 25.5)?;
//! let count: i32 = client.get_as("D400")?;
//! # Ok::<(), omron_fins_driver::FinsError>(())
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

use crate::address::{IntoRegisterAddress, RegisterAddress};
use crate::command::{
    ReadBitCommand, ReadWordCommand, WriteBitCommand, WriteWordCommand, MRC_MEMORY,
    SRC_MEMORY_READ, SRC_MEMORY_WRITE,
};
use crate::error::{FinsError, Result};
use crate::header::NodePair;
use crate::response::FinsResponse;
use crate::transport::TcpTransport;
use crate::value::{RegisterType, RegisterValue, ValueKind};

/// Typed register access bound to one transport.
///
/// Cheap to create; several clients may share a transport.
#[derive(Debug)]
pub struct Client<'t> {
    transport: &'t TcpTransport,
    sid_counter: AtomicU8,
}

impl<'t> Client<'t> {
    /// Creates a client on top of a connected transport.
    pub fn new(transport: &'t TcpTransport) -> Self {
        Self {
            transport,
            sid_counter: AtomicU8::new(0),
        }
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &'t TcpTransport {
        self.transport
    }

    fn next_sid(&self) -> u8 {
        self.sid_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Sends one memory-area command built from the node pair and a fresh
    /// SID, then validates SID, echoed command code and end code.
    fn request<F>(&self, sub_code: u8, build: F) -> Result<FinsResponse>
    where
        F: FnOnce(NodePair, u8) -> Result<Vec<u8>>,
    {
        let sid = self.next_sid();
        let bytes = self.transport.transact(|nodes| build(nodes, sid))?;
        let response = FinsResponse::from_bytes(&bytes)?;
        response.check_sid(sid)?;
        response.check_command(MRC_MEMORY, sub_code)?;
        response.check_error()?;
        Ok(response)
    }

    /// Reads `count` consecutive words.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is malformed or carries a bit, the
    /// count is 0 or above 999, communication fails or the PLC reports an
    /// end code.
    pub fn read_words(&self, address: impl IntoRegisterAddress, count: u16) -> Result<Vec<u16>> {
        let address = address.into_register_address()?;
        let response = self.request(SRC_MEMORY_READ, |nodes, sid| {
            Ok(ReadWordCommand::new(nodes, sid, address, count)?.to_bytes())
        })?;
        let words = response.to_words()?;
        if words.len() != count as usize {
            return Err(FinsError::invalid_response(format!(
                "expected {} words, got {}",
                count,
                words.len()
            )));
        }
        Ok(words)
    }

    /// Reads one word.
    ///
    /// # Errors
    ///
    /// Same as [`read_words`](Self::read_words).
    pub fn read_word(&self, address: impl IntoRegisterAddress) -> Result<u16> {
        Ok(self.read_words(address, 1)?[0])
    }

    /// Writes consecutive words.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is malformed or carries a bit, `words`
    /// is empty or longer than 999, communication fails or the PLC reports an
    /// end code.
    pub fn write_words(&self, address: impl IntoRegisterAddress, words: &[u16]) -> Result<()> {
        let address = address.into_register_address()?;
        self.request(SRC_MEMORY_WRITE, |nodes, sid| {
            Ok(WriteWordCommand::new(nodes, sid, address, words)?.to_bytes())
        })?;
        Ok(())
    }

    /// Writes one word.
    ///
    /// # Errors
    ///
    /// Same as [`write_words`](Self::write_words).
    pub fn write_word(&self, address: impl IntoRegisterAddress, word: u16) -> Result<()> {
        self.write_words(address, &[word])
    }

    /// Reads `count` consecutive bits starting at a bit address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address has no bit or the bit is above 15,
    /// communication fails or the PLC reports an end code.
    pub fn read_bits(&self, address: impl IntoRegisterAddress, count: u16) -> Result<Vec<bool>> {
        let address = address.into_register_address()?;
        let response = self.request(SRC_MEMORY_READ, |nodes, sid| {
            Ok(ReadBitCommand::new(nodes, sid, address, count)?.to_bytes())
        })?;
        let bits = response.to_bits();
        if bits.len() != count as usize {
            return Err(FinsError::invalid_response(format!(
                "expected {} bits, got {}",
                count,
                bits.len()
            )));
        }
        Ok(bits)
    }

    /// Reads one bit.
    ///
    /// # Errors
    ///
    /// Same as [`read_bits`](Self::read_bits).
    pub fn read_bit(&self, address: impl IntoRegisterAddress) -> Result<bool> {
        Ok(self.read_bits(address, 1)?[0])
    }

    /// Writes consecutive bits starting at a bit address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address has no bit or the bit is above 15,
    /// `values` is empty or too long, communication fails or the PLC reports
    /// an end code.
    pub fn write_bits(&self, address: impl IntoRegisterAddress, values: &[bool]) -> Result<()> {
        let address = address.into_register_address()?;
        self.request(SRC_MEMORY_WRITE, |nodes, sid| {
            Ok(WriteBitCommand::new(nodes, sid, address, values)?.to_bytes())
        })?;
        Ok(())
    }

    /// Writes one bit.
    ///
    /// # Errors
    ///
    /// Same as [`write_bits`](Self::write_bits).
    pub fn write_bit(&self, address: impl IntoRegisterAddress, value: bool) -> Result<()> {
        self.write_bits(address, &[value])
    }

    /// Reads a signed 32-bit integer from two words, low word first.
    ///
    /// # Errors
    ///
    /// Same as [`read_words`](Self::read_words).
    pub fn read_i32(&self, address: impl IntoRegisterAddress) -> Result<i32> {
        self.get_as(address)
    }

    /// Writes a signed 32-bit integer to two words, low word first.
    ///
    /// # Errors
    ///
    /// Same as [`write_words`](Self::write_words).
    pub fn write_i32(&self, address: impl IntoRegisterAddress, value: i32) -> Result<()> {
        self.set_as(address, value)
    }

    /// Reads a single-precision float from two words, low word first.
    ///
    /// # Errors
    ///
    /// Same as [`read_words`](Self::read_words).
    pub fn read_f32(&self, address: impl IntoRegisterAddress) -> Result<f32> {
        self.get_as(address)
    }

    /// Writes a single-precision float to two words, low word first.
    ///
    /// # Errors
    ///
    /// Same as [`write_words`](Self::write_words).
    pub fn write_f32(&self, address: impl IntoRegisterAddress, value: f32) -> Result<()> {
        self.set_as(address, value)
    }

    /// Reads one value of the given kind.
    ///
    /// # Errors
    ///
    /// Returns the errors of the underlying bit or word read.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use omron_fins_driver::{Client, RegisterValue, TcpTransport, TransportConfig, ValueKind};
    ///
    /// let transport = TcpTransport::connect(TransportConfig::new([192, 168, 250, 1]))?;
    /// let client = Client::new(&transport);
    /// let kind = ValueKind::from_name("float")?;
    /// if let RegisterValue::Float32(temp) = client.get("D100", kind)? {
    ///     println!("temperature {temp}");
    /// }
    /// # Ok::<(), omron_fins_driver::FinsError>(())
    /// ```
    pub fn get(&self, address: impl IntoRegisterAddress, kind: ValueKind) -> Result<RegisterValue> {
        let address = address.into_register_address()?;
        match kind.word_count() {
            None => self.read_bit(address).map(RegisterValue::Bit),
            Some(count) => {
                let words = self.read_words(address, count)?;
                RegisterValue::from_words(kind, &words)
            }
        }
    }

    /// Reads one value whose kind is given by name (`"bool"`, `"int16"`,
    /// `"int32"`, `"float"`, ...).
    ///
    /// # Errors
    ///
    /// Returns `FinsError::UnsupportedType` for an unknown name, otherwise
    /// the errors of [`get`](Self::get).
    pub fn get_named(
        &self,
        address: impl IntoRegisterAddress,
        type_name: &str,
    ) -> Result<RegisterValue> {
        let kind = ValueKind::from_name(type_name)?;
        self.get(address, kind)
    }

    /// Reads `count` consecutive values of one kind in a single request.
    ///
    /// 32-bit kinds read `2 * count` words.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidParameter` if the request would exceed 999
    /// items, otherwise the errors of the underlying read.
    pub fn get_many(
        &self,
        address: impl IntoRegisterAddress,
        kind: ValueKind,
        count: u16,
    ) -> Result<Vec<RegisterValue>> {
        let address = address.into_register_address()?;
        match kind.word_count() {
            None => Ok(self
                .read_bits(address, count)?
                .into_iter()
                .map(RegisterValue::Bit)
                .collect()),
            Some(per_value) => {
                let total = count.checked_mul(per_value).ok_or_else(|| {
                    FinsError::invalid_parameter("count", "too many values for one request")
                })?;
                let words = self.read_words(address, total)?;
                words
                    .chunks_exact(per_value as usize)
                    .map(|chunk| RegisterValue::from_words(kind, chunk))
                    .collect()
            }
        }
    }

    /// Writes one value.
    ///
    /// # Errors
    ///
    /// Returns the errors of the underlying bit or word write.
    pub fn set(&self, address: impl IntoRegisterAddress, value: RegisterValue) -> Result<()> {
        match value {
            RegisterValue::Bit(bit) => self.write_bit(address, bit),
            _ => {
                let words = value.to_words().unwrap_or_default();
                self.write_words(address, &words)
            }
        }
    }

    /// Writes consecutive values of one kind in a single request.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidParameter` if `values` is empty or mixes
    /// kinds, otherwise the errors of the underlying write.
    pub fn set_many(
        &self,
        address: impl IntoRegisterAddress,
        values: &[RegisterValue],
    ) -> Result<()> {
        let address: RegisterAddress = address.into_register_address()?;
        let kind = values
            .first()
            .map(RegisterValue::kind)
            .ok_or_else(|| FinsError::invalid_parameter("values", "must not be empty"))?;
        if values.iter().any(|v| v.kind() != kind) {
            return Err(FinsError::invalid_parameter(
                "values",
                "all values must have the same kind",
            ));
        }

        if kind == ValueKind::Bit {
            let bits: Vec<bool> = values
                .iter()
                .map(|v| matches!(v, RegisterValue::Bit(true)))
                .collect();
            self.write_bits(address, &bits)
        } else {
            let words: Vec<u16> = values
                .iter()
                .filter_map(RegisterValue::to_words)
                .flatten()
                .collect();
            self.write_words(address, &words)
        }
    }

    /// Reads a value as a Rust type.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn get_as<T: RegisterType>(&self, address: impl IntoRegisterAddress) -> Result<T> {
        T::from_value(self.get(address, T::KIND)?)
    }

    /// Writes a value from a Rust type.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub fn set_as<T: RegisterType>(
        &self,
        address: impl IntoRegisterAddress,
        value: T,
    ) -> Result<()> {
        self.set(address, value.into_value())
    }
}
