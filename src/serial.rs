//! Serial transport for Host Link frames.
//!
//! The serial device gives no completion signal, so every exchange writes the
//! frame, waits a fixed settle delay and then drains whatever has arrived.
//! The raw bytes are handed back unparsed.
//!
//! # Example
//!
//! ```no_run
//! use omron_fins_driver::{SerialConfig, SerialTransport};
//!
//! let serial = SerialTransport::open(SerialConfig::new("/dev/ttyUSB0"))?;
//! let reply = serial.write_bit("I8.1", true)?;
//! println!("{}", String::from_utf8_lossy(&reply));
//! # Ok::<(), omron_fins_driver::FinsError>(())
//! ```

use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_serial::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::address::IntoRegisterAddress;
use crate::error::{FinsError, Result};
use crate::hostlink::HostLinkCommand;

/// Default baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default delay between writing a frame and draining the reply.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Default port read/write timeout.
pub const DEFAULT_SERIAL_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for a [`SerialTransport`].
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port name, e.g. `COM3` or `/dev/ttyUSB0`.
    pub port_name: String,
    /// Baud rate (default 115200).
    pub baud_rate: u32,
    /// Data bits (default 8).
    pub data_bits: DataBits,
    /// Stop bits (default 1).
    pub stop_bits: StopBits,
    /// Parity (default none).
    pub parity: Parity,
    /// Wait after each write before the reply is drained.
    pub settle_delay: Duration,
    /// Port read/write timeout.
    pub timeout: Duration,
}

impl SerialConfig {
    /// Creates a configuration with 115200 8N1 and a 200 ms settle delay.
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            settle_delay: DEFAULT_SETTLE_DELAY,
            timeout: DEFAULT_SERIAL_TIMEOUT,
        }
    }

    /// Sets the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Sets the settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the port timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Host Link exchange over a serial port.
pub struct SerialTransport {
    port: Mutex<Option<Box<dyn SerialPort>>>,
    config: SerialConfig,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port_name", &self.config.port_name)
            .field("open", &self.port.lock().is_some())
            .finish()
    }
}

impl SerialTransport {
    /// Opens the configured port.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::Io` if the port cannot be opened.
    pub fn open(config: SerialConfig) -> Result<Self> {
        let port = tokio_serial::new(&config.port_name, config.baud_rate)
            .data_bits(config.data_bits)
            .stop_bits(config.stop_bits)
            .parity(config.parity)
            .timeout(config.timeout)
            .open()
            .map_err(io::Error::from)?;
        info!(port = %config.port_name, baud = config.baud_rate, "serial port opened");
        Ok(Self {
            port: Mutex::new(Some(port)),
            config,
        })
    }

    /// Returns the port name.
    pub fn port_name(&self) -> &str {
        &self.config.port_name
    }

    /// Writes a frame, waits the settle delay and returns everything received.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::NotConnected` after [`close`](Self::close), or
    /// `FinsError::Io` if the port fails.
    pub fn exchange(&self, frame: &[u8]) -> Result<Vec<u8>> {
        let mut guard = self.port.lock();
        let port = guard.as_mut().ok_or(FinsError::NotConnected)?;

        port.clear(ClearBuffer::Input).map_err(io::Error::from)?;
        port.write_all(frame)?;
        port.flush()?;
        debug!(port = %self.config.port_name, sent = frame.len(), "serial frame sent");

        thread::sleep(self.config.settle_delay);

        let pending = port.bytes_to_read().map_err(io::Error::from)? as usize;
        let mut reply = vec![0u8; pending];
        port.read_exact(&mut reply)?;
        debug!(port = %self.config.port_name, received = reply.len(), "serial reply drained");
        Ok(reply)
    }

    /// Reads one bit; returns the raw reply.
    ///
    /// # Errors
    ///
    /// Returns an address error, or a transport error from [`exchange`](Self::exchange).
    pub fn read_bit(&self, address: impl IntoRegisterAddress) -> Result<Vec<u8>> {
        let cmd = HostLinkCommand::read_bit(address.into_register_address()?)?;
        self.exchange(&cmd.to_bytes())
    }

    /// Writes one bit; returns the raw reply.
    ///
    /// # Errors
    ///
    /// Returns an address error, or a transport error from [`exchange`](Self::exchange).
    pub fn write_bit(&self, address: impl IntoRegisterAddress, value: bool) -> Result<Vec<u8>> {
        let cmd = HostLinkCommand::write_bit(address.into_register_address()?, value)?;
        self.exchange(&cmd.to_bytes())
    }

    /// Closes the port. Later exchanges fail with `NotConnected`.
    pub fn close(&self) {
        if self.port.lock().take().is_some() {
            info!(port = %self.config.port_name, "serial port closed");
        }
    }
}

/// Lists serial port names, ordered by their trailing number.
///
/// # Errors
///
/// Returns `FinsError::Io` if the ports cannot be enumerated.
pub fn available_ports() -> Result<Vec<String>> {
    let names = tokio_serial::available_ports()
        .map_err(io::Error::from)?
        .into_iter()
        .map(|info| info.port_name)
        .collect();
    Ok(sort_ports(names))
}

fn port_number(name: &str) -> u32 {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    name[name.len() - digits..].parse().unwrap_or(0)
}

fn sort_ports(mut names: Vec<String>) -> Vec<String> {
    names.sort_by_key(|name| port_number(name));
    names
}
