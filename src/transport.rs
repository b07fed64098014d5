//! FINS/TCP transport with handshake, health check and reconnect.
//!
//! [`TcpTransport`] owns one TCP connection to the PLC. Opening it runs the
//! node-address handshake; every request then holds the connection lock for
//! a complete send + receive cycle, so frames from different threads never
//! interleave on the socket. A reconnect takes the same lock, which means no
//! request ever sees a half-updated [`NodePair`].
//!
//! # State machine
//!
//! ```text
//! Disconnected -> Connecting -> Handshaking -> Connected
//!                     ^                          |
//!                     |    probe failure /       |
//!                     +---- Reconnecting <-------+
//!                           channel lost
//! ```
//!
//! `close()` moves to `Disconnected` from any state.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use omron_fins_driver::{TcpTransport, TransportConfig};
//!
//! let config = TransportConfig::new([192, 168, 250, 1])
//!     .with_timeout(Duration::from_secs(1));
//! let transport = TcpTransport::connect(config)?;
//! println!("connected as node {}", transport.nodes().local);
//! transport.close();
//! # Ok::<(), omron_fins_driver::FinsError>(())
//! ```

use std::io::{self, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::command::HandshakeCommand;
use crate::error::{FinsError, Result};
use crate::header::{frame_length, NodePair, LENGTH_OFFSET};
use crate::health::{HealthConfig, HealthMonitor, Probe, TcpProbe};
use crate::response::{HandshakeResponse, HANDSHAKE_RESPONSE_SIZE};

/// Default FINS/TCP port.
pub const DEFAULT_FINS_PORT: u16 = 9600;

/// Default timeout for connect, send and receive.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Largest length field accepted in a received frame.
pub const MAX_FRAME_LENGTH: usize = 4096;

/// Configuration for a [`TcpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// PLC socket address.
    pub plc_addr: SocketAddr,
    /// Connect, read and write timeout.
    pub timeout: Duration,
    /// Health-check settings.
    pub health: HealthConfig,
}

impl TransportConfig {
    /// Creates a configuration for the PLC at `ip`, port 9600.
    ///
    /// # Example
    ///
    /// ```
    /// use std::net::Ipv4Addr;
    /// use omron_fins_driver::TransportConfig;
    ///
    /// let config = TransportConfig::new(Ipv4Addr::new(192, 168, 250, 1));
    /// assert_eq!(config.plc_addr.port(), 9600);
    /// ```
    pub fn new(ip: impl Into<IpAddr>) -> Self {
        Self::from_socket_addr(SocketAddr::new(ip.into(), DEFAULT_FINS_PORT))
    }

    /// Creates a configuration for an explicit socket address.
    pub fn from_socket_addr(plc_addr: SocketAddr) -> Self {
        Self {
            plc_addr,
            timeout: DEFAULT_TIMEOUT,
            health: HealthConfig::default(),
        }
    }

    /// Sets a custom PLC port (default is 9600).
    pub fn with_port(mut self, port: u16) -> Self {
        self.plc_addr.set_port(port);
        self
    }

    /// Sets the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the health-check settings.
    pub fn with_health(mut self, health: HealthConfig) -> Self {
        self.health = health;
        self
    }
}

/// Lifecycle state of a [`TcpTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// No channel; either never opened or closed.
    Disconnected = 0,
    /// TCP connect in progress.
    Connecting = 1,
    /// Waiting for the node-address reply.
    Handshaking = 2,
    /// Ready for requests.
    Connected = 3,
    /// Channel lost or unhealthy; the monitor is re-establishing it.
    Reconnecting = 4,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Handshaking,
            3 => Self::Connected,
            4 => Self::Reconnecting,
            _ => Self::Disconnected,
        }
    }
}

#[derive(Debug, Default)]
struct Connection {
    stream: Option<TcpStream>,
    nodes: NodePair,
    last_health_check: Option<Instant>,
}

struct Shared {
    config: TransportConfig,
    probe: Box<dyn Probe>,
    state: AtomicU8,
    closed: AtomicBool,
    failures: AtomicU32,
    conn: Mutex<Connection>,
    /// Clone of the live socket, used by `close()` to unblock a pending read.
    interrupt: Mutex<Option<TcpStream>>,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Connects and handshakes, storing the new stream in `conn`.
    fn open(&self, conn: &mut Connection) -> Result<()> {
        let addr = self.config.plc_addr;
        let timeout = self.config.timeout;

        self.set_state(ConnectionState::Connecting);
        let mut stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        self.set_state(ConnectionState::Handshaking);
        let nodes = handshake(&mut stream)?;
        info!(%addr, local = nodes.local, remote = nodes.remote, "FINS handshake complete");

        *self.interrupt.lock() = Some(stream.try_clone()?);
        conn.stream = Some(stream);
        conn.nodes = nodes;
        conn.last_health_check = Some(Instant::now());
        self.failures.store(0, Ordering::SeqCst);

        if self.closed.load(Ordering::SeqCst) {
            // close() raced with the reconnect; do not resurrect the channel.
            drop_stream(self, conn);
            self.set_state(ConnectionState::Disconnected);
            return Err(FinsError::NotConnected);
        }
        self.set_state(ConnectionState::Connected);
        Ok(())
    }

    fn check_health(&self) -> ConnectionState {
        if self.closed.load(Ordering::SeqCst) {
            return ConnectionState::Disconnected;
        }
        let addr = self.config.plc_addr;
        let reachable = self
            .probe
            .is_reachable(addr, self.config.health.probe_timeout);
        let lost = {
            let mut conn = self.conn.lock();
            conn.last_health_check = Some(Instant::now());
            conn.stream.is_none()
        };

        if reachable {
            self.failures.store(0, Ordering::SeqCst);
            if !lost {
                debug!(%addr, "health probe ok");
                return self.state();
            }
        } else {
            let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
            warn!(%addr, failures, "health probe failed");
            if failures < self.config.health.failure_threshold && !lost {
                return self.state();
            }
        }

        self.reconnect()
    }

    fn reconnect(&self) -> ConnectionState {
        let addr = self.config.plc_addr;
        let mut conn = self.conn.lock();
        if self.closed.load(Ordering::SeqCst) {
            return ConnectionState::Disconnected;
        }
        self.set_state(ConnectionState::Reconnecting);
        warn!(%addr, "reconnecting to PLC");
        drop_stream(self, &mut conn);

        match self.open(&mut conn) {
            Ok(()) => {
                info!(%addr, "reconnected to PLC");
                ConnectionState::Connected
            }
            Err(e) => {
                error!(%addr, error = %e, "reconnect failed");
                if !self.closed.load(Ordering::SeqCst) {
                    self.set_state(ConnectionState::Reconnecting);
                }
                self.state()
            }
        }
    }
}

fn drop_stream(shared: &Shared, conn: &mut Connection) {
    if let Some(stream) = conn.stream.take() {
        let _ = stream.shutdown(Shutdown::Both);
    }
    shared.interrupt.lock().take();
}

fn handshake(stream: &mut TcpStream) -> Result<NodePair> {
    stream.write_all(&HandshakeCommand::new().to_bytes())?;
    let mut reply = [0u8; HANDSHAKE_RESPONSE_SIZE];
    read_full(stream, &mut reply)?;
    let reply = HandshakeResponse::from_bytes(&reply)?;
    Ok(NodePair::new(reply.client_node, reply.server_node))
}

fn map_io(e: io::Error) -> FinsError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => FinsError::Timeout,
        _ => FinsError::Io(e),
    }
}

/// Fills `buf` completely or fails with `ConnectionClosed` on EOF.
fn read_full(stream: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(FinsError::ConnectionClosed {
                    expected: buf.len(),
                    received: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(map_io(e)),
        }
    }
    Ok(())
}

/// Writes a frame and reads one complete FINS/TCP frame back.
fn exchange(stream: &mut TcpStream, frame: &[u8]) -> Result<Vec<u8>> {
    stream.write_all(frame).map_err(map_io)?;

    let mut prefix = [0u8; LENGTH_OFFSET];
    read_full(stream, &mut prefix)?;
    let length = frame_length(&prefix)?;
    if length > MAX_FRAME_LENGTH {
        return Err(FinsError::invalid_response(format!(
            "frame length {} exceeds {}",
            length, MAX_FRAME_LENGTH
        )));
    }

    let mut response = vec![0u8; LENGTH_OFFSET + length];
    response[..LENGTH_OFFSET].copy_from_slice(&prefix);
    read_full(stream, &mut response[LENGTH_OFFSET..])?;
    Ok(response)
}

/// FINS/TCP connection to one PLC.
///
/// The transport is `Send + Sync`; share it between threads by reference or
/// in an `Arc`. Dropping it closes the connection.
pub struct TcpTransport {
    shared: Arc<Shared>,
    monitor: Mutex<Option<HealthMonitor>>,
}

impl TcpTransport {
    /// Connects to the PLC, performs the handshake and starts the health monitor.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the socket cannot be opened or
    /// `FinsError::HandshakeFailed` if the PLC rejects the node request.
    pub fn connect(config: TransportConfig) -> Result<Self> {
        Self::connect_with_probe(config, TcpProbe)
    }

    /// Like [`connect`](Self::connect) with a custom reachability probe.
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect), plus `FinsError::Io` when
    /// `probe_on_connect` is set and the probe fails.
    pub fn connect_with_probe(
        config: TransportConfig,
        probe: impl Probe + 'static,
    ) -> Result<Self> {
        let addr = config.plc_addr;
        if config.health.probe_on_connect && !probe.is_reachable(addr, config.health.probe_timeout)
        {
            return Err(FinsError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{} did not answer the reachability probe", addr),
            )));
        }

        let shared = Arc::new(Shared {
            config,
            probe: Box::new(probe),
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            closed: AtomicBool::new(false),
            failures: AtomicU32::new(0),
            conn: Mutex::new(Connection::default()),
            interrupt: Mutex::new(None),
        });

        {
            let mut conn = shared.conn.lock();
            if let Err(e) = shared.open(&mut conn) {
                shared.set_state(ConnectionState::Disconnected);
                error!(%addr, error = %e, "connect failed");
                return Err(e);
            }
        }
        info!(%addr, "connected to PLC");

        let monitor = if shared.config.health.enabled {
            let weak: Weak<Shared> = Arc::downgrade(&shared);
            Some(HealthMonitor::spawn(
                shared.config.health.interval,
                move || match weak.upgrade() {
                    Some(shared) => {
                        shared.check_health();
                        true
                    }
                    None => false,
                },
            )?)
        } else {
            None
        };

        Ok(Self {
            shared,
            monitor: Mutex::new(monitor),
        })
    }

    /// Sends one request and returns the complete response frame.
    ///
    /// `build` receives the current node pair and returns the frame to send.
    /// The connection lock is held from building the frame until the reply
    /// has been read. On a transport failure the channel is dropped and the
    /// health monitor reconnects on its next tick.
    ///
    /// # Errors
    ///
    /// - `FinsError::NotConnected` if closed or waiting for a reconnect
    /// - `FinsError::Timeout`, `FinsError::ConnectionClosed`, `FinsError::Io`
    ///   on transport failure
    /// - any error returned by `build` (the channel is kept)
    pub fn transact<F>(&self, build: F) -> Result<Vec<u8>>
    where
        F: FnOnce(NodePair) -> Result<Vec<u8>>,
    {
        let shared = &self.shared;
        let mut conn = shared.conn.lock();
        if shared.closed.load(Ordering::SeqCst) {
            return Err(FinsError::NotConnected);
        }
        let nodes = conn.nodes;
        let stream = conn.stream.as_mut().ok_or(FinsError::NotConnected)?;
        let frame = build(nodes)?;

        debug!(sent = frame.len(), "FINS frame sent");
        match exchange(stream, &frame) {
            Ok(response) => {
                debug!(received = response.len(), "FINS frame received");
                Ok(response)
            }
            Err(e) => {
                warn!(error = %e, "FINS exchange failed; dropping channel");
                drop_stream(shared, &mut conn);
                if !shared.closed.load(Ordering::SeqCst) {
                    shared.set_state(ConnectionState::Reconnecting);
                }
                Err(e)
            }
        }
    }

    /// Runs one health check now: probe, and reconnect if needed.
    ///
    /// The background monitor calls this on every tick.
    pub fn check_health(&self) -> ConnectionState {
        self.shared.check_health()
    }

    /// Returns the current state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Returns whether requests can currently be sent.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns the node pair from the latest handshake.
    pub fn nodes(&self) -> NodePair {
        self.shared.conn.lock().nodes
    }

    /// Returns when the last health check (or handshake) ran.
    pub fn last_health_check(&self) -> Option<Instant> {
        self.shared.conn.lock().last_health_check
    }

    /// Returns the PLC address.
    pub fn plc_addr(&self) -> SocketAddr {
        self.shared.config.plc_addr
    }

    /// Closes the connection and stops the health monitor. Idempotent.
    ///
    /// A request blocked in another thread fails once the socket shuts down.
    /// Returns the resulting state, always [`ConnectionState::Disconnected`].
    pub fn close(&self) -> ConnectionState {
        let shared = &self.shared;
        if shared.closed.swap(true, Ordering::SeqCst) {
            return self.state();
        }
        if let Some(stream) = shared.interrupt.lock().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        {
            let mut conn = shared.conn.lock();
            drop_stream(shared, &mut conn);
            shared.set_state(ConnectionState::Disconnected);
        }
        if let Some(monitor) = self.monitor.lock().take() {
            monitor.stop();
        }
        info!(addr = %shared.config.plc_addr, "connection closed");
        self.state()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("plc_addr", &self.shared.config.plc_addr)
            .field("state", &self.state())
            .finish()
    }
}
