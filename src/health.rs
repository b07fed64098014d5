//! Connection health supervision.
//!
//! A [`TcpTransport`](crate::TcpTransport) runs a background thread that wakes
//! every [`HealthConfig::interval`], asks a [`Probe`] whether the PLC is
//! reachable and reconnects after [`HealthConfig::failure_threshold`]
//! consecutive failures or when the channel has been lost.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use omron_fins_driver::HealthConfig;
//!
//! let health = HealthConfig::default()
//!     .with_interval(Duration::from_secs(5))
//!     .with_failure_threshold(2);
//! assert_eq!(health.probe_timeout, Duration::from_secs(3));
//! ```

use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

/// Default time between health probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(10);

/// Default probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Reachability check used by the health monitor.
///
/// Any `Fn(SocketAddr, Duration) -> bool` closure is a probe, which makes it
/// easy to script outcomes in tests.
pub trait Probe: Send + Sync {
    /// Returns whether `addr` answered within `timeout`.
    fn is_reachable(&self, addr: SocketAddr, timeout: Duration) -> bool;
}

impl<F> Probe for F
where
    F: Fn(SocketAddr, Duration) -> bool + Send + Sync,
{
    fn is_reachable(&self, addr: SocketAddr, timeout: Duration) -> bool {
        self(addr, timeout)
    }
}

/// Probe that opens (and immediately drops) a TCP connection to the PLC.
///
/// ICMP echo needs raw sockets; a TCP connect to the FINS port needs no
/// privileges and proves the PLC's stack is accepting connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

impl Probe for TcpProbe {
    fn is_reachable(&self, addr: SocketAddr, timeout: Duration) -> bool {
        TcpStream::connect_timeout(&addr, timeout).is_ok()
    }
}

/// Health-check settings.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Whether the background monitor runs at all.
    pub enabled: bool,
    /// Time between probes.
    pub interval: Duration,
    /// Timeout handed to the probe.
    pub probe_timeout: Duration,
    /// Consecutive probe failures that trigger a reconnect.
    pub failure_threshold: u32,
    /// Probe the PLC before opening the first connection.
    pub probe_on_connect: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_PROBE_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            failure_threshold: 1,
            probe_on_connect: false,
        }
    }
}

impl HealthConfig {
    /// Returns a configuration with the background monitor switched off.
    ///
    /// [`TcpTransport::check_health`](crate::TcpTransport::check_health) can
    /// still be called by hand.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the probe interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets how many consecutive failures trigger a reconnect (minimum 1).
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Enables or disables the probe before the first connection.
    pub fn with_probe_on_connect(mut self, enabled: bool) -> Self {
        self.probe_on_connect = enabled;
        self
    }
}

/// Handle to a running monitor thread.
#[derive(Debug)]
pub(crate) struct HealthMonitor {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    /// Spawns a thread calling `tick` every `interval` until `tick` returns
    /// `false` or the monitor is stopped.
    pub(crate) fn spawn<F>(interval: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("fins-health".into())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if !tick() {
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        debug!(?interval, "health monitor started");
        Ok(Self { stop, handle })
    }

    /// Stops the thread and waits for it to finish.
    pub(crate) fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.thread().id() != thread::current().id() {
            let _ = self.handle.join();
        }
        debug!("health monitor stopped");
    }
}
