//! Transport double that records outbound traffic

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::network_sim::NetworkSimulator;
use crate::error::{Result, SyncError};
use crate::net::Transport;

#[derive(Debug, Default)]
struct Log {
    commands: Vec<(SocketAddr, String)>,
    datagrams: Vec<(SocketAddr, String)>,
    unreachable: HashSet<IpAddr>,
}

/// Records every command and datagram instead of sending it
///
/// Traffic passes through a [`NetworkSimulator`]: a dropped command fails
/// like a timed-out connect, a dropped datagram vanishes silently.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    log: Mutex<Log>,
    network: NetworkSimulator,
}

impl RecordingTransport {
    /// Transport over a perfect network
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport over the given network conditions
    #[must_use]
    pub fn with_network(network: NetworkSimulator) -> Self {
        Self {
            log: Mutex::default(),
            network,
        }
    }

    fn log(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse every connection to `ip`
    pub fn set_unreachable(&self, ip: IpAddr) {
        self.log().unreachable.insert(ip);
    }

    /// Commands delivered so far
    #[must_use]
    pub fn commands(&self) -> Vec<(SocketAddr, String)> {
        self.log().commands.clone()
    }

    /// Datagrams delivered so far, decoded as text
    #[must_use]
    pub fn datagrams(&self) -> Vec<(SocketAddr, String)> {
        self.log().datagrams.clone()
    }

    /// Forget recorded traffic
    pub fn clear(&self) {
        let mut log = self.log();
        log.commands.clear();
        log.datagrams.clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_command(&self, addr: SocketAddr, line: &str) -> Result<()> {
        let delay = self.network.sample_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.log().unreachable.contains(&addr.ip()) {
            return Err(SyncError::ConnectionFailed {
                addr,
                message: "connection refused".to_string(),
                source: None,
            });
        }
        if self.network.drops_packet() {
            return Err(SyncError::ConnectionTimeout { duration: delay });
        }
        self.log().commands.push((addr, line.to_string()));
        Ok(())
    }

    async fn send_datagram(&self, addr: SocketAddr, payload: &[u8]) -> Result<()> {
        if self.network.drops_packet() {
            return Ok(());
        }
        let text = String::from_utf8_lossy(payload).into_owned();
        self.log().datagrams.push((addr, text));
        Ok(())
    }
}
