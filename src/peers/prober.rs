//! Liveness and latency prober

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::Instant;

use super::table::PeerTable;
use crate::error::{Result, SyncError};
use crate::net::connect_tcp;
use crate::state::{EventBus, NodeEvent};

/// Echo request sent to a peer's control port
pub const ECHO_REQUEST: &str = "echo ping";

/// Line a peer answers an echo request with
pub const ECHO_REPLY: &str = "ping";

/// Measure one-way latency to `addr`
///
/// The stopwatch starts before the connect, so the measured window spans
/// the TCP handshake and the echo exchange. Half of it is returned.
///
/// # Errors
///
/// Returns a transport error if the peer cannot be reached, closes early,
/// or answers with something other than the echo reply. Returns
/// `ConnectionTimeout` if the whole exchange exceeds `timeout`.
pub async fn probe_latency(addr: SocketAddr, timeout: Duration) -> Result<Duration> {
    let started = Instant::now();
    let exchange = async {
        let mut stream = connect_tcp(addr, timeout).await?;
        stream.write_all(format!("{ECHO_REQUEST}\n").as_bytes()).await?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                return Err(SyncError::Disconnected { addr });
            }
            match line.trim_end() {
                ECHO_REPLY => return Ok(()),
                "" => {}
                other => {
                    return Err(SyncError::UnexpectedResponse {
                        expected: ECHO_REPLY.to_string(),
                        actual: other.to_string(),
                    });
                }
            }
        }
    };

    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| SyncError::ConnectionTimeout { duration: timeout })??;

    Ok(started.elapsed() / 2)
}

/// Keeps the peer table fed from beacons and echo probes
#[derive(Clone)]
pub struct LatencyProber {
    table: Arc<PeerTable>,
    control_port: u16,
    probe_timeout: Duration,
    events: EventBus,
}

impl LatencyProber {
    /// Create a prober that probes peers on `control_port`
    #[must_use]
    pub fn new(
        table: Arc<PeerTable>,
        control_port: u16,
        probe_timeout: Duration,
        events: EventBus,
    ) -> Self {
        Self {
            table,
            control_port,
            probe_timeout,
            events,
        }
    }

    /// The table this prober writes into
    #[must_use]
    pub fn table(&self) -> &Arc<PeerTable> {
        &self.table
    }

    /// Handle a beacon from `ip`
    ///
    /// Refreshes the peer and launches a probe in the background. Duplicate
    /// beacons may launch overlapping probes; each records its own sample.
    pub async fn on_beacon(&self, ip: IpAddr) {
        if self.table.touch(ip).await {
            tracing::info!(peer = %ip, "Discovered peer");
            self.events.emit(NodeEvent::PeerDiscovered { ip });
        }

        let Some(token) = self.table.probe_token(ip).await else {
            return;
        };
        let prober = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    tracing::debug!(peer = %ip, "Probe cancelled");
                }
                () = prober.probe(ip) => {}
            }
        });
    }

    /// Probe `ip` once and record the result
    ///
    /// Failures are logged and leave the table untouched.
    pub async fn probe(&self, ip: IpAddr) {
        let addr = SocketAddr::new(ip, self.control_port);
        match probe_latency(addr, self.probe_timeout).await {
            Ok(latency) => {
                if self.table.record_latency(ip, latency).await {
                    tracing::debug!(peer = %ip, ?latency, "Recorded latency");
                    self.events.emit(NodeEvent::LatencyMeasured { ip, latency });
                }
            }
            Err(e) => {
                tracing::debug!(peer = %ip, "Latency probe failed: {}", e);
            }
        }
    }
}
