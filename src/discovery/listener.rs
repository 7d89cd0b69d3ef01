//! Beacon listener for the master role

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use super::MAX_BEACON_SIZE;
use crate::error::{Result, SyncError};
use crate::peers::LatencyProber;

/// Receives beacons on the discovery port and feeds the prober
pub struct BeaconListener {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
}

impl BeaconListener {
    /// Bind the discovery port and start listening
    ///
    /// # Errors
    ///
    /// Returns `BindFailed` if the port cannot be bound.
    pub async fn bind(addr: SocketAddr, prober: LatencyProber) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| SyncError::BindFailed {
                what: "discovery listener",
                port: addr.port(),
                source,
            })?;
        let local_addr = socket.local_addr()?;
        let shutdown = CancellationToken::new();

        tracing::info!("Listening for beacons on {}", local_addr);

        let token = shutdown.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; MAX_BEACON_SIZE];
            loop {
                let received = tokio::select! {
                    () = token.cancelled() => break,
                    received = socket.recv_from(&mut buf) => received,
                };
                match received {
                    Ok((len, src)) => {
                        let name = String::from_utf8_lossy(&buf[..len]);
                        tracing::debug!(peer = %src.ip(), %name, "Beacon received");
                        prober.on_beacon(src.ip()).await;
                    }
                    Err(e) => {
                        tracing::debug!("Beacon receive error: {}", e);
                    }
                }
            }
            tracing::debug!("Beacon listener on {} stopped", local_addr);
        });

        Ok(Self {
            local_addr,
            shutdown,
        })
    }

    /// Address the listener is bound to
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop listening
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for BeaconListener {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
