//! Periodic discovery beacon for the slave role

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::watch;

use crate::error::Result;
use crate::net::{TimerHandle, bind_broadcast_udp};
use crate::types::{NodeConfig, Role, Settings};

struct BeaconSender {
    socket: UdpSocket,
    target: SocketAddr,
    /// Fallback when the settings carry no name
    name: String,
    role: watch::Receiver<Role>,
    settings: watch::Receiver<Settings>,
}

impl BeaconSender {
    fn enabled(&self) -> bool {
        !self.role.borrow().is_master() && self.settings.borrow().beacon_enabled
    }

    fn display_name(&self) -> String {
        let settings = self.settings.borrow();
        if settings.display_name.is_empty() {
            self.name.clone()
        } else {
            settings.display_name.clone()
        }
    }

    async fn announce(&self) -> bool {
        if !self.enabled() {
            return false;
        }
        let name = self.display_name();
        match self.socket.send_to(name.as_bytes(), self.target).await {
            Ok(_) => {
                tracing::trace!(target_addr = %self.target, name, "Beacon sent");
                true
            }
            Err(e) => {
                tracing::debug!(target_addr = %self.target, "Beacon send failed: {}", e);
                false
            }
        }
    }
}

/// Broadcasts the display name from the settings on the discovery port at a fixed interval
///
/// Sends are skipped while the node is master or the `beacon_enabled`
/// setting is off, so the beacon can stay armed across role changes.
pub struct DiscoveryBeacon {
    sender: Arc<BeaconSender>,
    timer: TimerHandle,
}

impl DiscoveryBeacon {
    /// Start beaconing to `beacon_address:discovery_port`
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the broadcast socket cannot be set up.
    pub async fn start(
        config: &NodeConfig,
        role: watch::Receiver<Role>,
        settings: watch::Receiver<Settings>,
    ) -> Result<Self> {
        let sender = Arc::new(BeaconSender {
            socket: bind_broadcast_udp(config.bind_address).await?,
            target: SocketAddr::new(config.beacon_address, config.discovery_port),
            name: config.display_name.clone(),
            role,
            settings,
        });

        tracing::info!(
            name = %sender.name,
            "Discovery beacon to {} every {:?}",
            sender.target,
            config.beacon_interval
        );

        let timer = Self::arm(&sender, config.beacon_interval);
        Ok(Self { sender, timer })
    }

    fn arm(sender: &Arc<BeaconSender>, interval: Duration) -> TimerHandle {
        let sender = sender.clone();
        TimerHandle::every(interval, move || {
            let sender = sender.clone();
            async move {
                sender.announce().await;
            }
        })
    }

    /// Send one beacon now, outside the schedule
    ///
    /// Returns `false` if the beacon is currently disabled or the send failed.
    pub async fn announce(&self) -> bool {
        self.sender.announce().await
    }

    /// Whether beacons are currently being sent
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.timer.is_cancelled() && self.sender.enabled()
    }

    /// Stop the beacon for good
    pub fn stop(&self) {
        self.timer.cancel();
    }
}
