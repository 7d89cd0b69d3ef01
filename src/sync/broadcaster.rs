//! Master-side fan-out of actions and timeline positions

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Mutex;

use super::action::{SyncAction, seek_command};
use crate::media::MediaController;
use crate::net::{TimerHandle, Transport};
use crate::peers::PeerTable;
use crate::state::{EventBus, NodeEvent};

/// Peer ports the broadcaster addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerPorts {
    /// TCP port actions are forwarded to
    pub control: u16,
    /// UDP port positions are sent to
    pub sync: u16,
}

struct Inner {
    table: Arc<PeerTable>,
    transport: Arc<dyn Transport>,
    media: Arc<dyn MediaController>,
    ports: PeerPorts,
    events: EventBus,
}

impl Inner {
    async fn tick(&self) -> usize {
        for ip in self.table.sweep().await {
            self.events.emit(NodeEvent::PeerEvicted { ip });
        }

        if !self.media.is_playing() {
            return 0;
        }

        let master_time = self.media.current_time();
        let peers = self.table.snapshot().await;
        let sends = peers.iter().map(|peer| {
            let target = master_time + peer.sync_lead().as_secs_f64();
            let addr = SocketAddr::new(peer.ip, self.ports.sync);
            let line = seek_command(target);
            async move {
                match self.transport.send_datagram(addr, line.as_bytes()).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::trace!(peer = %addr, "Sync datagram failed: {}", e);
                        false
                    }
                }
            }
        });
        join_all(sends).await.into_iter().filter(|sent| *sent).count()
    }
}

/// Mirrors actions to peers and streams the master position while playing
pub struct SyncBroadcaster {
    inner: Arc<Inner>,
    interval: Duration,
    ticker: Mutex<Option<TimerHandle>>,
}

impl SyncBroadcaster {
    /// Create a stopped broadcaster
    #[must_use]
    pub fn new(
        table: Arc<PeerTable>,
        transport: Arc<dyn Transport>,
        media: Arc<dyn MediaController>,
        ports: PeerPorts,
        interval: Duration,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                table,
                transport,
                media,
                ports,
                events,
            }),
            interval,
            ticker: Mutex::new(None),
        }
    }

    /// Send `action` to every alive peer over TCP
    ///
    /// Best effort: failures are logged and not retried, the next position
    /// sync covers for a missed action. Returns how many peers took it.
    pub async fn forward(&self, action: &SyncAction) -> usize {
        let line = action.to_command();
        let peers = self.inner.table.snapshot().await;
        let sends = peers.iter().map(|peer| {
            let addr = SocketAddr::new(peer.ip, self.inner.ports.control);
            let line = line.as_str();
            async move {
                match self.inner.transport.send_command(addr, line).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::debug!(peer = %addr, command = line, "Forward failed: {}", e);
                        false
                    }
                }
            }
        });
        let delivered = join_all(sends).await.into_iter().filter(|ok| *ok).count();
        tracing::debug!(command = %line, delivered, peers = peers.len(), "Forwarded action");
        delivered
    }

    /// Sweep dead peers and send one round of positions
    ///
    /// Returns the number of datagrams sent. Nothing is sent while paused.
    pub async fn tick(&self) -> usize {
        self.inner.tick().await
    }

    /// Start the periodic position sync
    ///
    /// Does nothing if it is already running.
    pub async fn start(&self) {
        let mut ticker = self.ticker.lock().await;
        if ticker.is_some() {
            return;
        }
        let inner = self.inner.clone();
        *ticker = Some(TimerHandle::every(self.interval, move || {
            let inner = inner.clone();
            async move {
                inner.tick().await;
            }
        }));
        tracing::info!("Sync broadcast started every {:?}", self.interval);
    }

    /// Stop the periodic position sync
    pub async fn stop(&self) {
        if self.ticker.lock().await.take().is_some() {
            tracing::info!("Sync broadcast stopped");
        }
    }

    /// Check whether the periodic sync is running
    pub async fn is_running(&self) -> bool {
        self.ticker.lock().await.is_some()
    }

    /// Peer table the broadcaster reads
    #[must_use]
    pub fn table(&self) -> &Arc<PeerTable> {
        &self.inner.table
    }
}
