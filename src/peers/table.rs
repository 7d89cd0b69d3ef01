//! Peer table owned by the master

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::latency::LatencyHistory;

/// A peer known to the master
#[derive(Debug)]
struct Peer {
    /// Last beacon or probe response
    last_seen: Instant,
    /// Recent one-way latency estimates
    latency: LatencyHistory,
    /// Cancels in-flight probes when the peer is evicted
    probes: CancellationToken,
}

impl Peer {
    fn new(now: Instant) -> Self {
        Self {
            last_seen: now,
            latency: LatencyHistory::new(),
            probes: CancellationToken::new(),
        }
    }
}

/// Copy of a peer's state taken under the table lock
#[derive(Debug, Clone, PartialEq)]
pub struct PeerSnapshot {
    /// Peer address
    pub ip: IpAddr,
    /// Last beacon or probe response
    pub last_seen: Instant,
    /// Recent one-way latency estimates
    pub latency: LatencyHistory,
}

impl PeerSnapshot {
    /// Time since the peer was last heard from
    #[must_use]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    /// Lead added to the master position when syncing this peer
    ///
    /// Half of the most recent sample, or zero before the first probe.
    #[must_use]
    pub fn sync_lead(&self) -> Duration {
        self.latency.latest().map_or(Duration::ZERO, |l| l / 2)
    }
}

/// Table of peers with last-seen times and latency history
///
/// Every operation takes the single table lock, copies out what it needs
/// and releases it before returning.
pub struct PeerTable {
    peers: Mutex<HashMap<IpAddr, Peer>>,
    dead_threshold: Duration,
}

impl PeerTable {
    /// Create an empty table
    #[must_use]
    pub fn new(dead_threshold: Duration) -> Self {
        Self {
            peers: Mutex::new(HashMap::new()),
            dead_threshold,
        }
    }

    /// Silence after which a peer is evicted
    #[must_use]
    pub fn dead_threshold(&self) -> Duration {
        self.dead_threshold
    }

    /// Record a beacon from `ip`
    ///
    /// Returns `true` if the peer was not known before.
    pub async fn touch(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut peers = self.peers.lock().await;
        match peers.get_mut(&ip) {
            Some(peer) => {
                peer.last_seen = now;
                false
            }
            None => {
                peers.insert(ip, Peer::new(now));
                true
            }
        }
    }

    /// Record a latency sample from a probe response
    ///
    /// Also refreshes `last_seen`. Returns `false` if the peer is no longer
    /// in the table.
    pub async fn record_latency(&self, ip: IpAddr, sample: Duration) -> bool {
        let mut peers = self.peers.lock().await;
        let Some(peer) = peers.get_mut(&ip) else {
            return false;
        };
        peer.last_seen = Instant::now();
        peer.latency.push(sample);
        true
    }

    /// Token that is cancelled when `ip` is evicted
    pub async fn probe_token(&self, ip: IpAddr) -> Option<CancellationToken> {
        self.peers
            .lock()
            .await
            .get(&ip)
            .map(|p| p.probes.child_token())
    }

    /// Remove every peer silent for at least the dead threshold
    ///
    /// Returns the evicted addresses. Their in-flight probes are cancelled.
    pub async fn sweep(&self) -> Vec<IpAddr> {
        let now = Instant::now();
        let mut evicted = Vec::new();
        let mut peers = self.peers.lock().await;
        peers.retain(|ip, peer| {
            let alive = now.saturating_duration_since(peer.last_seen) < self.dead_threshold;
            if !alive {
                peer.probes.cancel();
                evicted.push(*ip);
            }
            alive
        });
        drop(peers);

        for ip in &evicted {
            tracing::info!(peer = %ip, "Evicted dead peer");
        }
        evicted
    }

    /// Alive peers, sorted by address
    ///
    /// Peers past the dead threshold are left out even if no sweep ran yet.
    pub async fn snapshot(&self) -> Vec<PeerSnapshot> {
        let now = Instant::now();
        let mut snapshot: Vec<PeerSnapshot> = self
            .peers
            .lock()
            .await
            .iter()
            .filter(|(_, p)| now.saturating_duration_since(p.last_seen) < self.dead_threshold)
            .map(|(ip, p)| PeerSnapshot {
                ip: *ip,
                last_seen: p.last_seen,
                latency: p.latency.clone(),
            })
            .collect();
        snapshot.sort_by_key(|p| p.ip);
        snapshot
    }

    /// Snapshot of one peer
    pub async fn get(&self, ip: IpAddr) -> Option<PeerSnapshot> {
        self.peers.lock().await.get(&ip).map(|p| PeerSnapshot {
            ip,
            last_seen: p.last_seen,
            latency: p.latency.clone(),
        })
    }

    /// Check if `ip` is in the table
    pub async fn contains(&self, ip: IpAddr) -> bool {
        self.peers.lock().await.contains_key(&ip)
    }

    /// Number of peers held, including not yet swept dead ones
    pub async fn len(&self) -> usize {
        self.peers.lock().await.len()
    }

    /// Check if the table is empty
    pub async fn is_empty(&self) -> bool {
        self.peers.lock().await.is_empty()
    }

    /// Forget every peer, cancelling their probes
    pub async fn clear(&self) {
        let mut peers = self.peers.lock().await;
        for peer in peers.values() {
            peer.probes.cancel();
        }
        peers.clear();
    }
}
