//! Event bus for node events

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::types::Role;

/// Node events
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    // Role events
    /// Role changed
    RoleChanged {
        /// New role
        role: Role,
    },

    // Peer events
    /// First beacon from a peer
    PeerDiscovered {
        /// Peer address
        ip: IpAddr,
    },
    /// Peer evicted by the liveness sweep
    PeerEvicted {
        /// Peer address
        ip: IpAddr,
    },
    /// Latency probe completed
    LatencyMeasured {
        /// Peer address
        ip: IpAddr,
        /// Recorded one-way estimate
        latency: Duration,
    },

    // Sync events
    /// Drift correction applied on a slave
    CorrectionApplied {
        /// Signed drift in seconds (master - local)
        drift: f64,
        /// Resulting rate
        rate: f64,
        /// Whether a seek was issued
        seeked: bool,
    },
    /// Nudged rate expired back to nominal
    CorrectionExpired {
        /// Nominal rate restored
        rate: f64,
    },

    // Playback events
    /// Media loaded
    MediaLoaded {
        /// Media path
        path: String,
    },
    /// Playback started
    PlaybackStarted,
    /// Playback paused
    PlaybackPaused,
    /// Media reached its end
    PlaybackEnded,

    // Error events
    /// Error occurred
    Error {
        /// Error message
        message: String,
    },
}

impl fmt::Display for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoleChanged { role } => write!(f, "role {role}"),
            Self::PeerDiscovered { ip } => write!(f, "peer_discovered {ip}"),
            Self::PeerEvicted { ip } => write!(f, "peer_evicted {ip}"),
            Self::LatencyMeasured { ip, latency } => {
                write!(f, "latency {ip} {:.3}", latency.as_secs_f64() * 1000.0)
            }
            Self::CorrectionApplied {
                drift,
                rate,
                seeked,
            } => {
                if *seeked {
                    write!(f, "scrub drift={drift:.3} rate={rate:.4}")
                } else {
                    write!(f, "nudge drift={drift:.3} rate={rate:.4}")
                }
            }
            Self::CorrectionExpired { rate } => write!(f, "correction_expired rate={rate:.4}"),
            Self::MediaLoaded { path } => write!(f, "loaded {path}"),
            Self::PlaybackStarted => f.write_str("playing"),
            Self::PlaybackPaused => f.write_str("paused"),
            Self::PlaybackEnded => f.write_str("ended"),
            Self::Error { message } => write!(f, "error {message}"),
        }
    }
}

/// Event bus for distributing events
#[derive(Clone)]
pub struct EventBus {
    /// Broadcast sender
    tx: broadcast::Sender<NodeEvent>,
}

impl EventBus {
    /// Create a new event bus
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Subscribe to events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.tx.subscribe()
    }

    /// Emit an event
    pub fn emit(&self, event: NodeEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event filter for selective subscription
pub struct EventFilter {
    rx: broadcast::Receiver<NodeEvent>,
    filter: Box<dyn Fn(&NodeEvent) -> bool + Send>,
}

impl EventFilter {
    /// Create a filtered event receiver
    pub fn new<F>(bus: &EventBus, filter: F) -> Self
    where
        F: Fn(&NodeEvent) -> bool + Send + 'static,
    {
        Self {
            rx: bus.subscribe(),
            filter: Box::new(filter),
        }
    }

    /// Receive next matching event
    pub async fn recv(&mut self) -> Option<NodeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if (self.filter)(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Helper functions for common filters
impl EventFilter {
    /// Filter for peer table events only
    #[must_use]
    pub fn peer_events(bus: &EventBus) -> Self {
        Self::new(bus, |e| {
            matches!(
                e,
                NodeEvent::PeerDiscovered { .. }
                    | NodeEvent::PeerEvicted { .. }
                    | NodeEvent::LatencyMeasured { .. }
            )
        })
    }

    /// Filter for drift correction events only
    #[must_use]
    pub fn sync_events(bus: &EventBus) -> Self {
        Self::new(bus, |e| {
            matches!(
                e,
                NodeEvent::CorrectionApplied { .. } | NodeEvent::CorrectionExpired { .. }
            )
        })
    }

    /// Filter for playback events only
    #[must_use]
    pub fn playback_events(bus: &EventBus) -> Self {
        Self::new(bus, |e| {
            matches!(
                e,
                NodeEvent::MediaLoaded { .. }
                    | NodeEvent::PlaybackStarted
                    | NodeEvent::PlaybackPaused
                    | NodeEvent::PlaybackEnded
            )
        })
    }
}
