//! Inbound connection handles

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// How the payload reached us
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// TCP control connection
    Stream,
    /// Single UDP datagram
    Datagram,
}

/// Handle to the connection a payload arrived on
///
/// Cloning is cheap. Replies are queued and written by the server in
/// order, one line each.
#[derive(Debug, Clone)]
pub struct Connection {
    id: u64,
    peer: SocketAddr,
    kind: ConnectionKind,
    outbound: mpsc::UnboundedSender<String>,
    closed: CancellationToken,
}

/// Bookkeeping view of a connection that does not keep it open
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Connection id
    pub id: u64,
    /// Remote address
    pub peer: SocketAddr,
    /// Transport kind
    pub kind: ConnectionKind,
    closed: CancellationToken,
}

impl ConnectionInfo {
    /// Check whether the connection is still open
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.closed.is_cancelled()
    }
}

impl Connection {
    /// Create a connection handle and the queue its replies land in
    #[must_use]
    pub fn new(peer: SocketAddr, kind: ConnectionKind) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let conn = Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            peer,
            kind,
            outbound,
            closed: CancellationToken::new(),
        };
        (conn, rx)
    }

    /// Unique id of this connection
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remote address
    #[must_use]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Transport kind
    #[must_use]
    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    /// Queue one reply line
    ///
    /// Returns `false` if the connection is already gone.
    pub fn reply(&self, line: impl Into<String>) -> bool {
        if self.closed.is_cancelled() {
            return false;
        }
        self.outbound.send(line.into()).is_ok()
    }

    /// Check whether replies can still be delivered
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.closed.is_cancelled() && !self.outbound.is_closed()
    }

    /// Mark the connection closed
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Bookkeeping view of this connection
    #[must_use]
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            peer: self.peer,
            kind: self.kind,
            closed: self.closed.clone(),
        }
    }

    pub(crate) fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }
}
