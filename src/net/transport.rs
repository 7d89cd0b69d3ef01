//! Outbound transport trait

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::Result;

/// Fire-and-forget outbound traffic used by the master role
///
/// Implementations must not retry: a lost command heals at the next
/// position sync.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one command line over a short-lived TCP connection
    ///
    /// The line is newline-terminated on the wire.
    async fn send_command(&self, addr: SocketAddr, line: &str) -> Result<()>;

    /// Deliver one UDP datagram
    async fn send_datagram(&self, addr: SocketAddr, payload: &[u8]) -> Result<()>;
}
