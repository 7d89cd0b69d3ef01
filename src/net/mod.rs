//! Network abstraction layer
//!
//! This module provides the transport primitives the sync core consumes:
//! outbound TCP command lines, UDP datagrams and cancellable timers.

mod timer;
mod tokio_impl;
mod transport;

#[cfg(test)]
mod tests;

pub use timer::TimerHandle;
pub use tokio_impl::{TokioTransport, bind_broadcast_udp, bind_udp, connect_tcp, spawn_blocking};
pub use transport::Transport;
