//! UDP discovery between nodes
//!
//! Slaves announce themselves by broadcasting their display name on the
//! discovery port. The master listens on that port and hands every sender
//! to the latency prober.

mod beacon;
mod listener;

#[cfg(test)]
mod tests;

pub use beacon::DiscoveryBeacon;
pub use listener::BeaconListener;

/// Longest beacon payload accepted
pub const MAX_BEACON_SIZE: usize = 512;
