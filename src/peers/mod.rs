//! Peer bookkeeping for the master role
//!
//! The master learns about slaves from their discovery beacons, probes
//! each one over TCP to estimate its one-way latency and evicts peers that
//! stay silent past the dead threshold.

mod latency;
mod prober;
mod table;

#[cfg(test)]
mod tests;

pub use latency::{LATENCY_HISTORY_LEN, LatencyHistory};
pub use prober::{ECHO_REPLY, ECHO_REQUEST, LatencyProber, probe_latency};
pub use table::{PeerSnapshot, PeerTable};
