//! Timeline synchronization
//!
//! The master mirrors state-changing actions to its peers and streams its
//! playback position to them. Each slave compares that position with its
//! own clock and corrects.

mod action;
mod broadcaster;
mod controller;

#[cfg(test)]
mod tests;

pub use action::{SEEK_TO_TIME, SyncAction, seek_command};
pub use broadcaster::{PeerPorts, SyncBroadcaster};
pub use controller::{Correction, SyncController, SyncMode, SyncState, Thresholds, evaluate};
