//! # wallsync
//!
//! Keeps media playback in step across the displays of a video wall.
//!
//! Each display runs a node. One node is master and owns the timeline;
//! the others are slaves that follow it over the LAN.
//!
//! ## Features
//!
//! - Text command protocol over TCP and UDP
//! - UDP discovery beacons
//! - TCP echo latency probing with dead-peer eviction
//! - Action mirroring and periodic position sync from the master
//! - Drift correction on slaves by rate nudging or seeking
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use wallsync::testing::SimulatedMedia;
//! use wallsync::{Node, NodeConfig, Role, SyncAction};
//!
//! # async fn example() -> Result<(), wallsync::SyncError> {
//! let config = NodeConfig::builder().role(Role::Master).build();
//! let node = Node::start(config, Arc::new(SimulatedMedia::new())).await?;
//!
//! node.core().apply(SyncAction::Load("intro.mp4".into())).await?;
//! node.core().apply(SyncAction::Play).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Node**: `Node` - servers, discovery and role switching
//! - **Core**: `PlayerCore` - actions, playlist and settings
//! - **Sync**: `SyncBroadcaster` on the master, `SyncController` on slaves
//! - **Plumbing**: `control`, `peers`, `discovery` and `net`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// State management
pub mod state;
/// Core types
pub mod types;

/// Testing utilities
pub mod testing;

pub mod control;
pub mod discovery;
pub mod media;
pub mod net;
mod node;
pub mod peers;
pub mod sync;

// Re-exports
pub use control::{CommandHandler, CommandRegistry, Connection, Dispatcher, StateTarget};
pub use error::{Result, SyncError};
pub use media::{EndedCallback, MediaController, Playlist};
pub use node::{Node, PlayState, PlayerCore, Rpc, register_all};
pub use peers::{LatencyProber, PeerSnapshot, PeerTable};
pub use state::{EventBus, NodeEvent, SettingsStore};
pub use sync::{Correction, SyncAction, SyncBroadcaster, SyncController};
pub use types::{CorrectionTuning, NodeConfig, NodeConfigBuilder, Role, Settings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
///
/// Convenient re-exports
pub mod prelude {
    pub use crate::{
        MediaController, Node, NodeConfig, NodeEvent, Role, Settings, SyncAction, SyncError,
    };
}
