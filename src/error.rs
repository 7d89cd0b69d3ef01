use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running a sync node
#[derive(Debug, Error)]
pub enum SyncError {
    // ===== Transport Errors =====
    /// Failed to reach a peer
    #[error("connection failed to {addr}: {message}")]
    ConnectionFailed {
        /// Remote address
        addr: SocketAddr,
        /// Description of the failure
        message: String,
        /// The underlying source of the error
        #[source]
        source: Option<io::Error>,
    },

    /// Connection timed out
    #[error("connection timeout after {duration:?}")]
    ConnectionTimeout {
        /// The duration of the timeout
        duration: std::time::Duration,
    },

    /// Peer closed the connection before replying
    #[error("peer {addr} disconnected")]
    Disconnected {
        /// Remote address
        addr: SocketAddr,
    },

    /// Failed to bind a listening socket
    #[error("failed to bind {what} on port {port}: {source}")]
    BindFailed {
        /// Which listener failed
        what: &'static str,
        /// Requested port
        port: u16,
        /// The underlying source of the error
        #[source]
        source: io::Error,
    },

    // ===== Protocol Errors =====
    /// Payload could not be interpreted
    #[error("malformed payload: {message}")]
    MalformedPayload {
        /// Description of the problem
        message: String,
    },

    /// Command argument missing or unparsable
    #[error("invalid argument for {command}: {message}")]
    InvalidArgument {
        /// Command name
        command: String,
        /// Description of the problem
        message: String,
    },

    /// Unexpected reply to a request
    #[error("unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        /// What was expected
        expected: String,
        /// What was actually received
        actual: String,
    },

    // ===== State Errors =====
    /// Operation not valid in the current state
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of why the state is invalid
        message: String,
    },

    /// Track index outside the playlist
    #[error("track {index} out of range (playlist has {len} entries)")]
    TrackOutOfRange {
        /// Requested index
        index: usize,
        /// Playlist length
        len: usize,
    },

    // ===== Media Errors =====
    /// Media controller rejected an operation
    #[error("media error: {message}")]
    Media {
        /// Description of the error
        message: String,
    },

    // ===== Settings Errors =====
    /// Settings file could not be read or written
    #[error("settings I/O failed for {}: {source}", path.display())]
    Settings {
        /// Settings file path
        path: PathBuf,
        /// The underlying source of the error
        #[source]
        source: io::Error,
    },

    /// No settings path configured
    #[error("no settings path configured")]
    NoSettingsPath,

    /// JSON encoding/decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== I/O Errors =====
    /// Network I/O error
    #[error("network error: {0}")]
    NetworkError(#[from] io::Error),

    /// Background task failed to complete
    #[error("background task failed: {message}")]
    TaskFailed {
        /// Description of the failure
        message: String,
    },
}

impl SyncError {
    /// Check if this error is recoverable by retrying
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::ConnectionFailed { .. }
                | Self::Disconnected { .. }
                | Self::NetworkError(_)
        )
    }

    /// Check if this error originated in the network transport
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::ConnectionTimeout { .. }
                | Self::Disconnected { .. }
                | Self::BindFailed { .. }
                | Self::NetworkError(_)
        )
    }

    pub(crate) fn invalid_argument(command: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            command: command.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
