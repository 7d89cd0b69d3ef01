//! State-changing actions and their wire form

use std::fmt;

use crate::error::{Result, SyncError};

/// Command a slave applies an authoritative position with
pub const SEEK_TO_TIME: &str = "seek_to_time";

/// Format a sync command for position `seconds`
#[must_use]
pub fn seek_command(seconds: f64) -> String {
    format!("{SEEK_TO_TIME} {seconds:.3}")
}

/// An action the master mirrors to every peer
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    /// Start or resume playback
    Play,
    /// Pause playback
    Pause,
    /// Seek to zero and play
    Restart,
    /// Load a media file or directory
    Load(String),
    /// Change the nominal rate
    SetRate(f64),
}

impl SyncAction {
    /// Command name on the wire
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Restart => "restart",
            Self::Load(_) => "load",
            Self::SetRate(_) => "set_rate",
        }
    }

    /// Literal command line, without the trailing newline
    #[must_use]
    pub fn to_command(&self) -> String {
        self.to_string()
    }

    /// Build an action from a command name and its arguments
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a missing or unparsable argument and
    /// `MalformedPayload` for an unknown name.
    pub fn from_command(name: &str, args: &[&str]) -> Result<Self> {
        match name {
            "play" => Ok(Self::Play),
            "pause" => Ok(Self::Pause),
            "restart" => Ok(Self::Restart),
            "load" => {
                if args.is_empty() {
                    return Err(SyncError::invalid_argument(name, "missing path"));
                }
                Ok(Self::Load(args.join(" ")))
            }
            "set_rate" => {
                let raw = args
                    .first()
                    .ok_or_else(|| SyncError::invalid_argument(name, "missing rate"))?;
                let rate: f64 = raw
                    .parse()
                    .map_err(|_| SyncError::invalid_argument(name, format!("bad rate {raw:?}")))?;
                if !rate.is_finite() || rate <= 0.0 {
                    return Err(SyncError::invalid_argument(name, "rate must be positive"));
                }
                Ok(Self::SetRate(rate))
            }
            other => Err(SyncError::MalformedPayload {
                message: format!("{other} is not a sync action"),
            }),
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(path) => write!(f, "load {path}"),
            Self::SetRate(rate) => write!(f, "set_rate {rate:.2}"),
            other => f.write_str(other.name()),
        }
    }
}
