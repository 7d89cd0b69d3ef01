//! Playstate document and structured-state application

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::player::PlayerCore;
use crate::control::StateTarget;
use crate::error::{Result, SyncError};
use crate::types::Settings;

/// Reply to `playstate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayState {
    /// Loaded media path
    pub path: Option<String>,
    /// Playlist index of the loaded media
    pub movie_index: usize,
    /// Playback position in seconds
    pub position: f64,
    /// Media length in seconds, if known
    pub duration: Option<f64>,
    /// Rate the media is playing at
    pub rate: f64,
    /// Output volume
    pub volume: f32,
    /// Whether media is playing
    pub playing: bool,
}

#[async_trait]
impl StateTarget for PlayerCore {
    fn name(&self) -> &str {
        "settings"
    }

    async fn apply_state(&self, doc: &Map<String, Value>) -> Result<()> {
        if !Settings::recognizes(doc) {
            return Err(SyncError::MalformedPayload {
                message: "no settings keys in state document".to_string(),
            });
        }
        let merged = self.settings().get().await.merged(doc)?;
        self.apply_settings(merged).await;
        Ok(())
    }
}
