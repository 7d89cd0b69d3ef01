use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Persisted player settings
///
/// The JSON form of this struct doubles as the structured-state document:
/// `request_state` replies with it, and a bare JSON object received on a
/// control connection is merged into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name announced in discovery beacons (empty = configured name)
    pub display_name: String,
    /// Output volume (0.0 - 1.0)
    pub volume: f32,
    /// Display brightness (0.0 - 1.0)
    pub brightness: f32,
    /// Restart the current item when it ends
    pub looping: bool,
    /// Nominal playback rate
    pub rate: f64,
    /// Whether the discovery beacon is sent while slave
    pub beacon_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            volume: 1.0,
            brightness: 1.0,
            looping: false,
            rate: 1.0,
            beacon_enabled: true,
        }
    }
}

impl Settings {
    /// Merge the known keys of `doc` into a copy of these settings
    ///
    /// Unknown keys are ignored. Values of the wrong type fail the whole
    /// merge, leaving `self` untouched.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if a known key holds a value of the wrong type.
    pub fn merged(&self, doc: &Map<String, Value>) -> Result<Self> {
        let mut current = serde_json::to_value(self)?;
        if let Value::Object(ref mut fields) = current {
            for (key, value) in doc {
                if fields.contains_key(key) {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }
        let mut merged: Self = serde_json::from_value(current)?;
        merged.clamp();
        Ok(merged)
    }

    /// Bring every field into its valid range
    pub fn clamp(&mut self) {
        self.volume = unit(self.volume, 1.0);
        self.brightness = unit(self.brightness, 1.0);
        if !self.rate.is_finite() || self.rate <= 0.0 {
            self.rate = 1.0;
        }
    }

    /// Check whether any key of `doc` is one we understand
    #[must_use]
    pub fn recognizes(doc: &Map<String, Value>) -> bool {
        const KEYS: [&str; 6] = [
            "display_name",
            "volume",
            "brightness",
            "looping",
            "rate",
            "beacon_enabled",
        ];
        doc.keys().any(|k| KEYS.contains(&k.as_str()))
    }
}

/// Clamp to `[0, 1]`, falling back to `default` for NaN
fn unit(value: f32, default: f32) -> f32 {
    if value.is_nan() {
        default
    } else {
        value.clamp(0.0, 1.0)
    }
}
