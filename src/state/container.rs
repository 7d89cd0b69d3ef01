//! Settings container with change notifications

use tokio::sync::{RwLock, watch};

use crate::types::Settings;

/// Settings container with change notifications
pub struct SettingsStore {
    /// Current settings
    settings: RwLock<Settings>,
    /// Change sender
    tx: watch::Sender<Settings>,
}

impl SettingsStore {
    /// Create a store holding `initial`
    #[must_use]
    pub fn new(initial: Settings) -> Self {
        let (tx, _) = watch::channel(initial.clone());
        Self {
            settings: RwLock::new(initial),
            tx,
        }
    }

    /// Get current settings
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Subscribe to settings changes
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Update settings with a function
    ///
    /// Returns the settings after the update.
    pub async fn update<F>(&self, f: F) -> Settings
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.settings.write().await;
        f(&mut settings);
        settings.clamp();
        self.tx.send_replace(settings.clone());
        settings.clone()
    }

    /// Replace the settings wholesale
    pub async fn replace(&self, settings: Settings) -> Settings {
        self.update(|s| *s = settings).await
    }

    /// Set volume
    pub async fn set_volume(&self, volume: f32) -> Settings {
        self.update(|s| s.volume = volume).await
    }

    /// Set brightness
    pub async fn set_brightness(&self, brightness: f32) -> Settings {
        self.update(|s| s.brightness = brightness).await
    }

    /// Set looping
    pub async fn set_looping(&self, looping: bool) -> Settings {
        self.update(|s| s.looping = looping).await
    }

    /// Set nominal rate
    pub async fn set_rate(&self, rate: f64) -> Settings {
        self.update(|s| s.rate = rate).await
    }

    /// Reset to defaults
    pub async fn reset(&self) -> Settings {
        self.replace(Settings::default()).await
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
