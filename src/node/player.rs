//! Playback state shared by every command handler

use std::path::Path;
use std::sync::{Arc, Weak};

use serde_json::{Value, json};
use tokio::sync::{Mutex, watch};

use super::state::PlayState;
use crate::error::{Result, SyncError};
use crate::media::{MediaController, Playlist};
use crate::net::Transport;
use crate::peers::PeerTable;
use crate::state::{EventBus, NodeEvent, SettingsStore};
use crate::sync::{Correction, PeerPorts, SyncAction, SyncBroadcaster, SyncController};
use crate::types::{NodeConfig, Role, Settings};

/// Media, settings and sync machinery of one node
///
/// Every state-changing action is applied locally first and, while the
/// node is master, mirrored to all peers afterwards.
pub struct PlayerCore {
    config: NodeConfig,
    media: Arc<dyn MediaController>,
    settings: SettingsStore,
    playlist: Mutex<Playlist>,
    controller: SyncController,
    broadcaster: SyncBroadcaster,
    table: Arc<PeerTable>,
    role: watch::Sender<Role>,
    events: EventBus,
}

impl PlayerCore {
    /// Assemble a core around `media`
    #[must_use]
    pub fn new(
        config: NodeConfig,
        media: Arc<dyn MediaController>,
        transport: Arc<dyn Transport>,
        mut settings: Settings,
        events: EventBus,
    ) -> Self {
        if settings.display_name.is_empty() {
            settings.display_name.clone_from(&config.display_name);
        }
        let table = Arc::new(PeerTable::new(config.dead_threshold));
        let controller = SyncController::new(
            media.clone(),
            settings.rate,
            config.correction,
            events.clone(),
        );
        let broadcaster = SyncBroadcaster::new(
            table.clone(),
            transport,
            media.clone(),
            PeerPorts {
                control: config.peer_control_port(),
                sync: config.peer_sync_port(),
            },
            config.sync_interval,
            events.clone(),
        );
        media.set_volume(settings.volume);
        media.set_brightness(settings.brightness);
        let (role, _) = watch::channel(config.initial_role);

        Self {
            config,
            media,
            settings: SettingsStore::new(settings),
            playlist: Mutex::new(Playlist::default()),
            controller,
            broadcaster,
            table,
            role,
            events,
        }
    }

    /// Node configuration
    #[must_use]
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Local media controller
    #[must_use]
    pub fn media(&self) -> &Arc<dyn MediaController> {
        &self.media
    }

    /// Settings store
    #[must_use]
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Peer table, populated while master
    #[must_use]
    pub fn peers(&self) -> &Arc<PeerTable> {
        &self.table
    }

    /// Master-side broadcaster
    #[must_use]
    pub fn broadcaster(&self) -> &SyncBroadcaster {
        &self.broadcaster
    }

    /// Slave-side drift controller
    #[must_use]
    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    /// Event bus
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Current role
    #[must_use]
    pub fn role(&self) -> Role {
        *self.role.borrow()
    }

    /// Check if this node is master
    #[must_use]
    pub fn is_master(&self) -> bool {
        self.role().is_master()
    }

    /// Watch role changes
    #[must_use]
    pub fn subscribe_role(&self) -> watch::Receiver<Role> {
        self.role.subscribe()
    }

    /// Switch role
    ///
    /// A new master starts streaming positions if media is already
    /// playing. A node that stops being master stops streaming and forgets
    /// its peers.
    pub async fn set_role(&self, role: Role) {
        let previous = self.role.send_replace(role);
        if previous == role {
            return;
        }
        tracing::info!(%role, "Role changed");

        if role.is_master() {
            self.controller.reset().await;
            if self.media.is_playing() {
                self.broadcaster.start().await;
            }
        } else {
            self.broadcaster.stop().await;
            self.table.clear().await;
        }
        self.events.emit(NodeEvent::RoleChanged { role });
    }

    /// Apply a state-changing action and mirror it while master
    ///
    /// # Errors
    ///
    /// Returns an error if the action cannot be applied locally, in which
    /// case nothing is forwarded.
    pub async fn apply(&self, action: SyncAction) -> Result<()> {
        match &action {
            SyncAction::Play => {
                self.media.play();
                self.events.emit(NodeEvent::PlaybackStarted);
            }
            SyncAction::Pause => {
                self.media.pause();
                self.controller.reset().await;
                self.events.emit(NodeEvent::PlaybackPaused);
            }
            SyncAction::Restart => {
                self.media.seek_to_time(0.0);
                self.controller.reset().await;
                self.media.play();
                self.events.emit(NodeEvent::PlaybackStarted);
            }
            SyncAction::Load(path) => {
                self.load_path(path).await?;
            }
            SyncAction::SetRate(rate) => {
                let settings = self.settings.set_rate(*rate).await;
                self.controller.set_nominal_rate(settings.rate).await;
            }
        }

        if self.is_master() {
            self.broadcaster.forward(&action).await;
            match action {
                SyncAction::Play | SyncAction::Restart => self.broadcaster.start().await,
                SyncAction::Pause => self.broadcaster.stop().await,
                SyncAction::Load(_) | SyncAction::SetRate(_) => {}
            }
        }
        Ok(())
    }

    /// Load a file, or every media file of a directory as a playlist
    async fn load_path(&self, path: &str) -> Result<()> {
        let is_dir = tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        let playlist = if is_dir {
            Playlist::scan(path).await?
        } else {
            Playlist::single(path)
        };

        let mut current = self.playlist.lock().await;
        let first = playlist
            .current()
            .map(path_string)
            .ok_or_else(|| SyncError::Media {
                message: format!("nothing to load from {path}"),
            })?;
        self.load_media(&first)?;
        *current = playlist;
        Ok(())
    }

    fn load_media(&self, path: &str) -> Result<()> {
        self.media.load(path)?;
        tracing::info!(path, "Loaded media");
        self.events.emit(NodeEvent::MediaLoaded {
            path: path.to_string(),
        });
        Ok(())
    }

    /// Apply a position received from the master
    ///
    /// Ignored while this node is master itself.
    pub async fn seek_to_time(&self, seconds: f64) -> Option<Correction> {
        if self.is_master() {
            tracing::debug!(seconds, "Ignoring sync position while master");
            return None;
        }
        Some(self.controller.on_sync(seconds).await)
    }

    /// Move through the playlist and load the selected entry
    ///
    /// With `resume` the new entry starts playing. Returns the new index.
    async fn step<F>(&self, resume: bool, select: F) -> Result<usize>
    where
        F: FnOnce(&mut Playlist) -> Result<Option<String>>,
    {
        let (index, path) = {
            let mut playlist = self.playlist.lock().await;
            let Some(path) = select(&mut *playlist)? else {
                return Err(SyncError::InvalidState {
                    message: "playlist is empty".to_string(),
                });
            };
            self.load_media(&path)?;
            (playlist.index(), path)
        };

        if self.is_master() {
            self.broadcaster.forward(&SyncAction::Load(path)).await;
        }
        if resume {
            self.apply(SyncAction::Play).await?;
        }
        Ok(index)
    }

    /// Advance to the next playlist entry, wrapping around
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the playlist is empty.
    pub async fn next(&self) -> Result<usize> {
        self.step(self.media.is_playing(), |p| Ok(p.next(true).map(path_string)))
            .await
    }

    /// Go back to the previous playlist entry, wrapping around
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the playlist is empty.
    pub async fn prev(&self) -> Result<usize> {
        self.step(self.media.is_playing(), |p| Ok(p.prev(true).map(path_string)))
            .await
    }

    /// Jump to playlist entry `index`
    ///
    /// # Errors
    ///
    /// Returns `TrackOutOfRange` if there is no such entry.
    pub async fn select_track(&self, index: usize) -> Result<usize> {
        self.step(self.media.is_playing(), |p| {
            p.select(index).map(|path| Some(path_string(path)))
        })
        .await
    }

    /// Current playlist index
    pub async fn track(&self) -> usize {
        self.playlist.lock().await.index()
    }

    /// Handle the media reaching its end
    ///
    /// A looping node restarts, otherwise the next playlist entry plays. At
    /// the end of the playlist the node pauses.
    pub async fn handle_ended(&self) {
        self.events.emit(NodeEvent::PlaybackEnded);

        let result = if self.settings.get().await.looping {
            self.apply(SyncAction::Restart).await
        } else if self.playlist.lock().await.is_last() {
            self.apply(SyncAction::Pause).await
        } else {
            self.step(true, |p| Ok(p.next(false).map(path_string)))
                .await
                .map(|_| ())
        };

        if let Err(e) = result {
            tracing::warn!("End of media handling failed: {}", e);
            self.events.emit(NodeEvent::Error {
                message: e.to_string(),
            });
        }
    }

    /// Hook the media "ended" callback up to [`PlayerCore::handle_ended`]
    ///
    /// The callback may fire on any thread; handling is spawned onto the
    /// runtime that was current when this was called.
    pub fn install_ended_handler(self: &Arc<Self>) {
        let core: Weak<Self> = Arc::downgrade(self);
        let runtime = tokio::runtime::Handle::current();
        self.media.on_ended(Box::new(move || {
            let core = core.clone();
            runtime.spawn(async move {
                if let Some(core) = core.upgrade() {
                    core.handle_ended().await;
                }
            });
        }));
    }

    /// Replace the settings and push them to the media
    ///
    /// An empty display name keeps the current one.
    pub async fn apply_settings(&self, mut settings: Settings) -> Settings {
        let previous = self.settings.get().await;
        if settings.display_name.is_empty() {
            settings.display_name = previous.display_name;
        }
        let previous_rate = previous.rate;
        let settings = self.settings.replace(settings).await;
        self.media.set_volume(settings.volume);
        self.media.set_brightness(settings.brightness);
        if (settings.rate - previous_rate).abs() > f64::EPSILON {
            self.controller.set_nominal_rate(settings.rate).await;
        }
        settings
    }

    /// Set the volume and return the stored value
    pub async fn set_volume(&self, volume: f32) -> f32 {
        let volume = self.settings.set_volume(volume).await.volume;
        self.media.set_volume(volume);
        volume
    }

    /// Set the brightness and return the stored value
    pub async fn set_brightness(&self, brightness: f32) -> f32 {
        let brightness = self.settings.set_brightness(brightness).await.brightness;
        self.media.set_brightness(brightness);
        brightness
    }

    /// Read settings from the configured file and apply them
    ///
    /// # Errors
    ///
    /// Returns `NoSettingsPath` without a configured path, `Settings` if the
    /// file cannot be read and a JSON error if it does not parse.
    pub async fn load_settings(&self) -> Result<Settings> {
        let path = self
            .config
            .settings_path
            .as_ref()
            .ok_or(SyncError::NoSettingsPath)?;
        let raw = tokio::fs::read(path)
            .await
            .map_err(|source| SyncError::Settings {
                path: path.clone(),
                source,
            })?;
        let mut settings: Settings = serde_json::from_slice(&raw)?;
        settings.clamp();
        tracing::info!(path = %path.display(), "Loaded settings");
        Ok(self.apply_settings(settings).await)
    }

    /// Write the current settings to the configured file
    ///
    /// # Errors
    ///
    /// Returns `NoSettingsPath` without a configured path and `Settings` if
    /// the file cannot be written.
    pub async fn save_settings(&self) -> Result<&Path> {
        let path = self
            .config
            .settings_path
            .as_ref()
            .ok_or(SyncError::NoSettingsPath)?;
        let json = serde_json::to_vec_pretty(&self.settings.get().await)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|source| SyncError::Settings {
                path: path.clone(),
                source,
            })?;
        tracing::info!(path = %path.display(), "Saved settings");
        Ok(path)
    }

    /// Snapshot of what is playing
    pub async fn play_state(&self) -> PlayState {
        let (path, movie_index) = {
            let playlist = self.playlist.lock().await;
            (
                playlist.current().map(|p| p.to_string_lossy().into_owned()),
                playlist.index(),
            )
        };
        PlayState {
            path,
            movie_index,
            position: self.media.current_time(),
            duration: self.media.duration(),
            rate: self.media.rate(),
            volume: self.settings.get().await.volume,
            playing: self.media.is_playing(),
        }
    }

    /// Diagnostic document of the whole node
    ///
    /// # Errors
    ///
    /// Returns a JSON error if a part fails to serialize.
    pub async fn snapshot(&self) -> Result<Value> {
        let now = tokio::time::Instant::now();
        let peers: Vec<Value> = self
            .table
            .snapshot()
            .await
            .iter()
            .map(|peer| {
                json!({
                    "ip": peer.ip.to_string(),
                    "age": peer.age(now).as_secs_f64(),
                    "latency": peer.latency.iter().map(|l| l.as_secs_f64()).collect::<Vec<_>>(),
                    "mean_latency": peer.latency.mean().map(|l| l.as_secs_f64()),
                })
            })
            .collect();
        let sync = self.controller.state().await;
        let settings = self.settings.get().await;
        let playlist: Vec<String> = self
            .playlist
            .lock()
            .await
            .entries()
            .iter()
            .map(|entry| path_string(entry))
            .collect();

        Ok(json!({
            "name": settings.display_name,
            "role": self.role().as_str(),
            "settings": serde_json::to_value(&settings)?,
            "playstate": serde_json::to_value(self.play_state().await)?,
            "playlist": playlist,
            "sync": {
                "mode": sync.mode.as_str(),
                "nominal_rate": sync.nominal_rate,
                "corrective_rate": sync.corrective_rate,
            },
            "broadcasting": self.broadcaster.is_running().await,
            "peers": peers,
        }))
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
