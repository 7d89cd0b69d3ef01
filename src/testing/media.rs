//! In-memory media controller

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use crate::error::{Result, SyncError};
use crate::media::{EndedCallback, MediaController};

#[derive(Debug)]
struct Playhead {
    path: Option<String>,
    /// Position at `anchored_at`
    anchor: f64,
    anchored_at: Instant,
    rate: f64,
    playing: bool,
    duration: Option<f64>,
    frame_rate: Option<f64>,
    volume: f32,
    brightness: f32,
    seeks: Vec<f64>,
    rates: Vec<f64>,
    loads: Vec<String>,
    reject_loads: bool,
}

impl Playhead {
    fn position(&self, now: Instant) -> f64 {
        let mut position = self.anchor;
        if self.playing {
            position += now.saturating_duration_since(self.anchored_at).as_secs_f64() * self.rate;
        }
        match self.duration {
            Some(duration) => position.clamp(0.0, duration),
            None => position.max(0.0),
        }
    }

    /// Fold elapsed play time into the anchor
    fn reanchor(&mut self) {
        let now = Instant::now();
        self.anchor = self.position(now);
        self.anchored_at = now;
    }
}

/// Media controller whose clock follows the tokio clock
///
/// Playback advances with `tokio::time`, so paused-time tests can move it
/// with `tokio::time::advance`. Seeks, rate changes and loads are recorded
/// for inspection.
pub struct SimulatedMedia {
    playhead: Mutex<Playhead>,
    ended: Mutex<Option<EndedCallback>>,
}

impl SimulatedMedia {
    /// Create a paused controller with nothing loaded
    #[must_use]
    pub fn new() -> Self {
        Self {
            playhead: Mutex::new(Playhead {
                path: None,
                anchor: 0.0,
                anchored_at: Instant::now(),
                rate: 1.0,
                playing: false,
                duration: None,
                frame_rate: None,
                volume: 1.0,
                brightness: 1.0,
                seeks: Vec::new(),
                rates: Vec::new(),
                loads: Vec::new(),
                reject_loads: false,
            }),
            ended: Mutex::new(None),
        }
    }

    /// Report `duration` seconds for every loaded file
    #[must_use]
    pub fn with_duration(self, duration: f64) -> Self {
        self.playhead().duration = Some(duration);
        self
    }

    /// Report `fps` as the stream frame rate
    #[must_use]
    pub fn with_frame_rate(self, fps: f64) -> Self {
        self.playhead().frame_rate = Some(fps);
        self
    }

    fn playhead(&self) -> MutexGuard<'_, Playhead> {
        self.playhead.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the playhead without recording a seek
    pub fn set_position(&self, seconds: f64) {
        let mut playhead = self.playhead();
        playhead.anchor = seconds;
        playhead.anchored_at = Instant::now();
    }

    /// Make subsequent loads fail
    pub fn reject_loads(&self, reject: bool) {
        self.playhead().reject_loads = reject;
    }

    /// Positions passed to `seek_to_time`, in order
    #[must_use]
    pub fn seeks(&self) -> Vec<f64> {
        self.playhead().seeks.clone()
    }

    /// Rates passed to `set_rate`, in order
    #[must_use]
    pub fn rates(&self) -> Vec<f64> {
        self.playhead().rates.clone()
    }

    /// Paths passed to `load`, in order
    #[must_use]
    pub fn loads(&self) -> Vec<String> {
        self.playhead().loads.clone()
    }

    /// Currently loaded path
    #[must_use]
    pub fn loaded_path(&self) -> Option<String> {
        self.playhead().path.clone()
    }

    /// Last volume set
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.playhead().volume
    }

    /// Last brightness set
    #[must_use]
    pub fn brightness(&self) -> f32 {
        self.playhead().brightness
    }

    /// Simulate reaching the end of the media
    ///
    /// Stops playback at the end and fires the ended callback.
    pub fn finish(&self) {
        {
            let mut playhead = self.playhead();
            playhead.reanchor();
            if let Some(duration) = playhead.duration {
                playhead.anchor = duration;
            }
            playhead.playing = false;
        }
        let ended = self.ended.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(callback) = ended.as_ref() {
            callback();
        }
    }
}

impl Default for SimulatedMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaController for SimulatedMedia {
    fn current_time(&self) -> f64 {
        self.playhead().position(Instant::now())
    }

    fn duration(&self) -> Option<f64> {
        let playhead = self.playhead();
        playhead.path.as_ref().and(playhead.duration)
    }

    fn seek_to_time(&self, seconds: f64) {
        let mut playhead = self.playhead();
        playhead.anchor = seconds;
        playhead.anchored_at = Instant::now();
        playhead.seeks.push(seconds);
    }

    fn set_rate(&self, rate: f64) {
        let mut playhead = self.playhead();
        playhead.reanchor();
        playhead.rate = rate;
        playhead.rates.push(rate);
    }

    fn rate(&self) -> f64 {
        self.playhead().rate
    }

    fn play(&self) {
        let mut playhead = self.playhead();
        if !playhead.playing {
            playhead.anchored_at = Instant::now();
            playhead.playing = true;
        }
    }

    fn pause(&self) {
        let mut playhead = self.playhead();
        playhead.reanchor();
        playhead.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playhead().playing
    }

    fn load(&self, path: &str) -> Result<()> {
        let mut playhead = self.playhead();
        if playhead.reject_loads {
            return Err(SyncError::Media {
                message: format!("cannot open {path}"),
            });
        }
        playhead.path = Some(path.to_string());
        playhead.loads.push(path.to_string());
        playhead.anchor = 0.0;
        playhead.anchored_at = Instant::now();
        playhead.playing = false;
        Ok(())
    }

    fn frame_rate(&self) -> Option<f64> {
        self.playhead().frame_rate
    }

    fn set_volume(&self, volume: f32) {
        self.playhead().volume = volume;
    }

    fn set_brightness(&self, brightness: f32) {
        self.playhead().brightness = brightness;
    }

    fn on_ended(&self, callback: EndedCallback) {
        *self.ended.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }
}
