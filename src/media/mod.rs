//! Media controller seam
//!
//! Decoding and rendering live outside this crate. A node drives whatever
//! player it is embedded in through [`MediaController`].

mod playlist;


pub use playlist::{MEDIA_EXTENSIONS, Playlist};

use crate::error::Result;

/// Callback invoked when the loaded media reaches its end
pub type EndedCallback = Box<dyn Fn() + Send + Sync>;

/// Local media player driven by the sync core
///
/// Implementations must not block: every method is called from async
/// tasks. Times are media-clock seconds.
pub trait MediaController: Send + Sync {
    /// Current playback position
    fn current_time(&self) -> f64;

    /// Length of the loaded media, if known
    fn duration(&self) -> Option<f64>;

    /// Jump to `seconds`
    fn seek_to_time(&self, seconds: f64);

    /// Set the playback rate
    fn set_rate(&self, rate: f64);

    /// Current playback rate
    fn rate(&self) -> f64;

    /// Start or resume playback
    fn play(&self);

    /// Pause playback
    fn pause(&self);

    /// Check if media is playing
    fn is_playing(&self) -> bool;

    /// Load the media at `path`, paused at position zero
    ///
    /// # Errors
    ///
    /// Returns a media error if the file cannot be opened.
    fn load(&self, path: &str) -> Result<()>;

    /// Native frame rate of the loaded stream, if known
    fn frame_rate(&self) -> Option<f64> {
        None
    }

    /// Set output volume in `0.0..=1.0`
    fn set_volume(&self, _volume: f32) {}

    /// Set output brightness in `0.0..=1.0`
    fn set_brightness(&self, _brightness: f32) {}

    /// Install the end-of-media callback, replacing any previous one
    fn on_ended(&self, callback: EndedCallback);
}
