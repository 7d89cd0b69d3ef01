//! Directory playlists

use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::net::spawn_blocking;

/// File extensions picked up when scanning a directory
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "avi", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "webm",
];

/// Ordered list of media files with a cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    entries: Vec<PathBuf>,
    index: usize,
}

impl Playlist {
    /// Create a playlist from explicit entries
    #[must_use]
    pub fn new(entries: Vec<PathBuf>) -> Self {
        Self { entries, index: 0 }
    }

    /// Playlist holding a single file
    #[must_use]
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self::new(vec![path.into()])
    }

    /// Scan `dir` for media files on a blocking worker
    ///
    /// Entries are sorted by file name.
    ///
    /// # Errors
    ///
    /// Returns `Media` if the directory cannot be read or holds no media
    /// files, and `TaskFailed` if the worker panicked.
    pub async fn scan(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let entries = spawn_blocking(move || scan_dir(&dir))
            .await
            .map_err(|e| SyncError::TaskFailed {
                message: e.to_string(),
            })??;
        Ok(Self::new(entries))
    }

    /// Entry under the cursor
    #[must_use]
    pub fn current(&self) -> Option<&Path> {
        self.entries.get(self.index).map(PathBuf::as_path)
    }

    /// Cursor position
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// All entries in play order
    #[must_use]
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the playlist is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the cursor is on the last entry
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.entries.len()
    }

    /// Move to the next entry
    ///
    /// With `wrap` the cursor goes from the last entry back to the first,
    /// otherwise it stays put and `None` is returned.
    pub fn next(&mut self, wrap: bool) -> Option<&Path> {
        if self.entries.is_empty() {
            return None;
        }
        if !self.is_last() {
            self.index += 1;
        } else if wrap {
            self.index = 0;
        } else {
            return None;
        }
        self.current()
    }

    /// Move to the previous entry
    pub fn prev(&mut self, wrap: bool) -> Option<&Path> {
        if self.entries.is_empty() {
            return None;
        }
        if self.index > 0 {
            self.index -= 1;
        } else if wrap {
            self.index = self.entries.len() - 1;
        } else {
            return None;
        }
        self.current()
    }

    /// Move the cursor to `index`
    ///
    /// # Errors
    ///
    /// Returns `TrackOutOfRange` if there is no such entry.
    pub fn select(&mut self, index: usize) -> Result<&Path> {
        if index >= self.entries.len() {
            return Err(SyncError::TrackOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        self.index = index;
        Ok(self.entries[index].as_path())
    }
}

fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn scan_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let read = std::fs::read_dir(dir).map_err(|e| SyncError::Media {
        message: format!("cannot read {}: {e}", dir.display()),
    })?;

    let mut entries: Vec<PathBuf> = read
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_media_file(path))
        .collect();

    if entries.is_empty() {
        return Err(SyncError::Media {
            message: format!("no media files in {}", dir.display()),
        });
    }

    entries.sort();
    tracing::debug!(dir = %dir.display(), count = entries.len(), "Scanned playlist");
    Ok(entries)
}
