//! Song and track models
//!
//! `TrackDescriptor` is what the import sources produce; `StoredSong` is what
//! the song store hands back once a descriptor has been persisted.

use serde::{Deserialize, Serialize};

/// Album name used when a track carries none
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// An unsaved, resolvable track
///
/// Built once by a source adapter and never mutated afterwards; the
/// `with_*` methods consume and return the descriptor while it is being
/// assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    external_id: String,
    title: String,
    artist: String,
    album: Option<String>,
    cover_url: Option<String>,
    duration_seconds: u32,
    playable_url: String,
}

impl TrackDescriptor {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        playable_url: impl Into<String>,
    ) -> Self {
        Self {
            external_id: String::new(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            cover_url: None,
            duration_seconds: 0,
            playable_url: playable_url.into(),
        }
    }

    /// Set the source id used for deduplication (empty means none)
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = external_id.into();
        self
    }

    pub fn with_album(mut self, album: Option<String>) -> Self {
        self.album = album.filter(|a| !a.trim().is_empty());
        self
    }

    pub fn with_cover_url(mut self, cover_url: Option<String>) -> Self {
        self.cover_url = cover_url.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    pub fn cover_url(&self) -> Option<&str> {
        self.cover_url.as_deref()
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    pub fn playable_url(&self) -> &str {
        &self.playable_url
    }
}

/// A persisted song row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSong {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_url: String,
    /// Length in seconds (0 when unknown)
    #[serde(rename = "duration")]
    pub duration_seconds: u32,
    pub audio_url: String,
    /// Source id; empty for manually entered songs
    #[serde(default)]
    pub external_id: String,
}
