//! Upstream source adapters
//!
//! Three independent adapters feed the resolver:
//! - [`invidious`]: public Invidious mirrors (primary playlist source)
//! - [`ytdlp`]: the local `yt-dlp` tool (playlist fallback, search, audio)
//! - [`spotify`]: Spotify Web API (client-credentials + paginated fetch)
//!
//! Playlist-capable adapters are wrapped in [`PlaylistSource`] so the
//! resolver can try them in a fixed priority order behind one call.

pub mod invidious;
pub mod spotify;
pub mod ytdlp;

pub use invidious::InvidiousClient;
pub use spotify::{CatalogTrack, SpotifyClient};
pub use ytdlp::{VideoInfo, YtDlp};

use crate::error::{truncate_message, MAX_SURFACED_MESSAGE};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single upstream source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// Upstream answered with its own error payload
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// External tool exited unsuccessfully or could not be started
    #[error("Tool error: {0}")]
    Tool(String),

    /// Source answered but had nothing for us
    #[error("empty response")]
    Empty,

    /// Every Invidious mirror failed; carries a summary of the first failures
    #[error("All Invidious instances failed. Errors: {0}")]
    AllMirrorsFailed(String),

    #[error("{0}")]
    MissingCredentials(String),
}

impl SourceError {
    /// Short message suitable for a client-facing event
    pub fn user_message(&self) -> String {
        match self {
            SourceError::Tool(stderr) if stderr.to_lowercase().contains("private") => {
                "Playlist is private or unavailable.".to_string()
            }
            SourceError::Tool(stderr) => truncate_message(stderr, MAX_SURFACED_MESSAGE),
            other => truncate_message(&other.to_string(), MAX_SURFACED_MESSAGE),
        }
    }

    /// Classify an HTTP client failure; `limit` is the client's request timeout
    pub(crate) fn from_http(err: reqwest::Error, limit: Duration) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(limit)
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

/// One playlist item as reported by a video-service source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub video_id: String,
    /// Raw video title, possibly "Artist - Title"
    pub title: String,
    /// Channel / uploader name
    pub channel: String,
    /// Length in seconds, 0 when the source does not say
    pub duration_seconds: u32,
}

/// A playlist-capable source
///
/// Closed set: the resolver tries these in the order it was given.
#[derive(Debug, Clone)]
pub enum PlaylistSource {
    Invidious(InvidiousClient),
    YtDlp(YtDlp),
}

impl PlaylistSource {
    /// Display name used in progress messages
    pub fn name(&self) -> &'static str {
        match self {
            PlaylistSource::Invidious(_) => "Invidious",
            PlaylistSource::YtDlp(_) => "yt-dlp",
        }
    }

    /// List the entries of a playlist
    pub async fn resolve_playlist(&self, playlist_id: &str) -> Result<Vec<PlaylistEntry>, SourceError> {
        match self {
            PlaylistSource::Invidious(client) => client.fetch_playlist(playlist_id).await,
            PlaylistSource::YtDlp(tool) => tool.flat_playlist(playlist_id).await,
        }
    }
}
