//! Playlist and video reference parsing
//!
//! Turns a free-form URL (or pasted id) into a canonical identifier.
//!
//! Edge case: any 11-character `[A-Za-z0-9_-]` token is accepted as a bare
//! video id, so a search phrase of exactly that shape ("hello_world") is
//! indistinguishable from an id. This is left unresolved on purpose; callers
//! that care must disambiguate before calling `extract_video_id`.

use crate::error::ImportError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static VIDEO_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([a-zA-Z0-9_-]{11})")
        .expect("video URL pattern is valid")
});

static VIDEO_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("video id pattern is valid"));

static LIST_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]list=([a-zA-Z0-9_-]+)").expect("list pattern is valid"));

static SPOTIFY_PLAYLIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"playlist/([a-zA-Z0-9]+)").expect("playlist pattern is valid"));

/// Which service a playlist reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// YouTube / YouTube Music
    VideoService,
    /// Spotify
    OtherService,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VideoService => write!(f, "youtube"),
            Self::OtherService => write!(f, "spotify"),
        }
    }
}

/// Parsed (source kind, playlist id) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistReference {
    kind: SourceKind,
    playlist_id: String,
}

impl PlaylistReference {
    /// Parse a YouTube (or YouTube Music) playlist URL
    pub fn parse_video_playlist(url: &str) -> Result<Self, ImportError> {
        extract_video_playlist_id(url)
            .map(|playlist_id| Self {
                kind: SourceKind::VideoService,
                playlist_id,
            })
            .ok_or_else(|| {
                ImportError::Validation(
                    "Invalid YouTube playlist URL. URL must contain ?list=...".to_string(),
                )
            })
    }

    /// Parse a Spotify playlist URL
    pub fn parse_spotify_playlist(url: &str) -> Result<Self, ImportError> {
        extract_spotify_playlist_id(url)
            .map(|playlist_id| Self {
                kind: SourceKind::OtherService,
                playlist_id,
            })
            .ok_or_else(|| ImportError::Validation("Invalid Spotify playlist URL.".to_string()))
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }
}

/// True for a well-formed 11-character video id
pub fn is_valid_video_id(candidate: &str) -> bool {
    VIDEO_ID_RE.is_match(candidate)
}

/// Extract a video id from a watch, short-link or embed URL, or a bare id
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if let Some(caps) = VIDEO_URL_RE.captures(input) {
        return Some(caps[1].to_string());
    }
    if is_valid_video_id(input) {
        return Some(input.to_string());
    }
    None
}

/// Extract the `list=` parameter from a YouTube or YouTube Music URL
///
/// The music host is normalized first so both forms yield the same id.
pub fn extract_video_playlist_id(url: &str) -> Option<String> {
    let normalized = url.trim().replace("music.youtube.com", "www.youtube.com");
    LIST_PARAM_RE
        .captures(&normalized)
        .map(|caps| caps[1].to_string())
}

/// Extract the id from a `/playlist/<id>` path segment
pub fn extract_spotify_playlist_id(url: &str) -> Option<String> {
    SPOTIFY_PLAYLIST_RE
        .captures(url.trim())
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_forms() {
        let expected = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), expected);
        assert_eq!(extract_video_id("https://youtube.com/watch?v=dQw4w9WgXcQ&t=42"), expected);
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ"), expected);
        assert_eq!(extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"), expected);
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), expected);
        assert_eq!(extract_video_id("  dQw4w9WgXcQ \n"), expected);
    }

    #[test]
    fn test_video_id_rejects_other_input() {
        assert_eq!(extract_video_id("https://vimeo.com/123456"), None);
        assert_eq!(extract_video_id("tooshort"), None);
        assert_eq!(extract_video_id("twelve_chars"), None);
        assert_eq!(extract_video_id("has space!!"), None);
    }

    #[test]
    fn test_bare_eleven_character_token_is_accepted() {
        // Ambiguous with a search query of the same shape; accepted as an id.
        assert_eq!(extract_video_id("hello_world"), Some("hello_world".to_string()));
    }

    #[test]
    fn test_music_host_yields_same_playlist_id() {
        let id = "PLrAXtmErZgOeiKm4sgNOknGvNjby9efdf";
        let plain = format!("https://www.youtube.com/playlist?list={}", id);
        let music = format!("https://music.youtube.com/playlist?list={}", id);
        let watch = format!("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list={}&index=2", id);

        assert_eq!(extract_video_playlist_id(&plain).as_deref(), Some(id));
        assert_eq!(extract_video_playlist_id(&music).as_deref(), Some(id));
        assert_eq!(extract_video_playlist_id(&watch).as_deref(), Some(id));
    }

    #[test]
    fn test_playlist_url_without_list_is_validation_error() {
        let err = PlaylistReference::parse_video_playlist("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .unwrap_err();
        assert!(matches!(err, ImportError::Validation(_)));
    }

    #[test]
    fn test_spotify_playlist_id() {
        let reference = PlaylistReference::parse_spotify_playlist(
            "https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc123",
        )
        .unwrap();
        assert_eq!(reference.kind(), SourceKind::OtherService);
        assert_eq!(reference.playlist_id(), "37i9dQZF1DXcBWIGoYBM5M");

        assert!(PlaylistReference::parse_spotify_playlist("https://open.spotify.com/album/xyz").is_err());
    }
}
