//! Spotify Web API client
//!
//! Service-to-service access only: a client-credentials token followed by a
//! paginated walk over a playlist's tracks. Spotify tracks are not playable
//! here; the resolver matches each one against YouTube afterwards.

use super::SourceError;
use crate::config::{SpotifyCredentials, SpotifySettings};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Tracks per page (API maximum)
const PAGE_LIMIT: u32 = 50;

/// Pages followed before the playlist is treated as malformed
pub const MAX_PAGES: usize = 200;

const TRACK_FIELDS: &str = "next,items(track(name,duration_ms,artists(name),album(name,images)))";

/// A track as listed by the catalog, before it has a playable source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub title: String,
    /// All contributing artists, comma-joined
    pub artist: String,
    pub album: String,
    /// Largest available cover image, empty when none
    pub cover_url: String,
    pub duration_seconds: u32,
}

impl CatalogTrack {
    /// "Artist - Title"
    pub fn label(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    /// Search phrase biased toward official audio uploads
    pub fn search_query(&self) -> String {
        format!("{} {} official audio", self.artist, self.title)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TracksPage {
    next: Option<String>,
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    name: Option<String>,
    duration_ms: Option<u64>,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    album: Option<ApiAlbum>,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiAlbum {
    name: Option<String>,
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    url: String,
    width: Option<u32>,
}

impl From<ApiTrack> for CatalogTrack {
    fn from(track: ApiTrack) -> Self {
        let artist = track
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let (album, cover_url) = match track.album {
            Some(album) => {
                // Spotify lists images widest first, but do not rely on it.
                let cover = album
                    .images
                    .iter()
                    .enumerate()
                    .max_by_key(|(idx, img)| (img.width.unwrap_or(0), std::cmp::Reverse(*idx)))
                    .map(|(_, img)| img.url.clone())
                    .unwrap_or_default();
                (album.name.unwrap_or_else(|| "Unknown".to_string()), cover)
            }
            None => ("Unknown".to_string(), String::new()),
        };

        CatalogTrack {
            title: track.name.unwrap_or_else(|| "Unknown".to_string()),
            artist: if artist.is_empty() {
                "Unknown".to_string()
            } else {
                artist
            },
            album,
            cover_url,
            duration_seconds: track
                .duration_ms
                .map(|ms| u32::try_from(ms / 1000).unwrap_or(u32::MAX))
                .unwrap_or(0),
        }
    }
}

/// Spotify Web API client
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http_client: reqwest::Client,
    settings: SpotifySettings,
    timeout: Duration,
}

impl SpotifyClient {
    /// Build a client; `timeout` bounds the token exchange and each page
    pub fn new(settings: SpotifySettings, timeout: Duration) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            settings,
            timeout,
        })
    }

    /// Configured credentials, or the operator-facing error
    pub fn credentials(&self) -> Result<&SpotifyCredentials, SourceError> {
        self.settings.credentials.as_ref().ok_or_else(|| {
            SourceError::MissingCredentials(
                "Spotify credentials not set. Set SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET \
                 (environment) or [spotify] client_id/client_secret (config file)."
                    .to_string(),
            )
        })
    }

    /// Exchange client credentials for a bearer token
    pub async fn access_token(&self) -> Result<String, SourceError> {
        let credentials = self.credentials()?;
        let url = format!("{}/api/token", self.settings.accounts_url.trim_end_matches('/'));

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| SourceError::from_http(e, self.timeout))?;

        let value = read_json(response, self.timeout).await?;
        let token: TokenResponse =
            serde_json::from_value(value).map_err(|e| SourceError::Parse(e.to_string()))?;

        token.access_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            SourceError::Parse(
                "Spotify did not return an access token. Check your Client ID and Secret.".to_string(),
            )
        })
    }

    /// Fetch every track of a playlist, following `next` links
    pub async fn playlist_tracks(
        &self,
        playlist_id: &str,
        token: &str,
    ) -> Result<Vec<CatalogTrack>, SourceError> {
        let api_base = self.settings.api_url.trim_end_matches('/');
        let mut next_url = Some(format!(
            "{}/v1/playlists/{}/tracks?limit={}&fields={}",
            api_base, playlist_id, PAGE_LIMIT, TRACK_FIELDS
        ));
        let mut tracks = Vec::new();
        let mut pages = 0;

        while let Some(url) = next_url.take() {
            if pages >= MAX_PAGES {
                return Err(SourceError::Upstream(format!(
                    "playlist paging did not finish after {} pages",
                    MAX_PAGES
                )));
            }
            pages += 1;

            debug!(url = %url, page = pages, "Fetching Spotify playlist page");
            let response = self
                .http_client
                .get(&url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| SourceError::from_http(e, self.timeout))?;
            let value = read_json(response, self.timeout).await?;
            let page: TracksPage =
                serde_json::from_value(value).map_err(|e| SourceError::Parse(e.to_string()))?;

            tracks.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| item.track)
                    .map(CatalogTrack::from),
            );

            next_url = match page.next {
                Some(next) => Some(rebase_next_link(&next, api_base)?),
                None => None,
            };
        }

        info!(playlist_id = %playlist_id, count = tracks.len(), "Fetched Spotify playlist");
        Ok(tracks)
    }
}

/// Keep the path and query of a `next` link but send it to our API host
///
/// The bearer token is only ever sent to the configured API base.
fn rebase_next_link(next: &str, api_base: &str) -> Result<String, SourceError> {
    let parsed = url::Url::parse(next)
        .map_err(|e| SourceError::Parse(format!("Bad next link {:?}: {}", next, e)))?;
    let mut rebased = format!("{}{}", api_base, parsed.path());
    if let Some(query) = parsed.query() {
        rebased.push('?');
        rebased.push_str(query);
    }
    Ok(rebased)
}

/// Read a JSON body, surfacing Spotify error payloads and non-JSON bodies
async fn read_json(response: reqwest::Response, limit: Duration) -> Result<Value, SourceError> {
    let status = response.status();
    let raw = response
        .text()
        .await
        .map_err(|e| SourceError::from_http(e, limit))?;
    let raw = raw.trim();

    let value: Value = serde_json::from_str(raw).map_err(|_| SourceError::Status {
        status: status.as_u16(),
        body: format!(
            "Spotify returned non-JSON: \"{}\"",
            raw.chars().take(120).collect::<String>()
        ),
    })?;

    if let Some(error) = value.get("error") {
        let message = value
            .get("error_description")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| error.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| error.to_string());
        return Err(SourceError::Status {
            status: status.as_u16(),
            body: format!("Spotify error: {}", message),
        });
    }

    if !status.is_success() {
        return Err(SourceError::Status {
            status: status.as_u16(),
            body: raw.chars().take(120).collect(),
        });
    }

    Ok(value)
}
