//! Invidious mirror client
//!
//! Invidious instances expose YouTube playlist contents without YouTube's
//! bot checks, but individual instances come and go. Instances are tried in
//! priority order; the first one that returns at least one video wins.

use super::{PlaylistEntry, SourceError};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Pages fetched per instance before giving up on the declared count
pub const MAX_PAGES: u32 = 10;

/// Failures summarized in the aggregate error
const MAX_REPORTED_FAILURES: usize = 3;

/// Invidious `/api/v1/playlists/{id}` page
#[derive(Debug, Deserialize)]
struct PlaylistPage {
    #[serde(rename = "videoCount")]
    video_count: Option<usize>,
    #[serde(default)]
    videos: Vec<PlaylistVideo>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistVideo {
    #[serde(rename = "videoId")]
    video_id: String,
    title: Option<String>,
    author: Option<String>,
    #[serde(rename = "lengthSeconds")]
    length_seconds: Option<u64>,
}

impl From<PlaylistVideo> for PlaylistEntry {
    fn from(video: PlaylistVideo) -> Self {
        PlaylistEntry {
            video_id: video.video_id,
            title: video.title.unwrap_or_else(|| "Unknown".to_string()),
            channel: video.author.unwrap_or_else(|| "Unknown Artist".to_string()),
            duration_seconds: video
                .length_seconds
                .map(|s| u32::try_from(s).unwrap_or(u32::MAX))
                .unwrap_or(0),
        }
    }
}

/// Client over a prioritized list of Invidious instances
#[derive(Debug, Clone)]
pub struct InvidiousClient {
    http_client: reqwest::Client,
    instances: Vec<String>,
    timeout: Duration,
}

impl InvidiousClient {
    /// Build a client; `timeout` bounds each page request
    pub fn new(instances: Vec<String>, timeout: Duration) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            instances,
            timeout,
        })
    }

    /// Fetch a playlist from the first instance that has it
    pub async fn fetch_playlist(&self, playlist_id: &str) -> Result<Vec<PlaylistEntry>, SourceError> {
        let mut failures: Vec<String> = Vec::new();

        for base in &self.instances {
            match self.fetch_from_instance(base, playlist_id).await {
                Ok(entries) if !entries.is_empty() => {
                    info!(
                        instance = %base,
                        playlist_id = %playlist_id,
                        count = entries.len(),
                        "Invidious returned playlist"
                    );
                    return Ok(entries);
                }
                Ok(_) => {
                    debug!(instance = %base, "Invidious instance returned no videos");
                    failures.push(format!("{}: {}", base, SourceError::Empty));
                }
                Err(e) => {
                    warn!(instance = %base, error = %e, "Invidious instance failed");
                    let reason: String = e.to_string().chars().take(60).collect();
                    failures.push(format!("{}: {}", base, reason));
                }
            }
        }

        if failures.is_empty() {
            return Err(SourceError::AllMirrorsFailed("no instances configured".to_string()));
        }

        failures.truncate(MAX_REPORTED_FAILURES);
        Err(SourceError::AllMirrorsFailed(failures.join(" | ")))
    }

    /// Page through one instance until the declared count or the page cap
    async fn fetch_from_instance(
        &self,
        base: &str,
        playlist_id: &str,
    ) -> Result<Vec<PlaylistEntry>, SourceError> {
        let mut entries: Vec<PlaylistEntry> = Vec::new();
        let mut page = 1;

        loop {
            let data = self.fetch_page(base, playlist_id, page).await?;
            if let Some(error) = data.error {
                if entries.is_empty() {
                    return Err(SourceError::Upstream(error));
                }
                warn!(instance = %base, page, error = %error, "Invidious stopped paging early");
                break;
            }
            if data.videos.is_empty() {
                break;
            }

            entries.extend(data.videos.into_iter().map(PlaylistEntry::from));

            let declared = data.video_count.unwrap_or(entries.len());
            if entries.len() >= declared || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }

        Ok(entries)
    }

    async fn fetch_page(
        &self,
        base: &str,
        playlist_id: &str,
        page: u32,
    ) -> Result<PlaylistPage, SourceError> {
        let url = format!(
            "{}/api/v1/playlists/{}?page={}",
            base.trim_end_matches('/'),
            playlist_id,
            page
        );
        debug!(url = %url, "Querying Invidious");

        let http_error = |e| SourceError::from_http(e, self.timeout);
        let response = self.http_client.get(&url).send().await.map_err(http_error)?;
        let status = response.status();
        let body = response.text().await.map_err(http_error)?;

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: body.chars().take(80).collect(),
            });
        }

        let trimmed = body.trim_start();
        if !trimmed.starts_with('{') {
            return Err(SourceError::Parse(format!(
                "Not JSON: {}",
                trimmed.chars().take(80).collect::<String>()
            )));
        }

        serde_json::from_str(trimmed).map_err(|e| SourceError::Parse(e.to_string()))
    }
}
