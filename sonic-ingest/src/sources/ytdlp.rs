//! yt-dlp tool adapter
//!
//! Shells out to the local `yt-dlp` binary for:
//! - flat playlist listings (fallback when every Invidious mirror fails)
//! - single top-result searches (Spotify track matching)
//! - single video metadata
//! - best-audio extraction to stdout (the audio relay)
//!
//! Every child is spawned with `kill_on_drop`, so a timed-out or abandoned
//! call never leaves the process running.

use super::{PlaylistEntry, SourceError};
use crate::config::IngestConfig;
use crate::reference::is_valid_video_id;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const PLAYLIST_URL: &str = "https://www.youtube.com/playlist?list=";

/// Audio format preference handed to `-f`
pub const AUDIO_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio/best";

/// Entry of `--flat-playlist --dump-single-json` output
#[derive(Debug, Deserialize)]
struct FlatEntry {
    id: Option<String>,
    url: Option<String>,
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    uploader_id: Option<String>,
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FlatPlaylist {
    #[serde(default)]
    entries: Vec<Option<FlatEntry>>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: Option<String>,
    width: Option<u32>,
}

/// Raw `-j` output for one video
#[derive(Debug, Deserialize)]
struct RawVideoInfo {
    title: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
}

/// Metadata for a single video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub duration_seconds: u32,
    /// Widest thumbnail, empty when none
    pub thumbnail_url: String,
}

fn seconds(duration: Option<f64>) -> u32 {
    duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| d.floor().min(u32::MAX as f64) as u32)
        .unwrap_or(0)
}

/// Handle on the local yt-dlp binary
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    search_timeout: Duration,
    playlist_timeout: Duration,
    info_timeout: Duration,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        let defaults = crate::config::Timeouts::default();
        Self {
            binary: binary.into(),
            search_timeout: defaults.search,
            playlist_timeout: defaults.playlist_dump,
            info_timeout: defaults.video_info,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            binary: config.ytdlp_binary.clone(),
            search_timeout: config.timeouts.search,
            playlist_timeout: config.timeouts.playlist_dump,
            info_timeout: config.timeouts.video_info,
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Run yt-dlp to completion and return its stdout
    async fn run(&self, args: &[String], timeout: Duration) -> Result<Vec<u8>, SourceError> {
        debug!(binary = %self.binary.display(), ?args, "Running yt-dlp");

        let child = self.command().args(args).spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::Tool(format!("{} not found", self.binary.display()))
            } else {
                SourceError::Tool(format!("failed to start {}: {}", self.binary.display(), e))
            }
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| SourceError::Tool(e.to_string()))?,
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "yt-dlp timed out, process killed");
                return Err(SourceError::Timeout(timeout));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("yt-dlp exited with {}", output.status)
            } else {
                stderr
            };
            return Err(SourceError::Tool(message));
        }

        Ok(output.stdout)
    }

    /// List a playlist in one call (`--flat-playlist --dump-single-json`)
    pub async fn flat_playlist(&self, playlist_id: &str) -> Result<Vec<PlaylistEntry>, SourceError> {
        let args = vec![
            "--flat-playlist".to_string(),
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            "--no-check-certificates".to_string(),
            format!("{}{}", PLAYLIST_URL, playlist_id),
        ];
        let stdout = self.run(&args, self.playlist_timeout).await?;
        parse_flat_playlist(&stdout)
    }

    /// Return the id of the first search result, if any
    pub async fn search_first(&self, query: &str) -> Result<Option<String>, SourceError> {
        let sanitized = query.replace('"', "");
        let args = vec![
            format!("ytsearch1:{}", sanitized),
            "--get-id".to_string(),
            "--no-playlist".to_string(),
            "--no-check-certificates".to_string(),
        ];
        let stdout = self.run(&args, self.search_timeout).await?;
        let text = String::from_utf8_lossy(&stdout);

        Ok(text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .filter(|id| is_valid_video_id(id))
            .map(str::to_string))
    }

    /// Fetch metadata for one video (`-j --no-playlist`)
    pub async fn video_info(&self, video_id: &str) -> Result<VideoInfo, SourceError> {
        let args = vec![
            "-j".to_string(),
            "--no-playlist".to_string(),
            "--no-check-certificates".to_string(),
            format!("{}{}", WATCH_URL, video_id),
        ];
        let stdout = self.run(&args, self.info_timeout).await?;
        parse_video_info(video_id, &stdout)
    }

    /// Command that writes the best audio stream of `video_id` to stdout
    ///
    /// The caller owns the spawned process (see `relay::AudioExtraction`).
    pub fn audio_command(&self, video_id: &str) -> Command {
        let mut command = self.command();
        command.args([
            "-f",
            AUDIO_FORMAT,
            "--no-playlist",
            "--no-check-certificates",
            "-o",
            "-",
        ]);
        command.arg(format!("{}{}", WATCH_URL, video_id));
        command
    }
}

fn parse_flat_playlist(stdout: &[u8]) -> Result<Vec<PlaylistEntry>, SourceError> {
    let playlist: FlatPlaylist =
        serde_json::from_slice(stdout).map_err(|e| SourceError::Parse(format!("Invalid JSON: {}", e)))?;

    let entries = playlist
        .entries
        .into_iter()
        .flatten()
        .filter_map(|item| {
            let video_id = item
                .id
                .filter(|id| !id.is_empty())
                .or_else(|| {
                    item.url
                        .as_deref()
                        .map(|u| u.replace(WATCH_URL, ""))
                        .filter(|id| !id.is_empty())
                })?;

            Some(PlaylistEntry {
                video_id,
                title: item.title.unwrap_or_else(|| "Unknown".to_string()),
                channel: item
                    .uploader
                    .or(item.channel)
                    .or(item.uploader_id)
                    .unwrap_or_else(|| "Unknown Artist".to_string()),
                duration_seconds: seconds(item.duration),
            })
        })
        .collect();

    Ok(entries)
}

fn parse_video_info(video_id: &str, stdout: &[u8]) -> Result<VideoInfo, SourceError> {
    let raw: RawVideoInfo =
        serde_json::from_slice(stdout).map_err(|e| SourceError::Parse(format!("Invalid JSON: {}", e)))?;

    let thumbnail_url = raw
        .thumbnails
        .iter()
        .filter(|t| t.url.is_some())
        .max_by_key(|t| t.width.unwrap_or(0))
        .and_then(|t| t.url.clone())
        .unwrap_or_default();

    Ok(VideoInfo {
        video_id: video_id.to_string(),
        title: raw.title.unwrap_or_else(|| "Unknown".to_string()),
        channel: raw
            .channel
            .or(raw.uploader)
            .unwrap_or_else(|| "Unknown Artist".to_string()),
        duration_seconds: seconds(raw.duration),
        thumbnail_url,
    })
}
