//! Audio relay
//!
//! Extracts the best audio stream of one video through yt-dlp, buffers it
//! completely, and answers with the whole buffer or the requested byte range.
//! Browsers' audio elements insist on `Accept-Ranges` to allow seeking.
//!
//! Each request owns exactly one child process. [`AudioExtraction`] kills it
//! when dropped, which covers completion, errors, timeouts and client
//! disconnects (axum drops the handler future).

use crate::error::ApiError;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Content type announced for relayed audio
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Relative URL at which a stored track can be played
pub fn playable_url(video_id: &str) -> String {
    format!("/stream/{}", video_id)
}

/// Inclusive byte range within a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    /// Number of bytes covered (never zero)
    pub fn byte_count(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Interpretation of a `Range` header against a buffer of known size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// No (usable) range: serve everything
    Full,
    Partial(ByteRange),
    /// Range starts past the end of the buffer
    Unsatisfiable,
}

/// Parse a `Range: bytes=...` header
///
/// Supports `start-end`, `start-` and suffix `-N` forms. Only the first range
/// of a multi-range request is honoured. A malformed header is ignored.
pub fn parse_range(header: Option<&str>, total: usize) -> RangeRequest {
    let Some(ranges) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeRequest::Full;
    };
    let first = ranges.split(',').next().unwrap_or_default().trim();
    let Some((start, end)) = first.split_once('-') else {
        return RangeRequest::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        let Ok(suffix) = end.parse::<usize>() else {
            return RangeRequest::Full;
        };
        if suffix == 0 || total == 0 {
            return RangeRequest::Unsatisfiable;
        }
        return RangeRequest::Partial(ByteRange {
            start: total.saturating_sub(suffix),
            end: total - 1,
        });
    }

    let Ok(start) = start.parse::<usize>() else {
        return RangeRequest::Full;
    };
    let end = if end.is_empty() {
        None
    } else {
        match end.parse::<usize>() {
            Ok(end) => Some(end),
            Err(_) => return RangeRequest::Full,
        }
    };

    if start >= total {
        return RangeRequest::Unsatisfiable;
    }
    let last = total - 1;
    let end = end.map_or(last, |e| e.min(last));
    if end < start {
        return RangeRequest::Full;
    }

    RangeRequest::Partial(ByteRange { start, end })
}

/// Relay failure before any byte was sent
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Failed to start yt-dlp: {0}")]
    Spawn(std::io::Error),

    #[error("Failed to read audio stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audio extraction timed out after {0}s")]
    Timeout(u64),

    #[error("Audio extraction failed: {0}")]
    Failed(String),
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// A running yt-dlp audio extraction
///
/// Killed on drop if it has not exited yet.
pub struct AudioExtraction {
    video_id: String,
    child: Option<Child>,
}

impl AudioExtraction {
    /// Spawn `command` and start forwarding its `ERROR` lines to the log
    pub fn spawn(mut command: Command, video_id: &str) -> Result<Self, RelayError> {
        let mut child = command.spawn().map_err(RelayError::Spawn)?;
        debug!(video_id, pid = ?child.id(), "Audio extraction started");

        if let Some(stderr) = child.stderr.take() {
            let video_id = video_id.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.contains("ERROR") {
                        warn!(video_id = %video_id, "yt-dlp: {}", line);
                    }
                }
            });
        }

        Ok(Self {
            video_id: video_id.to_string(),
            child: Some(child),
        })
    }

    /// Read stdout to the end and wait for the process
    ///
    /// A failed exit is only an error when nothing was produced; partial
    /// output is still served.
    pub async fn collect(mut self) -> Result<Vec<u8>, RelayError> {
        let Some(child) = self.child.as_mut() else {
            return Err(RelayError::Failed("process already reaped".to_string()));
        };
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| RelayError::Failed("stdout not captured".to_string()))?;

        let mut buffer = Vec::new();
        stdout.read_to_end(&mut buffer).await?;
        let status = child.wait().await?;
        self.child = None;

        if !status.success() {
            if buffer.is_empty() {
                return Err(RelayError::Failed(format!("yt-dlp exited with {}", status)));
            }
            warn!(
                video_id = %self.video_id,
                bytes = buffer.len(),
                "yt-dlp exited with {}, serving partial output",
                status
            );
        } else if buffer.is_empty() {
            return Err(RelayError::Failed("yt-dlp produced no audio".to_string()));
        }

        debug!(video_id = %self.video_id, bytes = buffer.len(), "Audio extraction finished");
        Ok(buffer)
    }
}

impl Drop for AudioExtraction {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Ok(None) = child.try_wait() {
                debug!(video_id = %self.video_id, "Killing unfinished audio extraction");
                let _ = child.start_kill();
            }
        }
    }
}

/// Build the relay response for a fully buffered stream
pub fn build_audio_response(audio: Bytes, range: RangeRequest) -> Response {
    let total = audio.len();

    let mut response = match range {
        RangeRequest::Full => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, AUDIO_CONTENT_TYPE.to_string()),
                (header::CONTENT_LENGTH, total.to_string()),
            ],
            Body::from(audio),
        )
            .into_response(),
        RangeRequest::Partial(range) => (
            StatusCode::PARTIAL_CONTENT,
            [
                (header::CONTENT_TYPE, AUDIO_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", range.start, range.end, total),
                ),
                (header::CONTENT_LENGTH, range.byte_count().to_string()),
            ],
            Body::from(audio.slice(range.start..=range.end)),
        )
            .into_response(),
        RangeRequest::Unsatisfiable => ApiError::RangeNotSatisfiable(total).into_response(),
    };

    response
        .headers_mut()
        .insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_forms() {
        assert_eq!(parse_range(None, 1000), RangeRequest::Full);
        assert_eq!(
            parse_range(Some("bytes=0-99"), 1000),
            RangeRequest::Partial(ByteRange { start: 0, end: 99 })
        );
        assert_eq!(
            parse_range(Some("bytes=500-"), 1000),
            RangeRequest::Partial(ByteRange { start: 500, end: 999 })
        );
        assert_eq!(
            parse_range(Some("bytes=-100"), 1000),
            RangeRequest::Partial(ByteRange { start: 900, end: 999 })
        );
        assert_eq!(
            parse_range(Some("bytes=900-5000"), 1000),
            RangeRequest::Partial(ByteRange { start: 900, end: 999 })
        );
    }

    #[test]
    fn test_parse_range_edge_cases() {
        assert_eq!(parse_range(Some("bytes=1000-"), 1000), RangeRequest::Unsatisfiable);
        assert_eq!(parse_range(Some("bytes=0-"), 0), RangeRequest::Unsatisfiable);
        assert_eq!(parse_range(Some("bytes=-0"), 1000), RangeRequest::Unsatisfiable);
        assert_eq!(parse_range(Some("items=0-1"), 1000), RangeRequest::Full);
        assert_eq!(parse_range(Some("bytes=abc-"), 1000), RangeRequest::Full);
        assert_eq!(parse_range(Some("bytes=50-10"), 1000), RangeRequest::Full);
        assert_eq!(
            parse_range(Some("bytes=0-1, 5-6"), 1000),
            RangeRequest::Partial(ByteRange { start: 0, end: 1 })
        );
    }

    #[test]
    fn test_partial_response_headers() {
        let audio = Bytes::from(vec![7u8; 1000]);
        let response = build_audio_response(
            audio,
            RangeRequest::Partial(ByteRange { start: 0, end: 99 }),
        );

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        let headers = response.headers();
        assert_eq!(headers.get(header::CONTENT_RANGE).unwrap(), "bytes 0-99/1000");
        assert_eq!(headers.get(header::CONTENT_LENGTH).unwrap(), "100");
        assert_eq!(headers.get(header::ACCEPT_RANGES).unwrap(), "bytes");
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), AUDIO_CONTENT_TYPE);
    }

    #[test]
    fn test_unsatisfiable_response_keeps_accept_ranges() {
        let response = build_audio_response(Bytes::from_static(b"abc"), RangeRequest::Unsatisfiable);
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers().get(header::ACCEPT_RANGES).unwrap(), "bytes");
        assert_eq!(response.headers().get(header::CONTENT_RANGE).unwrap(), "bytes */3");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collect_reads_stdout() {
        let mut command = Command::new("sh");
        command
            .args(["-c", "printf 'hello'; echo 'ERROR: noise' >&2"])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let extraction = AudioExtraction::spawn(command, "aaaaaaaaaaa").unwrap();
        assert_eq!(extraction.collect().await.unwrap(), b"hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collect_failure_without_output() {
        let mut command = Command::new("sh");
        command
            .args(["-c", "exit 3"])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let extraction = AudioExtraction::spawn(command, "aaaaaaaaaaa").unwrap();
        assert!(matches!(extraction.collect().await, Err(RelayError::Failed(_))));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_abandoned_extraction_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("pid");
        let mut command = Command::new("sh");
        command
            .args(["-c", &format!("echo $$ > {}; exec sleep 30", pidfile.display())])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let extraction = AudioExtraction::spawn(command, "aaaaaaaaaaa").unwrap();
        let result =
            tokio::time::timeout(std::time::Duration::from_millis(500), extraction.collect()).await;
        assert!(result.is_err(), "sleep should outlive the timeout");

        let pid = std::fs::read_to_string(&pidfile).unwrap().trim().to_string();
        let stat_path = format!("/proc/{}/stat", pid);
        let mut alive = true;
        for _ in 0..50 {
            alive = match std::fs::read_to_string(&stat_path) {
                // Killed but not yet reaped shows up as a zombie
                Ok(stat) => !stat.contains(") Z "),
                Err(_) => false,
            };
            if !alive {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(!alive, "yt-dlp stand-in {} still running", pid);
    }
}
