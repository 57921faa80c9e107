//! Shared integration test fixtures
//!
//! - in-memory song store
//! - executable shell scripts standing in for yt-dlp
//! - local axum servers standing in for Invidious and Spotify
//! - SSE body parsing

#![allow(dead_code)]

use axum::Router;
use http_body_util::BodyExt;
use sonic_common::ProgressEvent;
use sonic_ingest::config::{IngestConfig, SpotifyCredentials, SpotifySettings};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Single-connection in-memory pool with the schema applied
///
/// One connection only: every `sqlite::memory:` connection is its own
/// database.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sonic_ingest::db::init_tables(&pool).await.unwrap();
    pool
}

/// Write an executable `yt-dlp` replacement running `body` under /bin/sh
///
/// The returned directory must outlive every use of the script.
#[cfg(unix)]
pub fn fake_ytdlp(body: &str) -> (TempDir, PathBuf) {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("yt-dlp");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    (dir, path)
}

/// Serve `router` on an ephemeral loopback port and return its base URL
pub async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Configuration pointing every upstream at test doubles
pub fn test_config(ytdlp: PathBuf, invidious: Vec<String>) -> IngestConfig {
    let mut config = IngestConfig {
        ytdlp_binary: ytdlp,
        invidious_instances: invidious,
        ..IngestConfig::default()
    };
    config.timeouts.mirror = Duration::from_secs(5);
    config.timeouts.spotify = Duration::from_secs(5);
    config.timeouts.search = Duration::from_secs(10);
    config.timeouts.playlist_dump = Duration::from_secs(10);
    config.timeouts.video_info = Duration::from_secs(10);
    config.timeouts.audio = Duration::from_secs(10);
    config
}

/// Spotify settings aimed at a stub server, with credentials
pub fn spotify_settings(base: &str) -> SpotifySettings {
    SpotifySettings {
        credentials: Some(SpotifyCredentials {
            client_id: "test-id".to_string(),
            client_secret: "test-secret".to_string(),
        }),
        accounts_url: base.to_string(),
        api_url: base.to_string(),
    }
}

/// Parse `data:` frames of an SSE body into progress events
pub fn parse_sse(body: &str) -> Vec<ProgressEvent> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|json| serde_json::from_str(json.trim()).unwrap())
        .collect()
}

/// Read a whole response body as UTF-8
pub async fn body_string(body: axum::body::Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Drain every event already queued on a receiver
pub fn drain(mut rx: tokio::sync::mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Count of (progress, skip) events
pub fn item_counts(events: &[ProgressEvent]) -> (usize, usize) {
    events.iter().fold((0, 0), |(p, s), e| match e {
        ProgressEvent::Progress { .. } => (p + 1, s),
        ProgressEvent::Skip { .. } => (p, s + 1),
        _ => (p, s),
    })
}

/// The single `total` event's count, if any
pub fn declared_total(events: &[ProgressEvent]) -> Option<usize> {
    let totals: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Total { count } => Some(*count),
            _ => None,
        })
        .collect();
    assert!(totals.len() <= 1, "total sent more than once: {totals:?}");
    totals.first().copied()
}

/// Assert exactly one terminal event, and that it is the last one
pub fn assert_single_terminal(events: &[ProgressEvent]) {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1, "expected exactly one terminal event: {events:?}");
    assert!(events.last().map(|e| e.is_terminal()).unwrap_or(false));
}

/// yt-dlp script body answering `--flat-playlist` with `json`
pub fn flat_playlist_script(json: &str) -> String {
    format!(
        "case \"$*\" in\n  *--flat-playlist*) cat <<'JSON'\n{}\nJSON\n  ;;\n  *) echo 'ERROR: unexpected call' >&2; exit 1 ;;\nesac",
        json
    )
}
