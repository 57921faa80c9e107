//! HTTP API tests
//!
//! Drive the full router with `oneshot` against an in-memory song store and
//! a scripted yt-dlp.

#![cfg(unix)]

mod helpers;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use helpers::*;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sonic_common::ProgressEvent;
use sonic_ingest::{build_router, AppState};
use std::path::PathBuf;
use tower::ServiceExt;

async fn test_app(ytdlp: PathBuf) -> axum::Router {
    let state = AppState::new(test_config(ytdlp, vec![]), memory_pool().await).unwrap();
    build_router(state)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_string(response.into_body()).await).unwrap()
}

/// yt-dlp stand-in emitting 1000 bytes of "audio"
const AUDIO_SCRIPT: &str = "head -c 1000 /dev/zero | tr '\\0' 'a'";

#[tokio::test]
async fn test_health() {
    let (_dir, ytdlp) = fake_ytdlp("exit 1");
    let app = test_app(ytdlp).await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "sonic-ingest");
    assert_eq!(body["spotify_configured"], false);
}

#[tokio::test]
async fn test_import_without_url_is_bad_request() {
    let (_dir, ytdlp) = fake_ytdlp("exit 1");
    let app = test_app(ytdlp).await;

    for uri in ["/import/video-playlist", "/import/other-service-playlist"] {
        let response = app.clone().oneshot(post_json(uri, json!({}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "url is required");
    }
}

#[tokio::test]
async fn test_import_streams_progress_events() {
    let (_dir, ytdlp) = fake_ytdlp(&flat_playlist_script(
        r#"{"entries": [{"id": "aaaaaaaaaaa", "title": "A - B"}, {"id": "aaaaaaaaaaa", "title": "A - B"}]}"#,
    ));
    let app = test_app(ytdlp).await;

    let response = app
        .oneshot(post_json(
            "/import/video-playlist",
            json!({"url": "https://www.youtube.com/playlist?list=PLxyz"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(headers["x-accel-buffering"], "no");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");

    let events = parse_sse(&body_string(response.into_body()).await);
    assert_single_terminal(&events);
    assert_eq!(declared_total(&events), Some(2));
    assert_eq!(item_counts(&events), (1, 1));
    assert_eq!(events[0], ProgressEvent::info("Fetching playlist info..."));
}

#[tokio::test]
async fn test_other_service_import_without_credentials() {
    let (_dir, ytdlp) = fake_ytdlp("exit 1");
    let app = test_app(ytdlp).await;

    let response = app
        .oneshot(post_json(
            "/import/other-service-playlist",
            json!({"url": "https://open.spotify.com/playlist/abc123"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let events = parse_sse(&body_string(response.into_body()).await);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ProgressEvent::Error { .. }));
}

#[tokio::test]
async fn test_stream_rejects_malformed_id() {
    let (_dir, ytdlp) = fake_ytdlp(AUDIO_SCRIPT);
    let app = test_app(ytdlp).await;

    let response = app
        .oneshot(Request::builder().uri("/stream/short").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

async fn stream_request(app: axum::Router, range: Option<&str>) -> axum::response::Response {
    let mut request = Request::builder().uri("/stream/dQw4w9WgXcQ");
    if let Some(range) = range {
        request = request.header(header::RANGE, range);
    }
    app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap()
}

#[tokio::test]
async fn test_stream_full_and_ranged() {
    let (_dir, ytdlp) = fake_ytdlp(AUDIO_SCRIPT);
    let app = test_app(ytdlp).await;

    let full = stream_request(app.clone(), None).await;
    assert_eq!(full.status(), StatusCode::OK);
    assert_eq!(full.headers()[header::ACCEPT_RANGES], "bytes");
    assert_eq!(full.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(full.into_body().collect().await.unwrap().to_bytes().len(), 1000);

    let head = stream_request(app.clone(), Some("bytes=0-99")).await;
    assert_eq!(head.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(head.headers()[header::CONTENT_RANGE], "bytes 0-99/1000");
    assert_eq!(head.headers()[header::CONTENT_LENGTH], "100");
    assert_eq!(head.into_body().collect().await.unwrap().to_bytes().len(), 100);

    let tail = stream_request(app.clone(), Some("bytes=900-")).await;
    assert_eq!(tail.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(tail.headers()[header::CONTENT_RANGE], "bytes 900-999/1000");
    assert_eq!(tail.into_body().collect().await.unwrap().to_bytes().len(), 100);

    let past_end = stream_request(app, Some("bytes=5000-")).await;
    assert_eq!(past_end.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(past_end.headers()[header::CONTENT_RANGE], "bytes */1000");
}

#[tokio::test]
async fn test_stream_tool_failure_is_server_error() {
    let (_dir, ytdlp) = fake_ytdlp("echo 'ERROR: Video unavailable' >&2; exit 1");
    let app = test_app(ytdlp).await;

    let response = stream_request(app, None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_songs_create_list_and_deduplicate() {
    let (_dir, ytdlp) = fake_ytdlp("exit 1");
    let app = test_app(ytdlp).await;

    let missing = app
        .clone()
        .oneshot(post_json("/songs", json!({"title": "T", "artist": "A"})))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let song = json!({
        "title": "Song",
        "artist": "Artist",
        "audioUrl": "/stream/aaaaaaaaaaa",
        "durationSeconds": 120,
        "externalId": "aaaaaaaaaaa"
    });
    let created = app.clone().oneshot(post_json("/songs", song.clone())).await.unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = json_body(created).await;
    assert_eq!(created["album"], "Unknown Album");
    assert_eq!(created["duration"], 120);

    let again = app.clone().oneshot(post_json("/songs", song)).await.unwrap();
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(json_body(again).await["id"], created["id"]);

    let list = app
        .oneshot(Request::builder().uri("/songs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let list = json_body(list).await;
    assert_eq!(list.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_video_info() {
    let (_dir, ytdlp) = fake_ytdlp(
        r#"cat <<'JSON'
{"title": "Artist - Track", "channel": "Chan", "duration": 245.7,
 "thumbnails": [{"url": "s.jpg", "width": 120}, {"url": "l.jpg", "width": 1280}]}
JSON"#,
    );
    let app = test_app(ytdlp).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/youtube/info",
            json!({"url": "https://youtu.be/dQw4w9WgXcQ"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["videoId"], "dQw4w9WgXcQ");
    assert_eq!(body["artist"], "Artist");
    assert_eq!(body["title"], "Track");
    assert_eq!(body["coverUrl"], "l.jpg");
    assert_eq!(body["duration"], 245);
    assert_eq!(body["audioUrl"], "/stream/dQw4w9WgXcQ");

    let invalid = app
        .oneshot(post_json("/youtube/info", json!({"url": "https://example.com/"})))
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_video_info_tool_failure() {
    let (_dir, ytdlp) = fake_ytdlp("echo 'ERROR: region locked' >&2; exit 1");
    let app = test_app(ytdlp).await;

    let response = app
        .oneshot(post_json("/youtube/info", json!({"url": "dQw4w9WgXcQ"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await["error"]["message"],
        "Could not fetch video info. It may be unavailable or region-locked."
    );
}
