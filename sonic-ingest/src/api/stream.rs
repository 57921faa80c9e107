//! Audio relay endpoint
//!
//! GET /stream/:video_id

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap},
    response::Response,
    routing::get,
    Router,
};

use crate::error::{ApiError, ApiResult};
use crate::reference::is_valid_video_id;
use crate::relay::{build_audio_response, parse_range, AudioExtraction, RelayError};
use crate::AppState;

/// GET /stream/:video_id
///
/// Buffers the whole extraction, then serves it with `Range` support.
pub async fn stream_audio(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    if !is_valid_video_id(&video_id) {
        return Err(ApiError::BadRequest("Invalid video ID".to_string()));
    }

    let extraction = AudioExtraction::spawn(state.ytdlp.audio_command(&video_id), &video_id)?;

    let limit = state.config.timeouts.audio;
    let audio = match tokio::time::timeout(limit, extraction.collect()).await {
        Ok(result) => result.map_err(|e| {
            tracing::error!(video_id = %video_id, error = %e, "Stream error");
            e
        })?,
        Err(_) => {
            tracing::error!(video_id = %video_id, "Audio extraction timed out");
            return Err(RelayError::Timeout(limit.as_secs()).into());
        }
    };

    let range = parse_range(
        headers.get(header::RANGE).and_then(|v| v.to_str().ok()),
        audio.len(),
    );

    Ok(build_audio_response(Bytes::from(audio), range))
}

/// Build stream routes
pub fn stream_routes() -> Router<AppState> {
    Router::new().route("/stream/:video_id", get(stream_audio))
}
