//! Single video metadata
//!
//! POST /youtube/info

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::reference::extract_video_id;
use crate::relay::playable_url;
use crate::resolver::split_title;
use crate::AppState;

const VIDEO_ALBUM: &str = "YouTube";

/// POST /youtube/info request
#[derive(Debug, Deserialize)]
pub struct VideoInfoRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// POST /youtube/info response, ready to be posted to /songs
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfoResponse {
    pub video_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_url: String,
    pub duration: u32,
    pub audio_url: String,
}

/// POST /youtube/info
pub async fn video_info(
    State(state): State<AppState>,
    Json(request): Json<VideoInfoRequest>,
) -> ApiResult<Json<VideoInfoResponse>> {
    let url = request
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("url is required".to_string()))?;
    let video_id =
        extract_video_id(&url).ok_or_else(|| ApiError::BadRequest("Invalid YouTube URL".to_string()))?;

    let info = state.ytdlp.video_info(&video_id).await.map_err(|e| {
        tracing::warn!(video_id = %video_id, error = %e, "Video info lookup failed");
        ApiError::Internal(
            "Could not fetch video info. It may be unavailable or region-locked.".to_string(),
        )
    })?;

    let (artist, title) = split_title(&info.title, &info.channel);

    Ok(Json(VideoInfoResponse {
        audio_url: playable_url(&video_id),
        video_id,
        title,
        artist,
        album: VIDEO_ALBUM.to_string(),
        cover_url: info.thumbnail_url,
        duration: info.duration_seconds,
    }))
}

/// Build video info routes
pub fn info_routes() -> Router<AppState> {
    Router::new().route("/youtube/info", post(video_info))
}
