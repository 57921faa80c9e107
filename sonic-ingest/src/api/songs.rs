//! Song endpoints
//!
//! GET /songs, POST /songs

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sonic_common::models::{StoredSong, TrackDescriptor};

use crate::db::songs::{self, InsertOutcome};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /songs request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSongRequest {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub cover_url: Option<String>,
    #[serde(alias = "duration")]
    pub duration_seconds: Option<u32>,
    pub audio_url: Option<String>,
    #[serde(alias = "youtubeId")]
    pub external_id: Option<String>,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CreateSongRequest {
    fn into_descriptor(self) -> ApiResult<TrackDescriptor> {
        let (Some(title), Some(artist), Some(audio_url)) = (
            required(self.title),
            required(self.artist),
            required(self.audio_url),
        ) else {
            return Err(ApiError::BadRequest(
                "title, artist, and audioUrl are required".to_string(),
            ));
        };

        Ok(TrackDescriptor::new(title, artist, audio_url)
            .with_external_id(self.external_id.unwrap_or_default().trim())
            .with_album(self.album)
            .with_cover_url(self.cover_url)
            .with_duration(self.duration_seconds.unwrap_or(0)))
    }
}

/// GET /songs
pub async fn list_songs(State(state): State<AppState>) -> ApiResult<Json<Vec<StoredSong>>> {
    Ok(Json(songs::list_songs(&state.db).await?))
}

/// POST /songs
///
/// 201 with the new song, or 200 with the existing one when the external id
/// is already stored.
pub async fn create_song(
    State(state): State<AppState>,
    Json(request): Json<CreateSongRequest>,
) -> ApiResult<(StatusCode, Json<StoredSong>)> {
    let track = request.into_descriptor()?;

    match songs::insert_song(&state.db, &track).await? {
        InsertOutcome::Inserted(song) => {
            tracing::info!(song_id = %song.id, title = %song.title, "Song added");
            Ok((StatusCode::CREATED, Json(song)))
        }
        InsertOutcome::Duplicate(existing) => Ok((StatusCode::OK, Json(existing))),
    }
}

/// Build song routes
pub fn song_routes() -> Router<AppState> {
    Router::new().route("/songs", get(list_songs).post(create_song))
}
