//! Playlist import endpoints
//!
//! POST /import/video-playlist, POST /import/other-service-playlist
//!
//! Each request runs one import session on a background task and answers
//! immediately with the session's SSE progress stream. Dropping the stream
//! stops the session after the in-flight item.

use axum::{extract::State, response::Response, routing::post, Json, Router};
use serde::Deserialize;
use sonic_common::sse::progress_response;

use crate::error::{ApiError, ApiResult, ImportError};
use crate::progress::{ProgressEmitter, PROGRESS_CHANNEL_CAPACITY};
use crate::reference::SourceKind;
use crate::resolver::SessionOutcome;
use crate::AppState;

/// Import request body
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub url: Option<String>,
}

impl ImportRequest {
    fn required_url(self) -> ApiResult<String> {
        self.url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ApiError::BadRequest("url is required".to_string()))
    }
}

/// POST /import/video-playlist
pub async fn import_video_playlist(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Response> {
    start_session(state, SourceKind::VideoService, request.required_url()?)
}

/// POST /import/other-service-playlist
pub async fn import_other_service_playlist(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Response> {
    start_session(state, SourceKind::OtherService, request.required_url()?)
}

fn start_session(state: AppState, kind: SourceKind, url: String) -> ApiResult<Response> {
    let (emitter, rx) = ProgressEmitter::channel(PROGRESS_CHANNEL_CAPACITY);
    let resolver = state.resolver.clone();
    let last_error = state.last_error.clone();

    tracing::info!(source = %kind, url = %url, "Import session started");

    tokio::spawn(async move {
        let outcome = match kind {
            SourceKind::VideoService => resolver.import_video_playlist(&url, emitter).await,
            SourceKind::OtherService => resolver.import_spotify_playlist(&url, emitter).await,
        };

        match &outcome {
            SessionOutcome::Failed(ImportError::Validation(_)) => {}
            SessionOutcome::Failed(err) => {
                *last_error.write().await = Some(err.to_string());
            }
            SessionOutcome::Completed { .. } | SessionOutcome::Disconnected => {}
        }

        tracing::info!(source = %kind, ?outcome, "Import session ended");
    });

    Ok(progress_response(rx))
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import/video-playlist", post(import_video_playlist))
        .route(
            "/import/other-service-playlist",
            post(import_other_service_playlist),
        )
}
