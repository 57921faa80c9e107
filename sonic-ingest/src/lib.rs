//! sonic-ingest library interface
//!
//! Playlist ingestion and audio relay service. Exposed as a library so the
//! integration tests can drive the router directly.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod progress;
pub mod reference;
pub mod relay;
pub mod resolver;
pub mod sources;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::config::IngestConfig;
use crate::resolver::Resolver;
use crate::sources::{SourceError, YtDlp};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Song store
    pub db: SqlitePool,
    /// Import orchestrator shared by all sessions
    pub resolver: Arc<Resolver>,
    /// yt-dlp handle for the relay and single-video lookups
    pub ytdlp: YtDlp,
    pub config: Arc<IngestConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last import failure, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// Build state with the production source chain
    pub fn new(config: IngestConfig, db: SqlitePool) -> Result<Self, SourceError> {
        let resolver = Resolver::new(&config, db.clone())?;
        Ok(Self::with_resolver(config, db, resolver))
    }

    /// Build state around an already assembled resolver
    pub fn with_resolver(config: IngestConfig, db: SqlitePool, resolver: Resolver) -> Self {
        Self {
            db,
            ytdlp: resolver.ytdlp().clone(),
            resolver: Arc::new(resolver),
            config: Arc::new(config),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::import_routes())
        .merge(api::stream_routes())
        .merge(api::song_routes())
        .merge(api::info_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
