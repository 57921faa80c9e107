//! sonic-ingest - Playlist Ingestion and Audio Relay
//!
//! Imports YouTube and Spotify playlists into the song store, reporting
//! progress over SSE, and relays audio for playback with byte-range support.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sonic_ingest::config::IngestConfig;
use sonic_ingest::AppState;

/// Command-line arguments for sonic-ingest
///
/// Anything left unset falls back to the environment, then the config file.
#[derive(Parser, Debug)]
#[command(name = "sonic-ingest")]
#[command(about = "Playlist ingestion and audio relay service")]
#[command(version)]
struct Args {
    /// Port to listen on [env: PORT]
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long)]
    bind: Option<String>,

    /// SQLite database file [env: DB_PATH]
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "SONIC_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = sonic_common::config::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "sonic_ingest={},sonic_common={},tower_http=info",
                toml_config.logging.level, toml_config.logging.level
            )
            .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting sonic-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config = IngestConfig::resolve(&toml_config);
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }

    info!("Database: {}", config.database_path.display());
    info!("yt-dlp: {}", config.ytdlp_binary.display());
    info!("Invidious mirrors: {}", config.invidious_instances.len());

    let db_pool = sonic_ingest::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address, config.port))?;

    let state = AppState::new(config, db_pool).context("Failed to initialize HTTP clients")?;
    let app = sonic_ingest::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
