//! Database access for sonic-ingest
//!
//! SQLite via sqlx. The song store is the only shared mutable state between
//! concurrent import sessions; its uniqueness guarantees live in the schema.

pub mod songs;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

/// Initialize database connection pool
///
/// Creates the file (and its parent directory) when missing, then the
/// tables.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    tracing::debug!("Connecting to database: {}", db_path.display());

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Initialize tables and indexes
///
/// Idempotent; safe to call on every startup.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            album TEXT NOT NULL DEFAULT 'Unknown Album',
            cover_url TEXT NOT NULL DEFAULT '',
            duration INTEGER NOT NULL DEFAULT 0,
            audio_url TEXT NOT NULL,
            external_id TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one song per non-empty external id; manual songs carry ''.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_songs_external_id
            ON songs(external_id)
            WHERE external_id <> ''
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (songs)");

    Ok(())
}
