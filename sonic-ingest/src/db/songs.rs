//! Song store
//!
//! Idempotent insert keyed on the external id. Deduplication is a single
//! `INSERT OR IGNORE` against a partial unique index, so two sessions racing
//! on the same id cannot both insert.

use sonic_common::models::{StoredSong, TrackDescriptor, UNKNOWN_ALBUM};
use sonic_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Result of an insert attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Inserted(StoredSong),
    /// A song with the same external id already existed; nothing written
    Duplicate(StoredSong),
}

/// Placeholder cover for songs that arrive without one
pub fn placeholder_cover(song_id: &str) -> String {
    format!("https://picsum.photos/seed/{}/400/400", song_id)
}

fn song_from_row(row: &SqliteRow) -> StoredSong {
    let duration: i64 = row.get("duration");
    StoredSong {
        id: row.get("id"),
        title: row.get("title"),
        artist: row.get("artist"),
        album: row.get("album"),
        cover_url: row.get("cover_url"),
        duration_seconds: u32::try_from(duration.max(0)).unwrap_or(u32::MAX),
        audio_url: row.get("audio_url"),
        external_id: row.get("external_id"),
    }
}

/// Insert a track unless its external id is already stored
pub async fn insert_song(pool: &SqlitePool, track: &TrackDescriptor) -> Result<InsertOutcome> {
    let id = Uuid::new_v4().to_string();
    let song = StoredSong {
        title: track.title().to_string(),
        artist: track.artist().to_string(),
        album: track.album().unwrap_or(UNKNOWN_ALBUM).to_string(),
        cover_url: track
            .cover_url()
            .map(str::to_string)
            .unwrap_or_else(|| placeholder_cover(&id)),
        duration_seconds: track.duration_seconds(),
        audio_url: track.playable_url().to_string(),
        external_id: track.external_id().to_string(),
        id,
    };

    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO songs (
            id, title, artist, album, cover_url, duration, audio_url, external_id, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&song.id)
    .bind(&song.title)
    .bind(&song.artist)
    .bind(&song.album)
    .bind(&song.cover_url)
    .bind(i64::from(song.duration_seconds))
    .bind(&song.audio_url)
    .bind(&song.external_id)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    if result.rows_affected() == 1 {
        tracing::debug!(song_id = %song.id, external_id = %song.external_id, "Song inserted");
        return Ok(InsertOutcome::Inserted(song));
    }

    let existing = find_by_external_id(pool, &song.external_id).await?.ok_or_else(|| {
        Error::Internal(format!(
            "Insert of external id {:?} was ignored but no existing row was found",
            song.external_id
        ))
    })?;

    tracing::debug!(song_id = %existing.id, external_id = %existing.external_id, "Duplicate song");
    Ok(InsertOutcome::Duplicate(existing))
}

/// Load a song by its external id (empty ids never match)
pub async fn find_by_external_id(pool: &SqlitePool, external_id: &str) -> Result<Option<StoredSong>> {
    if external_id.is_empty() {
        return Ok(None);
    }

    let row = sqlx::query(
        r#"
        SELECT id, title, artist, album, cover_url, duration, audio_url, external_id
        FROM songs
        WHERE external_id = ?
        "#,
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(song_from_row))
}

/// All songs in insertion order
pub async fn list_songs(pool: &SqlitePool) -> Result<Vec<StoredSong>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, artist, album, cover_url, duration, audio_url, external_id
        FROM songs
        ORDER BY rowid
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(song_from_row).collect())
}
