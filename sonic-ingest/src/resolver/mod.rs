//! Import resolver
//!
//! Drives one import session: turns a playlist reference into tracks via the
//! source adapters, persists each one, and reports every step through the
//! session's [`ProgressEmitter`].
//!
//! Items are processed strictly in input order. A closed progress channel
//! stops the loop after the in-flight item.

mod spotify;
mod video;

use crate::config::IngestConfig;
use crate::db::songs::{self, InsertOutcome};
use crate::error::ImportError;
use crate::progress::{ProgressEmitter, ReceiverClosed};
use crate::sources::{InvidiousClient, PlaylistSource, SourceError, SpotifyClient, YtDlp};
use sonic_common::models::{StoredSong, TrackDescriptor};
use sonic_common::ProgressEvent;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

/// Terminal message when no source produced any item
pub const EMPTY_PLAYLIST: &str = "Playlist is empty or private.";

/// Skip reason when a track could not be stored
pub const SAVE_FAILED: &str = "Could not save track";

/// Split a raw video title into (artist, title)
///
/// "Artist - Title" splits on the first `" - "`; everything after it stays
/// in the title. Titles without the separator keep the raw text and take the
/// channel name as artist.
pub fn split_title(raw: &str, channel: &str) -> (String, String) {
    if let Some((artist, title)) = raw.split_once(" - ") {
        let artist = artist.trim();
        let title = title.trim();
        if !artist.is_empty() && !title.is_empty() {
            return (artist.to_string(), title.to_string());
        }
    }
    (channel.trim().to_string(), raw.trim().to_string())
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// `done` was sent
    Completed { imported: usize, skipped: usize },
    /// `error` was sent
    Failed(ImportError),
    /// The client went away before the terminal event
    Disconnected,
}

/// Why a session loop stopped early
#[derive(Debug)]
enum Interrupt {
    Fatal(ImportError),
    Closed,
}

impl From<ImportError> for Interrupt {
    fn from(err: ImportError) -> Self {
        Interrupt::Fatal(err)
    }
}

impl From<ReceiverClosed> for Interrupt {
    fn from(_: ReceiverClosed) -> Self {
        Interrupt::Closed
    }
}

/// Per-session bookkeeping on top of the emitter
struct ImportSession {
    emitter: ProgressEmitter,
    total: usize,
    imported: Vec<StoredSong>,
    skipped: usize,
}

impl ImportSession {
    fn new(emitter: ProgressEmitter) -> Self {
        Self {
            emitter,
            total: 0,
            imported: Vec::new(),
            skipped: 0,
        }
    }

    fn ensure_open(&self) -> Result<(), Interrupt> {
        if self.emitter.is_closed() {
            Err(Interrupt::Closed)
        } else {
            Ok(())
        }
    }

    async fn info(&mut self, message: impl Into<String>) -> Result<(), Interrupt> {
        Ok(self.emitter.emit(ProgressEvent::info(message)).await?)
    }

    async fn begin(&mut self, total: usize) -> Result<(), Interrupt> {
        self.total = total;
        Ok(self.emitter.emit(ProgressEvent::Total { count: total }).await?)
    }

    async fn searching(&mut self, index: usize, label: String) -> Result<(), Interrupt> {
        let event = ProgressEvent::Searching {
            index,
            total: self.total,
            label,
        };
        Ok(self.emitter.emit(event).await?)
    }

    async fn record_imported(&mut self, index: usize, song: StoredSong) -> Result<(), Interrupt> {
        self.imported.push(song.clone());
        let event = ProgressEvent::Progress {
            index,
            total: self.total,
            song,
        };
        Ok(self.emitter.emit(event).await?)
    }

    async fn record_skipped(&mut self, index: usize, reason: impl Into<String>) -> Result<(), Interrupt> {
        self.skipped += 1;
        let event = ProgressEvent::Skip {
            index,
            total: self.total,
            reason: reason.into(),
        };
        Ok(self.emitter.emit(event).await?)
    }

    /// Emit the terminal event matching `result`
    async fn conclude(mut self, result: Result<(), Interrupt>) -> SessionOutcome {
        match result {
            Ok(()) => {
                let imported = self.imported.len();
                let skipped = self.skipped;
                let songs = std::mem::take(&mut self.imported);
                match self.emitter.emit(ProgressEvent::Done { songs }).await {
                    Ok(()) => {
                        info!(imported, skipped, "Import session completed");
                        SessionOutcome::Completed { imported, skipped }
                    }
                    Err(ReceiverClosed) => SessionOutcome::Disconnected,
                }
            }
            Err(Interrupt::Fatal(err)) => {
                match &err {
                    ImportError::Validation(_) => warn!(error = %err, "Import request rejected"),
                    _ => error!(error = %err, "Import session failed"),
                }
                match self.emitter.emit(ProgressEvent::error(err.to_string())).await {
                    Ok(()) => SessionOutcome::Failed(err),
                    Err(ReceiverClosed) => SessionOutcome::Disconnected,
                }
            }
            Err(Interrupt::Closed) => {
                info!(
                    imported = self.imported.len(),
                    skipped = self.skipped,
                    "Client disconnected, import session stopped"
                );
                SessionOutcome::Disconnected
            }
        }
    }
}

/// Import orchestrator shared by all sessions
#[derive(Debug, Clone)]
pub struct Resolver {
    db: SqlitePool,
    playlist_sources: Vec<PlaylistSource>,
    ytdlp: YtDlp,
    spotify: SpotifyClient,
}

impl Resolver {
    /// Build the production source chain: Invidious first, then yt-dlp
    pub fn new(config: &IngestConfig, db: SqlitePool) -> Result<Self, SourceError> {
        let ytdlp = YtDlp::from_config(config);
        let invidious =
            InvidiousClient::new(config.invidious_instances.clone(), config.timeouts.mirror)?;
        let spotify = SpotifyClient::new(config.spotify.clone(), config.timeouts.spotify)?;

        Ok(Self::with_sources(
            db,
            vec![
                PlaylistSource::Invidious(invidious),
                PlaylistSource::YtDlp(ytdlp.clone()),
            ],
            ytdlp,
            spotify,
        ))
    }

    /// Build with an explicit playlist source order
    pub fn with_sources(
        db: SqlitePool,
        playlist_sources: Vec<PlaylistSource>,
        ytdlp: YtDlp,
        spotify: SpotifyClient,
    ) -> Self {
        Self {
            db,
            playlist_sources,
            ytdlp,
            spotify,
        }
    }

    pub fn ytdlp(&self) -> &YtDlp {
        &self.ytdlp
    }

    /// Persist one track and report it as `progress` or `skip`
    async fn persist(
        &self,
        session: &mut ImportSession,
        index: usize,
        track: &TrackDescriptor,
    ) -> Result<(), Interrupt> {
        match songs::insert_song(&self.db, track).await {
            Ok(InsertOutcome::Inserted(song)) => session.record_imported(index, song).await,
            Ok(InsertOutcome::Duplicate(_)) => session.record_skipped(index, "Duplicate").await,
            Err(e) => {
                warn!(external_id = track.external_id(), error = %e, "Failed to persist track");
                session.record_skipped(index, SAVE_FAILED).await
            }
        }
    }
}
