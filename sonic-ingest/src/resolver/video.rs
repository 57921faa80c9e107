//! YouTube playlist import

use super::{split_title, ImportSession, Interrupt, Resolver, SessionOutcome, EMPTY_PLAYLIST};
use crate::error::ImportError;
use crate::progress::ProgressEmitter;
use crate::reference::{is_valid_video_id, PlaylistReference};
use crate::relay::playable_url;
use crate::sources::{PlaylistEntry, SourceError};
use sonic_common::models::TrackDescriptor;
use tracing::{info, warn};

/// Album recorded for tracks imported from a video playlist
const PLAYLIST_ALBUM: &str = "YouTube Playlist";

fn thumbnail_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/mqdefault.jpg", video_id)
}

fn descriptor(entry: &PlaylistEntry) -> TrackDescriptor {
    let (artist, title) = split_title(&entry.title, &entry.channel);
    TrackDescriptor::new(title, artist, playable_url(&entry.video_id))
        .with_external_id(entry.video_id.clone())
        .with_album(Some(PLAYLIST_ALBUM.to_string()))
        .with_cover_url(Some(thumbnail_url(&entry.video_id)))
        .with_duration(entry.duration_seconds)
}

impl Resolver {
    /// Import every video of a YouTube playlist
    pub async fn import_video_playlist(&self, url: &str, emitter: ProgressEmitter) -> SessionOutcome {
        let mut session = ImportSession::new(emitter);
        let result = self.run_video_import(url, &mut session).await;
        session.conclude(result).await
    }

    async fn run_video_import(&self, url: &str, session: &mut ImportSession) -> Result<(), Interrupt> {
        let reference = PlaylistReference::parse_video_playlist(url)?;
        info!(playlist_id = reference.playlist_id(), "Starting video playlist import");

        session.info("Fetching playlist info...").await?;
        let entries = self.resolve_entries(reference.playlist_id(), session).await?;

        session.begin(entries.len()).await?;
        for (offset, entry) in entries.iter().enumerate() {
            session.ensure_open()?;
            let index = offset + 1;

            if !is_valid_video_id(&entry.video_id) {
                warn!(video_id = %entry.video_id, "Skipping playlist entry with malformed id");
                session
                    .record_skipped(index, format!("Invalid video id: {}", entry.video_id))
                    .await?;
                continue;
            }

            self.persist(session, index, &descriptor(entry)).await?;
        }

        Ok(())
    }

    /// Try each playlist source in priority order until one lists something
    async fn resolve_entries(
        &self,
        playlist_id: &str,
        session: &mut ImportSession,
    ) -> Result<Vec<PlaylistEntry>, Interrupt> {
        let mut previous: Option<&'static str> = None;
        let mut last_error: Option<SourceError> = None;

        for source in &self.playlist_sources {
            if let Some(previous) = previous {
                session
                    .info(format!("{} unavailable, trying {} fallback...", previous, source.name()))
                    .await?;
            }

            match source.resolve_playlist(playlist_id).await {
                Ok(entries) if !entries.is_empty() => {
                    info!(source = source.name(), count = entries.len(), "Playlist resolved");
                    session
                        .info(format!("Found {} tracks via {}.", entries.len(), source.name()))
                        .await?;
                    return Ok(entries);
                }
                Ok(_) => {
                    warn!(source = source.name(), playlist_id, "Source returned no entries");
                    last_error = None;
                }
                Err(e) => {
                    warn!(source = source.name(), playlist_id, error = %e, "Playlist source failed");
                    last_error = Some(e);
                }
            }

            previous = Some(source.name());
        }

        let err = match last_error {
            Some(e) => ImportError::Fatal(format!("Import failed: {}", e.user_message())),
            None => ImportError::Fatal(EMPTY_PLAYLIST.to_string()),
        };
        Err(err.into())
    }
}
