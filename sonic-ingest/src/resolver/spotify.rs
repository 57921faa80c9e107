//! Spotify playlist import
//!
//! Spotify only lists the tracks; every one is matched to a YouTube video
//! with a single top-result search before it can be stored.

use super::{ImportSession, Interrupt, Resolver, SessionOutcome, EMPTY_PLAYLIST};
use crate::error::ImportError;
use crate::progress::ProgressEmitter;
use crate::reference::PlaylistReference;
use crate::relay::playable_url;
use crate::sources::CatalogTrack;
use sonic_common::models::TrackDescriptor;
use tracing::{debug, info, warn};

fn descriptor(track: &CatalogTrack, video_id: &str) -> TrackDescriptor {
    TrackDescriptor::new(track.title.clone(), track.artist.clone(), playable_url(video_id))
        .with_external_id(video_id)
        .with_album(Some(track.album.clone()))
        .with_cover_url(Some(track.cover_url.clone()))
        .with_duration(track.duration_seconds)
}

impl Resolver {
    /// Import a Spotify playlist, matching each track on YouTube
    pub async fn import_spotify_playlist(&self, url: &str, emitter: ProgressEmitter) -> SessionOutcome {
        let mut session = ImportSession::new(emitter);
        let result = self.run_spotify_import(url, &mut session).await;
        session.conclude(result).await
    }

    async fn run_spotify_import(&self, url: &str, session: &mut ImportSession) -> Result<(), Interrupt> {
        let reference = PlaylistReference::parse_spotify_playlist(url)?;

        // Refuse before any network traffic or progress output
        self.spotify
            .credentials()
            .map_err(|e| ImportError::Configuration(e.to_string()))?;

        info!(playlist_id = reference.playlist_id(), "Starting Spotify playlist import");

        session.info("Connecting to Spotify...").await?;
        let token = self
            .spotify
            .access_token()
            .await
            .map_err(|e| ImportError::Fatal(format!("Spotify authentication failed: {}", e.user_message())))?;

        session.info("Fetching playlist tracks...").await?;
        let tracks = self
            .spotify
            .playlist_tracks(reference.playlist_id(), &token)
            .await
            .map_err(|e| ImportError::Fatal(format!("Could not fetch playlist: {}", e.user_message())))?;

        if tracks.is_empty() {
            return Err(ImportError::Fatal(EMPTY_PLAYLIST.to_string()).into());
        }

        session.begin(tracks.len()).await?;
        for (offset, track) in tracks.iter().enumerate() {
            session.ensure_open()?;
            let index = offset + 1;

            session.searching(index, track.label()).await?;

            match self.ytdlp.search_first(&track.search_query()).await {
                Ok(Some(video_id)) => {
                    debug!(track = %track.label(), video_id = %video_id, "Matched track");
                    self.persist(session, index, &descriptor(track, &video_id)).await?;
                }
                Ok(None) => {
                    session
                        .record_skipped(index, format!("No YouTube match for: {}", track.title))
                        .await?;
                }
                Err(e) => {
                    warn!(track = %track.label(), error = %e, "Search failed");
                    session.record_skipped(index, e.user_message()).await?;
                }
            }
        }

        Ok(())
    }
}
