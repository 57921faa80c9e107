//! Runtime configuration for sonic-ingest
//!
//! `IngestConfig` is resolved once at startup from the TOML file and the
//! environment, then handed to every client at construction time. Nothing
//! reads the environment after startup.

use sonic_common::config::{resolve_setting, TomlConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable names
pub const ENV_SPOTIFY_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
pub const ENV_SPOTIFY_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";
pub const ENV_DB_PATH: &str = "DB_PATH";
pub const ENV_PORT: &str = "PORT";
pub const ENV_YTDLP: &str = "YTDLP_PATH";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_DATABASE: &str = "music.db";

pub const SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const SPOTIFY_API_URL: &str = "https://api.spotify.com";

/// Public Invidious mirrors, highest priority first
///
/// Maintained list: https://api.invidious.io/instances.json
pub const DEFAULT_INVIDIOUS_INSTANCES: &[&str] = &[
    "https://inv.nadeko.net",
    "https://invidious.privacydev.net",
    "https://invidious.epicsite.xyz",
    "https://iv.ggtyler.dev",
    "https://invidious.nikkosphere.com",
    "https://yt.artemislena.eu",
    "https://invidious.perennialte.ch",
    "https://invidious.fdn.fr",
    "https://invidious.slipfox.xyz",
];

/// Spotify client credentials
#[derive(Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Spotify endpoints and credentials
#[derive(Debug, Clone)]
pub struct SpotifySettings {
    /// `None` when either half of the credential pair is missing
    pub credentials: Option<SpotifyCredentials>,
    pub accounts_url: String,
    pub api_url: String,
}

impl Default for SpotifySettings {
    fn default() -> Self {
        Self {
            credentials: None,
            accounts_url: SPOTIFY_ACCOUNTS_URL.to_string(),
            api_url: SPOTIFY_API_URL.to_string(),
        }
    }
}

/// Per-call timeouts for external work
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// One Invidious page request
    pub mirror: Duration,
    /// Token exchange and each playlist page
    pub spotify: Duration,
    /// One `ytsearch1:` lookup
    pub search: Duration,
    /// Flat playlist dump (large playlists are slow)
    pub playlist_dump: Duration,
    /// Single video metadata lookup
    pub video_info: Duration,
    /// Full audio extraction for one relay request
    pub audio: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            mirror: Duration::from_secs(12),
            spotify: Duration::from_secs(15),
            search: Duration::from_secs(30),
            playlist_dump: Duration::from_secs(120),
            video_info: Duration::from_secs(30),
            audio: Duration::from_secs(300),
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub bind_address: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub spotify: SpotifySettings,
    /// Invidious mirror base URLs in priority order
    pub invidious_instances: Vec<String>,
    /// yt-dlp executable
    pub ytdlp_binary: PathBuf,
    pub timeouts: Timeouts,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            database_path: PathBuf::from(DEFAULT_DATABASE),
            spotify: SpotifySettings::default(),
            invidious_instances: DEFAULT_INVIDIOUS_INSTANCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ytdlp_binary: PathBuf::from("yt-dlp"),
            timeouts: Timeouts::default(),
        }
    }
}

impl IngestConfig {
    /// Resolve configuration from the TOML file and environment
    ///
    /// **Priority:** ENV → TOML → default. Command-line overrides are applied
    /// by the binary afterwards.
    pub fn resolve(toml: &TomlConfig) -> Self {
        let defaults = Self::default();

        let port = match std::env::var(ENV_PORT) {
            Ok(raw) => match raw.trim().parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    warn!("Ignoring unparseable {}={:?}", ENV_PORT, raw);
                    toml.port.unwrap_or(defaults.port)
                }
            },
            Err(_) => toml.port.unwrap_or(defaults.port),
        };

        let database_path = std::env::var(ENV_DB_PATH)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| toml.database_path.clone())
            .unwrap_or(defaults.database_path);

        let ytdlp_binary = std::env::var(ENV_YTDLP)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| toml.ytdlp.binary.clone())
            .unwrap_or(defaults.ytdlp_binary);

        let invidious_instances = if toml.invidious.instances.is_empty() {
            defaults.invidious_instances
        } else {
            toml.invidious
                .instances
                .iter()
                .map(|s| s.trim_end_matches('/').to_string())
                .collect()
        };

        let t = &toml.timeouts;
        let timeouts = Timeouts {
            mirror: t.mirror_secs.map(Duration::from_secs).unwrap_or(defaults.timeouts.mirror),
            spotify: t.spotify_secs.map(Duration::from_secs).unwrap_or(defaults.timeouts.spotify),
            search: t.search_secs.map(Duration::from_secs).unwrap_or(defaults.timeouts.search),
            playlist_dump: t
                .playlist_dump_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeouts.playlist_dump),
            video_info: t
                .video_info_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeouts.video_info),
            audio: t.audio_secs.map(Duration::from_secs).unwrap_or(defaults.timeouts.audio),
        };

        Self {
            bind_address: toml
                .bind_address
                .clone()
                .unwrap_or(defaults.bind_address),
            port,
            database_path,
            spotify: resolve_spotify(toml),
            invidious_instances,
            ytdlp_binary,
            timeouts,
        }
    }
}

/// Resolve Spotify settings; missing credentials are not an error here
fn resolve_spotify(toml: &TomlConfig) -> SpotifySettings {
    let client_id = resolve_setting(
        "Spotify client id",
        ENV_SPOTIFY_CLIENT_ID,
        toml.spotify.client_id.as_deref(),
    );
    let client_secret = resolve_setting(
        "Spotify client secret",
        ENV_SPOTIFY_CLIENT_SECRET,
        toml.spotify.client_secret.as_deref(),
    );

    let credentials = match (client_id, client_secret) {
        (Some(client_id), Some(client_secret)) => Some(SpotifyCredentials {
            client_id,
            client_secret,
        }),
        (None, None) => {
            info!("Spotify credentials not configured; Spotify imports will be refused");
            None
        }
        _ => {
            warn!("Only one of the Spotify client id/secret is configured; Spotify imports will be refused");
            None
        }
    };

    SpotifySettings {
        credentials,
        accounts_url: toml
            .spotify
            .accounts_url
            .clone()
            .unwrap_or_else(|| SPOTIFY_ACCOUNTS_URL.to_string()),
        api_url: toml
            .spotify
            .api_url
            .clone()
            .unwrap_or_else(|| SPOTIFY_API_URL.to_string()),
    }
}
