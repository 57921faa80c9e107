//! Configuration loading
//!
//! SonicStream services read an optional TOML file and let environment
//! variables override individual keys. Resolution order for every setting:
//! 1. Command-line argument (handled by the binary)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application directory name under the platform config dir
const APP_DIR: &str = "sonicstream";

/// On-disk configuration file contents
///
/// Every field is optional so a partial file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Address to bind the HTTP listener to
    pub bind_address: Option<String>,
    /// Port to listen on
    pub port: Option<u16>,
    /// SQLite database file
    pub database_path: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub spotify: SpotifyConfig,
    pub invidious: InvidiousConfig,
    pub ytdlp: YtDlpConfig,
    pub timeouts: TimeoutConfig,
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Spotify Web API section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Override for the accounts service (token endpoint host)
    pub accounts_url: Option<String>,
    /// Override for the Web API base URL
    pub api_url: Option<String>,
}

/// Invidious mirror section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvidiousConfig {
    /// Mirror base URLs in priority order; empty means built-in list
    pub instances: Vec<String>,
}

/// yt-dlp section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YtDlpConfig {
    /// Path or name of the yt-dlp executable
    pub binary: Option<PathBuf>,
}

/// Per-call timeouts in seconds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub mirror_secs: Option<u64>,
    pub spotify_secs: Option<u64>,
    pub search_secs: Option<u64>,
    pub playlist_dump_secs: Option<u64>,
    pub video_info_secs: Option<u64>,
    pub audio_secs: Option<u64>,
}

/// Get the default configuration file path for the platform
///
/// On Linux `~/.config/sonicstream/config.toml` is preferred, then
/// `/etc/sonicstream/config.toml`. Returns `None` when no file exists.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the TOML config, or defaults when there is none
///
/// An explicitly requested file must exist. The platform default file is
/// optional.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    match explicit {
        Some(path) => {
            let config = load_toml_config(path)?;
            info!("Configuration loaded from {}", path.display());
            Ok(config)
        }
        None => match default_config_path() {
            Some(path) => {
                let config = load_toml_config(&path)?;
                info!("Configuration loaded from {}", path.display());
                Ok(config)
            }
            None => {
                info!("No configuration file found, using defaults and environment");
                Ok(TomlConfig::default())
            }
        },
    }
}

/// Validate a setting value (non-empty, non-whitespace)
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Resolve a string setting from environment then TOML
///
/// Blank values count as absent. When both sources carry a value the
/// environment wins and a warning names both sources.
pub fn resolve_setting(name: &str, env_var: &str, toml_value: Option<&str>) -> Option<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_value(v));
    let toml_value = toml_value.filter(|v| is_valid_value(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in multiple sources: environment, TOML. Using environment ({}).",
            name, env_var
        );
    }

    if let Some(value) = env_value {
        info!("{} loaded from environment variable", name);
        return Some(value);
    }

    if let Some(value) = toml_value {
        info!("{} loaded from TOML config", name);
        return Some(value.to_string());
    }

    None
}
