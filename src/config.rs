//! # Configuration Module
//!
//! Settings for Jukebox come from three layers, later ones winning:
//!
//! 1. Built-in defaults (a stock local TerminusDB, database `a231songs`)
//! 2. A JSON config file, by default `config.json` in the platform config dir
//! 3. Command-line flags and their `JUKEBOX_*` environment variables
//!    (applied in [`crate::cli`])
//!
//! ## File Locations
//!
//! - Linux: `~/.config/jukebox/config.json`, downloads in `~/.cache/jukebox/`
//! - macOS: `~/Library/Application Support/jukebox/config.json`,
//!   downloads in `~/Library/Caches/jukebox/`
//! - Windows: `%APPDATA%\jukebox\config.json`, downloads in `%LOCALAPPDATA%\jukebox\`
//!
//! ## Example
//!
//! ```json
//! {
//!   "connection": { "server_url": "https://db.example.org", "database": "songs" },
//!   "query_limit": 400,
//!   "audio": { "volume": 0.5 }
//! }
//! ```

use crate::catalog::{SlotLayout, CHUNK_SIZE};
use crate::error::CatalogError;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub connection: ConnectionSettings,
    /// Chunk slot → attribute mapping for wildcard results.
    pub layout: SlotLayout,
    /// Maximum bindings fetched per listing. Four per song.
    pub query_limit: usize,
    pub audio: AudioSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connection: ConnectionSettings::default(),
            layout: SlotLayout::default(),
            query_limit: 100,
            audio: AudioSettings::default(),
        }
    }
}

/// Where the catalog lives and how to log in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub server_url: String,
    pub user: String,
    pub account: String,
    pub key: String,
    pub database: String,
    /// The stock local server ships a self-signed certificate.
    pub accept_invalid_certs: bool,
    /// Create the database on connect if it does not exist.
    pub create_database: bool,
    /// Use a local SQLite catalog instead of the server.
    pub local_path: Option<PathBuf>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            server_url: "https://127.0.0.1:6363".to_string(),
            user: "admin".to_string(),
            account: "admin".to_string(),
            key: "root".to_string(),
            database: "a231songs".to_string(),
            accept_invalid_certs: true,
            create_database: false,
            local_path: None,
        }
    }
}

/// Download-and-play settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Songs are fetched from `<base_url><title>.wav`.
    pub base_url: String,
    /// Defaults to the platform cache dir when unset.
    pub download_dir: Option<PathBuf>,
    pub volume: f32,
    /// How often to check whether playback has finished.
    pub poll_interval_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            base_url: "https://raw.githubusercontent.com/Mdinh22/terminus_db_songs/main/".to_string(),
            download_dir: None,
            volume: 0.7,
            poll_interval_ms: 1000,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from the default location when `path`
    /// is `None`. A missing default file means defaults; a missing explicit
    /// file is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// result fails [`Settings::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = get_config_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!("No config file at {}, using defaults", default_path.display());
                    Self::default()
                }
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Parse a JSON config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(settings)
    }

    /// Reject settings the rest of the crate cannot work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        self.layout.validate()?;
        if self.query_limit == 0 || self.query_limit % CHUNK_SIZE != 0 {
            // A limit that splits a song would make every full listing malformed.
            return Err(CatalogError::Config(format!(
                "query_limit must be a positive multiple of {CHUNK_SIZE}, got {}",
                self.query_limit
            )));
        }
        if !(0.0..=2.0).contains(&self.audio.volume) {
            return Err(CatalogError::Config(format!(
                "audio volume must be between 0.0 and 2.0, got {}",
                self.audio.volume
            )));
        }
        if self.audio.poll_interval_ms == 0 {
            return Err(CatalogError::Config("audio poll_interval_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Download directory, created if needed.
    pub fn download_dir(&self) -> Result<PathBuf> {
        let dir = match &self.audio.download_dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .ok_or_else(|| anyhow::anyhow!(
                    "Could not determine system cache directory. Set audio.download_dir in the config file."
                ))?
                .join("jukebox"),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create download directory {}", dir.display()))?;
        Ok(dir)
    }
}

/// Returns the platform-appropriate config file path. The directory is not
/// created; a missing file simply means defaults.
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| anyhow::anyhow!(
        "Could not determine system config directory. Pass --config explicitly."
    ))?;
    Ok(config_dir.join("jukebox").join("config.json"))
}
