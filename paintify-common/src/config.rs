//! Configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! Secrets (caption provider API key, catalog client credentials) are never
//! compiled in; they come from the environment or the TOML file.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "PAINTIFY_CONFIG";

/// Environment variable overriding the database path
pub const DATABASE_ENV_VAR: &str = "PAINTIFY_DATABASE";

/// Full service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// SQLite database file path
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Caption provider (generative model) settings
    #[serde(default)]
    pub caption: CaptionSettings,

    /// Track catalog (Spotify) settings
    #[serde(default)]
    pub catalog: CatalogSettings,
}

/// Generative model provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct CaptionSettings {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_caption_api_base")]
    pub api_base: String,

    /// Provider API key (env `PAINTIFY_CAPTION_API_KEY` or `OPENAI_API_KEY`)
    #[serde(default)]
    pub api_key: String,

    /// Model identifier passed on every completion request
    #[serde(default = "default_caption_model")]
    pub model: String,
}

/// Music catalog search settings
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    /// Client id (env `PAINTIFY_SPOTIFY_CLIENT_ID`)
    #[serde(default)]
    pub client_id: String,

    /// Client secret (env `PAINTIFY_SPOTIFY_CLIENT_SECRET`)
    #[serde(default)]
    pub client_secret: String,
}

fn default_bind_address() -> String {
    "127.0.0.1:5750".to_string()
}

fn default_database_path() -> PathBuf {
    default_data_dir().join("paintify.db")
}

fn default_caption_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_caption_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            database_path: default_database_path(),
            caption: CaptionSettings::default(),
            catalog: CatalogSettings::default(),
        }
    }
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            api_base: default_caption_api_base(),
            api_key: String::new(),
            model: default_caption_model(),
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

impl Settings {
    /// Load settings following the resolution priority order.
    ///
    /// A missing config file is not fatal: the service starts with compiled
    /// defaults and whatever the environment supplies.
    pub fn load(cli_config: Option<&Path>) -> Result<Self> {
        let mut settings = match resolve_config_file(cli_config) {
            Some(path) => {
                let content = std::fs::read_to_string(&path)?;
                toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?
            }
            None => {
                tracing::warn!("No config file found, using compiled defaults");
                Settings::default()
            }
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Environment variables override TOML values.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(key) = std::env::var("PAINTIFY_CAPTION_API_KEY") {
            self.caption.api_key = key;
        } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.caption.api_key = key;
        }
        if let Ok(model) = std::env::var("PAINTIFY_CAPTION_MODEL") {
            self.caption.model = model;
        }
        if let Ok(id) = std::env::var("PAINTIFY_SPOTIFY_CLIENT_ID") {
            self.catalog.client_id = id;
        }
        if let Ok(secret) = std::env::var("PAINTIFY_SPOTIFY_CLIENT_SECRET") {
            self.catalog.client_secret = secret;
        }
    }

    /// Fail startup early when a credential required by the external
    /// clients is absent.
    pub fn validate(&self) -> Result<()> {
        if self.caption.api_key.is_empty() {
            return Err(Error::Config(
                "caption.api_key is not set (PAINTIFY_CAPTION_API_KEY)".to_string(),
            ));
        }
        if self.catalog.client_id.is_empty() || self.catalog.client_secret.is_empty() {
            return Err(Error::Config(
                "catalog client credentials are not set (PAINTIFY_SPOTIFY_CLIENT_ID/SECRET)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Pick the config file path: CLI argument, then environment variable,
/// then the platform config directory. Returns None when nothing exists.
fn resolve_config_file(cli_config: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_config {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    let candidate = dirs::config_dir().map(|d| d.join("paintify").join("config.toml"))?;
    if candidate.exists() {
        Some(candidate)
    } else {
        None
    }
}

/// OS-dependent default data folder
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("paintify"))
        .unwrap_or_else(|| PathBuf::from("./paintify_data"))
}
