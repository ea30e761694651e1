//! Configuration for Texnote
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then `TEXNOTE_*` environment variables.

use crate::error::{Result, TexnoteError};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default compile backend location
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Quiet period before an auto-save fires
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 2000;

/// How long a status message stays visible
pub const DEFAULT_STATUS_TTL_MS: u64 = 5000;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Raw on-disk / environment shape
#[derive(Debug, Deserialize)]
struct RawConfig {
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    api_base_url: String,
    autosave_debounce_ms: u64,
    status_ttl_ms: u64,
    request_timeout_secs: u64,
}

/// Texnote configuration
#[derive(Debug, Clone)]
pub struct TexnoteConfig {
    /// Supabase project URL (e.g. `https://xyz.supabase.co`)
    pub supabase_url: String,

    /// Public anon key sent as the `apikey` header
    pub supabase_anon_key: Arc<SecretString>,

    /// Base URL of the compile backend
    pub api_base_url: String,

    /// Auto-save debounce window in milliseconds
    pub autosave_debounce_ms: u64,

    /// Status message lifetime in milliseconds
    pub status_ttl_ms: u64,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for TexnoteConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: Arc::new(SecretString::new(String::new().into())),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            autosave_debounce_ms: DEFAULT_AUTOSAVE_DEBOUNCE_MS,
            status_ttl_ms: DEFAULT_STATUS_TTL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl TexnoteConfig {
    /// Default config file location (`$XDG_CONFIG_HOME/texnote/config.toml`)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("texnote")
            .join("config.toml")
    }

    /// Load configuration from an explicit file, or the default location
    /// when `path` is `None`. A missing default file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (file, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };
        debug!("Loading configuration from {}", file.display());

        let raw: RawConfig = config::Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("autosave_debounce_ms", DEFAULT_AUTOSAVE_DEBOUNCE_MS)?
            .set_default("status_ttl_ms", DEFAULT_STATUS_TTL_MS)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
            .add_source(
                config::File::from(file)
                    .format(config::FileFormat::Toml)
                    .required(required),
            )
            .add_source(config::Environment::with_prefix("TEXNOTE"))
            .build()?
            .try_deserialize()?;

        Ok(Self {
            supabase_url: raw.supabase_url.unwrap_or_default(),
            supabase_anon_key: Arc::new(SecretString::new(
                raw.supabase_anon_key.unwrap_or_default().into(),
            )),
            api_base_url: raw.api_base_url,
            autosave_debounce_ms: raw.autosave_debounce_ms,
            status_ttl_ms: raw.status_ttl_ms,
            request_timeout_secs: raw.request_timeout_secs,
        })
    }

    /// Check that the backend settings needed for network operations are present
    pub fn validate(&self) -> Result<()> {
        if self.supabase_url.trim().is_empty() {
            return Err(TexnoteError::Config(config::ConfigError::Message(
                "Supabase URL not set. Set TEXNOTE_SUPABASE_URL or supabase_url in the config file"
                    .to_string(),
            )));
        }
        if self.supabase_anon_key.expose_secret().trim().is_empty() {
            return Err(TexnoteError::Config(config::ConfigError::Message(
                "Supabase anon key not set. Set TEXNOTE_SUPABASE_ANON_KEY or supabase_anon_key in the config file"
                    .to_string(),
            )));
        }
        Ok(())
    }

    pub fn autosave_window(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn status_ttl(&self) -> Duration {
        Duration::from_millis(self.status_ttl_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
