//! Server configuration
//!
//! Loaded from TOML; every section is optional and falls back to defaults.
//!
//! ```toml
//! bind = "127.0.0.1:3000"
//! data_dir = "./data"
//!
//! [patch]
//! context_margin = 32
//! match_window = 1000
//!
//! [assist]
//! model = "gemini-2.5-flash"
//! ```

use crate::assist::AssistConfig;
use crate::error::ConfigError;
use quill_patch::PatchOptions;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
    /// Chapter data directory; in-memory store when unset
    pub data_dir: Option<PathBuf>,
    /// Largest accepted request body in bytes
    pub max_body_bytes: u64,
    /// Patch codec tuning
    pub patch: PatchSettings,
    /// Generative-AI collaborator
    pub assist: AssistConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            data_dir: None,
            max_body_bytes: 4 * 1024 * 1024,
            patch: PatchSettings::default(),
            assist: AssistConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse TOML text
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the text does not match the schema.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Set listen address
    #[must_use]
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// Set data directory
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Parsed listen address
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBind`] if `bind` is not `host:port`.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.bind.clone()))
    }
}

/// Patch codec settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchSettings {
    /// Context characters around each change
    pub context_margin: usize,
    /// Search distance when locating hunks
    pub match_window: usize,
    /// Diff deadline in milliseconds; 0 disables it
    pub diff_timeout_ms: u64,
}

impl Default for PatchSettings {
    fn default() -> Self {
        let options = PatchOptions::default();
        Self {
            context_margin: options.context_margin,
            match_window: options.match_window,
            diff_timeout_ms: 1000,
        }
    }
}

impl PatchSettings {
    /// Codec options for these settings
    #[must_use]
    pub fn options(&self) -> PatchOptions {
        PatchOptions::default()
            .with_context_margin(self.context_margin)
            .with_match_window(self.match_window)
            .with_diff_timeout((self.diff_timeout_ms > 0).then(|| Duration::from_millis(self.diff_timeout_ms)))
    }
}
