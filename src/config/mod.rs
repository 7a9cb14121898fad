//! Configuration for rickdex
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/rickdex/config.toml)
//! 3. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod observability;
mod serialization;

#[cfg(test)]
mod tests;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports
// ─────────────────────────────────────────────────────────────────────────────

pub use observability::{FileLogging, LogRotation, LoggingConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Public Rick and Morty API
pub const DEFAULT_API_URL: &str = "https://rickandmortyapi.com/api";

/// Request timeout when nothing is configured
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Quiet period before a search-as-you-type query is sent
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Resolved settings for the browser and its HTTP client
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the character listing API
    pub api_url: String,

    /// Timeout applied to every listing request
    pub request_timeout_secs: u64,

    /// Debounce for search-as-you-type
    pub search_debounce_ms: u64,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub search_debounce_ms: Option<u64>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// `~/.config/rickdex/config.toml`, on every platform
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("rickdex").join("config.toml"))
    }

    /// Write the commented default template on first run
    ///
    /// Failures are ignored: the file is optional and defaults apply.
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return;
            }
        }

        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Parse a config file
    ///
    /// A missing file is not an error. A file that exists but does not parse
    /// is: a broken config should fail fast rather than silently fall back
    /// to defaults.
    fn load_file_config(path: &Path) -> Result<FileConfig> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(e)
                .with_context(|| format!("Cannot read config file {}", path.display())),
        }
    }

    /// Load configuration: env vars -> file -> defaults
    pub fn from_env() -> Result<Self> {
        let file = match Self::config_path() {
            Some(path) => Self::load_file_config(&path)?,
            None => FileConfig::default(),
        };

        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge a parsed file with environment lookups over the defaults
    pub(crate) fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // API URL: env > file > default
        let api_url = env("RICKDEX_API_URL")
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        // Request timeout: env > file > default
        let request_timeout_secs = match env("RICKDEX_TIMEOUT_SECS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("Invalid RICKDEX_TIMEOUT_SECS: {:?}", v))?,
            None => file
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        // Search debounce: env > file > default
        let search_debounce_ms = match env("RICKDEX_SEARCH_DEBOUNCE_MS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("Invalid RICKDEX_SEARCH_DEBOUNCE_MS: {:?}", v))?,
            None => file
                .search_debounce_ms
                .unwrap_or(DEFAULT_SEARCH_DEBOUNCE_MS),
        };

        // Logging settings: file config only (RUST_LOG env var handled in logging::init)
        let logging = LoggingConfig::from_file(file.logging);

        Ok(Self {
            api_url,
            request_timeout_secs,
            search_debounce_ms,
            logging,
        })
    }
}
