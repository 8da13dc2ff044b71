//! Configuration for the dashboard
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/cdr-dash/config.toml)
//! 3. Built-in defaults (lowest priority)
//!
//! Service endpoints are separate: they come from the bootstrap document the
//! `bootstrap` setting points at (see [`bootstrap`]).

use crate::filter::FilterMode;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod bootstrap;
mod observability;
mod serialization;
mod startup;


// ─────────────────────────────────────────────────────────────────────────────
// Re-exports
// ─────────────────────────────────────────────────────────────────────────────

pub use bootstrap::{BootstrapSource, ConfigError, Endpoints};
pub use observability::{FileLogging, LogRotation, LoggingConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_BOOTSTRAP: &str = "http://localhost/keycloak.json";
const DEFAULT_POLL_SECS: u64 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    /// URL or file path of the bootstrap document
    pub bootstrap: String,

    /// Time between poll ticks
    pub poll_interval: Duration,

    /// Whether filters re-query the backend or re-render locally
    pub filter_mode: FilterMode,

    /// Whether to enable the TUI (disabled for headless mode)
    pub enable_tui: bool,

    /// Timeout for every HTTP request
    pub request_timeout: Duration,

    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bootstrap: DEFAULT_BOOTSTRAP.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            filter_mode: FilterMode::Client,
            enable_tui: true,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub bootstrap: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub filter_mode: Option<FilterMode>,
    pub request_timeout_secs: Option<u64>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/cdr-dash/config.toml
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("cdr-dash").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Config is optional
            }
        }

        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load file config if it exists
    ///
    /// A file that exists but does not parse is an error rather than a silent
    /// fallback to defaults.
    fn load_file_config() -> Result<FileConfig, ConfigError> {
        let Some(path) = Self::config_path() else {
            return Ok(FileConfig::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).map_err(|e| ConfigError::File {
                path,
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    /// Load configuration: env vars > file > defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = Self::load_file_config()?;
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Merge a parsed file with an environment lookup
    pub(crate) fn from_sources(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let bootstrap = env("CDR_DASH_BOOTSTRAP")
            .or(file.bootstrap)
            .unwrap_or_else(|| DEFAULT_BOOTSTRAP.to_string());

        let poll_secs = match env("CDR_DASH_POLL_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: "CDR_DASH_POLL_SECS",
                    value,
                })?,
            None => file.poll_interval_secs.unwrap_or(DEFAULT_POLL_SECS),
        };
        if poll_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "poll_interval_secs",
                value: "0".to_string(),
            });
        }

        let filter_mode = match env("CDR_DASH_FILTER_MODE") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CDR_DASH_FILTER_MODE",
                value,
            })?,
            None => file.filter_mode.unwrap_or_default(),
        };

        // TUI toggle: env only (runtime flag)
        let enable_tui = env("CDR_DASH_NO_TUI")
            .map(|v| v != "1" && v.to_lowercase() != "true")
            .unwrap_or(true);

        let request_timeout = Duration::from_secs(
            file.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        );

        Ok(Self {
            bootstrap,
            poll_interval: Duration::from_secs(poll_secs),
            filter_mode,
            enable_tui,
            request_timeout,
            logging: LoggingConfig::from_file(file.logging),
        })
    }

    /// Parsed bootstrap location
    pub fn bootstrap_source(&self) -> Result<BootstrapSource, ConfigError> {
        BootstrapSource::parse(&self.bootstrap).ok_or(ConfigError::MissingBootstrap)
    }
}
