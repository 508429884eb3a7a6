//! Configuration loading for the sync worker.
//!
//! Configuration is loaded from a TOML file (default: `ticketsync.toml`).
//! The Tito API key may be left out of the file and supplied through the
//! `TITO_API_KEY` environment variable instead.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sync_core::{Partition, DEFAULT_BATCH_LIMIT, DEFAULT_MAX_PAGES};

/// Environment variable consulted when `tito.api_key` is not set.
pub const API_KEY_ENV: &str = "TITO_API_KEY";

/// Longest accepted grace period after the cut-off (30 days).
pub const MAX_STOP_GRACE_SECS: u64 = 30 * 24 * 60 * 60;

/// Root configuration for the sync worker.
///
/// Every section may be left out of the file; missing sections take their
/// defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Registrations API configuration.
    #[serde(default)]
    pub tito: TitoConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Sync schedule configuration.
    #[serde(default)]
    pub sync: SyncConfig,
    /// HTTP endpoints configuration.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Registrations API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TitoConfig {
    /// API base URL (default: https://api.tito.io/v3).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Tito account slug.
    #[serde(default)]
    pub account_id: String,
    /// Tito event slug.
    #[serde(default)]
    pub event_id: String,
    /// API key, sent as `Authorization: Token token=<key>`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Maximum pages fetched in one run (default: 1000).
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
    /// Maximum tickets written per run (default: 100).
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
}

/// Sync schedule configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Conference instance the synced tickets are stored under.
    #[serde(default)]
    pub conference_instance: String,
    /// Interval between runs in seconds (default: 300 = 5 minutes).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Enable the scheduled sync (default: true).
    #[serde(default = "default_sync_enabled")]
    pub enabled: bool,
    /// Stop syncing once this instant (plus grace) has passed.
    #[serde(default)]
    pub stop_syncing_from: Option<DateTime<Utc>>,
    /// Grace period after `stop_syncing_from` in seconds (default: 600).
    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,
    /// Overall deadline for a single run in seconds (default: 300).
    #[serde(default = "default_run_deadline_secs")]
    pub run_deadline_secs: u64,
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Bind address for HTTP server (default: 0.0.0.0:8080).
    #[serde(default = "default_http_bind")]
    pub bind_address: String,
    /// Enable metrics endpoint (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

// Default value functions
fn default_base_url() -> String {
    "https://api.tito.io/v3".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

fn default_database_path() -> PathBuf {
    PathBuf::from("ticketsync.db")
}

fn default_batch_limit() -> usize {
    DEFAULT_BATCH_LIMIT
}

fn default_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_sync_enabled() -> bool {
    true
}

fn default_stop_grace_secs() -> u64 {
    600 // 10 minutes
}

fn default_run_deadline_secs() -> u64 {
    300
}

fn default_http_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for TitoConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            account_id: String::new(),
            event_id: String::new(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_pages: default_max_pages(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            batch_limit: default_batch_limit(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            conference_instance: String::new(),
            interval_secs: default_interval_secs(),
            enabled: default_sync_enabled(),
            stop_syncing_from: None,
            stop_grace_secs: default_stop_grace_secs(),
            run_deadline_secs: default_run_deadline_secs(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_http_bind(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load, fill the API key from the environment if needed, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        if config.tito.api_key.is_none() {
            config.tito.api_key = std::env::var(API_KEY_ENV).ok();
        }
        config.validate()?;
        Ok(config)
    }

    /// Check that every value the worker needs is present and usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("tito.account_id", &self.tito.account_id),
            ("tito.event_id", &self.tito.event_id),
            ("sync.conference_instance", &self.sync.conference_instance),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing { field });
            }
        }
        if self.tito.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(ConfigError::Missing {
                field: "tito.api_key",
            });
        }
        if self.storage.batch_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "storage.batch_limit",
                reason: "must be at least 1".into(),
            });
        }
        let at_least_one = [
            ("tito.max_pages", u64::from(self.tito.max_pages)),
            ("tito.request_timeout_secs", self.tito.request_timeout_secs),
            ("sync.interval_secs", self.sync.interval_secs),
            ("sync.run_deadline_secs", self.sync.run_deadline_secs),
        ];
        for (field, value) in at_least_one {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be at least 1".into(),
                });
            }
        }
        if self.sync.stop_grace_secs > MAX_STOP_GRACE_SECS {
            return Err(ConfigError::Invalid {
                field: "sync.stop_grace_secs",
                reason: format!("must be at most {}", MAX_STOP_GRACE_SECS),
            });
        }
        Ok(())
    }

    /// The partition synced tickets are stored under.
    pub fn partition(&self) -> Result<Partition, ConfigError> {
        Partition::new(self.sync.conference_instance.clone()).map_err(|_| ConfigError::Missing {
            field: "sync.conference_instance",
        })
    }
}

impl TitoConfig {
    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SyncConfig {
    /// Whether a run may start at `now`.
    ///
    /// Runs are refused once `stop_syncing_from + stop_grace_secs` has
    /// passed. Without a cut-off, syncing is always permitted, and a grace
    /// period too large to represent never closes.
    pub fn sync_permitted(&self, now: DateTime<Utc>) -> bool {
        let Some(stop) = self.stop_syncing_from else {
            return true;
        };
        let closes_at = i64::try_from(self.stop_grace_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|grace| stop.checked_add_signed(grace));
        match closes_at {
            Some(closes_at) => now <= closes_at,
            None => true,
        }
    }

    /// Overall deadline for one run.
    pub fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A required value is absent.
    #[error("missing required setting: {field}")]
    Missing {
        /// Dotted name of the setting.
        field: &'static str,
    },
    /// A value is present but unusable.
    #[error("invalid setting {field}: {reason}")]
    Invalid {
        /// Dotted name of the setting.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}
