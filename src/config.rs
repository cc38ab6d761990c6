//! TOML configuration for the offboardd daemon.
//!
//! Layered model: `OFFBOARDD_CONFIG` environment variable, then the standard
//! system location, then compiled-in defaults. Partial files are fine; every
//! section falls back field-by-field.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the daemon process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OffboarddConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub poller: PollerConfig,
    pub directory: DirectoryConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

impl OffboarddConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try to load configuration from, in order:
    /// 1. The path in the `OFFBOARDD_CONFIG` environment variable.
    /// 2. `/etc/offboardd/offboardd.toml`.
    /// 3. Compiled-in defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var("OFFBOARDD_CONFIG") {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "OFFBOARDD_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new("/etc/offboardd/offboardd.toml");
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP API listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port for the API listener.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// SQLite storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "data/offboardd.db".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Background poller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Seconds between due-record checks. Minute granularity is the
    /// contract; lowering this only tightens dispatch latency.
    pub tick_interval_sec: u64,
    /// Age (seconds) after which an `in-progress` claim counts as abandoned
    /// and is returned to `scheduled` at the start of a tick.
    pub stale_claim_sec: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            tick_interval_sec: 60,
            stale_claim_sec: 600,
        }
    }
}

// ---------------------------------------------------------------------------
// Directory API
// ---------------------------------------------------------------------------

/// External directory API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Base URL of the directory REST API.
    pub base_url: String,
    /// Per-call timeout (seconds).
    pub request_timeout_sec: u64,
    /// Attempts per call for throttling / 5xx responses (first try included).
    pub max_attempts: u32,
    /// Initial backoff between attempts (milliseconds); doubles per retry.
    pub retry_backoff_ms: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://directory.example.com/v1".to_string(),
            request_timeout_sec: 30,
            max_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Token endpoint configuration for application-credential access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token endpoint URL; `{tenant}` is replaced with the tenant id.
    pub token_url: String,
    pub client_id: String,
    /// Client secret. Never logged.
    pub client_secret: String,
    /// Scope requested for directory operations.
    pub scope: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_url: "https://login.example.com/{tenant}/oauth2/token".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            scope: "https://directory.example.com/.default".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
