//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// Default cadence of the document-status polling loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the auth service (`/auth/*`).
    pub auth_url: String,
    /// Base URL of the ingestion service (`/classes`, `/documents`, `/upload`).
    pub ingestion_url: String,
    /// File holding the durable bearer token.
    pub token_path: PathBuf,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Service Endpoints ---
        let auth_url = base_url(&lookup, "AUTH_URL", "http://localhost:8002")?;
        let ingestion_url = base_url(&lookup, "INGESTION_URL", "http://localhost:8001")?;

        // --- Durable Token Location ---
        let token_path = match lookup("TOKEN_PATH") {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_token_path(),
        };

        // --- Timing ---
        let poll_interval = match lookup("POLL_INTERVAL_MS") {
            Some(raw) => Duration::from_millis(parse_positive(&raw, "POLL_INTERVAL_MS")?),
            None => DEFAULT_POLL_INTERVAL,
        };
        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_positive(&raw, "REQUEST_TIMEOUT_SECS")?),
            None => Duration::from_secs(30),
        };

        // --- Logging ---
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            auth_url,
            ingestion_url,
            token_path,
            poll_interval,
            request_timeout,
            log_level,
        })
    }
}

/// Returns `<data dir>/coursedocs/token`, or `./coursedocs/token` when the
/// platform has no data directory.
pub fn default_token_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("coursedocs");
    path.push("token");
    path
}

fn base_url<F>(lookup: &F, key: &str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not an http(s) URL", raw),
        ));
    }
    Ok(trimmed.to_string())
}

fn parse_positive(raw: &str, key: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not a positive integer", raw),
        )),
    }
}
