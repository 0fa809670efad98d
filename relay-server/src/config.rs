//! Configuration module for environment variable parsing.
//!
//! All settings come from the process environment (optionally seeded from a
//! `.env` file). Only the port, log directory and timeout have defaults.

use std::env;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;
use url::Url;

/// Port used when `PORT` is unset or invalid.
pub const DEFAULT_PORT: u16 = 3000;

/// Directory used when `LOG_DIR` is unset.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid URL in {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// TableCheck franchise the webhook is scoped to
    pub franchise_id: String,

    /// TableCheck shop the webhook is scoped to
    pub shop_id: String,

    /// Public URL TableCheck should deliver callbacks to
    pub callback_url: String,

    /// Bearer token for the TableCheck API
    pub tablecheck_api_key: String,

    /// Base URL of the TableCheck API
    pub tablecheck_api_url: Url,

    /// Optional timeout for the outbound registration call
    pub request_timeout_ms: Option<u64>,

    // =========================================================================
    // Web Server Configuration
    // =========================================================================

    /// Port for the web server to listen on
    pub port: u16,

    /// Directory holding the event log files
    pub log_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let api_url = required("TABLECHECK_API_URL")?;
        let tablecheck_api_url = Url::parse(api_url.trim()).map_err(|source| {
            ConfigError::InvalidUrl {
                name: "TABLECHECK_API_URL",
                source,
            }
        })?;

        Ok(Config {
            franchise_id: required("FRANCHISE_ID")?,
            shop_id: required("SHOP_ID")?,
            callback_url: required("WEBHOOK_CALLBACK_URL")?,
            tablecheck_api_key: required("TABLECHECK_API_KEY")?,
            tablecheck_api_url,

            request_timeout_ms: parse_number(&lookup, "TABLECHECK_TIMEOUT_MS"),

            port: parse_number(&lookup, "PORT").unwrap_or(DEFAULT_PORT),

            log_dir: lookup("LOG_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
        })
    }
}

/// Parse an optional numeric variable, warning when it is present but invalid.
fn parse_number<F, T>(lookup: &F, name: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid number, using default");
            None
        }
    }
}
