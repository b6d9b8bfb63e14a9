use std::time::Duration;
use thiserror::Error;

use omdb_data::remote::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use omdb_data::storage::DEFAULT_EXPIRATION_HOURS;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CACHE_EXPIRATION_SECS: u64 = DEFAULT_EXPIRATION_HOURS.unsigned_abs() * 60 * 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} must be a non-negative integer, got '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Service settings read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub omdb_api_key: String,
    pub omdb_base_url: String,
    pub omdb_timeout: Duration,
    pub cache_expiration: Duration,
    pub database_url: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let omdb_api_key = get("OMDB_API_KEY").ok_or(ConfigError::Missing("OMDB_API_KEY"))?;
        let omdb_base_url = get("OMDB_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let omdb_timeout = Duration::from_secs(parse_number(
            "OMDB_TIMEOUT_SECS",
            get("OMDB_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        )?);
        let cache_expiration = Duration::from_secs(parse_number(
            "CACHE_EXPIRATION_SECS",
            get("CACHE_EXPIRATION_SECS"),
            DEFAULT_CACHE_EXPIRATION_SECS,
        )?);
        let port = parse_number("PORT", get("PORT"), DEFAULT_PORT)?;

        Ok(Self {
            omdb_api_key,
            omdb_base_url,
            omdb_timeout,
            cache_expiration,
            database_url: get("DATABASE_URL"),
            port,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
