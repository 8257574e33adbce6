use std::env;
use std::time::Duration;

use thiserror::Error;

use hushlog_openai::client::DEFAULT_BASE_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Process configuration, read once from the environment at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_timeout: Duration,
    /// Serve on this address instead of the Lambda runtime.
    pub local_addr: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 2)?;
        let timeout_secs = parse_or(&lookup, "OPENAI_TIMEOUT_SECS", 120)?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections,
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            openai_timeout: Duration::from_secs(timeout_secs),
            local_addr: lookup("HUSHLOG_LOCAL_ADDR").filter(|v| !v.trim().is_empty()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
