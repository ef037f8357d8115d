//! API host and credential, read from the process environment at startup.

use std::fmt;
use thiserror::Error;
use url::Url;

pub const API_HOST_VAR: &str = "CF_API";
pub const API_TOKEN_VAR: &str = "CF_TOKEN";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("Invalid API host '{0}'")]
    InvalidHost(String),
}

#[derive(Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub token: String,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup. Missing and
    /// blank values are treated the same.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingVar(key))
        };

        let host = read(API_HOST_VAR)?;
        let token = read(API_TOKEN_VAR)?;

        Ok(Self {
            base_url: parse_api_host(&host)?,
            token,
        })
    }
}

/// Parse an API host, adding `http://` when no scheme is given.
pub fn parse_api_host(host: &str) -> Result<Url, ConfigError> {
    if let Ok(url) = Url::parse(host)
        && matches!(url.scheme(), "http" | "https")
        && url.host_str().is_some()
    {
        return Ok(url);
    }

    let with_scheme = format!("http://{}", host);
    match Url::parse(&with_scheme) {
        Ok(url) if url.host_str().is_some() => Ok(url),
        _ => Err(ConfigError::InvalidHost(host.to_string())),
    }
}
