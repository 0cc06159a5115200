//! Process configuration.
//!
//! Values come from the environment, optionally layered over a YAML file named
//! by `AIDEN_PROXY_CONFIG`. Everything is read once at startup.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const CONFIG_FILE_VAR: &str = "AIDEN_PROXY_CONFIG";
pub const LISTEN_VAR: &str = "LISTEN";
pub const UPSTREAM_URL_VAR: &str = "AIDEN_API_BASE_URL";
pub const TIMEOUT_VAR: &str = "AIDEN_API_TIMEOUT_SECS";
pub const IDENTITY_URL_VAR: &str = "AIDEN_IDENTITY_URL";
pub const MAX_BODY_VAR: &str = "AIDEN_MAX_BODY_BYTES";

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_UPSTREAM_URL: &str = "http://localhost:8000";
const DEFAULT_IDENTITY_URL: &str = "http://localhost:3000/api/v1/auths/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("{key} is not a valid URL ({value:?}): {source}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        source: url::ParseError,
    },

    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must use http or https, got {scheme}")]
    UnsupportedScheme { key: &'static str, scheme: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the proxy listens on
    pub listen_addr: String,

    /// Upstream origin every route forwards to
    pub upstream_url: Url,

    /// Outbound request timeout in seconds
    pub request_timeout_secs: u64,

    /// Endpoint that resolves caller credentials into an identity
    pub identity_url: Url,

    /// Largest inbound body accepted for forwarding
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            upstream_url: default_url(DEFAULT_UPSTREAM_URL),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            identity_url: default_url(DEFAULT_IDENTITY_URL),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

fn default_url(raw: &str) -> Url {
    Url::parse(raw).unwrap_or_else(|_| unreachable!("built-in default URL {raw} is valid"))
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration using `lookup` in place of the environment.
    ///
    /// If `AIDEN_PROXY_CONFIG` resolves to a path, that YAML file provides
    /// the base values; individual variables then override it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup(CONFIG_FILE_VAR) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(addr) = lookup(LISTEN_VAR) {
            cfg.listen_addr = addr;
        }
        if let Some(raw) = lookup(UPSTREAM_URL_VAR) {
            cfg.upstream_url = parse_url(UPSTREAM_URL_VAR, raw)?;
        }
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            cfg.request_timeout_secs = parse_number(TIMEOUT_VAR, raw)?;
        }
        if let Some(raw) = lookup(IDENTITY_URL_VAR) {
            cfg.identity_url = parse_url(IDENTITY_URL_VAR, raw)?;
        }
        if let Some(raw) = lookup(MAX_BODY_VAR) {
            cfg.max_body_bytes = parse_number(MAX_BODY_VAR, raw)?;
        }

        check_scheme(UPSTREAM_URL_VAR, &cfg.upstream_url)?;
        check_scheme(IDENTITY_URL_VAR, &cfg.identity_url)?;
        if cfg.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                key: TIMEOUT_VAR,
                value: "0".to_string(),
            });
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_url(key: &'static str, value: String) -> Result<Url, ConfigError> {
    Url::parse(value.trim()).map_err(|source| ConfigError::InvalidUrl { key, value, source })
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { key, value })
}

fn check_scheme(key: &'static str, url: &Url) -> Result<(), ConfigError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::UnsupportedScheme {
            key,
            scheme: other.to_string(),
        }),
    }
}
