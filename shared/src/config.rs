use std::env;
use std::time::Duration;

use log::{info, warn};
use reqwest::Url;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://cry-backend.onrender.com/api";
pub const DEFAULT_INVITOR_ID: &str = "ROOT001";
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_TREE_TITLE: &str = "Invitation Tree";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid API base URL '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("Environment variable {name} must be a non-negative integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// Client settings, read from the environment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: Url,
    pub default_invitor_id: String,
    pub validation_debounce: Duration,
    pub request_timeout: Option<Duration>,
    pub tree_cache_ttl: Option<Duration>,
    pub tree_title: String,
}

impl ClientConfig {
    /// Builds a config from `REFERRAL_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base = env::var("REFERRAL_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let default_invitor_id = env::var("REFERRAL_DEFAULT_INVITOR")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|_| DEFAULT_INVITOR_ID.to_string());
        let tree_title =
            env::var("REFERRAL_TREE_TITLE").unwrap_or_else(|_| DEFAULT_TREE_TITLE.to_string());

        let debounce_ms = read_u64("REFERRAL_VALIDATION_DEBOUNCE_MS")?.unwrap_or(DEFAULT_DEBOUNCE_MS);
        let request_timeout = read_u64("REFERRAL_REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs);
        let tree_cache_ttl = read_u64("REFERRAL_TREE_CACHE_TTL_SECS")?.map(Duration::from_secs);

        let config = Self {
            api_base: parse_base_url(&api_base)?,
            default_invitor_id,
            validation_debounce: Duration::from_millis(debounce_ms),
            request_timeout,
            tree_cache_ttl,
            tree_title,
        };

        info!("Using referral API base URL: {}", config.api_base);
        Ok(config)
    }

    /// A config pointing at `api_base` with every other setting at its default.
    pub fn for_base_url(api_base: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: parse_base_url(api_base)?,
            ..Self::default()
        })
    }

    pub fn with_api_base(mut self, api_base: &str) -> Result<Self, ConfigError> {
        self.api_base = parse_base_url(api_base)?;
        Ok(self)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.validation_debounce = debounce;
        self
    }

    pub fn with_default_invitor(mut self, invitor_id: impl Into<String>) -> Self {
        self.default_invitor_id = invitor_id.into();
        self
    }

    pub fn with_tree_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.tree_cache_ttl = ttl;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            // constant, always parses
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base URL is valid"),
            default_invitor_id: DEFAULT_INVITOR_ID.to_string(),
            validation_debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            request_timeout: None,
            tree_cache_ttl: None,
            tree_title: DEFAULT_TREE_TITLE.to_string(),
        }
    }
}

fn read_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(None),
    }
}

fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidBaseUrl {
            value: value.to_string(),
            reason: "URL cannot be used as a base".to_string(),
        });
    }

    if url.scheme() != "https" && url.scheme() != "http" {
        warn!("API base URL uses unexpected scheme '{}'", url.scheme());
    }

    Ok(url)
}
