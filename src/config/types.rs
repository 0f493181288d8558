//! Configuration types loaded from YAML
//!
//! Every section has defaults, so an empty file is a valid configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::shared::ReconnectConfig;
use crate::core::symbols::normalize_symbol;
use crate::error::AppError;

use super::constants::{self, env_override};

// ============================================================================
// Sections
// ============================================================================

/// Backend REST API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_API_BASE_URL.to_string(),
            timeout_ms: constants::DEFAULT_API_TIMEOUT_MS,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "api.base_url must start with http:// or https:// (got '{}')",
                self.base_url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(AppError::Config("api.timeout_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Live price feed settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Ticker stream endpoint
    pub ws_url: String,
    /// Quote asset of every subscribed pair
    pub quote_asset: String,
    /// Watchlist of base symbols
    pub symbols: Vec<String>,
    /// Liveness window in seconds; 0 disables the check
    pub idle_timeout_secs: u64,
    /// Period of the REST re-poll in seconds; 0 fetches once per set change
    pub poll_interval_secs: u64,
    /// Upper bound on unsubscribe + close during teardown
    pub teardown_timeout_ms: u64,
    /// Reconnect policy for dropped streams
    pub reconnect: ReconnectConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: constants::DEFAULT_FEED_WS_URL.to_string(),
            quote_asset: constants::DEFAULT_QUOTE_ASSET.to_string(),
            symbols: constants::DEFAULT_WATCHLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
            idle_timeout_secs: constants::DEFAULT_FEED_IDLE_TIMEOUT_SECS,
            poll_interval_secs: constants::DEFAULT_FEED_POLL_INTERVAL_SECS,
            teardown_timeout_ms: constants::DEFAULT_FEED_TEARDOWN_TIMEOUT_MS,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl FeedConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_secs > 0).then(|| Duration::from_secs(self.poll_interval_secs))
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(AppError::Config(format!(
                "feed.ws_url must start with ws:// or wss:// (got '{}')",
                self.ws_url
            )));
        }

        if self.quote_asset.is_empty() || !self.quote_asset.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::Config(format!(
                "feed.quote_asset must be a non-empty alphanumeric code (got '{}')",
                self.quote_asset
            )));
        }

        for symbol in &self.symbols {
            if normalize_symbol(symbol).is_none() {
                return Err(AppError::Config(format!(
                    "feed.symbols contains an invalid symbol '{}'",
                    symbol
                )));
            }
        }

        if self.teardown_timeout_ms == 0 {
            return Err(AppError::Config(
                "feed.teardown_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.reconnect.initial_delay_ms > self.reconnect.max_delay_ms {
            return Err(AppError::Config(format!(
                "feed.reconnect.initial_delay_ms ({}) must be <= max_delay_ms ({})",
                self.reconnect.initial_delay_ms, self.reconnect.max_delay_ms
            )));
        }

        Ok(())
    }
}

/// Session persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// File the bearer token is persisted to
    pub token_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_path: PathBuf::from(constants::DEFAULT_TOKEN_PATH),
        }
    }
}

// ============================================================================
// Root
// ============================================================================

/// Root application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub feed: FeedConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    /// Validate all configuration rules
    pub fn validate(&self) -> Result<(), AppError> {
        self.api.validate()?;
        self.feed.validate()?;

        if self.session.token_path.as_os_str().is_empty() {
            return Err(AppError::Config(
                "session.token_path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply environment variable overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = env_override::<String>(constants::ENV_API_BASE_URL) {
            self.api.base_url = url;
        }
        if let Some(ms) = env_override::<u64>(constants::ENV_API_TIMEOUT_MS) {
            self.api.timeout_ms = ms;
        }
        if let Some(url) = env_override::<String>(constants::ENV_FEED_WS_URL) {
            self.feed.ws_url = url;
        }
        if let Some(secs) = env_override::<u64>(constants::ENV_FEED_IDLE_TIMEOUT_SECS) {
            self.feed.idle_timeout_secs = secs;
        }
        if let Some(secs) = env_override::<u64>(constants::ENV_FEED_POLL_INTERVAL_SECS) {
            self.feed.poll_interval_secs = secs;
        }
        if let Some(path) = env_override::<PathBuf>(constants::ENV_TOKEN_PATH) {
            self.session.token_path = path;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
