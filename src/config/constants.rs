//! Application constants and environment overrides
//!
//! Defaults live here so that `config.yaml` can stay short. Each
//! overridable value has a matching environment variable.

use std::str::FromStr;

// =============================================================================
// Backend API
// =============================================================================

/// Default backend base URL
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Default per-request timeout for backend calls (milliseconds)
pub const DEFAULT_API_TIMEOUT_MS: u64 = 10_000;

/// Environment variable: backend base URL
pub const ENV_API_BASE_URL: &str = "API_BASE_URL";

/// Environment variable: backend request timeout in milliseconds
pub const ENV_API_TIMEOUT_MS: &str = "API_TIMEOUT_MS";

// =============================================================================
// Ticker Stream
// =============================================================================

/// Default public ticker stream endpoint
pub const DEFAULT_FEED_WS_URL: &str = "wss://stream.binance.com:9443/ws";

/// Default quote asset for ticker channels
pub const DEFAULT_QUOTE_ASSET: &str = "USDT";

/// Default watchlist when none is configured
pub const DEFAULT_WATCHLIST: &[&str] = &["BTC", "ETH", "SOL"];

/// Default liveness window: no frame for this long means the stream is dead
pub const DEFAULT_FEED_IDLE_TIMEOUT_SECS: u64 = 60;

/// Default REST re-poll period for the active set
pub const DEFAULT_FEED_POLL_INTERVAL_SECS: u64 = 10;

/// Default bound on how long teardown waits for unsubscribe + close
pub const DEFAULT_FEED_TEARDOWN_TIMEOUT_MS: u64 = 2_000;

/// Environment variable: ticker stream endpoint
pub const ENV_FEED_WS_URL: &str = "FEED_WS_URL";

/// Environment variable: liveness window in seconds (0 disables)
pub const ENV_FEED_IDLE_TIMEOUT_SECS: &str = "FEED_IDLE_TIMEOUT_SECS";

/// Environment variable: REST re-poll period in seconds (0 disables)
pub const ENV_FEED_POLL_INTERVAL_SECS: &str = "FEED_POLL_INTERVAL_SECS";

// =============================================================================
// Session
// =============================================================================

/// Default location of the persisted session token
pub const DEFAULT_TOKEN_PATH: &str = ".minex/token";

/// Environment variable: session token path
pub const ENV_TOKEN_PATH: &str = "MINEX_TOKEN_PATH";

/// Read and parse an environment variable
///
/// Returns `None` when the variable is unset, blank or unparseable.
pub fn env_override<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(env)]
    fn test_env_override_unset() {
        std::env::remove_var("MINEX_TEST_UNSET");
        assert_eq!(env_override::<u64>("MINEX_TEST_UNSET"), None);
    }

    #[test]
    #[serial(env)]
    fn test_env_override_parses_value() {
        std::env::set_var("MINEX_TEST_TIMEOUT", " 2500 ");
        assert_eq!(env_override::<u64>("MINEX_TEST_TIMEOUT"), Some(2500));
        std::env::remove_var("MINEX_TEST_TIMEOUT");
    }

    #[test]
    #[serial(env)]
    fn test_env_override_rejects_garbage() {
        std::env::set_var("MINEX_TEST_GARBAGE", "soon");
        assert_eq!(env_override::<u64>("MINEX_TEST_GARBAGE"), None);
        std::env::remove_var("MINEX_TEST_GARBAGE");
    }

    #[test]
    fn test_default_values() {
        assert_eq!(DEFAULT_API_TIMEOUT_MS, 10_000);
        assert_eq!(DEFAULT_QUOTE_ASSET, "USDT");
        assert!(DEFAULT_FEED_WS_URL.starts_with("wss://"));
    }
}
