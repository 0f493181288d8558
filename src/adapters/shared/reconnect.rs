//! Reconnection with exponential backoff
//!
//! Exponential backoff with random jitter so that many clients dropped by
//! the same outage do not reconnect in lockstep.

use serde::{Deserialize, Serialize};

use crate::adapters::errors::{ExchangeError, ExchangeResult};

/// Configuration for reconnection attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Maximum number of reconnection attempts per outage
    pub max_attempts: u32,
    /// Initial delay in milliseconds (doubles each attempt)
    pub initial_delay_ms: u64,
    /// Maximum delay cap in milliseconds
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

/// Base delay before attempt `attempt` (0-based), without jitter
pub fn backoff_delay_ms(config: &ReconnectConfig, attempt: u32) -> u64 {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    std::cmp::min(config.initial_delay_ms.saturating_mul(factor), config.max_delay_ms)
}

/// Reconnect with exponential backoff and jitter
///
/// Sleeps `min(initial * 2^attempt, max) + jitter(0-199ms)` before each
/// attempt and returns on the first success.
///
/// # Returns
/// * `Ok(())` - Reconnection successful
/// * `Err(ExchangeError)` - All attempts failed (the last error)
///
/// # Example
/// ```ignore
/// let stream = Arc::clone(&stream);
/// reconnect_with_backoff(&ReconnectConfig::default(), "binance", || {
///     let stream = Arc::clone(&stream);
///     async move { stream.lock().await.connect().await }
/// })
/// .await?;
/// ```
pub async fn reconnect_with_backoff<F, Fut>(
    config: &ReconnectConfig,
    feed_name: &str,
    mut connect_fn: F,
) -> ExchangeResult<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ExchangeResult<()>>,
{
    let mut last_error: Option<ExchangeError> = None;

    for attempt in 0..config.max_attempts {
        let jitter = rand::random::<u64>() % 200;
        let backoff_ms = backoff_delay_ms(config, attempt) + jitter;

        tracing::info!(
            feed = feed_name,
            attempt = attempt + 1,
            max_attempts = config.max_attempts,
            backoff_ms,
            "Reconnect attempt scheduled"
        );

        tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;

        match connect_fn().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!(
                    feed = feed_name,
                    attempt = attempt + 1,
                    error = %e,
                    "Reconnect attempt failed"
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        ExchangeError::ConnectionFailed("Reconnection failed after max attempts".into())
    }))
}
