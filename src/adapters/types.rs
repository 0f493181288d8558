//! Core data types shared by ticker stream adapters

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// Shared Subscription ID Counter
// =============================================================================

/// Global atomic counter for control-frame ids across all streams
static GLOBAL_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Get next unique control-frame id (shared across all streams)
pub fn next_subscription_id() -> u64 {
    GLOBAL_SUBSCRIPTION_ID.fetch_add(1, Ordering::SeqCst)
}

/// Current wall-clock time in Unix milliseconds
pub fn current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// =============================================================================
// Ticker Types
// =============================================================================

/// A decoded 24h ticker update, keyed by base asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerUpdate {
    /// Uppercase base symbol with the quote suffix stripped (e.g. "BTC")
    pub symbol: String,
    /// Last traded price
    pub price: Decimal,
    /// 24h price change in percent
    pub change_percent: Decimal,
}

impl TickerUpdate {
    pub fn new(symbol: impl Into<String>, price: Decimal, change_percent: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change_percent,
        }
    }
}

// =============================================================================
// Connection Health Types
// =============================================================================

/// Connection state published by the feed reader task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// No stream open (idle, torn down, or reconnect gave up)
    #[default]
    Disconnected,
    /// Initial connect in progress
    Connecting,
    /// Stream open and subscribed
    Connected,
    /// Backing off before another connect attempt
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_subscription_ids_are_unique_and_increasing() {
        let a = next_subscription_id();
        let b = next_subscription_id();
        assert!(b > a);
    }

    #[test]
    fn test_current_time_ms_is_recent() {
        // 2023-01-01 in ms
        assert!(current_time_ms() > 1_672_531_200_000);
    }

    #[test]
    fn test_connection_state_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
    }

    #[test]
    fn test_ticker_update_new() {
        let update = TickerUpdate::new(
            "BTC",
            Decimal::from_str("64500.00").unwrap(),
            Decimal::from_str("2.50").unwrap(),
        );
        assert_eq!(update.symbol, "BTC");
        assert_eq!(update.price.to_string(), "64500.00");
    }
}
