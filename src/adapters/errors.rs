//! Market-data stream error types
//!
//! All stream adapter failures are wrapped in `ExchangeError`
//! so the reconciler can log and recover from them uniformly.

use thiserror::Error;

/// Errors raised by ticker stream adapters
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Connection to the stream endpoint failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// SUBSCRIBE/UNSUBSCRIBE control frame could not be sent
    #[error("Subscription failed for {symbol}: {reason}")]
    SubscriptionFailed { symbol: String, reason: String },

    /// Feed answered a SUBSCRIBE/UNSUBSCRIBE with an error
    #[error("Subscription rejected (code {code}): {message}")]
    SubscriptionRejected { code: i64, message: String },

    /// No frame received within the liveness window
    #[error("Network timeout after {0}ms")]
    NetworkTimeout(u64),

    /// Frame could not be parsed into a ticker update
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// WebSocket protocol error (boxed to reduce enum size)
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
}

/// Result type alias for stream operations
pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
