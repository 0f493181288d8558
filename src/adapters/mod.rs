//! Market-data stream adapters
//!
//! This module provides the abstractions for consuming a push ticker
//! stream over WebSocket, plus the Binance implementation.

pub mod binance;
pub mod errors;
pub mod shared;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use binance::{BinanceConfig, BinanceTickerStream};
pub use errors::{ExchangeError, ExchangeResult};
pub use shared::ReconnectConfig;
pub use traits::{TickerStream, TickerStreamFactory};
pub use types::{ConnectionState, TickerUpdate};
