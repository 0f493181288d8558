//! Binance ticker stream adapter
//!
//! Public 24hr ticker data over the combined WebSocket endpoint using the
//! `SUBSCRIBE`/`UNSUBSCRIBE` control protocol.

pub mod adapter;
pub mod config;
pub mod types;

pub use adapter::BinanceTickerStream;
pub use config::BinanceConfig;
pub use types::{decode_ticker_frame, strip_quote, ticker_channel, BinanceTickerEvent};
