//! Minexcoins client core
//!
//! Headless client for the Minexcoins exchange backend:
//! - Live price feed reconciling a REST snapshot with a Binance ticker stream
//! - Typed REST API client (auth, wallet, trade, admin)
//! - Session handling with a pluggable token store

pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod error;

pub use error::AppError;
