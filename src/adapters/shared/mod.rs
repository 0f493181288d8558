//! Shared helpers for ticker stream adapters
//!
//! Common utilities for WebSocket connection management and
//! reconnection with backoff.

pub mod reconnect;
pub mod websocket;

pub use reconnect::{backoff_delay_ms, reconnect_with_backoff, ReconnectConfig};
pub use websocket::{connect_tls, TlsWebSocketStream};
