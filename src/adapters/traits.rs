//! Ticker stream trait definition
//!
//! The `TickerStream` trait is the seam between the price feed reconciler
//! and a concrete push feed. The reconciler only ever talks to this trait,
//! so tests can drive it with a scripted in-memory stream.

use async_trait::async_trait;

use crate::adapters::errors::ExchangeResult;
use crate::adapters::types::TickerUpdate;

/// A persistent push connection delivering per-symbol ticker frames
///
/// # Example Implementation
///
/// ```ignore
/// #[async_trait]
/// impl TickerStream for MyStream {
///     async fn connect(&mut self) -> ExchangeResult<()> {
///         self.ws = Some(connect_tls(&self.url).await?);
///         Ok(())
///     }
///     // ... other methods
/// }
/// ```
#[async_trait]
pub trait TickerStream: Send {
    /// Open the connection. Calling it again after a drop re-opens it.
    async fn connect(&mut self) -> ExchangeResult<()>;

    /// Subscribe to the ticker channel of every base symbol in `symbols`
    async fn subscribe(&mut self, symbols: &[String]) -> ExchangeResult<()>;

    /// Unsubscribe from the ticker channels of `symbols`
    async fn unsubscribe(&mut self, symbols: &[String]) -> ExchangeResult<()>;

    /// Wait for the next text frame.
    ///
    /// Returns `None` once the connection is closed by the peer. Must be
    /// cancel-safe: the reconciler races it against teardown.
    async fn next_message(&mut self) -> Option<ExchangeResult<String>>;

    /// Decode a text frame.
    ///
    /// `Ok(None)` means a well-formed non-ticker frame (subscription ack,
    /// other event type); `Err` means the frame is malformed.
    fn decode(&self, text: &str) -> ExchangeResult<Option<TickerUpdate>>;

    /// Close the connection
    async fn close(&mut self) -> ExchangeResult<()>;

    /// Feed name used in logs (e.g. "binance")
    fn feed_name(&self) -> &'static str;
}

/// Creates a fresh, unconnected stream for each subscription generation
pub trait TickerStreamFactory: Send + Sync {
    fn create(&self) -> Box<dyn TickerStream>;
}

impl<F> TickerStreamFactory for F
where
    F: Fn() -> Box<dyn TickerStream> + Send + Sync,
{
    fn create(&self) -> Box<dyn TickerStream> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_utils::ScriptedStream;

    #[tokio::test]
    async fn test_scripted_stream_connect_and_subscribe() {
        let (mut stream, handle) = ScriptedStream::new();
        assert!(!handle.is_connected());

        stream.connect().await.unwrap();
        stream.subscribe(&["BTC".to_string()]).await.unwrap();

        assert!(handle.is_connected());
        assert_eq!(handle.subscribed(), vec!["BTC".to_string()]);
    }

    #[tokio::test]
    async fn test_scripted_stream_close() {
        let (mut stream, handle) = ScriptedStream::new();
        stream.connect().await.unwrap();
        stream.close().await.unwrap();
        assert!(!handle.is_connected());
        assert_eq!(handle.close_count(), 1);
    }

    #[test]
    fn test_closure_is_a_factory() {
        let factory = || -> Box<dyn TickerStream> { Box::new(ScriptedStream::new().0) };
        let stream = factory.create();
        assert_eq!(stream.feed_name(), "scripted");
    }
}
