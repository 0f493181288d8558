//! Binance ticker stream implementation
//!
//! One WebSocket connection per subscription generation. Control frames go
//! out on the same socket the ticker frames come in on; Ping/Pong handling
//! is left to tungstenite.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::shared::{connect_tls, TlsWebSocketStream};
use crate::adapters::traits::TickerStream;
use crate::adapters::types::{next_subscription_id, TickerUpdate};

use super::config::BinanceConfig;
use super::types::{decode_ticker_frame, BinanceControlRequest};

/// Binance public ticker stream
pub struct BinanceTickerStream {
    config: BinanceConfig,
    ws: Option<TlsWebSocketStream>,
    subscriptions: Vec<String>,
}

impl BinanceTickerStream {
    pub fn new(config: BinanceConfig) -> Self {
        Self {
            config,
            ws: None,
            subscriptions: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.ws.is_some()
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    async fn send_control(&mut self, request: BinanceControlRequest) -> ExchangeResult<()> {
        let ws = self.ws.as_mut().ok_or_else(|| {
            ExchangeError::ConnectionFailed("WebSocket not connected".into())
        })?;

        let payload = serde_json::to_string(&request)
            .map_err(|e| ExchangeError::InvalidResponse(format!("Encode error: {}", e)))?;

        ws.send(Message::Text(payload)).await.map_err(|e| {
            ExchangeError::SubscriptionFailed {
                symbol: request.params.join(","),
                reason: e.to_string(),
            }
        })?;

        tracing::debug!(
            feed = "binance",
            method = request.method,
            id = request.id,
            channels = ?request.params,
            "Control frame sent"
        );
        Ok(())
    }
}

#[async_trait]
impl TickerStream for BinanceTickerStream {
    async fn connect(&mut self) -> ExchangeResult<()> {
        if let Some(mut ws) = self.ws.take() {
            let _ = ws.close(None).await;
        }
        self.subscriptions.clear();

        tracing::info!(feed = "binance", url = %self.config.ws_url, "Connecting ticker stream");
        let ws = connect_tls(&self.config.ws_url).await?;
        self.ws = Some(ws);
        tracing::info!(feed = "binance", "Ticker stream connected");
        Ok(())
    }

    async fn subscribe(&mut self, symbols: &[String]) -> ExchangeResult<()> {
        if symbols.is_empty() {
            return Ok(());
        }
        let request =
            BinanceControlRequest::subscribe(symbols, &self.config.quote_asset, next_subscription_id());
        self.send_control(request).await?;

        for symbol in symbols {
            if !self.subscriptions.contains(symbol) {
                self.subscriptions.push(symbol.clone());
            }
        }
        Ok(())
    }

    async fn unsubscribe(&mut self, symbols: &[String]) -> ExchangeResult<()> {
        if symbols.is_empty() {
            return Ok(());
        }
        let request = BinanceControlRequest::unsubscribe(
            symbols,
            &self.config.quote_asset,
            next_subscription_id(),
        );
        self.send_control(request).await?;
        self.subscriptions.retain(|s| !symbols.contains(s));
        Ok(())
    }

    async fn next_message(&mut self) -> Option<ExchangeResult<String>> {
        loop {
            let ws = match self.ws.as_mut() {
                Some(ws) => ws,
                None => {
                    return Some(Err(ExchangeError::ConnectionFailed(
                        "WebSocket not connected".into(),
                    )))
                }
            };

            match ws.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => {
                        tracing::trace!(feed = "binance", "Ignoring non-UTF8 binary frame");
                    }
                },
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(feed = "binance", frame = ?frame, "Ticker stream closed by server");
                    self.ws = None;
                    return None;
                }
                Some(Err(e)) => {
                    self.ws = None;
                    return Some(Err(ExchangeError::WebSocket(Box::new(e))));
                }
                None => {
                    self.ws = None;
                    return None;
                }
            }
        }
    }

    fn decode(&self, text: &str) -> ExchangeResult<Option<TickerUpdate>> {
        decode_ticker_frame(text, &self.config.quote_asset)
    }

    async fn close(&mut self) -> ExchangeResult<()> {
        self.subscriptions.clear();
        if let Some(mut ws) = self.ws.take() {
            if let Err(e) = ws.close(None).await {
                tracing::debug!(feed = "binance", error = %e, "Close handshake failed");
            }
        }
        Ok(())
    }

    fn feed_name(&self) -> &'static str {
        "binance"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn local_config(addr: std::net::SocketAddr) -> BinanceConfig {
        BinanceConfig {
            ws_url: format!("ws://{}/ws", addr),
            quote_asset: "USDT".to_string(),
        }
    }

    #[test]
    fn test_stream_not_connected_initially() {
        let stream = BinanceTickerStream::new(BinanceConfig::default());
        assert!(!stream.is_connected());
        assert_eq!(stream.feed_name(), "binance");
    }

    #[tokio::test]
    async fn test_subscribe_requires_connection() {
        let mut stream = BinanceTickerStream::new(BinanceConfig::default());
        let result = stream.subscribe(&["BTC".to_string()]).await;
        assert!(matches!(result, Err(ExchangeError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_next_message_requires_connection() {
        let mut stream = BinanceTickerStream::new(BinanceConfig::default());
        assert!(matches!(
            stream.next_message().await,
            Some(Err(ExchangeError::ConnectionFailed(_)))
        ));
    }

    #[tokio::test]
    async fn test_subscribe_and_receive_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

            let subscribe = match ws.next().await {
                Some(Ok(Message::Text(text))) => text,
                other => panic!("expected SUBSCRIBE frame, got {:?}", other),
            };
            ws.send(Message::Text(r#"{"result":null,"id":1}"#.to_string()))
                .await
                .unwrap();
            ws.send(Message::Text(
                r#"{"e":"24hrTicker","s":"BTCUSDT","c":"64500.00","P":"2.50"}"#.to_string(),
            ))
            .await
            .unwrap();

            let unsubscribe = match ws.next().await {
                Some(Ok(Message::Text(text))) => text,
                other => panic!("expected UNSUBSCRIBE frame, got {:?}", other),
            };
            (subscribe, unsubscribe)
        });

        let mut stream = BinanceTickerStream::new(local_config(addr));
        stream.connect().await.unwrap();
        stream.subscribe(&["BTC".to_string(), "ETH".to_string()]).await.unwrap();
        assert_eq!(stream.subscriptions(), &["BTC".to_string(), "ETH".to_string()]);

        let ack = stream.next_message().await.unwrap().unwrap();
        assert_eq!(stream.decode(&ack).unwrap(), None);

        let ticker = stream.next_message().await.unwrap().unwrap();
        let update = stream.decode(&ticker).unwrap().unwrap();
        assert_eq!(update.symbol, "BTC");

        stream.unsubscribe(&["BTC".to_string(), "ETH".to_string()]).await.unwrap();
        assert!(stream.subscriptions().is_empty());

        let (subscribe, unsubscribe) = server.await.unwrap();
        let subscribe: serde_json::Value = serde_json::from_str(&subscribe).unwrap();
        assert_eq!(subscribe["method"], "SUBSCRIBE");
        assert_eq!(
            subscribe["params"],
            serde_json::json!(["btcusdt@ticker", "ethusdt@ticker"])
        );
        let unsubscribe: serde_json::Value = serde_json::from_str(&unsubscribe).unwrap();
        assert_eq!(unsubscribe["method"], "UNSUBSCRIBE");

        stream.close().await.unwrap();
        assert!(!stream.is_connected());
    }
}
