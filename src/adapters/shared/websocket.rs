//! Shared WebSocket connection helpers

use tokio_tungstenite::{connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};

use crate::adapters::errors::ExchangeError;

/// WebSocket stream over plain TCP or TLS, depending on the URL scheme
pub type TlsWebSocketStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connect to a WebSocket endpoint (TLSv1.2 minimum for `wss://`)
///
/// `ws://` URLs connect without TLS, which is what local test servers use.
pub async fn connect_tls(url: &str) -> Result<TlsWebSocketStream, ExchangeError> {
    let tls = native_tls::TlsConnector::builder()
        .min_protocol_version(Some(native_tls::Protocol::Tlsv12))
        .build()
        .map_err(|e| ExchangeError::ConnectionFailed(format!("TLS error: {}", e)))?;

    let (ws_stream, _response) =
        connect_async_tls_with_config(url, None, false, Some(Connector::NativeTls(tls)))
            .await
            .map_err(|e| ExchangeError::WebSocket(Box::new(e)))?;

    Ok(ws_stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_tls_rejects_invalid_url() {
        let result = connect_tls("not a url").await;
        assert!(matches!(result, Err(ExchangeError::WebSocket(_))));
    }

    #[tokio::test]
    async fn test_connect_tls_refused() {
        // Port 1 on localhost is never listening in CI containers
        let result = connect_tls("ws://127.0.0.1:1/ws").await;
        assert!(result.is_err());
    }
}
