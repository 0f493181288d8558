//! Binance wire types
//!
//! Control frame:
//!   {"method":"SUBSCRIBE","params":["btcusdt@ticker"],"id":1}
//! Ticker frame (only the fields we read):
//!   {"e":"24hrTicker","s":"BTCUSDT","c":"64500.00","P":"2.50", ...}
//! Control acknowledgement:
//!   {"result":null,"id":1}

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::types::TickerUpdate;

/// Event type carried by 24h rolling-window ticker frames
pub const TICKER_EVENT_TYPE: &str = "24hrTicker";

// =============================================================================
// Outbound
// =============================================================================

/// SUBSCRIBE / UNSUBSCRIBE request
#[derive(Debug, Clone, Serialize)]
pub struct BinanceControlRequest {
    pub method: &'static str,
    pub params: Vec<String>,
    pub id: u64,
}

impl BinanceControlRequest {
    pub fn subscribe(symbols: &[String], quote_asset: &str, id: u64) -> Self {
        Self {
            method: "SUBSCRIBE",
            params: channels(symbols, quote_asset),
            id,
        }
    }

    pub fn unsubscribe(symbols: &[String], quote_asset: &str, id: u64) -> Self {
        Self {
            method: "UNSUBSCRIBE",
            params: channels(symbols, quote_asset),
            id,
        }
    }
}

/// Ticker channel name for a base symbol, e.g. `BTC` -> `btcusdt@ticker`
pub fn ticker_channel(symbol: &str, quote_asset: &str) -> String {
    format!("{}{}@ticker", symbol.to_lowercase(), quote_asset.to_lowercase())
}

fn channels(symbols: &[String], quote_asset: &str) -> Vec<String> {
    symbols.iter().map(|s| ticker_channel(s, quote_asset)).collect()
}

// =============================================================================
// Inbound
// =============================================================================

/// 24hr ticker event
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceTickerEvent {
    #[serde(rename = "e")]
    pub event_type: String,
    /// Trading pair, e.g. "BTCUSDT"
    #[serde(rename = "s")]
    pub symbol: String,
    /// Last price as string
    #[serde(rename = "c")]
    pub last_price: String,
    /// 24h change in percent as string
    #[serde(rename = "P")]
    pub change_percent: String,
}

impl BinanceTickerEvent {
    /// Convert to a base-symbol ticker update
    pub fn to_update(&self, quote_asset: &str) -> ExchangeResult<TickerUpdate> {
        let symbol = strip_quote(&self.symbol, quote_asset).ok_or_else(|| {
            ExchangeError::InvalidResponse(format!(
                "Pair {} is not quoted in {}",
                self.symbol, quote_asset
            ))
        })?;
        let price = Decimal::from_str(self.last_price.trim()).map_err(|e| {
            ExchangeError::InvalidResponse(format!("Invalid last price '{}': {}", self.last_price, e))
        })?;
        let change_percent = Decimal::from_str(self.change_percent.trim()).map_err(|e| {
            ExchangeError::InvalidResponse(format!(
                "Invalid change percent '{}': {}",
                self.change_percent, e
            ))
        })?;
        Ok(TickerUpdate::new(symbol, price, change_percent))
    }
}

#[derive(Debug, Deserialize)]
struct BinanceErrorBody {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct BinanceControlResponse {
    #[serde(default)]
    error: Option<BinanceErrorBody>,
    id: Option<u64>,
}

/// Recover the base symbol from a pair, e.g. `BTCUSDT` -> `BTC`
///
/// Returns `None` if the pair does not end with the quote asset or
/// nothing is left once the suffix is stripped.
pub fn strip_quote(pair: &str, quote_asset: &str) -> Option<String> {
    let pair = pair.trim().to_uppercase();
    let quote = quote_asset.to_uppercase();
    match pair.strip_suffix(&quote) {
        Some(base) if !base.is_empty() => Some(base.to_string()),
        _ => None,
    }
}

/// Decode one text frame from the stream
///
/// * `Ok(Some(update))` - a 24hr ticker frame
/// * `Ok(None)` - a control acknowledgement or another event type
/// * `Err(SubscriptionRejected)` - an error answer to a control request
/// * `Err(InvalidResponse)` - anything malformed
pub fn decode_ticker_frame(text: &str, quote_asset: &str) -> ExchangeResult<Option<TickerUpdate>> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| ExchangeError::InvalidResponse(format!("Invalid JSON: {}", e)))?;

    let event_type = value.get("e").and_then(|e| e.as_str()).map(str::to_owned);

    match event_type.as_deref() {
        Some(TICKER_EVENT_TYPE) => {
            let event: BinanceTickerEvent = serde_json::from_value(value)
                .map_err(|e| ExchangeError::InvalidResponse(format!("Invalid ticker: {}", e)))?;
            event.to_update(quote_asset).map(Some)
        }
        Some(other) => {
            tracing::trace!(event_type = other, "Ignoring non-ticker event");
            Ok(None)
        }
        None if value.get("id").is_some() => {
            let response: BinanceControlResponse = serde_json::from_value(value).map_err(|e| {
                ExchangeError::InvalidResponse(format!("Invalid control response: {}", e))
            })?;
            if let Some(error) = response.error {
                tracing::warn!(
                    id = ?response.id,
                    code = error.code,
                    message = %error.msg,
                    "Control request rejected"
                );
                return Err(ExchangeError::SubscriptionRejected {
                    code: error.code,
                    message: error.msg,
                });
            }
            tracing::debug!(id = ?response.id, "Control request acknowledged");
            Ok(None)
        }
        None => Err(ExchangeError::InvalidResponse(format!(
            "Unrecognised frame: {}",
            text
        ))),
    }
}
