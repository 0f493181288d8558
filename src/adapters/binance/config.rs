//! Binance stream configuration

use crate::adapters::traits::{TickerStream, TickerStreamFactory};
use crate::config::{constants, FeedConfig};

use super::adapter::BinanceTickerStream;

/// Connection settings for the public ticker stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinanceConfig {
    /// Raw stream endpoint (e.g. `wss://stream.binance.com:9443/ws`)
    pub ws_url: String,
    /// Quote asset appended to every base symbol (e.g. `USDT`)
    pub quote_asset: String,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            ws_url: constants::DEFAULT_FEED_WS_URL.to_string(),
            quote_asset: constants::DEFAULT_QUOTE_ASSET.to_string(),
        }
    }
}

impl BinanceConfig {
    pub fn from_feed_config(feed: &FeedConfig) -> Self {
        Self {
            ws_url: feed.ws_url.clone(),
            quote_asset: feed.quote_asset.to_uppercase(),
        }
    }
}

impl TickerStreamFactory for BinanceConfig {
    fn create(&self) -> Box<dyn TickerStream> {
        Box::new(BinanceTickerStream::new(self.clone()))
    }
}
