//! Shared test utilities for stream-driven tests
//!
//! Provides `ScriptedStream`, an in-memory `TickerStream` whose inbound
//! frames and connection failures are scripted through a `ScriptHandle`,
//! and `ScriptedStreamFactory`, which records every stream it creates.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::adapters::binance::types::decode_ticker_frame;
use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::traits::{TickerStream, TickerStreamFactory};
use crate::adapters::types::TickerUpdate;

/// Calls observed on a scripted stream, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamCall {
    Connect,
    Subscribe(Vec<String>),
    Unsubscribe(Vec<String>),
    Close,
}

enum ScriptFrame {
    Text(String),
    Drop,
}

#[derive(Default)]
struct ScriptState {
    connected: bool,
    subscribed: Vec<String>,
    calls: Vec<StreamCall>,
    failing_connects: u32,
}

/// In-memory ticker stream driven by a `ScriptHandle`
pub struct ScriptedStream {
    state: Arc<Mutex<ScriptState>>,
    frames: mpsc::UnboundedReceiver<ScriptFrame>,
    quote_asset: String,
}

/// Test-side control of a `ScriptedStream`
#[derive(Clone)]
pub struct ScriptHandle {
    state: Arc<Mutex<ScriptState>>,
    frames: mpsc::UnboundedSender<ScriptFrame>,
}

impl ScriptedStream {
    pub fn new() -> (Self, ScriptHandle) {
        let state = Arc::new(Mutex::new(ScriptState::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        let stream = Self {
            state: Arc::clone(&state),
            frames: rx,
            quote_asset: "USDT".to_string(),
        };
        (stream, ScriptHandle { state, frames: tx })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TickerStream for ScriptedStream {
    async fn connect(&mut self) -> ExchangeResult<()> {
        let mut state = self.state();
        state.calls.push(StreamCall::Connect);
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(ExchangeError::ConnectionFailed("scripted connect failure".into()));
        }
        state.connected = true;
        state.subscribed.clear();
        Ok(())
    }

    async fn subscribe(&mut self, symbols: &[String]) -> ExchangeResult<()> {
        let mut state = self.state();
        if !state.connected {
            return Err(ExchangeError::ConnectionFailed("Not connected".into()));
        }
        state.calls.push(StreamCall::Subscribe(symbols.to_vec()));
        state.subscribed.extend(symbols.iter().cloned());
        Ok(())
    }

    async fn unsubscribe(&mut self, symbols: &[String]) -> ExchangeResult<()> {
        let mut state = self.state();
        state.calls.push(StreamCall::Unsubscribe(symbols.to_vec()));
        state.subscribed.retain(|s| !symbols.contains(s));
        Ok(())
    }

    async fn next_message(&mut self) -> Option<ExchangeResult<String>> {
        let connected = self.state().connected;
        if !connected {
            return Some(Err(ExchangeError::ConnectionFailed("Not connected".into())));
        }
        match self.frames.recv().await {
            Some(ScriptFrame::Text(text)) => Some(Ok(text)),
            Some(ScriptFrame::Drop) | None => {
                self.state().connected = false;
                None
            }
        }
    }

    fn decode(&self, text: &str) -> ExchangeResult<Option<TickerUpdate>> {
        decode_ticker_frame(text, &self.quote_asset)
    }

    async fn close(&mut self) -> ExchangeResult<()> {
        let mut state = self.state();
        state.calls.push(StreamCall::Close);
        state.connected = false;
        state.subscribed.clear();
        Ok(())
    }

    fn feed_name(&self) -> &'static str {
        "scripted"
    }
}

impl ScriptHandle {
    fn state(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a raw text frame
    pub fn push_text(&self, text: &str) {
        let _ = self.frames.send(ScriptFrame::Text(text.to_string()));
    }

    /// Queue a 24hrTicker frame in wire format (e.g. pair "BTCUSDT")
    pub fn push_ticker(&self, pair: &str, last_price: &str, change_percent: &str) {
        let frame = serde_json::json!({
            "e": "24hrTicker",
            "E": 1_700_000_000_000u64,
            "s": pair,
            "c": last_price,
            "P": change_percent,
        });
        self.push_text(&frame.to_string());
    }

    /// Simulate the peer closing the connection
    pub fn drop_connection(&self) {
        let _ = self.frames.send(ScriptFrame::Drop);
    }

    /// Make the next `n` connect attempts fail
    pub fn fail_next_connects(&self, n: u32) {
        self.state().failing_connects = n;
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.state().subscribed.clone()
    }

    pub fn calls(&self) -> Vec<StreamCall> {
        self.state().calls.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == StreamCall::Connect).count()
    }

    pub fn close_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == StreamCall::Close).count()
    }
}

/// Factory that hands out scripted streams and keeps their handles
#[derive(Clone, Default)]
pub struct ScriptedStreamFactory {
    handles: Arc<Mutex<Vec<ScriptHandle>>>,
    failing_connects: u32,
}

impl ScriptedStreamFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every created stream fails its first `n` connect attempts
    pub fn with_failing_connects(n: u32) -> Self {
        Self {
            failing_connects: n,
            ..Self::default()
        }
    }

    /// Handles of all streams created so far, oldest first
    pub fn handles(&self) -> Vec<ScriptHandle> {
        self.handles.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Handle of the most recently created stream
    pub fn latest(&self) -> Option<ScriptHandle> {
        self.handles().last().cloned()
    }

    pub fn created(&self) -> usize {
        self.handles().len()
    }
}

impl TickerStreamFactory for ScriptedStreamFactory {
    fn create(&self) -> Box<dyn TickerStream> {
        let (stream, handle) = ScriptedStream::new();
        handle.fail_next_connects(self.failing_connects);
        self.handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle);
        Box::new(stream)
    }
}
