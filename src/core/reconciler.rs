//! Live price feed reconciler
//!
//! Merges a one-shot REST snapshot with a long-lived ticker stream into a
//! [`PriceTable`]. Each call to [`PriceFeedReconciler::set_symbols`] with a
//! new set starts a new *generation*:
//!
//! 1. the table is reset, which fences out writes from the previous feed
//! 2. the previous stream task unsubscribes and closes (bounded wait)
//! 3. a poll task and a stream task are spawned for the new set
//!
//! The poll task fetches the REST snapshot once, then again every
//! `poll_interval_secs` when that is non-zero. While the stream is
//! `Connected` a poll never overwrites a streamed entry; otherwise it does,
//! so prices keep moving through an outage.
//!
//! The stream task reconnects with backoff on drops and idle timeouts and
//! resubscribes the active set. When every attempt fails, or the feed
//! rejects the subscription, it reports `Disconnected` and the table keeps
//! its last values.
//!
//! [`PriceFeedReconciler::refresh`] on an unchanged set still starts a new
//! generation; entries survive it with their last 24h change.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::shared::{reconnect_with_backoff, ReconnectConfig};
use crate::adapters::traits::{TickerStream, TickerStreamFactory};
use crate::adapters::types::ConnectionState;
use crate::api::PriceMap;
use crate::config::FeedConfig;
use crate::error::AppError;

use super::price_table::PriceTable;
use super::symbols::SymbolSet;

/// Source of the initial REST price snapshot
#[async_trait]
pub trait PriceSnapshotSource: Send + Sync {
    /// Current prices keyed by uppercase base symbol
    async fn fetch_prices(&self) -> Result<PriceMap, AppError>;
}

type SharedStream = Arc<Mutex<Box<dyn TickerStream>>>;

struct ActiveFeed {
    symbols: SymbolSet,
    generation: u64,
    cancel: CancellationToken,
    poll_task: JoinHandle<()>,
    stream_task: JoinHandle<()>,
}

/// Owner-driven price feed for a changing symbol set
pub struct PriceFeedReconciler {
    source: Arc<dyn PriceSnapshotSource>,
    factory: Arc<dyn TickerStreamFactory>,
    config: FeedConfig,
    table: PriceTable,
    status: Arc<watch::Sender<ConnectionState>>,
    active: Option<ActiveFeed>,
}

impl PriceFeedReconciler {
    pub fn new(
        source: Arc<dyn PriceSnapshotSource>,
        factory: Arc<dyn TickerStreamFactory>,
        config: FeedConfig,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            source,
            factory,
            config,
            table: PriceTable::new(),
            status: Arc::new(status),
            active: None,
        }
    }

    /// Replace the subscription set.
    ///
    /// Symbols are trimmed and uppercased. A set equal to the active one is
    /// a no-op; an empty set tears the feed down and clears the table.
    pub async fn set_symbols<I, S>(&mut self, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = SymbolSet::new(symbols);
        if symbols == self.symbols() {
            tracing::debug!(symbols = %symbols, "Subscription set unchanged");
            return;
        }
        self.start(symbols).await;
    }

    /// Tear down and restart the feed for the current set.
    ///
    /// Used to recover after the stream gave up reconnecting.
    pub async fn refresh(&mut self) {
        let symbols = self.symbols();
        if symbols.is_empty() {
            return;
        }
        self.start(symbols).await;
    }

    /// Tear the feed down and clear the table
    pub async fn stop(&mut self) {
        if self.active.is_none() && self.table.is_empty() {
            return;
        }
        self.start(SymbolSet::empty()).await;
    }

    /// Active subscription set (empty when stopped)
    pub fn symbols(&self) -> SymbolSet {
        self.active
            .as_ref()
            .map(|feed| feed.symbols.clone())
            .unwrap_or_default()
    }

    /// Handle to the read model
    pub fn table(&self) -> PriceTable {
        self.table.clone()
    }

    /// Receiver for stream connection state changes
    pub fn status(&self) -> watch::Receiver<ConnectionState> {
        self.status.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.status.borrow()
    }

    /// Generation of the active feed, `None` when stopped
    pub fn generation(&self) -> Option<u64> {
        self.active.as_ref().map(|feed| feed.generation)
    }

    async fn start(&mut self, symbols: SymbolSet) {
        // Reset first: from here on, writes from the old feed are rejected
        let generation = self.table.reset(&symbols);
        self.teardown().await;

        if symbols.is_empty() {
            self.status.send_replace(ConnectionState::Disconnected);
            tracing::info!(generation, "Price feed stopped");
            return;
        }

        tracing::info!(generation, symbols = %symbols, "Starting price feed");

        let cancel = CancellationToken::new();
        let poll_task = tokio::spawn(run_price_polls(
            Arc::clone(&self.source),
            self.table.clone(),
            generation,
            cancel.clone(),
            self.config.poll_interval(),
            self.status.subscribe(),
        ));

        let task = StreamTask {
            stream: Arc::new(Mutex::new(self.factory.create())),
            symbols: symbols.to_vec(),
            generation,
            table: self.table.clone(),
            status: Arc::clone(&self.status),
            cancel: cancel.clone(),
            reconnect: self.config.reconnect.clone(),
            idle_timeout: self.config.idle_timeout(),
        };
        let stream_task = tokio::spawn(task.run());

        self.active = Some(ActiveFeed {
            symbols,
            generation,
            cancel,
            poll_task,
            stream_task,
        });
    }

    /// Cancel the active feed and wait for its stream to close
    async fn teardown(&mut self) {
        let Some(feed) = self.active.take() else {
            return;
        };

        feed.cancel.cancel();
        feed.poll_task.abort();

        let mut stream_task = feed.stream_task;
        match tokio::time::timeout(self.config.teardown_timeout(), &mut stream_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                if !e.is_cancelled() {
                    tracing::error!(generation = feed.generation, error = %e, "Price stream task panicked");
                }
            }
            Err(_) => {
                tracing::warn!(
                    generation = feed.generation,
                    timeout_ms = self.config.teardown_timeout_ms,
                    "Price stream teardown timed out, aborting task"
                );
                stream_task.abort();
                self.status.send_replace(ConnectionState::Disconnected);
            }
        }
    }
}

impl Drop for PriceFeedReconciler {
    fn drop(&mut self) {
        if let Some(feed) = self.active.take() {
            feed.cancel.cancel();
            feed.poll_task.abort();
            feed.stream_task.abort();
        }
    }
}

// =============================================================================
// Poll task
// =============================================================================

async fn run_price_polls(
    source: Arc<dyn PriceSnapshotSource>,
    table: PriceTable,
    generation: u64,
    cancel: CancellationToken,
    poll_interval: Option<Duration>,
    status: watch::Receiver<ConnectionState>,
) {
    if !fetch_snapshot(source.as_ref(), &table, generation, &cancel, &status).await {
        return;
    }
    let Some(period) = poll_interval else {
        return;
    };

    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        if !fetch_snapshot(source.as_ref(), &table, generation, &cancel, &status).await {
            return;
        }
    }
}

/// One REST fetch merged into the table; `false` once cancelled
async fn fetch_snapshot(
    source: &dyn PriceSnapshotSource,
    table: &PriceTable,
    generation: u64,
    cancel: &CancellationToken,
    status: &watch::Receiver<ConnectionState>,
) -> bool {
    let result = tokio::select! {
        _ = cancel.cancelled() => return false,
        result = source.fetch_prices() => result,
    };

    match result {
        Ok(prices) => {
            let stream_live = *status.borrow() == ConnectionState::Connected;
            let written = if stream_live {
                table.apply_snapshot(generation, &prices)
            } else {
                table.apply_poll(generation, &prices)
            };
            tracing::debug!(
                generation,
                received = prices.len(),
                written,
                stream_live,
                "Price snapshot applied"
            );
        }
        Err(e) => {
            tracing::warn!(generation, error = %e, "Price snapshot fetch failed, table unchanged");
        }
    }
    true
}

// =============================================================================
// Stream task
// =============================================================================

enum StreamEvent {
    Cancelled,
    Frame(String),
    Dropped(ExchangeError),
}

struct StreamTask {
    stream: SharedStream,
    symbols: Vec<String>,
    generation: u64,
    table: PriceTable,
    status: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
    reconnect: ReconnectConfig,
    idle_timeout: Option<Duration>,
}

impl StreamTask {
    async fn run(self) {
        let feed = self.stream.lock().await.feed_name();
        self.status.send_replace(ConnectionState::Connecting);

        let initial = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = connect_and_subscribe(&self.stream, &self.symbols) => Some(result),
        };

        let mut live = match initial {
            None => false,
            Some(Ok(())) => {
                self.status.send_replace(ConnectionState::Connected);
                tracing::info!(feed, generation = self.generation, "Price stream connected");
                true
            }
            Some(Err(e)) => {
                tracing::warn!(feed, generation = self.generation, error = %e, "Price stream connect failed");
                self.reconnect(feed).await
            }
        };

        while live {
            let event = {
                let mut guard = self.stream.lock().await;
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => StreamEvent::Cancelled,
                    event = next_event(&mut **guard, self.idle_timeout) => event,
                }
            };

            match event {
                StreamEvent::Cancelled => break,
                StreamEvent::Frame(text) => {
                    if let Err(e) = self.handle_frame(feed, &text).await {
                        tracing::error!(
                            feed,
                            generation = self.generation,
                            symbols = ?self.symbols,
                            error = %e,
                            "Subscription rejected by feed, closing stream"
                        );
                        break;
                    }
                }
                StreamEvent::Dropped(e) => {
                    tracing::warn!(feed, generation = self.generation, error = %e, "Price stream dropped");
                    live = self.reconnect(feed).await;
                }
            }
        }

        self.shutdown(feed).await;
    }

    /// Apply one frame; `Err` only when the feed rejected a subscription
    async fn handle_frame(&self, feed: &str, text: &str) -> ExchangeResult<()> {
        let decoded = self.stream.lock().await.decode(text);
        match decoded {
            Ok(Some(update)) => {
                if !self.table.apply_stream(self.generation, &update) {
                    tracing::trace!(feed, symbol = %update.symbol, "Ticker update not applied");
                }
            }
            Ok(None) => {}
            Err(e @ ExchangeError::SubscriptionRejected { .. }) => return Err(e),
            Err(e) => {
                tracing::warn!(feed, generation = self.generation, error = %e, "Dropping malformed ticker frame");
            }
        }
        Ok(())
    }

    /// Reconnect and resubscribe; `false` when cancelled or out of attempts
    async fn reconnect(&self, feed: &'static str) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.status.send_replace(ConnectionState::Reconnecting);

        let attempt = reconnect_with_backoff(&self.reconnect, feed, || {
            let stream = Arc::clone(&self.stream);
            let symbols = self.symbols.clone();
            async move { connect_and_subscribe(&stream, &symbols).await }
        });

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            result = attempt => result,
        };

        match result {
            Ok(()) => {
                self.status.send_replace(ConnectionState::Connected);
                tracing::info!(feed, generation = self.generation, "Price stream reconnected and resubscribed");
                true
            }
            Err(e) => {
                self.status.send_replace(ConnectionState::Disconnected);
                tracing::error!(
                    feed,
                    generation = self.generation,
                    max_attempts = self.reconnect.max_attempts,
                    error = %e,
                    "Price stream reconnect gave up, keeping last known prices"
                );
                false
            }
        }
    }

    async fn shutdown(&self, feed: &str) {
        let mut guard = self.stream.lock().await;
        if let Err(e) = guard.unsubscribe(&self.symbols).await {
            tracing::debug!(feed, error = %e, "Unsubscribe during teardown failed");
        }
        if let Err(e) = guard.close().await {
            tracing::debug!(feed, error = %e, "Close during teardown failed");
        }
        self.status.send_replace(ConnectionState::Disconnected);
        tracing::info!(feed, generation = self.generation, "Price stream closed");
    }
}

async fn connect_and_subscribe(stream: &SharedStream, symbols: &[String]) -> ExchangeResult<()> {
    let mut guard = stream.lock().await;
    guard.connect().await?;
    guard.subscribe(symbols).await
}

async fn next_event(stream: &mut dyn TickerStream, idle_timeout: Option<Duration>) -> StreamEvent {
    let message = match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, stream.next_message()).await {
            Ok(message) => message,
            Err(_) => {
                return StreamEvent::Dropped(ExchangeError::NetworkTimeout(limit.as_millis() as u64));
            }
        },
        None => stream.next_message().await,
    };

    match message {
        Some(Ok(text)) => StreamEvent::Frame(text),
        Some(Err(e)) => StreamEvent::Dropped(e),
        None => StreamEvent::Dropped(ExchangeError::ConnectionFailed("closed by peer".to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================
