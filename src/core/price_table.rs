//! Shared price table read model
//!
//! The table is a `tokio::sync::watch` channel holding a [`PriceSnapshot`].
//! Writers mutate it in place through `send_if_modified`, readers take a
//! cheap borrow or subscribe for change notification.
//!
//! Every write carries the generation of the feed that produced it.
//! [`PriceTable::reset`] bumps the generation, so late writes from a torn
//! down feed are rejected instead of resurrecting stale symbols.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::adapters::types::{current_time_ms, TickerUpdate};
use crate::api::PriceMap;

use super::symbols::{normalize_symbol, SymbolSet};

/// Where an entry's value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceSource {
    /// REST snapshot (`GET /trade/prices`)
    Snapshot,
    /// Push ticker stream
    Stream,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub symbol: String,
    pub price: Decimal,
    pub change_percent_24h: Decimal,
    pub source: PriceSource,
    /// Generation of the feed that wrote this entry
    pub generation: u64,
    pub updated_at_ms: u64,
}

/// Point-in-time view of the table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceSnapshot {
    pub generation: u64,
    /// Active subscription set of this generation
    pub symbols: SymbolSet,
    pub entries: BTreeMap<String, PriceEntry>,
}

impl PriceSnapshot {
    pub fn get(&self, symbol: &str) -> Option<&PriceEntry> {
        normalize_symbol(symbol).and_then(|s| self.entries.get(&s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cloneable handle to the shared table
#[derive(Clone)]
pub struct PriceTable {
    tx: Arc<watch::Sender<PriceSnapshot>>,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceTable {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(PriceSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Start a new generation for `symbols`.
    ///
    /// Entries outside the new set are dropped; surviving entries stay
    /// visible until the new feed's snapshot or stream replaces them.
    /// Returns the new generation.
    pub fn reset(&self, symbols: &SymbolSet) -> u64 {
        let mut generation = 0;
        self.mutate(|state| {
            state.generation += 1;
            generation = state.generation;
            state.symbols = symbols.clone();
            state.entries.retain(|sym, _| symbols.contains(sym));
            true
        });
        tracing::debug!(generation, symbols = %symbols, "Price table reset");
        generation
    }

    /// Merge a REST snapshot written by feed `generation`.
    ///
    /// Only symbols of the active set are taken. A symbol that already
    /// received a stream update in this generation keeps it. Returns the
    /// number of entries written.
    pub fn apply_snapshot(&self, generation: u64, prices: &PriceMap) -> usize {
        self.merge_snapshot(generation, prices, true)
    }

    /// Merge a polled snapshot while the stream is not delivering.
    ///
    /// Same as [`apply_snapshot`](Self::apply_snapshot) except that stream
    /// entries of this generation are overwritten too, since they stop
    /// moving once the stream is down.
    pub fn apply_poll(&self, generation: u64, prices: &PriceMap) -> usize {
        self.merge_snapshot(generation, prices, false)
    }

    /// The REST endpoint carries no change data: an existing entry keeps its
    /// last known 24h change, a new one starts at zero.
    fn merge_snapshot(&self, generation: u64, prices: &PriceMap, keep_streamed: bool) -> usize {
        let now = current_time_ms();
        let mut written = 0;
        self.mutate(|state| {
            if state.generation != generation {
                return false;
            }
            for symbol in state.symbols.iter() {
                let Some(price) = prices.get(symbol) else {
                    continue;
                };
                let existing = state.entries.get(symbol);
                let streamed = existing.is_some_and(|e| {
                    e.source == PriceSource::Stream && e.generation == generation
                });
                if streamed && keep_streamed {
                    continue;
                }
                let change_percent_24h = existing
                    .map(|e| e.change_percent_24h)
                    .unwrap_or(Decimal::ZERO);
                state.entries.insert(
                    symbol.to_string(),
                    PriceEntry {
                        symbol: symbol.to_string(),
                        price: *price,
                        change_percent_24h,
                        source: PriceSource::Snapshot,
                        generation,
                        updated_at_ms: now,
                    },
                );
                written += 1;
            }
            written > 0
        });
        written
    }

    /// Apply one stream update written by feed `generation`.
    ///
    /// Returns `false` when the generation is stale or the symbol is not
    /// in the active set.
    pub fn apply_stream(&self, generation: u64, update: &TickerUpdate) -> bool {
        let Some(symbol) = normalize_symbol(&update.symbol) else {
            return false;
        };
        let now = current_time_ms();
        self.mutate(|state| {
            if state.generation != generation || !state.symbols.contains(&symbol) {
                return false;
            }
            state.entries.insert(
                symbol.clone(),
                PriceEntry {
                    symbol: symbol.clone(),
                    price: update.price,
                    change_percent_24h: update.change_percent,
                    source: PriceSource::Stream,
                    generation,
                    updated_at_ms: now,
                },
            );
            true
        })
    }

    /// Drop every entry and start an empty generation
    pub fn clear(&self) -> u64 {
        self.reset(&SymbolSet::empty())
    }

    pub fn generation(&self) -> u64 {
        self.tx.borrow().generation
    }

    /// Current contents; the read lock is held only for the clone
    pub fn snapshot(&self) -> PriceSnapshot {
        self.tx.borrow().clone()
    }

    pub fn get(&self, symbol: &str) -> Option<PriceEntry> {
        let symbol = normalize_symbol(symbol)?;
        self.tx.borrow().entries.get(&symbol).cloned()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver notified after every change
    pub fn subscribe(&self) -> watch::Receiver<PriceSnapshot> {
        self.tx.subscribe()
    }

    /// Apply `f` in place; receivers are notified only when it returns `true`
    fn mutate<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut PriceSnapshot) -> bool,
    {
        self.tx.send_if_modified(f)
    }
}

// ============================================================================
// Tests
// ============================================================================
