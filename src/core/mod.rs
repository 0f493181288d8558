//! Core module - price table, feed reconciler, portfolio valuation, session
//!
//! This module uses **explicit re-exports** instead of glob exports
//! (`pub use module::*`) so the public API only changes on purpose.
//!
//! ## Usage
//! ```ignore
//! use minex_client::core::{PriceFeedReconciler, PriceTable, SessionManager};
//! ```

pub mod portfolio;
pub mod price_table;
pub mod reconciler;
pub mod session;
pub mod symbols;

// Explicit re-exports for portfolio module
pub use portfolio::{total_value, unpriced_currencies, wallet_value};

// Explicit re-exports for price_table module
pub use price_table::{PriceEntry, PriceSnapshot, PriceSource, PriceTable};

// Explicit re-exports for reconciler module
pub use reconciler::{PriceFeedReconciler, PriceSnapshotSource};

// Explicit re-exports for session module
pub use session::{
    FileTokenStore, MemoryTokenStore, Session, SessionError, SessionManager, TokenStore,
};

// Explicit re-exports for symbols module
pub use symbols::{normalize_symbol, SymbolSet};
