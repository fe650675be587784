//! Refsync - multi-exchange reference-data synchronization.
//!
//! This crate maintains a single consistent source of truth for
//! trading-instrument reference data (tick size, lot size, minimum notional,
//! maximum order size, contract terms) across cryptocurrency exchanges,
//! under a canonical symbology that keeps spot and perpetual instruments on
//! the same underlying pair distinct.
//!
//! # Architecture
//!
//! Per-exchange pollers feed a shared reconciliation engine:
//!
//! - **`resolver`** - exchange-native id + kind to [`domain::CanonicalSymbol`]
//! - **`normalize`** - raw string listings to validated decimal records
//! - **`reconcile`** - diff against the active generation, atomic commit
//! - **`store`** - immutable generation snapshots, SQLite durability
//! - **`scheduler`** - per-exchange polling with backoff and staleness
//! - **`query`** - the read path used by order-construction logic
//!
//! Every commit produces a whole new generation; readers snapshot the active
//! generation once per call and can never observe a mix of two poll cycles.
//!
//! # Modules
//!
//! - [`config`] - TOML configuration with per-exchange sections
//! - [`domain`] - canonical symbols, instrument records, generations
//! - [`error`] - error types for the crate
//! - [`port`] - adapter and store trait seams
//! - [`adapter`] - Binance and OKX reference-data clients
//! - [`notify`] - change events and source-health conditions
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use refsync::notify::NotifierRegistry;
//! use refsync::query::QueryApi;
//! use refsync::reconcile::Reconciler;
//! use refsync::store::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::default());
//! let _engine = Reconciler::new(Arc::clone(&store), Arc::new(NotifierRegistry::new()));
//! let _queries = QueryApi::new(store);
//! ```

pub mod adapter;
pub mod config;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod notify;
pub mod port;
pub mod query;
pub mod reconcile;
pub mod resolver;
pub mod retry;
pub mod scheduler;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;
