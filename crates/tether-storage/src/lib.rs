//! Hybrid persistence for Tether.
//!
//! A [`HybridStore`] keeps an in-memory index, an append-only durable log
//! and an optional relational backend consistent with each other. The
//! backend strategy is picked once, when the store is opened.

pub mod append_log;
pub mod config;
pub mod detached;
pub mod hybrid;
pub mod index;
pub mod postgres;

pub use append_log::AppendLog;
pub use config::StoreConfig;
pub use detached::DetachedBackend;
pub use hybrid::{HybridStore, StoreMode};
pub use index::DurableIndex;
pub use postgres::PostgresBackend;
pub use tether_core::{Backend, Lookup, Result, StoreError, Tombstoner};
