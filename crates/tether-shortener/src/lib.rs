//! URL shortener service.
//!
//! Wires a [`HybridStore`](tether_storage::HybridStore) and a
//! [`DeletionPipeline`](tether_deleter::DeletionPipeline) behind the
//! [`Shortener`] trait. Core types are re-exported from `tether_core`.

pub mod service;

pub use service::ShortenerService;
pub use tether_core::{Shortener, StoreError};
