//! Core types and traits for the Tether URL shortener.
//!
//! This crate holds the data model, the short code codec and the traits
//! shared by the storage, deletion and service crates.

pub mod backend;
pub mod codec;
pub mod error;
pub mod record;
pub mod shortcode;
pub mod shortener;

pub use backend::{Backend, Lookup, Tombstoner};
pub use error::{Result, StoreError};
pub use record::{BatchItem, BatchResult, DeleteRequest, Stats, UrlRecord, UserUrl};
pub use shortcode::ShortCode;
pub use shortener::Shortener;
