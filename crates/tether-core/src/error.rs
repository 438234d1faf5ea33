use crate::shortcode::ShortCode;
use thiserror::Error;

/// Result type for store, backend and pipeline operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The URL already has a short code. The code is still usable.
    #[error("url already shortened as {0}")]
    Duplicate(ShortCode),
    #[error("no url for short code: {0}")]
    NotFound(String),
    /// The record exists but carries a tombstone.
    #[error("url was deleted: {0}")]
    Deleted(String),
    #[error("can't save url: {0}")]
    SaveFailed(String),
    /// A delete batch was rolled back. Nothing in the batch was applied.
    #[error("can't commit delete batch: {0}")]
    CommitFailed(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("durable log i/o failed: {0}")]
    Log(String),
    #[error("durable log is corrupt at line {line}: {reason}")]
    CorruptLog { line: usize, reason: String },
    #[error("operation cancelled")]
    Cancelled,
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
}

impl StoreError {
    /// Returns `true` for outcomes a caller may treat as success with an
    /// existing resource.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Log(err.to_string())
    }
}
