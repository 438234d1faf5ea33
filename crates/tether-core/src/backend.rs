use crate::error::Result;
use crate::record::{DeleteRequest, Stats, UrlRecord, UserUrl};
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// What the relational backend knows about a short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The code maps to this URL and is not tombstoned.
    Active(String),
    /// The code exists but is tombstoned.
    Deleted,
    /// The backend has no row for the code.
    Missing,
}

/// The relational side of the hybrid store.
///
/// Exactly one strategy is chosen when the store is built: a real database
/// when a DSN is configured, or a detached strategy that stores nothing.
/// Dropping any returned future cancels the operation; transactional
/// operations roll back in that case.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Inserts one record.
    /// Returns `Err(Duplicate)` if the URL or its short code already exists.
    async fn insert(&self, record: &UrlRecord) -> Result<()>;

    /// Inserts all records in one serializable transaction.
    /// Any failing row rolls back the whole batch.
    async fn insert_batch(&self, records: &[UrlRecord]) -> Result<()>;

    /// Looks a short code up.
    async fn lookup(&self, code: &ShortCode) -> Result<Lookup>;

    /// Lists every record submitted by `user_id`. Empty if there are none.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<UserUrl>>;

    /// Counts distinct URLs and distinct users.
    async fn stats(&self) -> Result<Stats>;

    /// Sets the tombstone for each `(user_id, short_code)` pair in one
    /// transaction. Any failing row rolls back the whole batch.
    async fn mark_deleted(&self, batch: &[DeleteRequest]) -> Result<()>;

    /// Liveness probe. `false` when unreachable or not configured.
    async fn ping(&self) -> bool;

    /// Whether this strategy is backed by a real database.
    fn is_attached(&self) -> bool;

    /// Releases connections. Later calls may fail.
    async fn close(&self);
}

/// Commits batches of delete requests.
///
/// This is the seam between the deletion pipeline and the store.
#[async_trait]
pub trait Tombstoner: Send + Sync + 'static {
    /// Applies the whole batch or nothing.
    async fn commit_deletes(&self, batch: &[DeleteRequest]) -> Result<()>;
}
