use crate::error::Result;
use crate::record::{BatchItem, BatchResult, Stats, UserUrl};
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// The operations offered to the transport layer.
///
/// Callers hand in an already validated URL and an already resolved user id.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens `url` for `user_id`.
    ///
    /// Returns `Err(Duplicate(code))` when a relational backend already holds
    /// the URL. The carried code is valid and equal to what a fresh save
    /// would have produced.
    async fn save(&self, url: &str, user_id: &str) -> Result<ShortCode>;

    /// Resolves a short code to its original URL.
    async fn get(&self, code: &str) -> Result<String>;

    /// Shortens a batch of URLs atomically.
    async fn save_batch(&self, user_id: &str, items: Vec<BatchItem>) -> Result<Vec<BatchResult>>;

    /// Lists the URLs submitted by `user_id`.
    async fn get_by_user(&self, user_id: &str) -> Result<Vec<UserUrl>>;

    /// Queues tombstones for `codes` owned by `user_id`.
    ///
    /// Returns once the requests are handed off, not once they commit.
    fn delete_async(&self, codes: Vec<ShortCode>, user_id: &str) -> Result<()>;

    /// Counts distinct URLs and users.
    async fn stats(&self) -> Result<Stats>;

    /// Liveness of the relational backend. `false` when none is configured.
    async fn ping(&self) -> bool;
}
