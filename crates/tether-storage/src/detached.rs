use async_trait::async_trait;
use tether_core::{Backend, DeleteRequest, Lookup, Result, ShortCode, Stats, UrlRecord, UserUrl};
use tracing::warn;

/// The backend used when no database is configured.
///
/// Writes are accepted and dropped, lookups always miss so reads fall
/// through to the in-memory index, and listings and stats are empty.
/// Tombstones are not recorded anywhere; they are neither written to the
/// durable log nor applied to the index.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedBackend;

impl DetachedBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for DetachedBackend {
    async fn insert(&self, _record: &UrlRecord) -> Result<()> {
        Ok(())
    }

    async fn insert_batch(&self, _records: &[UrlRecord]) -> Result<()> {
        Ok(())
    }

    async fn lookup(&self, _code: &ShortCode) -> Result<Lookup> {
        Ok(Lookup::Missing)
    }

    async fn list_by_user(&self, _user_id: &str) -> Result<Vec<UserUrl>> {
        Ok(Vec::new())
    }

    async fn stats(&self) -> Result<Stats> {
        Ok(Stats::default())
    }

    async fn mark_deleted(&self, batch: &[DeleteRequest]) -> Result<()> {
        // TODO: decide whether file-only mode should persist tombstones
        // (a `deleted: true` log line per request) once the log format is
        // versioned.
        warn!(
            count = batch.len(),
            "no relational backend configured, delete batch is not recorded"
        );
        Ok(())
    }

    async fn ping(&self) -> bool {
        false
    }

    fn is_attached(&self) -> bool {
        false
    }

    async fn close(&self) {}
}
