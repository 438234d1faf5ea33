use crate::config::StoreConfig;
use crate::detached::DetachedBackend;
use crate::index::DurableIndex;
use crate::postgres::PostgresBackend;
use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use tether_core::{
    Backend, BatchItem, BatchResult, DeleteRequest, Lookup, Result, ShortCode, Stats, StoreError,
    Tombstoner, UrlRecord, UserUrl,
};
use tracing::{debug, info, trace, warn};

/// Which persistence layers a store writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Durable log and in-memory index, with a relational database as the
    /// source of truth.
    Hybrid,
    /// Durable log and in-memory index only.
    FileOnly,
}

impl Display for StoreMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreMode::Hybrid => write!(f, "hybrid"),
            StoreMode::FileOnly => write!(f, "file-only"),
        }
    }
}

/// The hybrid persistence layer.
///
/// Every save goes to the backend first and then, if the code is not yet
/// indexed, to the durable log and the index. The log is therefore a full
/// replay source even when a database is primary. The two writes are not a
/// two-phase commit: a crash between them leaves the log behind the
/// database, which the next save of the same URL repairs.
#[derive(Debug)]
pub struct HybridStore<B> {
    index: DurableIndex,
    backend: B,
}

impl HybridStore<DetachedBackend> {
    /// Opens a file-only store.
    pub fn open_detached(config: &StoreConfig) -> Result<Self> {
        let index = DurableIndex::open(&config.log_path)?;
        info!(records = index.len(), "opened file-only store");
        Ok(Self::new(index, DetachedBackend::new()))
    }
}

impl HybridStore<PostgresBackend> {
    /// Opens a store backed by PostgreSQL, creating the schema if needed.
    pub async fn open_postgres(config: &StoreConfig, database_url: &str) -> Result<Self> {
        let index = DurableIndex::open(&config.log_path)?;
        let backend = PostgresBackend::connect_with(
            database_url,
            config.max_connections,
            config.acquire_timeout,
        )
        .await?;
        backend.ensure_schema().await?;
        info!(records = index.len(), "opened hybrid store");
        Ok(Self::new(index, backend))
    }
}

impl<B: Backend> HybridStore<B> {
    pub fn new(index: DurableIndex, backend: B) -> Self {
        Self { index, backend }
    }

    pub fn mode(&self) -> StoreMode {
        if self.backend.is_attached() {
            StoreMode::Hybrid
        } else {
            StoreMode::FileOnly
        }
    }

    pub fn index(&self) -> &DurableIndex {
        &self.index
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Shortens `url` on behalf of `user_id`.
    ///
    /// A backend duplicate is reported as `Err(Duplicate(code))` after the
    /// local log has been brought up to date; callers treat it as success
    /// with an existing resource. Any other backend failure is `SaveFailed`
    /// and nothing is appended locally.
    pub async fn save(&self, url: &str, user_id: &str) -> Result<ShortCode> {
        let record = UrlRecord::new(user_id, url);
        let code = record.short_code.clone();

        let outcome = match self.backend.insert(&record).await {
            Ok(()) => Ok(code.clone()),
            Err(StoreError::Duplicate(existing)) => {
                debug!(code = %existing, "url already stored in backend");
                Err(StoreError::Duplicate(existing))
            }
            Err(err) => {
                warn!(code = %code, error = %err, "backend insert failed");
                return Err(StoreError::SaveFailed(err.to_string()));
            }
        };

        // On a backend duplicate the log line carries this caller's user id,
        // not the backend owner's. Ownership is only ever read from the
        // backend, so the two may disagree.
        if self.index.insert_if_absent(record)? {
            debug!(code = %code, user_id, "saved new url");
        }

        outcome
    }

    /// Resolves a short code.
    ///
    /// The backend answers first. When it has no row, the in-memory index
    /// is consulted.
    pub async fn get(&self, code: &str) -> Result<String> {
        trace!(code, "resolving short code");

        match self.backend.lookup(&ShortCode::new_unchecked(code)).await? {
            Lookup::Active(url) => return Ok(url),
            Lookup::Deleted => return Err(StoreError::Deleted(code.to_string())),
            Lookup::Missing => {}
        }

        match self.index.get(code) {
            Some(record) if record.deleted => Err(StoreError::Deleted(code.to_string())),
            Some(record) => Ok(record.original_url),
            None => Err(StoreError::NotFound(code.to_string())),
        }
    }

    /// Shortens every item in one atomic backend transaction.
    ///
    /// If the backend rejects any row nothing from the batch is kept there
    /// and nothing is appended locally. On success each URL not already
    /// indexed is appended to the log once.
    pub async fn save_batch(&self, user_id: &str, items: &[BatchItem]) -> Result<Vec<BatchResult>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<UrlRecord> = items
            .iter()
            .map(|item| UrlRecord::new(user_id, item.original_url.as_str()))
            .collect();

        if let Err(err) = self.backend.insert_batch(&records).await {
            warn!(count = records.len(), error = %err, "backend batch insert rolled back");
            return Err(StoreError::SaveFailed(err.to_string()));
        }

        let results = items
            .iter()
            .zip(&records)
            .map(|(item, record)| BatchResult {
                correlation_id: item.correlation_id.clone(),
                short_code: record.short_code.clone(),
            })
            .collect();

        let total = records.len();
        let appended = self.index.insert_all_if_absent(records)?;
        debug!(total, appended, user_id, "saved url batch");

        Ok(results)
    }

    /// Lists the URLs submitted by `user_id`. Backend only.
    pub async fn get_by_user(&self, user_id: &str) -> Result<Vec<UserUrl>> {
        self.backend.list_by_user(user_id).await
    }

    /// Counts distinct URLs and users. Backend only.
    pub async fn stats(&self) -> Result<Stats> {
        self.backend.stats().await
    }

    pub async fn ping(&self) -> bool {
        self.backend.ping().await
    }

    /// Flushes the log to disk and releases backend connections.
    pub async fn close(&self) -> Result<()> {
        self.backend.close().await;
        self.index.sync()?;
        info!(mode = %self.mode(), "closed store");
        Ok(())
    }
}

#[async_trait]
impl<B: Backend> Tombstoner for HybridStore<B> {
    async fn commit_deletes(&self, batch: &[DeleteRequest]) -> Result<()> {
        self.backend.mark_deleted(batch).await.map_err(|err| match err {
            StoreError::CommitFailed(_) | StoreError::Cancelled => err,
            other => StoreError::CommitFailed(other.to_string()),
        })
    }
}
