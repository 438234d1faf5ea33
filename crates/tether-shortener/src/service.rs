use async_trait::async_trait;
use std::sync::Arc;
use tether_core::{
    Backend, BatchItem, BatchResult, DeleteRequest, Result, ShortCode, Shortener, Stats,
    StoreError, UserUrl,
};
use tether_deleter::{intake, process, DeletionPipeline, PipelineConfig, ShutdownMode};
use tether_storage::{HybridStore, StoreMode};
use tracing::{debug, info};

/// A concrete implementation of the `Shortener` trait.
///
/// Reads and saves go straight to the [`HybridStore`]. Deletes are handed
/// to a background [`DeletionPipeline`] that commits tombstones in
/// batches.
pub struct ShortenerService<B: Backend> {
    store: Arc<HybridStore<B>>,
    deletions: DeletionPipeline,
    pipeline: PipelineConfig,
}

impl<B: Backend> ShortenerService<B> {
    /// Creates the service and starts its deletion pipeline.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(store: HybridStore<B>, pipeline: PipelineConfig) -> Self {
        let store = Arc::new(store);
        let deletions = DeletionPipeline::spawn(Arc::clone(&store), pipeline.clone());
        info!(mode = %store.mode(), "shortener service started");
        Self {
            store,
            deletions,
            pipeline,
        }
    }

    pub fn store(&self) -> &HybridStore<B> {
        &self.store
    }

    pub fn mode(&self) -> StoreMode {
        self.store.mode()
    }

    /// Tombstones `codes` owned by `user_id` and waits for the commit.
    ///
    /// Runs a dedicated pass of the pipeline over this call's requests, so
    /// a failed commit surfaces as `CommitFailed` here instead of only
    /// being logged.
    pub async fn delete_and_wait(&self, codes: Vec<ShortCode>, user_id: &str) -> Result<()> {
        if codes.is_empty() {
            return Ok(());
        }

        let requests = codes
            .into_iter()
            .map(|code| DeleteRequest::new(user_id, code))
            .collect();
        let input = intake(requests).map_err(|e| {
            StoreError::Unavailable(format!("delete intake rejected request: {e}"))
        })?;

        process(
            self.store.as_ref(),
            &self.pipeline,
            &self.deletions.cancellation(),
            vec![input],
        )
        .await
    }

    /// Stops the deletion pipeline, then closes the store.
    pub async fn shutdown(&self, mode: ShutdownMode) -> Result<()> {
        self.deletions.shutdown(mode).await;
        self.store.close().await
    }
}

#[async_trait]
impl<B: Backend> Shortener for ShortenerService<B> {
    async fn save(&self, url: &str, user_id: &str) -> Result<ShortCode> {
        self.store.save(url, user_id).await
    }

    async fn get(&self, code: &str) -> Result<String> {
        self.store.get(code).await
    }

    async fn save_batch(&self, user_id: &str, items: Vec<BatchItem>) -> Result<Vec<BatchResult>> {
        self.store.save_batch(user_id, &items).await
    }

    async fn get_by_user(&self, user_id: &str) -> Result<Vec<UserUrl>> {
        self.store.get_by_user(user_id).await
    }

    fn delete_async(&self, codes: Vec<ShortCode>, user_id: &str) -> Result<()> {
        let count = codes.len();
        self.deletions.submit(user_id, codes)?;
        debug!(count, user_id, "accepted delete requests");
        Ok(())
    }

    async fn stats(&self) -> Result<Stats> {
        self.store.stats().await
    }

    async fn ping(&self) -> bool {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;
    use tether_core::{Lookup, UrlRecord};
    use tether_storage::{DetachedBackend, DurableIndex, StoreConfig};

    /// Rows keyed by short code, tombstones applied per owner.
    #[derive(Default)]
    struct MemoryBackend {
        rows: Mutex<HashMap<ShortCode, UrlRecord>>,
    }

    #[async_trait]
    impl Backend for MemoryBackend {
        async fn insert(&self, record: &UrlRecord) -> Result<()> {
            let mut rows = self.rows.lock();
            if rows.contains_key(&record.short_code) {
                return Err(StoreError::Duplicate(record.short_code.clone()));
            }
            rows.insert(record.short_code.clone(), record.clone());
            Ok(())
        }

        async fn insert_batch(&self, records: &[UrlRecord]) -> Result<()> {
            for record in records {
                self.insert(record).await?;
            }
            Ok(())
        }

        async fn lookup(&self, code: &ShortCode) -> Result<Lookup> {
            Ok(match self.rows.lock().get(code) {
                Some(row) if row.deleted => Lookup::Deleted,
                Some(row) => Lookup::Active(row.original_url.clone()),
                None => Lookup::Missing,
            })
        }

        async fn list_by_user(&self, user_id: &str) -> Result<Vec<UserUrl>> {
            Ok(self
                .rows
                .lock()
                .values()
                .filter(|row| row.user_id == user_id)
                .map(|row| UserUrl {
                    short_code: row.short_code.clone(),
                    original_url: row.original_url.clone(),
                })
                .collect())
        }

        async fn stats(&self) -> Result<Stats> {
            let rows = self.rows.lock();
            let mut users: Vec<&str> = rows.values().map(|row| row.user_id.as_str()).collect();
            users.sort_unstable();
            users.dedup();
            Ok(Stats {
                urls: rows.len() as u64,
                users: users.len() as u64,
            })
        }

        async fn mark_deleted(&self, batch: &[DeleteRequest]) -> Result<()> {
            let mut rows = self.rows.lock();
            for request in batch {
                if let Some(row) = rows.get_mut(&request.short_code) {
                    if row.user_id == request.user_id {
                        row.deleted = true;
                    }
                }
            }
            Ok(())
        }

        async fn ping(&self) -> bool {
            true
        }

        fn is_attached(&self) -> bool {
            true
        }

        async fn close(&self) {}
    }

    fn slow_pipeline() -> PipelineConfig {
        PipelineConfig::builder()
            .flush_interval(Duration::from_secs(3600))
            .build()
    }

    fn memory_service(dir: &TempDir) -> ShortenerService<MemoryBackend> {
        let index = DurableIndex::open(dir.path().join("urls.json")).unwrap();
        let store = HybridStore::new(index, MemoryBackend::default());
        ShortenerService::new(store, slow_pipeline())
    }

    fn detached_service(dir: &TempDir) -> ShortenerService<DetachedBackend> {
        let config = StoreConfig::builder()
            .log_path(dir.path().join("urls.json"))
            .build();
        let store = HybridStore::open_detached(&config).unwrap();
        ShortenerService::new(store, slow_pipeline())
    }

    #[tokio::test]
    async fn save_then_get() {
        let dir = TempDir::new().unwrap();
        let service = detached_service(&dir);

        let code = service.save("https://example.com", "u1").await.unwrap();

        assert_eq!(code, ShortCode::from_url("https://example.com"));
        assert_eq!(
            service.get(code.as_str()).await.unwrap(),
            "https://example.com"
        );
        assert_eq!(service.mode(), StoreMode::FileOnly);
        service.shutdown(ShutdownMode::Drain).await.unwrap();
    }

    #[tokio::test]
    async fn batch_results_keep_correlation_ids() {
        let dir = TempDir::new().unwrap();
        let service = memory_service(&dir);

        let items = vec![
            BatchItem {
                correlation_id: "first".to_string(),
                original_url: "https://a.example".to_string(),
            },
            BatchItem {
                correlation_id: "second".to_string(),
                original_url: "https://b.example".to_string(),
            },
        ];
        let results = service.save_batch("u1", items).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].correlation_id, "first");
        assert_eq!(
            results[1].short_code,
            ShortCode::from_url("https://b.example")
        );
        assert_eq!(service.get_by_user("u1").await.unwrap().len(), 2);
        service.shutdown(ShutdownMode::Drain).await.unwrap();
    }

    #[tokio::test]
    async fn queued_delete_commits_on_drain() {
        let dir = TempDir::new().unwrap();
        let service = memory_service(&dir);
        let code = service.save("https://example.com", "u1").await.unwrap();

        service.delete_async(vec![code.clone()], "u1").unwrap();
        service.shutdown(ShutdownMode::Drain).await.unwrap();

        let err = service.store().get(code.as_str()).await.unwrap_err();
        assert!(matches!(err, StoreError::Deleted(_)));
    }

    #[tokio::test]
    async fn ten_queued_deletes_commit_without_timer() {
        let dir = TempDir::new().unwrap();
        let service = memory_service(&dir);
        let mut codes = Vec::new();
        for n in 0..10 {
            let url = format!("https://example.com/{n}");
            codes.push(service.save(&url, "u1").await.unwrap());
        }

        service.delete_async(codes.clone(), "u1").unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if service.get(codes[9].as_str()).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        for code in &codes {
            let err = service.get(code.as_str()).await.unwrap_err();
            assert!(matches!(err, StoreError::Deleted(_)));
        }
        service.shutdown(ShutdownMode::Drain).await.unwrap();
    }

    #[tokio::test]
    async fn delete_and_wait_commits_before_returning() {
        let dir = TempDir::new().unwrap();
        let service = memory_service(&dir);
        let code = service.save("https://example.com", "u1").await.unwrap();

        service
            .delete_and_wait(vec![code.clone()], "u1")
            .await
            .unwrap();

        let err = service.get(code.as_str()).await.unwrap_err();
        assert!(matches!(err, StoreError::Deleted(_)));
        service.shutdown(ShutdownMode::Drain).await.unwrap();
    }

    #[tokio::test]
    async fn delete_by_another_user_is_ignored() {
        let dir = TempDir::new().unwrap();
        let service = memory_service(&dir);
        let code = service.save("https://example.com", "owner").await.unwrap();

        service
            .delete_and_wait(vec![code.clone()], "intruder")
            .await
            .unwrap();

        assert_eq!(
            service.get(code.as_str()).await.unwrap(),
            "https://example.com"
        );
        service.shutdown(ShutdownMode::Drain).await.unwrap();
    }

    #[tokio::test]
    async fn discard_drops_queued_deletes() {
        let dir = TempDir::new().unwrap();
        let service = memory_service(&dir);
        let code = service.save("https://example.com", "u1").await.unwrap();

        service.delete_async(vec![code.clone()], "u1").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        service.shutdown(ShutdownMode::Discard).await.unwrap();

        assert_eq!(
            service.store().get(code.as_str()).await.unwrap(),
            "https://example.com"
        );
    }

    #[tokio::test]
    async fn delete_after_shutdown_is_cancelled() {
        let dir = TempDir::new().unwrap();
        let service = memory_service(&dir);
        service.shutdown(ShutdownMode::Drain).await.unwrap();

        let err = service
            .delete_async(vec![ShortCode::from_url("https://example.com")], "u1")
            .unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
    }

    #[tokio::test]
    async fn file_only_service_degrades_quietly() {
        let dir = TempDir::new().unwrap();
        let service = detached_service(&dir);
        let code = service.save("https://example.com", "u1").await.unwrap();

        assert!(!service.ping().await);
        assert_eq!(service.stats().await.unwrap(), Stats::default());
        assert!(service.get_by_user("u1").await.unwrap().is_empty());

        service
            .delete_and_wait(vec![code.clone()], "u1")
            .await
            .unwrap();
        assert_eq!(
            service.get(code.as_str()).await.unwrap(),
            "https://example.com"
        );
        service.shutdown(ShutdownMode::Drain).await.unwrap();
    }

    #[tokio::test]
    async fn works_through_trait_object() {
        let dir = TempDir::new().unwrap();
        let service: Arc<dyn Shortener> = Arc::new(memory_service(&dir));

        let first = service.save("https://example.com", "u1").await.unwrap();
        let err = service.save("https://example.com", "u2").await.unwrap_err();

        match err {
            StoreError::Duplicate(existing) => assert_eq!(existing, first),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(service.stats().await.unwrap().urls, 1);
    }
}
