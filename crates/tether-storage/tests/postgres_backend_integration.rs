use tether_core::{BatchItem, DeleteRequest, Lookup, ShortCode, Stats, UrlRecord};
use tether_storage::{
    Backend, DurableIndex, HybridStore, PostgresBackend, StoreError, StoreMode, Tombstoner,
};
use tether_test_infra::{PostgresConfig, PostgresServer};

struct Fixture {
    _postgres: PostgresServer,
    backend: PostgresBackend,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::new(PostgresConfig::builder().build())
            .await
            .expect("start postgres");
        let pool = postgres.connect().await.expect("connect postgres");

        let backend = PostgresBackend::new(pool);
        backend.ensure_schema().await.expect("create schema");

        Self {
            _postgres: postgres,
            backend,
        }
    }
}

fn item(id: &str, url: &str) -> BatchItem {
    BatchItem {
        correlation_id: id.to_string(),
        original_url: url.to_string(),
    }
}

#[tokio::test]
async fn insert_and_lookup_active_record() {
    let fixture = Fixture::start().await;
    let record = UrlRecord::new("u1", "https://example.com");

    fixture.backend.insert(&record).await.unwrap();

    let got = fixture.backend.lookup(&record.short_code).await.unwrap();
    assert_eq!(got, Lookup::Active("https://example.com".to_string()));
}

#[tokio::test]
async fn insert_reports_duplicate_for_known_url() {
    let fixture = Fixture::start().await;

    fixture
        .backend
        .insert(&UrlRecord::new("u1", "https://example.com"))
        .await
        .unwrap();

    let err = fixture
        .backend
        .insert(&UrlRecord::new("u2", "https://example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Duplicate(code) if code == ShortCode::from_url("https://example.com")));
}

#[tokio::test]
async fn ensure_schema_is_idempotent() {
    let fixture = Fixture::start().await;
    fixture.backend.ensure_schema().await.unwrap();
}

#[tokio::test]
async fn lookup_missing_code() {
    let fixture = Fixture::start().await;
    let got = fixture
        .backend
        .lookup(&ShortCode::new_unchecked("missing"))
        .await
        .unwrap();
    assert_eq!(got, Lookup::Missing);
}

#[tokio::test]
async fn mark_deleted_tombstones_only_owner_rows() {
    let fixture = Fixture::start().await;
    let mine = UrlRecord::new("u1", "https://mine.example");
    let theirs = UrlRecord::new("u2", "https://theirs.example");
    fixture.backend.insert(&mine).await.unwrap();
    fixture.backend.insert(&theirs).await.unwrap();

    fixture
        .backend
        .mark_deleted(&[
            DeleteRequest::new("u1", mine.short_code.clone()),
            DeleteRequest::new("u1", theirs.short_code.clone()),
        ])
        .await
        .unwrap();

    assert_eq!(
        fixture.backend.lookup(&mine.short_code).await.unwrap(),
        Lookup::Deleted
    );
    assert_eq!(
        fixture.backend.lookup(&theirs.short_code).await.unwrap(),
        Lookup::Active("https://theirs.example".to_string())
    );
}

#[tokio::test]
async fn failed_batch_rolls_back_every_row() {
    let fixture = Fixture::start().await;
    let existing = UrlRecord::new("u1", "https://existing.example");
    fixture.backend.insert(&existing).await.unwrap();

    let err = fixture
        .backend
        .insert_batch(&[
            UrlRecord::new("u1", "https://fresh.example"),
            UrlRecord::new("u1", "https://existing.example"),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));

    let fresh = ShortCode::from_url("https://fresh.example");
    assert_eq!(fixture.backend.lookup(&fresh).await.unwrap(), Lookup::Missing);
    assert_eq!(
        fixture.backend.lookup(&existing.short_code).await.unwrap(),
        Lookup::Active("https://existing.example".to_string())
    );
}

#[tokio::test]
async fn list_and_stats() {
    let fixture = Fixture::start().await;
    fixture
        .backend
        .insert_batch(&[
            UrlRecord::new("u1", "https://a.example"),
            UrlRecord::new("u1", "https://b.example"),
            UrlRecord::new("u2", "https://c.example"),
        ])
        .await
        .unwrap();

    let listed = fixture.backend.list_by_user("u1").await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(fixture.backend.list_by_user("nobody").await.unwrap().is_empty());

    assert_eq!(
        fixture.backend.stats().await.unwrap(),
        Stats { urls: 3, users: 2 }
    );
    assert!(fixture.backend.ping().await);
}

#[tokio::test]
async fn ping_fails_after_close() {
    let fixture = Fixture::start().await;
    fixture.backend.close().await;
    assert!(!fixture.backend.ping().await);
}

#[tokio::test]
async fn hybrid_store_over_postgres() {
    let fixture = Fixture::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("urls.json");
    let store = HybridStore::new(DurableIndex::open(&path).unwrap(), fixture.backend.clone());
    assert_eq!(store.mode(), StoreMode::Hybrid);

    let code = store.save("https://example.com", "u1").await.unwrap();
    let err = store.save("https://example.com", "u2").await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(existing) if existing == code));
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);

    let results = store
        .save_batch("u1", &[item("x", "https://x.example"), item("y", "https://y.example")])
        .await
        .unwrap();
    assert_eq!(results[1].correlation_id, "y");

    store
        .commit_deletes(&[DeleteRequest::new("u1", code.clone())])
        .await
        .unwrap();
    assert!(matches!(
        store.get(code.as_str()).await.unwrap_err(),
        StoreError::Deleted(_)
    ));
    assert_eq!(
        store.get(results[0].short_code.as_str()).await.unwrap(),
        "https://x.example"
    );
}
