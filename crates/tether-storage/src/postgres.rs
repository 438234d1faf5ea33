use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Connection, Row};
use std::time::Duration;
use tether_core::{
    Backend, DeleteRequest, Lookup, Result, ShortCode, Stats, StoreError, UrlRecord, UserUrl,
};
use tracing::{debug, info, trace};

/// Idempotent DDL applied on startup.
pub const SCHEMA: &str = include_str!("../ddl/postgres/urls.sql");

/// PostgreSQL implementation of the relational backend.
///
/// `url` is the primary key and `short_url` carries a unique index, so a
/// URL can only ever be inserted once. Deletion is a tombstone: rows are
/// never removed and `deleted` is only ever set to `true`.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Creates a backend from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a backend by opening a bounded connection pool.
    pub async fn connect_with(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        info!(max_connections, "connected to postgres");
        Ok(Self::new(pool))
    }

    /// Creates the `urls` table and its indexes if they are missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("ensured urls schema");
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

fn count_to_u64(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|e| StoreError::InvalidData(format!("negative count '{value}': {e}")))
}

#[async_trait]
impl Backend for PostgresBackend {
    async fn insert(&self, record: &UrlRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO urls (user_id, short_url, url)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&record.user_id)
        .bind(record.short_code.as_str())
        .bind(&record.original_url)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Duplicate(record.short_code.clone()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn insert_batch(&self, records: &[UrlRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO urls (user_id, short_url, url)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(&record.user_id)
            .bind(record.short_code.as_str())
            .bind(&record.original_url)
            .execute(&mut *tx)
            .await;

            // Returning drops `tx`, which rolls the batch back.
            match result {
                Ok(_) => {}
                Err(err) if is_unique_violation(&err) => {
                    return Err(StoreError::Duplicate(record.short_code.clone()));
                }
                Err(err) => return Err(map_sqlx_error(err)),
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(count = records.len(), "committed insert batch");
        Ok(())
    }

    async fn lookup(&self, code: &ShortCode) -> Result<Lookup> {
        let row = sqlx::query(
            r#"
            SELECT url, deleted
            FROM urls
            WHERE short_url = $1
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            trace!(code = %code, "short code not in postgres");
            return Ok(Lookup::Missing);
        };

        let url: String = row.try_get("url").map_err(map_sqlx_error)?;
        let deleted: Option<bool> = row.try_get("deleted").map_err(map_sqlx_error)?;

        if deleted.unwrap_or(false) {
            Ok(Lookup::Deleted)
        } else {
            Ok(Lookup::Active(url))
        }
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<UserUrl>> {
        let rows = sqlx::query(
            r#"
            SELECT short_url, url
            FROM urls
            WHERE user_id = $1
            ORDER BY short_url
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                let short_url: String = row.try_get("short_url").map_err(map_sqlx_error)?;
                let url: String = row.try_get("url").map_err(map_sqlx_error)?;
                Ok(UserUrl {
                    short_code: ShortCode::new_unchecked(short_url),
                    original_url: url,
                })
            })
            .collect()
    }

    async fn stats(&self) -> Result<Stats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(DISTINCT url) AS urls, COUNT(DISTINCT user_id) AS users
            FROM urls
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let urls: i64 = row.try_get("urls").map_err(map_sqlx_error)?;
        let users: i64 = row.try_get("users").map_err(map_sqlx_error)?;

        Ok(Stats {
            urls: count_to_u64(urls)?,
            users: count_to_u64(users)?,
        })
    }

    async fn mark_deleted(&self, batch: &[DeleteRequest]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for request in batch {
            sqlx::query(
                r#"
                UPDATE urls
                SET deleted = true
                WHERE user_id = $1
                  AND short_url = $2
                "#,
            )
            .bind(&request.user_id)
            .bind(request.short_code.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(count = batch.len(), "committed tombstone batch");
        Ok(())
    }

    async fn ping(&self) -> bool {
        match self.pool.acquire().await {
            Ok(mut conn) => conn.ping().await.is_ok(),
            Err(err) => {
                debug!(error = %err, "postgres ping failed to acquire a connection");
                false
            }
        }
    }

    fn is_attached(&self) -> bool {
        true
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
