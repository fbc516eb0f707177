//! Key-value storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::KeyValueStore,
    time::{Clock, SystemClock},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS kv_store (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        expires_at INTEGER,
        updated_at INTEGER NOT NULL
    )
"#;

/// SQLite-backed key-value store
///
/// The durable backend for desktop hosts:
/// - Survives restarts
/// - Per-entry TTL, enforced on read
/// - Last write wins
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

fn storage_error(context: &str, e: sqlx::Error) -> BridgeError {
    BridgeError::Storage(format!("{}: {}", context, e))
}

impl SqliteKeyValueStore {
    /// Open (or create) a store at the given database path
    pub async fn open(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(BridgeError::Io)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| storage_error("Failed to connect to DB", e))?;

        let store = Self::from_pool(pool).await?;
        debug!(path = ?db_path, "Initialized key-value store");
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    ///
    /// Limited to one connection: every SQLite in-memory connection is its
    /// own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| storage_error("Failed to connect to DB", e))?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| storage_error("Failed to create table", e))?;

        Ok(Self {
            pool,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source used for TTL checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn now_millis(&self) -> i64 {
        self.clock.unix_timestamp_millis()
    }

    /// Delete every expired row, returning how many were removed
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM kv_store WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(self.now_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to purge expired keys", e))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn is_available(&self) -> bool {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "SQLite store unavailable");
                false
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value, expires_at FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to get key", e))?;

        match row {
            Some(row) => {
                let value: String = row.get(0);
                let expires_at: Option<i64> = row.get(1);

                if matches!(expires_at, Some(at) if at <= self.now_millis()) {
                    debug!(key = key, "Key expired");
                    self.delete(key).await?;
                    return Ok(None);
                }

                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let now = self.now_millis();
        let expires_at = ttl.map(|ttl| now.saturating_add(ttl.as_millis() as i64));

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, expires_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to set key", e))?;

        debug!(key = key, "Stored key");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to delete key", e))?;

        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT key FROM kv_store WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to list keys", e))?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }
}
