/// SQLite-backed keyed store
///
/// One row per session key in `session_state`. Uses WAL mode so readers never
/// block the writer, and parameterized queries throughout.
use async_trait::async_trait;
use sdk::errors::EngineError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use super::{KeyedStore, Result};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and run migrations
    ///
    /// This will:
    /// 1. Create the parent directory and database file if missing
    /// 2. Enable WAL mode
    /// 3. Run migrations to set up the schema
    pub async fn open(db_path: &Path) -> std::result::Result<Self, EngineError> {
        info!("Opening session store at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| EngineError::StoreUnavailable(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                EngineError::StoreUnavailable(format!("Failed to connect to database: {}", e))
            })?;

        debug!("Session store connection established");

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Run database migrations
    ///
    /// Migrations are idempotent and can be run multiple times safely.
    async fn run_migrations(&self) -> std::result::Result<(), EngineError> {
        sqlx::raw_sql(include_str!("../../migrations/001_initial.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                EngineError::StoreUnavailable(format!(
                    "Failed to execute migration 001_initial.sql: {}",
                    e
                ))
            })?;

        debug!("Session store migrations completed");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Flush the WAL to disk
    pub async fn flush_wal(&self) -> Result<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;

        debug!("WAL flushed successfully");
        Ok(())
    }
}

#[async_trait]
impl KeyedStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let blob: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT blob FROM session_state WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(blob)
    }

    async fn put(&self, key: &str, blob: Vec<u8>) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();

        sqlx::query(
            "INSERT INTO session_state (key, blob, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET blob = excluded.blob, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(blob)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let keys: Vec<String> = sqlx::query_scalar("SELECT key FROM session_state ORDER BY key")
            .fetch_all(&self.pool)
            .await?;

        Ok(keys)
    }

    /// Flushes the WAL and closes all connections in the pool.
    async fn close(&self) -> Result<()> {
        info!("Closing session store");
        self.flush_wal().await?;
        self.pool.close().await;
        Ok(())
    }
}
