//! MetadataIndex: durable, ordered key/value index of object records.
//!
//! Backed by a single SQLite table (`metadata`) whose `TEXT` primary key uses
//! BINARY collation, so key order is byte-lexicographic and a prefix scan is a
//! forward range read starting at the prefix. Values are JSON-encoded
//! [`Object`] records. Each write commits its own transaction with
//! `synchronous = FULL`, i.e. it is fsync'd before `put` returns.

use super::error::StoreResult;
use crate::models::object::Object;
use futures::TryStreamExt;
use sqlx::{
    ConnectOptions, Row, SqlitePool,
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
};
use std::{path::Path, time::Duration};
use tokio::fs;
use tracing::{info, warn};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const INDEX_FILE: &str = "metadata.db";

/// Handle to the on-disk index. Open once at startup, close once at shutdown;
/// every call made after [`MetadataIndex::close`] fails.
#[derive(Debug)]
pub struct MetadataIndex {
    pool: SqlitePool,
}

impl MetadataIndex {
    /// Open or create the index inside `dir`.
    ///
    /// `verbose` only controls whether the engine logs every statement.
    pub async fn open(dir: impl AsRef<Path>, verbose: bool) -> StoreResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;

        let mut options = SqliteConnectOptions::new()
            .filename(dir.join(INDEX_FILE))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_secs(5));
        if !verbose {
            options = options.disable_statement_logging();
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        MIGRATOR.run(&pool).await?;

        info!("opened metadata index at {}", dir.display());
        Ok(Self { pool })
    }

    /// Insert or replace the record stored under `key`.
    pub async fn put(&self, key: &str, object: &Object) -> StoreResult<()> {
        let value = serde_json::to_string(object)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO metadata (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Point lookup. A missing key is `Ok(None)`, never an error.
    pub async fn get(&self, key: &str) -> StoreResult<Option<Object>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match value {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    /// Remove the record under `key`. Removing a missing key succeeds.
    pub async fn del(&self, key: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM metadata WHERE key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// All records whose key starts with `prefix`, in byte order of the key.
    ///
    /// Records that no longer decode are logged and skipped.
    pub async fn list_by_prefix(&self, prefix: &str) -> StoreResult<Vec<Object>> {
        let mut rows = sqlx::query("SELECT key, value FROM metadata WHERE key >= ? ORDER BY key ASC")
            .bind(prefix)
            .fetch(&self.pool);

        let mut out = Vec::new();
        while let Some(row) = rows.try_next().await? {
            let key: String = row.try_get("key")?;
            if !key.starts_with(prefix) {
                break;
            }

            let value: String = row.try_get("value")?;
            match serde_json::from_str::<Object>(&value) {
                Ok(object) => out.push(object),
                Err(err) => warn!("skipping undecodable record {}: {}", key, err),
            }
        }

        Ok(out)
    }

    /// Cheap liveness query used by the readiness probe.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    /// Wait for in-flight queries, then release every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("closed metadata index");
    }
}
