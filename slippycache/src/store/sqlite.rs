//! SQLite-backed metadata store.
//!
//! One table, one row per cached tile:
//!
//! ```text
//! tiles(partition TEXT, id TEXT, zoom, x, y, source, file_path,
//!       file_size_bytes, cached_at, last_accessed_at, access_count,
//!       PRIMARY KEY (partition, id))
//! ```
//!
//! Timestamps are stored as Unix milliseconds so ordering is numeric.
//! Every call runs on the blocking pool behind a single connection mutex,
//! which gives the single-writer model the cache relies on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::record::{Partition, TileRecord};
use super::traits::{StoreError, TileMetadataStore};
use crate::coord::TileCoord;
use crate::provider::BoxFuture;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tiles (
    partition        TEXT    NOT NULL,
    id               TEXT    NOT NULL,
    zoom             INTEGER NOT NULL,
    x                INTEGER NOT NULL,
    y                INTEGER NOT NULL,
    source           TEXT    NOT NULL,
    file_path        TEXT    NOT NULL,
    file_size_bytes  INTEGER NOT NULL,
    cached_at        INTEGER NOT NULL,
    last_accessed_at INTEGER NOT NULL,
    access_count     INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (partition, id)
);
CREATE INDEX IF NOT EXISTS idx_tiles_lru ON tiles (partition, last_accessed_at);
";

const SELECT_COLUMNS: &str = "partition, id, zoom, x, y, source, file_path, \
     file_size_bytes, cached_at, last_accessed_at, access_count";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata store backed by a SQLite database file.
#[derive(Clone)]
pub struct SqliteTileStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteTileStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %path.display(), "Opened tile metadata store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database (tests, ephemeral caches).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Database file location, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run a closure against the connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
        .map_err(StoreError::from)
    }
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(idx: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {}", millis).into(),
        )
    })
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TileRecord> {
    let partition: String = row.get(0)?;
    let partition = partition
        .parse::<Partition>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into()))?;
    let file_path: String = row.get(6)?;
    let size: i64 = row.get(7)?;
    let access_count: i64 = row.get(10)?;

    Ok(TileRecord {
        partition,
        id: row.get(1)?,
        zoom: row.get(2)?,
        x: row.get(3)?,
        y: row.get(4)?,
        source: row.get(5)?,
        file_path: PathBuf::from(file_path),
        file_size_bytes: size.max(0) as u64,
        cached_at: from_millis(8, row.get(8)?)?,
        last_accessed_at: from_millis(9, row.get(9)?)?,
        access_count: access_count.max(0) as u64,
    })
}

impl TileMetadataStore for SqliteTileStore {
    fn get(
        &self,
        partition: &Partition,
        tile: TileCoord,
    ) -> BoxFuture<'_, Result<Option<TileRecord>, StoreError>> {
        let partition = partition.key();
        let id = tile.id();
        Box::pin(self.run(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM tiles WHERE partition = ?1 AND id = ?2",
                    SELECT_COLUMNS
                ),
                params![partition, id],
                row_to_record,
            )
            .optional()
        }))
    }

    fn upsert(&self, record: TileRecord) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(self.run(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO tiles (partition, id, zoom, x, y, source, file_path, \
                 file_size_bytes, cached_at, last_accessed_at, access_count) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.partition.key(),
                    record.id,
                    record.zoom,
                    record.x,
                    record.y,
                    record.source,
                    record.file_path.to_string_lossy(),
                    record.file_size_bytes as i64,
                    to_millis(record.cached_at),
                    to_millis(record.last_accessed_at),
                    record.access_count as i64,
                ],
            )?;
            Ok(())
        }))
    }

    fn touch(
        &self,
        partition: &Partition,
        id: &str,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<bool, StoreError>> {
        let partition = partition.key();
        let id = id.to_string();
        Box::pin(self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE tiles SET last_accessed_at = ?1, access_count = access_count + 1 \
                 WHERE partition = ?2 AND id = ?3",
                params![to_millis(at), partition, id],
            )?;
            Ok(changed > 0)
        }))
    }

    fn total_size(&self, partition: &Partition) -> BoxFuture<'_, Result<u64, StoreError>> {
        let partition = partition.key();
        Box::pin(self.run(move |conn| {
            let total: i64 = conn.query_row(
                "SELECT COALESCE(SUM(file_size_bytes), 0) FROM tiles WHERE partition = ?1",
                params![partition],
                |row| row.get(0),
            )?;
            Ok(total.max(0) as u64)
        }))
    }

    fn count(&self, partition: &Partition) -> BoxFuture<'_, Result<u64, StoreError>> {
        let partition = partition.key();
        Box::pin(self.run(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM tiles WHERE partition = ?1",
                params![partition],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        }))
    }

    fn oldest_first(
        &self,
        partition: &Partition,
        limit: Option<usize>,
    ) -> BoxFuture<'_, Result<Vec<TileRecord>, StoreError>> {
        let partition = partition.key();
        // SQLite treats a negative LIMIT as "no limit"
        let limit = limit.map_or(-1, |n| n as i64);
        Box::pin(self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tiles WHERE partition = ?1 \
                 ORDER BY last_accessed_at ASC, id ASC LIMIT ?2",
                SELECT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![partition, limit], row_to_record)?;
            rows.collect()
        }))
    }

    fn delete(&self, partition: &Partition, id: &str) -> BoxFuture<'_, Result<bool, StoreError>> {
        let partition = partition.key();
        let id = id.to_string();
        Box::pin(self.run(move |conn| {
            let changed = conn.execute(
                "DELETE FROM tiles WHERE partition = ?1 AND id = ?2",
                params![partition, id],
            )?;
            Ok(changed > 0)
        }))
    }

    fn clear(&self, partition: &Partition) -> BoxFuture<'_, Result<Vec<TileRecord>, StoreError>> {
        let partition = partition.key();
        Box::pin(self.run(move |conn| {
            let tx = conn.transaction()?;
            let removed = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {} FROM tiles WHERE partition = ?1",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt.query_map(params![partition], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            tx.execute("DELETE FROM tiles WHERE partition = ?1", params![partition])?;
            tx.commit()?;
            Ok(removed)
        }))
    }

    fn partitions(&self) -> BoxFuture<'_, Result<Vec<Partition>, StoreError>> {
        Box::pin(self.run(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT partition FROM tiles ORDER BY partition")?;
            let rows = stmt.query_map([], |row| {
                let key: String = row.get(0)?;
                key.parse::<Partition>()
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into()))
            })?;
            rows.collect()
        }))
    }
}
