//! # SQLite Blob Store
//!
//! Keeps every blob in a single `blobs` table keyed by storage key. Useful on
//! mobile where the app already ships a SQLite database.

use std::sync::Mutex;

use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};

use crate::storage::BlobStore;
use crate::{BacktrackError, Result};

fn sql_err(err: rusqlite::Error) -> BacktrackError {
    BacktrackError::Storage {
        message: err.to_string(),
    }
}

/// Blob store backed by a SQLite database.
pub struct SqliteStore {
    /// Database connection
    db: Mutex<Connection>,
    /// Database path (":memory:" for in-memory databases)
    db_path: String,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path`.
    pub fn open(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path).map_err(sql_err)?;
        Self::init_schema(&db)?;
        info!("[SqliteStore] Opened {}", db_path);

        Ok(Self {
            db: Mutex::new(db),
            db_path: db_path.to_string(),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS blobs (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at INTEGER DEFAULT (strftime('%s', 'now'))
            );
            "#,
        )
        .map_err(sql_err)
    }

    fn with_db<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<R>,
    {
        let db = self.db.lock().map_err(|_| BacktrackError::Storage {
            message: "sqlite store lock poisoned".to_string(),
        })?;
        f(&db).map_err(sql_err)
    }
}

impl BlobStore for SqliteStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.with_db(|db| {
            db.query_row(
                "SELECT value FROM blobs WHERE key = ?",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
        })
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        debug!("[SqliteStore] Writing {} bytes to '{}'", value.len(), key);
        self.with_db(|db| {
            db.execute(
                "INSERT OR REPLACE INTO blobs (key, value, updated_at)
                 VALUES (?, ?, strftime('%s', 'now'))",
                params![key, value],
            )
            .map(|_| ())
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.with_db(|db| {
            db.execute("DELETE FROM blobs WHERE key = ?", params![key])
                .map(|_| ())
        })
    }
}
