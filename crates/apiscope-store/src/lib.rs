//! SQLite-backed endpoint cache.
//!
//! Persists finalized endpoint lists between the scan call and later
//! documentation retrieval, keyed by an opaque session key (in
//! practice `endpoints:<client-ip>`). The store owns its connection
//! handle; there is no shared global connection state.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use apiscope_capture::EndpointRecord;
use apiscope_core::{Error, Result};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS endpoint_sets (
    session_key   TEXT PRIMARY KEY,
    endpoints_json TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
";

/// Session-keyed endpoint list store.
pub struct EndpointStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl EndpointStore {
    /// Open or create the store.
    ///
    /// `db_dir` is the directory (e.g., `data/endpoints/`); the file
    /// will be `db_dir/apiscope.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("apiscope.db");

        let conn = Connection::open(&db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        info!(
            "EndpointStore initialized: {} sessions, path={}",
            store.session_count()?,
            store.db_path.display()
        );

        Ok(store)
    }

    /// Upsert the endpoint list for a session key.
    pub fn store(&self, session_key: &str, endpoints: &[EndpointRecord]) -> Result<()> {
        let json = serde_json::to_string(endpoints)?;
        let now = chrono::Utc::now().to_rfc3339();

        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO endpoint_sets (session_key, endpoints_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(session_key) DO UPDATE SET
                 endpoints_json = excluded.endpoints_json,
                 updated_at = excluded.updated_at",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![session_key, json, now])
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Retrieve the endpoint list for a session key, if any.
    pub fn retrieve(&self, session_key: &str) -> Result<Option<Vec<EndpointRecord>>> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .prepare_cached("SELECT endpoints_json FROM endpoint_sets WHERE session_key = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![session_key], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Number of stored sessions.
    pub fn session_count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM endpoint_sets", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count as usize)
    }
}
