//! `SQLite`-backed implementation of [`CheckpointStore`].
//!
//! Uses a single `Mutex<Connection>` for thread safety.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use starsync_types::star::JoinMiss;
use starsync_types::state::{PipelineId, RunStats, RunStatus, Watermark};

use crate::error::{self, StateError};
use crate::store::CheckpointStore;

/// Idempotent DDL for state tables.
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS watermarks (
    pipeline TEXT PRIMARY KEY,
    watermark INTEGER NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS sync_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pipeline TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL DEFAULT (datetime('now')),
    finished_at TEXT,
    rows_extracted INTEGER DEFAULT 0,
    facts_loaded INTEGER DEFAULT 0,
    join_misses INTEGER DEFAULT 0,
    watermark_before INTEGER,
    watermark_after INTEGER,
    error_message TEXT
);

CREATE TABLE IF NOT EXISTS join_misses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pipeline TEXT NOT NULL,
    run_id INTEGER NOT NULL REFERENCES sync_runs(id),
    id_venda INTEGER NOT NULL,
    id_funcionario INTEGER NOT NULL,
    id_categoria INTEGER NOT NULL,
    missing_key TEXT NOT NULL,
    recorded_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_join_misses_pipeline_run ON join_misses (pipeline, run_id);
";

/// `SQLite`-backed checkpoint storage.
///
/// Create with [`SqliteCheckpointStore::open`] for file-backed persistence
/// or [`SqliteCheckpointStore::in_memory`] for tests.
pub struct SqliteCheckpointStore {
    conn: Mutex<Connection>,
}

impl SqliteCheckpointStore {
    /// Open or create a `SQLite` state database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the directory can't be created,
    /// or [`StateError::Backend`] if the database can't be opened.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(StateError::backend)?;
        Self::init(conn)
    }

    /// Create an in-memory `SQLite` store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Backend`] if the in-memory database can't
    /// be initialized.
    pub fn in_memory() -> error::Result<Self> {
        let conn = Connection::open_in_memory().map_err(StateError::backend)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> error::Result<Self> {
        conn.execute_batch(CREATE_TABLES)
            .map_err(StateError::backend)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock_conn(&self) -> error::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StateError::LockPoisoned)
    }

    #[cfg(test)]
    fn get_run_row(
        &self,
        run_id: i64,
    ) -> error::Result<(String, i64, Option<i64>, Option<String>, Option<String>)> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT status, facts_loaded, watermark_after, finished_at, error_message \
             FROM sync_runs WHERE id = ?1",
            [run_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .map_err(StateError::backend)
    }

    #[cfg(test)]
    fn count_join_misses(&self, pipeline: &PipelineId, run_id: i64) -> error::Result<i64> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT COUNT(*) FROM join_misses WHERE pipeline = ?1 AND run_id = ?2",
            rusqlite::params![pipeline.as_str(), run_id],
            |row| row.get(0),
        )
        .map_err(StateError::backend)
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    fn read(&self, pipeline: &PipelineId) -> error::Result<Watermark> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT watermark FROM watermarks WHERE pipeline = ?1",
            [pipeline.as_str()],
            |row| row.get::<_, i64>(0),
        );

        match result {
            Ok(value) => Ok(Watermark::new(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(Watermark::UNSET),
            Err(e) => Err(StateError::backend(e)),
        }
    }

    fn write(&self, pipeline: &PipelineId, watermark: Watermark) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO watermarks (pipeline, watermark, updated_at) \
             VALUES (?1, ?2, datetime('now')) \
             ON CONFLICT(pipeline) \
             DO UPDATE SET watermark = ?2, updated_at = datetime('now')",
            rusqlite::params![pipeline.as_str(), watermark.value()],
        )
        .map_err(StateError::backend)?;
        Ok(())
    }

    fn start_run(&self, pipeline: &PipelineId) -> error::Result<Option<i64>> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO sync_runs (pipeline, status) VALUES (?1, ?2)",
            rusqlite::params![pipeline.as_str(), RunStatus::Running.as_str()],
        )
        .map_err(StateError::backend)?;
        Ok(Some(conn.last_insert_rowid()))
    }

    #[allow(clippy::cast_possible_wrap)]
    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE sync_runs SET status = ?1, finished_at = datetime('now'), \
             rows_extracted = ?2, facts_loaded = ?3, join_misses = ?4, \
             watermark_before = ?5, watermark_after = ?6, error_message = ?7 \
             WHERE id = ?8",
            rusqlite::params![
                status.as_str(),
                stats.rows_extracted as i64,
                stats.facts_loaded as i64,
                stats.join_misses as i64,
                stats.watermark_before.value(),
                stats.watermark_after.map(Watermark::value),
                stats.error_message,
                run_id,
            ],
        )
        .map_err(StateError::backend)?;
        Ok(())
    }

    fn record_join_misses(
        &self,
        pipeline: &PipelineId,
        run_id: i64,
        misses: &[JoinMiss],
    ) -> error::Result<u64> {
        if misses.is_empty() {
            return Ok(0);
        }

        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StateError::backend_context("record_join_misses: begin tx", e))?;
        let mut stmt = tx
            .prepare(
                "INSERT INTO join_misses \
                 (pipeline, run_id, id_venda, id_funcionario, id_categoria, missing_key) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .map_err(|e| StateError::backend_context("record_join_misses: prepare", e))?;

        let mut count = 0u64;
        for miss in misses {
            stmt.execute(rusqlite::params![
                pipeline.as_str(),
                run_id,
                miss.id_venda,
                miss.id_funcionario,
                miss.id_categoria,
                miss.missing.as_str(),
            ])
            .map_err(|e| StateError::backend_context("record_join_misses: execute", e))?;
            count += 1;
        }
        drop(stmt);
        tx.commit()
            .map_err(|e| StateError::backend_context("record_join_misses: commit", e))?;

        Ok(count)
    }
}
