//! `PostgreSQL`-backed implementation of [`CheckpointStore`].
//!
//! Uses the sync `postgres` crate with a single `Mutex<Client>`. The engine
//! calls store methods from `spawn_blocking`, never from an async task.

use std::sync::{Mutex, MutexGuard};

use postgres::{Client, NoTls};
use starsync_types::star::JoinMiss;
use starsync_types::state::{PipelineId, RunStats, RunStatus, Watermark};

use crate::error::{self, StateError};
use crate::store::CheckpointStore;

/// Idempotent DDL for state tables (`PostgreSQL` dialect).
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS watermarks (
    pipeline TEXT PRIMARY KEY,
    watermark BIGINT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS sync_runs (
    id BIGSERIAL PRIMARY KEY,
    pipeline TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    finished_at TIMESTAMPTZ,
    rows_extracted BIGINT DEFAULT 0,
    facts_loaded BIGINT DEFAULT 0,
    join_misses BIGINT DEFAULT 0,
    watermark_before BIGINT,
    watermark_after BIGINT,
    error_message TEXT
);

CREATE TABLE IF NOT EXISTS join_misses (
    id BIGSERIAL PRIMARY KEY,
    pipeline TEXT NOT NULL,
    run_id BIGINT NOT NULL REFERENCES sync_runs(id),
    id_venda BIGINT NOT NULL,
    id_funcionario BIGINT NOT NULL,
    id_categoria BIGINT NOT NULL,
    missing_key TEXT NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_join_misses_pipeline_run ON join_misses (pipeline, run_id);
";

/// `PostgreSQL`-backed checkpoint storage.
///
/// Create with [`PostgresCheckpointStore::open`] providing a libpq-style
/// connection string (e.g. `"host=localhost dbname=etl_state user=postgres"`).
pub struct PostgresCheckpointStore {
    client: Mutex<Client>,
}

impl PostgresCheckpointStore {
    /// Connect and initialize state tables.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Backend`] if connection or DDL execution fails.
    pub fn open(connstr: &str) -> error::Result<Self> {
        let mut client = Client::connect(connstr, NoTls).map_err(StateError::backend)?;
        client
            .batch_execute(CREATE_TABLES)
            .map_err(StateError::backend)?;
        Ok(Self {
            client: Mutex::new(client),
        })
    }

    fn lock_client(&self) -> error::Result<MutexGuard<'_, Client>> {
        self.client.lock().map_err(|_| StateError::LockPoisoned)
    }
}

impl CheckpointStore for PostgresCheckpointStore {
    fn read(&self, pipeline: &PipelineId) -> error::Result<Watermark> {
        let mut client = self.lock_client()?;
        let row = client
            .query_opt(
                "SELECT watermark FROM watermarks WHERE pipeline = $1",
                &[&pipeline.as_str()],
            )
            .map_err(StateError::backend)?;
        Ok(row.map_or(Watermark::UNSET, |r| Watermark::new(r.get(0))))
    }

    fn write(&self, pipeline: &PipelineId, watermark: Watermark) -> error::Result<()> {
        let mut client = self.lock_client()?;
        client
            .execute(
                "INSERT INTO watermarks (pipeline, watermark, updated_at) \
                 VALUES ($1, $2, now()) \
                 ON CONFLICT (pipeline) \
                 DO UPDATE SET watermark = EXCLUDED.watermark, updated_at = now()",
                &[&pipeline.as_str(), &watermark.value()],
            )
            .map_err(StateError::backend)?;
        Ok(())
    }

    fn start_run(&self, pipeline: &PipelineId) -> error::Result<Option<i64>> {
        let mut client = self.lock_client()?;
        let row = client
            .query_one(
                "INSERT INTO sync_runs (pipeline, status) VALUES ($1, $2) RETURNING id",
                &[&pipeline.as_str(), &RunStatus::Running.as_str()],
            )
            .map_err(StateError::backend)?;
        Ok(Some(row.get(0)))
    }

    #[allow(clippy::cast_possible_wrap)]
    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()> {
        let mut client = self.lock_client()?;
        client
            .execute(
                "UPDATE sync_runs SET status = $1, finished_at = now(), \
                 rows_extracted = $2, facts_loaded = $3, join_misses = $4, \
                 watermark_before = $5, watermark_after = $6, error_message = $7 \
                 WHERE id = $8",
                &[
                    &status.as_str(),
                    &(stats.rows_extracted as i64),
                    &(stats.facts_loaded as i64),
                    &(stats.join_misses as i64),
                    &stats.watermark_before.value(),
                    &stats.watermark_after.map(Watermark::value),
                    &stats.error_message,
                    &run_id,
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

        let mut client = self.lock_client()?;
        let mut tx = client
            .transaction()
            .map_err(|e| StateError::backend_context("record_join_misses: begin tx", e))?;
        let stmt = tx
            .prepare(
                "INSERT INTO join_misses \
                 (pipeline, run_id, id_venda, id_funcionario, id_categoria, missing_key) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .map_err(|e| StateError::backend_context("record_join_misses: prepare", e))?;

        let mut count = 0u64;
        for miss in misses {
            tx.execute(
                &stmt,
                &[
                    &pipeline.as_str(),
                    &run_id,
                    &miss.id_venda,
                    &miss.id_funcionario,
                    &miss.id_categoria,
                    &miss.missing.as_str(),
                ],
            )
            .map_err(|e| StateError::backend_context("record_join_misses: execute", e))?;
            count += 1;
        }
        tx.commit()
            .map_err(|e| StateError::backend_context("record_join_misses: commit", e))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starsync_types::star::MissingKey;

    fn test_connstr() -> String {
        std::env::var("TEST_POSTGRES_URL").expect("TEST_POSTGRES_URL not set")
    }

    fn clean_tables(client: &mut Client) {
        client
            .batch_execute("DELETE FROM join_misses; DELETE FROM sync_runs; DELETE FROM watermarks;")
            .unwrap();
    }

    #[test]
    #[ignore = "requires TEST_POSTGRES_URL"]
    fn watermark_roundtrip() {
        let store = PostgresCheckpointStore::open(&test_connstr()).unwrap();
        clean_tables(&mut store.lock_client().unwrap());

        let pid = PipelineId::new("pg_test");
        assert_eq!(store.read(&pid).unwrap(), Watermark::UNSET);

        store.write(&pid, Watermark::new(100)).unwrap();
        store.write(&pid, Watermark::new(103)).unwrap();
        assert_eq!(store.read(&pid).unwrap(), Watermark::new(103));
    }

    #[test]
    #[ignore = "requires TEST_POSTGRES_URL"]
    fn run_lifecycle_with_join_misses() {
        let store = PostgresCheckpointStore::open(&test_connstr()).unwrap();
        clean_tables(&mut store.lock_client().unwrap());

        let pid = PipelineId::new("pg_test");
        let run_id = store.start_run(&pid).unwrap().unwrap();
        let inserted = store
            .record_join_misses(
                &pid,
                run_id,
                &[JoinMiss {
                    id_venda: 104,
                    id_funcionario: 3,
                    id_categoria: 99,
                    missing: MissingKey::Category,
                }],
            )
            .unwrap();
        assert_eq!(inserted, 1);

        store
            .complete_run(
                run_id,
                RunStatus::Completed,
                &RunStats {
                    rows_extracted: 4,
                    facts_loaded: 3,
                    join_misses: 1,
                    watermark_before: Watermark::new(100),
                    watermark_after: Some(Watermark::new(104)),
                    error_message: None,
                },
            )
            .unwrap();

        let row = store
            .lock_client()
            .unwrap()
            .query_one(
                "SELECT status, join_misses FROM sync_runs WHERE id = $1",
                &[&run_id],
            )
            .unwrap();
        assert_eq!(row.get::<_, String>(0), "completed");
        assert_eq!(row.get::<_, i64>(1), 1);
    }
}
