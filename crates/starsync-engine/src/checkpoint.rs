//! Watermark and run-history access over the blocking [`CheckpointStore`].
//!
//! Every call runs on the blocking pool; the Postgres backend drives its own
//! runtime and must never run on an async worker thread.

use std::sync::Arc;

use anyhow::anyhow;
use starsync_state::CheckpointStore;
use starsync_types::star::JoinMiss;
use starsync_types::state::{PipelineId, RunStats, RunStatus, Watermark};

use crate::errors::PipelineError;

async fn blocking<T, F>(
    what: &'static str,
    state: &Arc<dyn CheckpointStore>,
    f: F,
) -> Result<T, PipelineError>
where
    T: Send + 'static,
    F: FnOnce(&dyn CheckpointStore) -> starsync_state::error::Result<T> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(state.as_ref()))
        .await
        .map_err(|e| PipelineError::Infrastructure(anyhow!("{what} task panicked: {e}")))?
        .map_err(|e| PipelineError::Infrastructure(anyhow::Error::new(e).context(what)))
}

/// Read the persisted watermark, [`Watermark::UNSET`] on the first run.
///
/// # Errors
///
/// Returns `Infrastructure` if the store is unreadable or corrupt.
pub async fn read_watermark(
    state: &Arc<dyn CheckpointStore>,
    pipeline: &PipelineId,
) -> Result<Watermark, PipelineError> {
    let pipeline = pipeline.clone();
    blocking("read watermark", state, move |s| s.read(&pipeline)).await
}

/// Persist `next` after a confirmed load.
///
/// # Errors
///
/// Refuses to move the watermark below `previous`; otherwise fails only on
/// storage errors.
pub async fn advance_watermark(
    state: &Arc<dyn CheckpointStore>,
    pipeline: &PipelineId,
    previous: Watermark,
    next: Watermark,
) -> Result<Watermark, PipelineError> {
    if next < previous {
        return Err(PipelineError::Infrastructure(anyhow!(
            "refusing to move watermark backwards from {previous} to {next}"
        )));
    }
    if next == previous {
        tracing::debug!(pipeline = pipeline.as_str(), watermark = %next, "Watermark unchanged");
        return Ok(next);
    }

    let pid = pipeline.clone();
    blocking("write watermark", state, move |s| s.write(&pid, next)).await?;
    tracing::info!(
        pipeline = pipeline.as_str(),
        from = %previous,
        to = %next,
        "Watermark advanced"
    );
    Ok(next)
}

pub(crate) async fn start_run(
    state: &Arc<dyn CheckpointStore>,
    pipeline: &PipelineId,
) -> Result<Option<i64>, PipelineError> {
    let pipeline = pipeline.clone();
    blocking("start run", state, move |s| s.start_run(&pipeline)).await
}

pub(crate) async fn complete_run(
    state: &Arc<dyn CheckpointStore>,
    run_id: i64,
    status: RunStatus,
    stats: RunStats,
) -> Result<(), PipelineError> {
    blocking("complete run", state, move |s| {
        s.complete_run(run_id, status, &stats)
    })
    .await
}

/// Persist the join-miss report. Failures are logged, never fatal.
pub(crate) async fn persist_join_misses(
    state: &Arc<dyn CheckpointStore>,
    pipeline: &PipelineId,
    run_id: i64,
    misses: Vec<JoinMiss>,
) {
    if misses.is_empty() {
        return;
    }
    let count = misses.len();
    let pid = pipeline.clone();
    match blocking("record join misses", state, move |s| {
        s.record_join_misses(&pid, run_id, &misses)
    })
    .await
    {
        Ok(stored) => tracing::info!(
            pipeline = pipeline.as_str(),
            run_id,
            join_misses = stored,
            "Persisted join-miss report"
        ),
        Err(e) => tracing::error!(
            pipeline = pipeline.as_str(),
            run_id,
            join_misses = count,
            error = %e,
            "Failed to persist join-miss report"
        ),
    }
}
