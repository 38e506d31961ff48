//! Warehouse load stage.

use starsync_sdk::connector::WarehouseSink;
use starsync_types::star::{LoadSummary, StarBatch};

use crate::errors::PipelineError;
use crate::retry::with_retry;

/// Write one star batch.
///
/// The sink writes all four tables in a single transaction, so a failure
/// that reports itself safe to retry left nothing behind and is retried.
/// An empty batch writes nothing.
///
/// # Errors
///
/// `LoadFailure` once retries are spent or on a non-retryable error.
pub async fn load<W: WarehouseSink>(
    sink: &W,
    batch: &StarBatch,
    max_retries: u32,
) -> Result<LoadSummary, PipelineError> {
    if batch.is_empty() {
        tracing::info!("Nothing to load: every extracted transaction was dropped");
        return Ok(LoadSummary::default());
    }

    let summary = with_retry("load", max_retries, || sink.load(batch))
        .await
        .map_err(PipelineError::LoadFailure)?;

    tracing::info!(
        employees = summary.employees,
        categories = summary.categories,
        calendar = summary.calendar,
        facts = summary.facts,
        "Loaded star batch"
    );
    Ok(summary)
}
