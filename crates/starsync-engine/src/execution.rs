//! Execution mode types for pipeline runs.

use serde::Serialize;
use starsync_types::star::{JoinMiss, StarBatch};
use starsync_types::state::Watermark;

use crate::result::PipelineResult;

/// Runtime execution options (not part of pipeline YAML config).
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Run every stage except load and watermark advance.
    pub dry_run: bool,
}

/// What a dry run would have loaded.
#[derive(Debug, Clone, Serialize)]
pub struct DryRunResult {
    pub watermark: Watermark,
    pub rows_extracted: u64,
    pub join_misses: Vec<JoinMiss>,
    pub batch: StarBatch,
    pub duration_secs: f64,
}

/// Every way a run can finish without a fault.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Loaded(PipelineResult),
    /// Nothing above the watermark; the watermark is untouched.
    NoNewData { watermark: Watermark },
    DryRun(DryRunResult),
}
