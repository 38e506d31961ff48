//! Pipeline execution result types and timing breakdowns.

use serde::Serialize;
use starsync_types::error::ValidationResult;
use starsync_types::star::LoadSummary;
use starsync_types::state::Watermark;

/// Wall-clock seconds spent in each stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageTimings {
    pub extract_secs: f64,
    pub reference_secs: f64,
    pub lookup_secs: f64,
    pub transform_secs: f64,
    pub load_secs: f64,
}

/// Result of a run that loaded a batch.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub pipeline: String,
    pub rows_extracted: u64,
    /// Transactions dropped by the join under the drop policy.
    pub join_misses: u64,
    pub loaded: LoadSummary,
    pub watermark_before: Watermark,
    pub watermark_after: Watermark,
    pub timings: StageTimings,
    pub duration_secs: f64,
}

/// Result of `check_pipeline`.
#[derive(Debug)]
pub struct CheckResult {
    pub source_validation: ValidationResult,
    pub destination_validation: ValidationResult,
    /// Current watermark when the checkpoint store is readable.
    pub watermark: Option<Watermark>,
}

impl CheckResult {
    #[must_use]
    pub fn state_ok(&self) -> bool {
        self.watermark.is_some()
    }
}
