//! Pipeline error model and retry backoff policy helpers.

use std::time::Duration;

use starsync_types::error::{BackoffClass, ConnectorError};
use starsync_types::star::JoinMiss;
use starsync_types::state::Watermark;

const BACKOFF_NORMAL_BASE_MS: u64 = 1_000;
const BACKOFF_SLOW_BASE_MS: u64 = 5_000;
const BACKOFF_MAX_MS: u64 = 60_000;

/// Join misses included in the error message.
const JOIN_MISS_SAMPLE: usize = 5;

/// Remote reference dependency that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    ReferenceFile,
    NameLookup,
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::ReferenceFile => "reference file",
            Self::NameLookup => "name lookup",
        })
    }
}

/// Every fault that aborts a run.
///
/// "No new data" is not here: it is a successful
/// [`PipelineOutcome::NoNewData`](crate::execution::PipelineOutcome::NoNewData).
#[derive(Debug)]
pub enum PipelineError {
    /// Extraction was empty but the source maximum id differs from the
    /// persisted watermark. Needs an operator; never corrected automatically.
    CheckpointInconsistency {
        watermark: Watermark,
        source_max: Watermark,
    },
    /// Transactions failed to join under the fail-fast policy.
    JoinMiss { misses: Vec<JoinMiss> },
    /// Reference file or name lookup failed after retries.
    UpstreamUnavailable {
        upstream: Upstream,
        error: ConnectorError,
    },
    /// Relational source read failed or returned rows that violate the
    /// watermark filter.
    Extract(ConnectorError),
    /// Warehouse write failed; the watermark was not advanced.
    LoadFailure(ConnectorError),
    /// State backend, config, or task failure.
    Infrastructure(anyhow::Error),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CheckpointInconsistency {
                watermark,
                source_max,
            } => write!(
                f,
                "Checkpoint inconsistency: no rows above watermark {watermark} but source \
                 maximum id is {source_max}; inspect the source and set the watermark explicitly"
            ),
            Self::JoinMiss { misses } => {
                let sample: Vec<String> = misses
                    .iter()
                    .take(JOIN_MISS_SAMPLE)
                    .map(|m| format!("id_venda={} ({})", m.id_venda, m.missing.as_str()))
                    .collect();
                write!(
                    f,
                    "{} transaction(s) did not join against reference data: {}",
                    misses.len(),
                    sample.join(", ")
                )?;
                if misses.len() > JOIN_MISS_SAMPLE {
                    write!(f, ", ...")?;
                }
                Ok(())
            }
            Self::UpstreamUnavailable { upstream, error } => {
                write!(f, "Upstream {upstream} unavailable: {error}")
            }
            Self::Extract(e) => write!(f, "Extract failed: {e}"),
            Self::LoadFailure(e) => write!(f, "Load failed: {e}"),
            Self::Infrastructure(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<anyhow::Error> for PipelineError {
    fn from(e: anyhow::Error) -> Self {
        Self::Infrastructure(e)
    }
}

impl PipelineError {
    /// Short stable name of the fault class, used in logs and run history.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CheckpointInconsistency { .. } => "checkpoint_inconsistency",
            Self::JoinMiss { .. } => "join_miss",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::Extract(_) => "extract",
            Self::LoadFailure(_) => "load_failure",
            Self::Infrastructure(_) => "infrastructure",
        }
    }

    /// Whether resolving this fault requires operator action on the checkpoint.
    #[must_use]
    pub fn is_checkpoint_fault(&self) -> bool {
        matches!(self, Self::CheckpointInconsistency { .. })
    }

    /// Returns the typed connector error behind this fault, if any.
    #[must_use]
    pub(crate) fn as_connector_error(&self) -> Option<&ConnectorError> {
        match self {
            Self::UpstreamUnavailable { error, .. } => Some(error),
            Self::Extract(e) | Self::LoadFailure(e) => Some(e),
            _ => None,
        }
    }
}

/// Compute retry delay based on error hints and attempt number.
pub(crate) fn compute_backoff(err: &ConnectorError, attempt: u32) -> Duration {
    if let Some(ms) = err.retry_after_ms {
        return Duration::from_millis(ms.min(BACKOFF_MAX_MS));
    }

    let base_ms: u64 = match err.backoff_class {
        BackoffClass::Normal => BACKOFF_NORMAL_BASE_MS,
        BackoffClass::Slow => BACKOFF_SLOW_BASE_MS,
    };

    let exp = attempt.saturating_sub(1).min(16);
    let delay_ms = base_ms.saturating_mul(2u64.pow(exp));
    Duration::from_millis(delay_ms.min(BACKOFF_MAX_MS))
}
