//! Incremental sales-to-star-schema pipeline orchestration.
//!
//! Each stage is a typed function over the previous stage's output; the
//! [`orchestrator`] composes them in order and owns the watermark ordering.

pub mod checkpoint;
pub mod config;
pub mod enrich;
pub mod errors;
pub mod execution;
pub mod extract;
pub mod load;
pub mod orchestrator;
pub mod reference;
pub mod resolve;
pub mod result;
pub(crate) mod retry;
pub mod transform;

pub use errors::{PipelineError, Upstream};
pub use execution::{DryRunResult, ExecutionOptions, PipelineOutcome};
pub use orchestrator::{check_pipeline, run_pipeline, Connectors};
pub use result::{CheckResult, PipelineResult};
