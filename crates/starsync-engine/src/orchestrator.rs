//! Pipeline orchestrator: read → extract → fetch → resolve → merge → load →
//! advance, with run history around it.

use std::sync::Arc;
use std::time::Instant;

use starsync_sdk::connector::{NameLookup, ReferenceSource, SalesSource, WarehouseSink};
use starsync_state::CheckpointStore;
use starsync_types::error::{ValidationResult, ValidationStatus};
use starsync_types::star::JoinMiss;
use starsync_types::state::{PipelineId, RunStats, RunStatus, Watermark};

use crate::checkpoint;
use crate::config::types::PipelineConfig;
use crate::enrich;
use crate::errors::PipelineError;
use crate::execution::{DryRunResult, ExecutionOptions, PipelineOutcome};
use crate::extract::{self, Extraction};
use crate::load;
use crate::reference;
use crate::result::{CheckResult, PipelineResult, StageTimings};
use crate::transform;

/// The four external collaborators of one pipeline.
pub struct Connectors<S, R, L, W> {
    pub source: S,
    pub reference: R,
    pub lookup: L,
    pub sink: W,
}

/// Everything `finalize_run` needs besides the outcome.
struct RunReport {
    outcome: PipelineOutcome,
    misses: Vec<JoinMiss>,
}

/// Run the pipeline once.
///
/// The watermark is written only after the sink confirms the load. Every
/// fault aborts the run with the watermark untouched.
///
/// # Errors
///
/// Returns the [`PipelineError`] of the first failing stage.
pub async fn run_pipeline<S, R, L, W>(
    config: &PipelineConfig,
    connectors: &Connectors<S, R, L, W>,
    state: Arc<dyn CheckpointStore>,
    options: &ExecutionOptions,
) -> Result<PipelineOutcome, PipelineError>
where
    S: SalesSource,
    R: ReferenceSource,
    L: NameLookup,
    W: WarehouseSink,
{
    let start = Instant::now();
    let pipeline = PipelineId::new(config.pipeline.clone());

    let watermark = checkpoint::read_watermark(&state, &pipeline).await?;
    tracing::info!(
        pipeline = pipeline.as_str(),
        watermark = %watermark,
        dry_run = options.dry_run,
        "Starting pipeline run"
    );

    let run_id = if options.dry_run {
        None
    } else {
        checkpoint::start_run(&state, &pipeline).await?
    };

    let result =
        execute_stages(config, connectors, &state, &pipeline, watermark, options, start).await;
    finalize_run(&state, &pipeline, run_id, watermark, result).await
}

#[allow(clippy::too_many_lines)]
async fn execute_stages<S, R, L, W>(
    config: &PipelineConfig,
    connectors: &Connectors<S, R, L, W>,
    state: &Arc<dyn CheckpointStore>,
    pipeline: &PipelineId,
    watermark: Watermark,
    options: &ExecutionOptions,
    start: Instant,
) -> Result<RunReport, PipelineError>
where
    S: SalesSource,
    R: ReferenceSource,
    L: NameLookup,
    W: WarehouseSink,
{
    let retries = config.resources.max_retries;
    let mut timings = StageTimings::default();

    let stage = Instant::now();
    let rows = match extract::extract(&connectors.source, watermark, retries).await? {
        Extraction::Batch(rows) => rows,
        Extraction::NoNewData => {
            return Ok(RunReport {
                outcome: PipelineOutcome::NoNewData { watermark },
                misses: Vec::new(),
            });
        }
    };
    timings.extract_secs = stage.elapsed().as_secs_f64();
    let high_watermark = extract::high_watermark(&rows, watermark);

    let stage = Instant::now();
    let categories = reference::fetch_reference(&connectors.reference, retries).await?;
    timings.reference_secs = stage.elapsed().as_secs_f64();

    let stage = Instant::now();
    let ids = enrich::distinct_employee_ids(&rows);
    let resolutions = enrich::resolve_names(
        &connectors.lookup,
        &ids,
        config.resources.lookup_concurrency,
        retries,
    )
    .await;
    let names = enrich::require_resolved(resolutions)?;
    timings.lookup_secs = stage.elapsed().as_secs_f64();

    let stage = Instant::now();
    let merged = transform::apply_join_policy(
        transform::merge(&rows, &categories, &names),
        config.policy.on_join_miss,
    )?;
    let batch = transform::build_star(&merged.merged, high_watermark);
    timings.transform_secs = stage.elapsed().as_secs_f64();
    tracing::info!(
        pipeline = pipeline.as_str(),
        facts = batch.facts.len(),
        employees = batch.employees.len(),
        categories = batch.categories.len(),
        calendar = batch.calendar.len(),
        join_misses = merged.misses.len(),
        "Built star batch"
    );

    #[allow(clippy::cast_possible_truncation)]
    let rows_extracted = rows.len() as u64;

    if options.dry_run {
        return Ok(RunReport {
            outcome: PipelineOutcome::DryRun(DryRunResult {
                watermark,
                rows_extracted,
                join_misses: merged.misses,
                batch,
                duration_secs: start.elapsed().as_secs_f64(),
            }),
            misses: Vec::new(),
        });
    }

    let stage = Instant::now();
    let loaded = load::load(&connectors.sink, &batch, retries).await?;
    timings.load_secs = stage.elapsed().as_secs_f64();

    let watermark_after =
        match checkpoint::advance_watermark(state, pipeline, watermark, batch.high_watermark)
            .await
        {
            Ok(w) => w,
            Err(e) => {
                tracing::error!(
                    pipeline = pipeline.as_str(),
                    loaded_through = %batch.high_watermark,
                    "Batch loaded but watermark write failed; the next run will reload it"
                );
                return Err(e);
            }
        };

    #[allow(clippy::cast_possible_truncation)]
    let join_misses = merged.misses.len() as u64;

    Ok(RunReport {
        outcome: PipelineOutcome::Loaded(PipelineResult {
            pipeline: pipeline.as_str().to_string(),
            rows_extracted,
            join_misses,
            loaded,
            watermark_before: watermark,
            watermark_after,
            timings,
            duration_secs: start.elapsed().as_secs_f64(),
        }),
        misses: merged.misses,
    })
}

async fn finalize_run(
    state: &Arc<dyn CheckpointStore>,
    pipeline: &PipelineId,
    run_id: Option<i64>,
    watermark_before: Watermark,
    result: Result<RunReport, PipelineError>,
) -> Result<PipelineOutcome, PipelineError> {
    let (status, mut stats, misses) = match &result {
        Ok(report) => match &report.outcome {
            PipelineOutcome::Loaded(r) => (
                RunStatus::Completed,
                RunStats {
                    rows_extracted: r.rows_extracted,
                    facts_loaded: r.loaded.facts,
                    join_misses: r.join_misses,
                    watermark_after: Some(r.watermark_after),
                    ..RunStats::default()
                },
                report.misses.clone(),
            ),
            PipelineOutcome::NoNewData { watermark } => (
                RunStatus::NoNewData,
                RunStats {
                    watermark_after: Some(*watermark),
                    ..RunStats::default()
                },
                Vec::new(),
            ),
            PipelineOutcome::DryRun(_) => (RunStatus::Completed, RunStats::default(), Vec::new()),
        },
        Err(err) => {
            tracing::error!(
                pipeline = pipeline.as_str(),
                kind = err.kind(),
                code = err.as_connector_error().map(|e| e.code.as_str()),
                error = %err,
                "Pipeline run failed"
            );
            let misses = match err {
                PipelineError::JoinMiss { misses } => misses.clone(),
                _ => Vec::new(),
            };
            (
                RunStatus::Failed,
                RunStats {
                    error_message: Some(format!("{}: {err}", err.kind())),
                    ..RunStats::default()
                },
                misses,
            )
        }
    };
    stats.watermark_before = watermark_before;

    if let Some(run_id) = run_id {
        checkpoint::persist_join_misses(state, pipeline, run_id, misses).await;
        if let Err(e) = checkpoint::complete_run(state, run_id, status, stats).await {
            tracing::error!(run_id, status = %status, error = %e, "Failed to record run history");
        }
    }

    let report = result?;
    match &report.outcome {
        PipelineOutcome::Loaded(r) => tracing::info!(
            pipeline = pipeline.as_str(),
            facts = r.loaded.facts,
            join_misses = r.join_misses,
            watermark = %r.watermark_after,
            duration_secs = r.duration_secs,
            "Pipeline run completed"
        ),
        PipelineOutcome::NoNewData { watermark } => tracing::info!(
            pipeline = pipeline.as_str(),
            watermark = %watermark,
            "Pipeline run finished: no new data"
        ),
        PipelineOutcome::DryRun(d) => tracing::info!(
            pipeline = pipeline.as_str(),
            facts = d.batch.facts.len(),
            "Dry run finished; nothing loaded"
        ),
    }
    Ok(report.outcome)
}

/// Probe the checkpoint store and both relational connectors.
///
/// Never fails: each check reports its own outcome.
pub async fn check_pipeline<S, R, L, W>(
    config: &PipelineConfig,
    connectors: &Connectors<S, R, L, W>,
    state: Arc<dyn CheckpointStore>,
) -> CheckResult
where
    S: SalesSource,
    W: WarehouseSink,
{
    tracing::info!(pipeline = config.pipeline, "Checking pipeline");
    let pipeline = PipelineId::new(config.pipeline.clone());

    let watermark = match checkpoint::read_watermark(&state, &pipeline).await {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::error!(error = %e, "Checkpoint store check failed");
            None
        }
    };

    let source_validation = connectors
        .source
        .validate()
        .await
        .unwrap_or_else(|e| ValidationResult::failed(e.to_string()));
    let destination_validation = connectors
        .sink
        .validate()
        .await
        .unwrap_or_else(|e| ValidationResult::failed(e.to_string()));

    for (name, v) in [("source", &source_validation), ("destination", &destination_validation)] {
        if v.status == ValidationStatus::Success {
            tracing::info!(connector = name, message = %v.message, "Validation passed");
        } else {
            tracing::warn!(connector = name, message = %v.message, "Validation failed");
        }
    }

    CheckResult {
        source_validation,
        destination_validation,
        watermark,
    }
}
