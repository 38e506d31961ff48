use std::path::Path;

use anyhow::{Context, Result};
use starsync_engine::result::PipelineResult;
use starsync_engine::{run_pipeline, ExecutionOptions, PipelineOutcome};

use crate::commands::{load_pipeline, with_checkpoint_store};
use crate::connectors;

/// Execute the `run` command: parse, validate, connect, and run once.
pub async fn execute(pipeline_path: &Path, dry_run: bool) -> Result<()> {
    let config = load_pipeline(pipeline_path)?;
    tracing::info!(
        pipeline = config.pipeline,
        on_join_miss = ?config.policy.on_join_miss,
        lookup_concurrency = config.resources.lookup_concurrency,
        "Pipeline validated"
    );

    let connectors = connectors::connect(&config).await?;
    let options = ExecutionOptions { dry_run };

    let outcome = with_checkpoint_store(&config, |state| {
        run_pipeline(&config, &connectors, state, &options)
    })
    .await?
    .with_context(|| format!("Pipeline '{}' failed", config.pipeline))?;

    match outcome {
        PipelineOutcome::Loaded(result) => print_loaded(&result),
        PipelineOutcome::NoNewData { watermark } => {
            println!(
                "Pipeline '{}': no new data since watermark {watermark}.",
                config.pipeline
            );
        }
        PipelineOutcome::DryRun(preview) => {
            println!(
                "Dry run of '{}': {} rows above watermark {}, {} join miss(es); nothing written.",
                config.pipeline,
                preview.rows_extracted,
                preview.watermark,
                preview.join_misses.len()
            );
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
    }
    Ok(())
}

fn print_loaded(result: &PipelineResult) {
    println!("Pipeline '{}' completed successfully.", result.pipeline);
    println!("  Rows extracted:  {}", result.rows_extracted);
    println!("  Join misses:     {}", result.join_misses);
    println!("  funcionarios:    {}", result.loaded.employees);
    println!("  categoria:       {}", result.loaded.categories);
    println!("  calendario:      {}", result.loaded.calendar);
    println!("  vendas:          {}", result.loaded.facts);
    println!(
        "  Watermark:       {} -> {}",
        result.watermark_before, result.watermark_after
    );
    println!("  Duration:        {:.2}s", result.duration_secs);
    println!("    Extract:       {:.3}s", result.timings.extract_secs);
    println!("    Reference:     {:.3}s", result.timings.reference_secs);
    println!("    Lookup:        {:.3}s", result.timings.lookup_secs);
    println!("    Transform:     {:.3}s", result.timings.transform_secs);
    println!("    Load:          {:.3}s", result.timings.load_secs);
}
