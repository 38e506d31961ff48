//! Operator access to the persisted watermark.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use starsync_types::state::{PipelineId, Watermark};

use crate::commands::{load_pipeline, with_checkpoint_store};

/// Print the persisted watermark.
pub async fn show(pipeline_path: &Path) -> Result<()> {
    let config = load_pipeline(pipeline_path)?;
    let pipeline = PipelineId::new(config.pipeline.clone());

    let watermark = with_checkpoint_store(&config, |state| async move {
        tokio::task::spawn_blocking(move || state.read(&pipeline))
            .await
            .map_err(|e| anyhow!("read watermark task panicked: {e}"))?
            .context("Failed to read watermark")
    })
    .await??;
    if watermark.is_unset() {
        println!("{}: {watermark} (unset)", config.pipeline);
    } else {
        println!("{}: {watermark}", config.pipeline);
    }
    Ok(())
}

/// Overwrite the persisted watermark. Lowering it re-extracts rows on the
/// next run; raising it skips them.
pub async fn set(pipeline_path: &Path, value: i64) -> Result<()> {
    if value < 0 {
        anyhow::bail!("Watermark must be a non-negative id_venda, got {value}");
    }
    let config = load_pipeline(pipeline_path)?;
    let pipeline = PipelineId::new(config.pipeline.clone());
    let next = Watermark::new(value);

    let previous = with_checkpoint_store(&config, |state| async move {
        tokio::task::spawn_blocking(move || {
            let previous = state.read(&pipeline)?;
            state.write(&pipeline, next)?;
            Ok::<_, starsync_state::StateError>(previous)
        })
        .await
        .map_err(|e| anyhow!("write watermark task panicked: {e}"))?
        .context("Failed to set watermark")
    })
    .await??;
    tracing::warn!(
        pipeline = config.pipeline,
        from = %previous,
        to = %next,
        "Watermark overwritten by operator"
    );
    println!("{}: {previous} -> {next}", config.pipeline);
    Ok(())
}
