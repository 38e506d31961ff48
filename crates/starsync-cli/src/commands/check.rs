use std::path::Path;

use anyhow::Result;
use starsync_engine::check_pipeline;
use starsync_types::error::{ValidationResult, ValidationStatus};

use crate::commands::{load_pipeline, with_checkpoint_store};
use crate::connectors::{self, ConnectorConfigs};

/// Execute the `check` command: validate config, state backend and connectivity.
pub async fn execute(pipeline_path: &Path) -> Result<()> {
    let config = load_pipeline(pipeline_path)?;
    println!("Pipeline structure: OK");

    ConnectorConfigs::from_pipeline(&config)?;
    println!("Connector configs:  OK");

    let connectors = connectors::connect(&config).await?;
    let result = with_checkpoint_store(&config, |state| {
        check_pipeline(&config, &connectors, state)
    })
    .await?;

    print_validation("Source", &result.source_validation);
    print_validation("Destination", &result.destination_validation);
    match result.watermark {
        Some(w) => println!("{:19} OK (watermark {w})", "State backend:"),
        None => println!("{:19} FAILED", "State backend:"),
    }

    let source_ok = result.source_validation.status == ValidationStatus::Success;
    let dest_ok = result.destination_validation.status == ValidationStatus::Success;
    if source_ok && dest_ok && result.state_ok() {
        println!("\nAll checks passed.");
        Ok(())
    } else {
        anyhow::bail!("One or more checks failed")
    }
}

fn print_validation(label: &str, result: &ValidationResult) {
    let status = match result.status {
        ValidationStatus::Success => "OK",
        ValidationStatus::Failed => "FAILED",
    };
    println!("{:19} {}", format!("{label}:"), status);
    if result.status != ValidationStatus::Success {
        println!("  {}", result.message);
    }
}
