mod commands;
mod connectors;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use starsync_engine::PipelineError;

const EXIT_FAILURE: u8 = 1;
/// A checkpoint the operator has to resolve.
const EXIT_CHECKPOINT_FAULT: u8 = 2;

#[derive(Parser)]
#[command(
    name = "starsync",
    version,
    about = "Incremental sales sync into a star-schema warehouse"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once
    Run {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
        /// Run every stage except the load and print what would be written
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate pipeline configuration and connectivity
    Check {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
    },
    /// Inspect or overwrite the persisted watermark
    Watermark {
        #[command(subcommand)]
        action: WatermarkAction,
    },
}

#[derive(Subcommand)]
enum WatermarkAction {
    /// Print the persisted watermark
    Show {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
    },
    /// Overwrite the persisted watermark
    Set {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
        /// New watermark (last loaded id_venda)
        value: i64,
    },
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PipelineError>() {
        Some(e) if e.is_checkpoint_fault() => EXIT_CHECKPOINT_FAULT,
        _ => EXIT_FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let result = match cli.command {
        Commands::Run { pipeline, dry_run } => commands::run::execute(&pipeline, dry_run).await,
        Commands::Check { pipeline } => commands::check::execute(&pipeline).await,
        Commands::Watermark { action } => match action {
            WatermarkAction::Show { pipeline } => commands::watermark::show(&pipeline).await,
            WatermarkAction::Set { pipeline, value } => {
                commands::watermark::set(&pipeline, value).await
            }
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use starsync_types::state::Watermark;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_watermark_set() {
        let cli = Cli::parse_from(["starsync", "watermark", "set", "p.yaml", "87"]);
        assert!(matches!(
            cli.command,
            Commands::Watermark {
                action: WatermarkAction::Set { value: 87, .. }
            }
        ));
    }

    #[test]
    fn checkpoint_fault_exits_with_two() {
        let err = anyhow::Error::new(PipelineError::CheckpointInconsistency {
            watermark: Watermark::new(100),
            source_max: Watermark::new(87),
        });
        assert_eq!(exit_status(&err), 2);
        assert_eq!(exit_status(&anyhow::anyhow!("boom")), 1);
        let wrapped = anyhow::Error::new(PipelineError::CheckpointInconsistency {
            watermark: Watermark::new(5),
            source_max: Watermark::new(9),
        })
        .context("Pipeline 'vendas' failed");
        assert_eq!(exit_status(&wrapped), 2);
    }
}
