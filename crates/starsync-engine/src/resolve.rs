//! Checkpoint store creation from pipeline config.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use starsync_state::{
    CheckpointStore, FileCheckpointStore, PostgresCheckpointStore, SqliteCheckpointStore,
};

use crate::config::types::{PipelineConfig, StateBackendKind};

const DEFAULT_WATERMARK_FILE: &str = "checkpoint.txt";

fn default_sqlite_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".starsync").join("state.db")
}

/// Open the configured checkpoint store.
///
/// Blocking; call from a blocking context or use [`open_checkpoint_store`].
///
/// # Errors
///
/// Returns an error if the backend cannot be opened or initialized.
pub fn create_checkpoint_store(config: &PipelineConfig) -> Result<Arc<dyn CheckpointStore>> {
    let connection = config.state.connection.as_deref();
    match config.state.backend {
        StateBackendKind::File => {
            let path = connection.unwrap_or(DEFAULT_WATERMARK_FILE);
            Ok(Arc::new(FileCheckpointStore::new(path)) as Arc<dyn CheckpointStore>)
        }
        StateBackendKind::Sqlite => {
            let store = match connection {
                Some(path) => SqliteCheckpointStore::open(Path::new(path))
                    .with_context(|| format!("Failed to open state DB at {path}"))?,
                None => SqliteCheckpointStore::open(&default_sqlite_path())
                    .context("Failed to open default state DB")?,
            };
            Ok(Arc::new(store) as Arc<dyn CheckpointStore>)
        }
        StateBackendKind::Postgres => {
            let connstr =
                connection.context("state backend 'postgres' requires a connection string")?;
            let store = PostgresCheckpointStore::open(connstr)
                .context("Failed to open Postgres state backend")?;
            Ok(Arc::new(store) as Arc<dyn CheckpointStore>)
        }
    }
}

/// [`create_checkpoint_store`] on the blocking pool.
///
/// # Errors
///
/// Returns an error if the backend cannot be opened.
pub async fn open_checkpoint_store(config: &PipelineConfig) -> Result<Arc<dyn CheckpointStore>> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || create_checkpoint_store(&config))
        .await
        .context("open checkpoint store task panicked")?
}
