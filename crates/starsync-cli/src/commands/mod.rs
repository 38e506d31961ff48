pub mod check;
pub mod run;
pub mod watermark;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use starsync_engine::config::parser;
use starsync_engine::config::types::PipelineConfig;
use starsync_engine::config::validator;
use starsync_engine::resolve::open_checkpoint_store;
use starsync_state::CheckpointStore;

/// Parse and validate a pipeline file.
pub(crate) fn load_pipeline(path: &Path) -> Result<PipelineConfig> {
    let config = parser::parse_pipeline(path)
        .with_context(|| format!("Failed to parse pipeline: {}", path.display()))?;
    validator::validate_pipeline(&config)?;
    Ok(config)
}

/// Open the checkpoint store, run `f` with it, and release it on every path.
///
/// The store is dropped on the blocking pool: the Postgres backend owns a
/// runtime that may not be dropped from async context.
///
/// # Errors
///
/// Returns an error if the store cannot be opened; `f`'s own result is
/// passed through untouched.
pub(crate) async fn with_checkpoint_store<F, Fut, T>(config: &PipelineConfig, f: F) -> Result<T>
where
    F: FnOnce(Arc<dyn CheckpointStore>) -> Fut,
    Fut: Future<Output = T>,
{
    let state = open_checkpoint_store(config).await?;
    let output = f(state.clone()).await;
    let _ = tokio::task::spawn_blocking(move || drop(state)).await;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use starsync_engine::config::parser::parse_pipeline_str;
    use starsync_types::state::PipelineId;

    fn config_with_state(state_yaml: &str) -> PipelineConfig {
        parse_pipeline_str(&format!(
            "version: \"1.0\"\npipeline: vendas\nsource: {{}}\nreference: {{}}\nlookup: {{}}\ndestination: {{}}\n{state_yaml}\n"
        ))
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn store_available_inside_and_error_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_state(&format!(
            "state:\n  backend: sqlite\n  connection: {}",
            dir.path().join("state.db").display()
        ));

        let out = with_checkpoint_store(&config, |state| async move {
            assert!(state.read(&PipelineId::new("vendas")).is_ok());
            Err::<(), anyhow::Error>(anyhow::anyhow!("connect failed"))
        })
        .await
        .unwrap();
        assert_eq!(out.unwrap_err().to_string(), "connect failed");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_failure_is_reported() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let config = config_with_state(&format!(
            "state:\n  backend: sqlite\n  connection: {}",
            blocker.path().join("state.db").display()
        ));
        let err = with_checkpoint_store(&config, |_state| async {}).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to open state DB"));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "requires TEST_POSTGRES_URL"]
    async fn failing_command_releases_postgres_store_without_panicking() {
        let url = std::env::var("TEST_POSTGRES_URL").expect("TEST_POSTGRES_URL not set");
        let config = config_with_state(&format!(
            "state:\n  backend: postgres\n  connection: \"{url}\""
        ));

        let out = with_checkpoint_store(&config, |_state| async {
            Err::<(), anyhow::Error>(anyhow::anyhow!("destination unreachable"))
        })
        .await
        .unwrap();
        assert_eq!(out.unwrap_err().to_string(), "destination unreachable");
    }
}
