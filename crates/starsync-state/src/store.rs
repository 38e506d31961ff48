//! Checkpoint store trait definition.
//!
//! [`CheckpointStore`] owns the single watermark of a pipeline. Run history
//! and the join-miss report are optional capabilities with no-op defaults,
//! for backends that can only hold the watermark itself.

use starsync_types::star::JoinMiss;
use starsync_types::state::{PipelineId, RunStats, RunStatus, Watermark};

use crate::error;

/// Storage contract for pipeline checkpoints.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn CheckpointStore>`.
pub trait CheckpointStore: Send + Sync {
    /// Read the persisted watermark.
    ///
    /// Returns [`Watermark::UNSET`] when nothing has been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) when storage exists
    /// but cannot be read or does not hold a valid watermark.
    fn read(&self, pipeline: &PipelineId) -> error::Result<Watermark>;

    /// Overwrite the persisted watermark.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn write(&self, pipeline: &PipelineId, watermark: Watermark) -> error::Result<()>;

    /// Begin a new run, returning its ID if this backend keeps run history.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn start_run(&self, _pipeline: &PipelineId) -> error::Result<Option<i64>> {
        Ok(None)
    }

    /// Mark a run as finished with the given status and stats.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn complete_run(
        &self,
        _run_id: i64,
        _status: RunStatus,
        _stats: &RunStats,
    ) -> error::Result<()> {
        Ok(())
    }

    /// Persist transactions dropped by the join. Returns the number stored.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn record_join_misses(
        &self,
        _pipeline: &PipelineId,
        _run_id: i64,
        _misses: &[JoinMiss],
    ) -> error::Result<u64> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WatermarkOnly;

    impl CheckpointStore for WatermarkOnly {
        fn read(&self, _pipeline: &PipelineId) -> error::Result<Watermark> {
            Ok(Watermark::new(7))
        }

        fn write(&self, _pipeline: &PipelineId, _watermark: Watermark) -> error::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn trait_is_object_safe() {
        fn _assert_object_safe(_: &dyn CheckpointStore) {}
    }

    #[test]
    fn run_history_defaults_are_noops() {
        let store = WatermarkOnly;
        let pid = PipelineId::new("p");
        assert_eq!(store.start_run(&pid).unwrap(), None);
        store
            .complete_run(1, RunStatus::Completed, &RunStats::default())
            .unwrap();
        assert_eq!(store.record_join_misses(&pid, 1, &[]).unwrap(), 0);
    }
}
