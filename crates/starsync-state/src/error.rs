//! Checkpoint store error types.

use std::path::PathBuf;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by [`CheckpointStore`](crate::CheckpointStore) implementations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state backend error: {0}")]
    Backend(#[source] BoxError),
    #[error("state backend error ({context}): {source}")]
    BackendContext {
        context: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt watermark in {}: {content:?} is not a non-negative integer", .path.display())]
    CorruptWatermark { path: PathBuf, content: String },
    #[error("state backend lock poisoned")]
    LockPoisoned,
}

impl StateError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }

    pub fn backend_context(
        context: &'static str,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::BackendContext {
            context,
            source: Box::new(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, StateError>;
