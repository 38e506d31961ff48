//! Plain-text file implementation of [`CheckpointStore`].
//!
//! The file holds a single integer. It is replaced atomically: the new
//! value is written to a temporary file in the same directory which is then
//! renamed over the old one.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use starsync_types::state::{PipelineId, Watermark};
use tempfile::NamedTempFile;

use crate::error::{self, StateError};
use crate::store::CheckpointStore;

/// Watermark stored as a plain-text integer at a fixed path.
///
/// One file holds one pipeline's watermark, so the `pipeline` argument of
/// the trait methods is not used for addressing. Run history is not kept.
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, content: &str) -> error::Result<Watermark> {
        match content.parse::<Watermark>() {
            Ok(wm) if wm.value() >= 0 => Ok(wm),
            _ => Err(StateError::CorruptWatermark {
                path: self.path.clone(),
                content: content.to_string(),
            }),
        }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn read(&self, _pipeline: &PipelineId) -> error::Result<Watermark> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => self.parse(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Watermark::UNSET),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, _pipeline: &PipelineId, watermark: Watermark) -> error::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        writeln!(tmp, "{watermark}")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StateError::Io(e.error))?;
        Ok(())
    }
}
