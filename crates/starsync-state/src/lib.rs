//! Watermark persistence for starsync pipelines.
//!
//! Provides the [`CheckpointStore`] trait and three implementations: a
//! plain-text [`FileCheckpointStore`], and [`SqliteCheckpointStore`] /
//! [`PostgresCheckpointStore`] which also keep run history and the
//! join-miss report.

#![warn(clippy::pedantic)]

pub mod error;
pub mod file;
pub mod postgres;
pub mod sqlite;
pub mod store;

pub use error::StateError;
pub use file::FileCheckpointStore;
pub use postgres::PostgresCheckpointStore;
pub use sqlite::SqliteCheckpointStore;
pub use store::CheckpointStore;
