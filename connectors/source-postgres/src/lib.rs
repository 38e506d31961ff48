//! PostgreSQL source for the transactional `venda` table.
//!
//! Extracts rows past the watermark and reports the table's current maximum
//! `id_venda` so the engine can tell "no new data" apart from an
//! inconsistent checkpoint.

pub mod client;
pub mod config;
pub mod query;
pub mod source;

pub use config::Config;
pub use source::PostgresSalesSource;
