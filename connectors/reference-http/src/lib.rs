//! HTTP reference data for starsync.
//!
//! [`ParquetReference`] downloads the category snapshot published as a
//! Parquet file; [`HttpNameLookup`] resolves employee ids through a keyed
//! lookup endpoint, one request per id.

pub mod config;
mod http;
pub mod lookup;
pub mod snapshot;

pub use config::{LookupConfig, ReferenceConfig};
pub use lookup::HttpNameLookup;
pub use snapshot::ParquetReference;
