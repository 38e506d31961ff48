//! Connector traits for starsync.
//!
//! Sources, reference fetchers, name lookups and warehouse sinks implement
//! these traits; the engine drives them generically.

pub mod connector;
pub mod prelude;

pub use starsync_types as types;
