//! PostgreSQL warehouse sink for the sales star schema.
//!
//! Provisions the `funcionarios`, `categoria`, `calendario` and `vendas`
//! tables and writes one [`StarBatch`](starsync_sdk::prelude::StarBatch)
//! per transaction, dimensions first.

pub mod client;
pub mod config;
pub mod ddl;
mod insert;
pub mod sink;

pub use config::Config;
pub use sink::PostgresWarehouse;
