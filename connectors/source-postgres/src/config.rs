//! Source PostgreSQL connector configuration.

use starsync_sdk::prelude::*;
use serde::Deserialize;

/// PostgreSQL connection config from pipeline YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Transactional table holding one row per sale.
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Server-side limit for a single query. Unset means no limit.
    #[serde(default)]
    pub statement_timeout_secs: Option<u64>,
}

fn default_port() -> u16 {
    5432
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_table() -> String {
    "venda".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.host.trim().is_empty() {
            return Err(ConnectorError::config("INVALID_CONFIG", "host must not be empty"));
        }
        if self.database.trim().is_empty() {
            return Err(ConnectorError::config(
                "INVALID_CONFIG",
                "database must not be empty",
            ));
        }
        if self.table.trim().is_empty() {
            return Err(ConnectorError::config("INVALID_CONFIG", "table must not be empty"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConnectorError::config(
                "INVALID_CONFIG",
                "connect_timeout_secs must be > 0",
            ));
        }
        if self.statement_timeout_secs == Some(0) {
            return Err(ConnectorError::config(
                "INVALID_CONFIG",
                "statement_timeout_secs must be > 0 when set",
            ));
        }
        Ok(())
    }
}
