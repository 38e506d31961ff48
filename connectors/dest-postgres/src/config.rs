//! Destination PostgreSQL connector configuration.

use serde::Deserialize;
use starsync_sdk::prelude::*;

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
    /// Schema namespace holding the star schema.
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_port() -> u16 {
    5432
}

fn default_schema() -> String {
    "dw_projeto".to_string()
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
        if self.schema.trim().is_empty() {
            return Err(ConnectorError::config("INVALID_CONFIG", "schema must not be empty"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConnectorError::config(
                "INVALID_CONFIG",
                "connect_timeout_secs must be > 0",
            ));
        }
        Ok(())
    }
}
