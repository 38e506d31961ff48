//! Pipeline configuration types deserialized from YAML.

use serde::Deserialize;

/// Top-level pipeline configuration.
///
/// Connector sections are kept opaque here; each connector crate
/// deserializes its own `Config` from them.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub version: String,
    /// Pipeline name; also the key the watermark is stored under.
    pub pipeline: String,
    pub source: serde_json::Value,
    pub reference: serde_json::Value,
    pub lookup: serde_json::Value,
    pub destination: serde_json::Value,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
}

/// Checkpoint store selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub backend: StateBackendKind,
    /// File path, `SQLite` path, or libpq connection string per backend.
    pub connection: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackendKind {
    #[default]
    File,
    Sqlite,
    Postgres,
}

/// What to do with transactions whose category or employee does not resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinMissPolicy {
    /// Drop the transaction, count it, and persist it in the join-miss report.
    #[default]
    Drop,
    /// Abort the run before anything is loaded.
    Fail,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub on_join_miss: JoinMissPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    /// Retries per stage call for retryable connector errors.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Maximum in-flight name lookups. 1 means strictly sequential.
    #[serde(default = "default_lookup_concurrency")]
    pub lookup_concurrency: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            lookup_concurrency: default_lookup_concurrency(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_lookup_concurrency() -> usize {
    1
}
