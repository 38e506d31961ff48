//! Reference file and lookup endpoint configuration.

use std::path::PathBuf;

use serde::Deserialize;
use starsync_sdk::prelude::*;

/// Canonical join key for category rows.
pub const CANONICAL_KEY: &str = "id_categoria";

/// Remote Parquet category snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    pub url: String,
    /// Key column as published; renamed to `id_categoria` on ingest.
    #[serde(default = "default_key_column")]
    pub key_column: String,
    #[serde(default = "default_name_column")]
    pub name_column: String,
    /// Directory for the staged download. Defaults to the system temp dir.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Keyed employee name lookup endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    /// Endpoint URL without the id parameter.
    pub url: String,
    #[serde(default = "default_query_param")]
    pub query_param: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_key_column() -> String {
    "id".to_string()
}

fn default_name_column() -> String {
    "nome_categoria".to_string()
}

fn default_query_param() -> String {
    "id".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn validate_url(url: &str) -> Result<reqwest::Url, ConnectorError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ConnectorError::config("INVALID_URL", format!("'{url}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConnectorError::config(
            "INVALID_URL",
            format!("'{url}': scheme must be http or https"),
        ));
    }
    Ok(parsed)
}

impl ReferenceConfig {
    pub fn validate(&self) -> Result<(), ConnectorError> {
        validate_url(&self.url)?;
        if self.key_column.trim().is_empty() || self.name_column.trim().is_empty() {
            return Err(ConnectorError::config(
                "INVALID_CONFIG",
                "key_column and name_column must not be empty",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConnectorError::config("INVALID_CONFIG", "timeout_secs must be > 0"));
        }
        Ok(())
    }
}

impl LookupConfig {
    pub fn validate(&self) -> Result<(), ConnectorError> {
        let url = validate_url(&self.url)?;
        if self.query_param.trim().is_empty() {
            return Err(ConnectorError::config(
                "INVALID_CONFIG",
                "query_param must not be empty",
            ));
        }
        if url.query_pairs().any(|(k, _)| k == self.query_param.as_str()) {
            return Err(ConnectorError::config(
                "INVALID_CONFIG",
                format!(
                    "url already carries '{}'; give the endpoint without it",
                    self.query_param
                ),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConnectorError::config("INVALID_CONFIG", "timeout_secs must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_defaults() {
        let cfg: ReferenceConfig = serde_json::from_value(serde_json::json!({
            "url": "https://storage.googleapis.com/challenge_junior/categoria.parquet"
        }))
        .unwrap();
        assert_eq!(cfg.key_column, "id");
        assert_eq!(cfg.name_column, "nome_categoria");
        assert_eq!(cfg.timeout_secs, 30);
        assert!(cfg.staging_dir.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn lookup_rejects_embedded_id_param() {
        let cfg: LookupConfig = serde_json::from_value(serde_json::json!({
            "url": "https://example.com/api_challenge_junior?id="
        }))
        .unwrap();
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.category, ErrorCategory::Config);
    }

    #[test]
    fn non_http_scheme_rejected() {
        let cfg: LookupConfig = serde_json::from_value(serde_json::json!({
            "url": "ftp://example.com/names"
        }))
        .unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let cfg: ReferenceConfig = serde_json::from_value(serde_json::json!({
            "url": "https://example.com/categoria.parquet", "timeout_secs": 0
        }))
        .unwrap();
        assert!(cfg.validate().is_err());
    }
}
