//! Semantic validation for parsed pipeline configuration values.

use anyhow::{bail, Result};

use crate::config::types::{PipelineConfig, StateBackendKind};

fn require_mapping(value: &serde_json::Value, section: &str, errors: &mut Vec<String>) {
    if !value.is_object() {
        errors.push(format!("'{section}' must be a mapping of connector settings"));
    }
}

/// Validate a parsed pipeline configuration.
///
/// # Errors
///
/// Returns one error listing every problem found.
pub fn validate_pipeline(config: &PipelineConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "Unsupported pipeline version '{}', expected '1.0'",
            config.version
        ));
    }

    let name = config.pipeline.trim();
    if name.is_empty() {
        errors.push("Pipeline name must not be empty".to_string());
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        errors.push(format!(
            "Pipeline name '{name}' may only contain letters, digits, '_', '-' and '.'"
        ));
    }

    require_mapping(&config.source, "source", &mut errors);
    require_mapping(&config.reference, "reference", &mut errors);
    require_mapping(&config.lookup, "lookup", &mut errors);
    require_mapping(&config.destination, "destination", &mut errors);

    if config.resources.lookup_concurrency == 0 {
        errors.push("lookup_concurrency must be at least 1".to_string());
    }

    match config.state.backend {
        StateBackendKind::Postgres if config.state.connection.is_none() => {
            errors.push("state backend 'postgres' requires a connection string".to_string());
        }
        _ => {}
    }
    if let Some(conn) = &config.state.connection {
        if conn.trim().is_empty() {
            errors.push("state connection must not be empty when given".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Pipeline validation failed:\n  - {}", errors.join("\n  - "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_pipeline_str;

    fn valid_yaml() -> &'static str {
        r#"
version: "1.0"
pipeline: vendas_dw
source:
  host: localhost
reference:
  url: https://example.com/categoria.parquet
lookup:
  url: https://example.com/names
destination:
  host: localhost
"#
    }

    #[test]
    fn valid_pipeline_passes() {
        let config = parse_pipeline_str(valid_yaml()).unwrap();
        assert!(validate_pipeline(&config).is_ok());
    }

    #[test]
    fn wrong_version_fails() {
        let yaml = valid_yaml().replace("\"1.0\"", "\"2.0\"");
        let config = parse_pipeline_str(&yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("Unsupported pipeline version"));
    }

    #[test]
    fn empty_pipeline_name_fails() {
        let yaml = valid_yaml().replace("vendas_dw", "\"\"");
        let config = parse_pipeline_str(&yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("Pipeline name must not be empty"));
    }

    #[test]
    fn path_like_pipeline_name_fails() {
        let yaml = valid_yaml().replace("vendas_dw", "../etc");
        let config = parse_pipeline_str(&yaml).unwrap();
        assert!(validate_pipeline(&config).is_err());
    }

    #[test]
    fn scalar_connector_section_fails() {
        let yaml = valid_yaml().replace("lookup:\n  url: https://example.com/names", "lookup: 42");
        let config = parse_pipeline_str(&yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("'lookup' must be a mapping"));
    }

    #[test]
    fn postgres_state_requires_connection() {
        let yaml = format!("{}state:\n  backend: postgres\n", valid_yaml());
        let config = parse_pipeline_str(&yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("requires a connection string"));
    }

    #[test]
    fn all_errors_reported_together() {
        let yaml = format!(
            "{}resources:\n  lookup_concurrency: 0\n",
            valid_yaml().replace("\"1.0\"", "\"0.9\"")
        );
        let config = parse_pipeline_str(&yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("Unsupported pipeline version"));
        assert!(err.contains("lookup_concurrency must be at least 1"));
    }
}
