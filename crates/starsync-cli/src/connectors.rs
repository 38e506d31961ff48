//! Builds the concrete connectors named by a pipeline config.

use anyhow::{Context, Result};
use dest_postgres::PostgresWarehouse;
use reference_http::{HttpNameLookup, LookupConfig, ParquetReference, ReferenceConfig};
use serde::de::DeserializeOwned;
use source_postgres::PostgresSalesSource;
use starsync_engine::config::types::PipelineConfig;
use starsync_engine::Connectors;

pub type PipelineConnectors =
    Connectors<PostgresSalesSource, ParquetReference, HttpNameLookup, PostgresWarehouse>;

fn section<T: DeserializeOwned>(value: &serde_json::Value, name: &str) -> Result<T> {
    serde_json::from_value(value.clone()).with_context(|| format!("Invalid '{name}' config"))
}

/// Parse every connector section and validate it without connecting.
pub struct ConnectorConfigs {
    pub source: source_postgres::Config,
    pub reference: ReferenceConfig,
    pub lookup: LookupConfig,
    pub destination: dest_postgres::Config,
}

impl ConnectorConfigs {
    pub fn from_pipeline(config: &PipelineConfig) -> Result<Self> {
        let configs = Self {
            source: section(&config.source, "source")?,
            reference: section(&config.reference, "reference")?,
            lookup: section(&config.lookup, "lookup")?,
            destination: section(&config.destination, "destination")?,
        };
        configs.source.validate().context("Invalid 'source' config")?;
        configs.reference.validate().context("Invalid 'reference' config")?;
        configs.lookup.validate().context("Invalid 'lookup' config")?;
        configs
            .destination
            .validate()
            .context("Invalid 'destination' config")?;
        Ok(configs)
    }
}

/// Open both database connections and build the HTTP clients.
pub async fn connect(config: &PipelineConfig) -> Result<PipelineConnectors> {
    let configs = ConnectorConfigs::from_pipeline(config)?;
    let source = PostgresSalesSource::connect(configs.source)
        .await
        .context("Failed to connect to source database")?;
    let sink = PostgresWarehouse::connect(configs.destination)
        .await
        .context("Failed to connect to destination database")?;
    Ok(Connectors {
        source,
        reference: ParquetReference::new(configs.reference)?,
        lookup: HttpNameLookup::new(configs.lookup)?,
        sink,
    })
}
