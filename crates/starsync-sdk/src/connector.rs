//! Async connector traits at each external boundary of the pipeline.

use starsync_types::error::{ConnectorError, ValidationResult, ValidationStatus};
use starsync_types::sales::{CategoryRecord, TransactionRecord};
use starsync_types::star::{LoadSummary, StarBatch};
use starsync_types::state::Watermark;

/// Default validation response for connectors that have nothing to probe.
pub fn default_validation() -> Result<ValidationResult, ConnectorError> {
    Ok(ValidationResult {
        status: ValidationStatus::Success,
        message: "Validation not implemented".to_string(),
    })
}

/// Relational store holding the transactional sales table.
#[allow(async_fn_in_trait)]
pub trait SalesSource {
    /// All transactions with `id_venda` strictly greater than `watermark`,
    /// ordered by `id_venda`.
    async fn fetch_since(
        &self,
        watermark: Watermark,
    ) -> Result<Vec<TransactionRecord>, ConnectorError>;

    /// Current maximum `id_venda`, or [`Watermark::UNSET`] for an empty table.
    async fn max_id(&self) -> Result<Watermark, ConnectorError>;

    async fn validate(&self) -> Result<ValidationResult, ConnectorError> {
        default_validation()
    }
}

/// Full snapshot of the category reference dataset.
#[allow(async_fn_in_trait)]
pub trait ReferenceSource {
    async fn fetch_categories(&self) -> Result<Vec<CategoryRecord>, ConnectorError>;
}

/// Keyed remote lookup resolving one employee id to a display name.
#[allow(async_fn_in_trait)]
pub trait NameLookup {
    /// Name for `id_funcionario`. An `Ok` empty string is a valid name.
    async fn lookup(&self, id_funcionario: i64) -> Result<String, ConnectorError>;
}

/// Warehouse holding the star schema.
#[allow(async_fn_in_trait)]
pub trait WarehouseSink {
    /// Write dimensions then facts as one unit of work.
    async fn load(&self, batch: &StarBatch) -> Result<LoadSummary, ConnectorError>;

    async fn validate(&self) -> Result<ValidationResult, ConnectorError> {
        default_validation()
    }
}
