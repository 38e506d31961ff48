//! [`SalesSource`] implementation over a single PostgreSQL connection.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use starsync_sdk::prelude::*;
use tokio_postgres::{Client, Row};

use crate::client::{self, pg_error};
use crate::config::Config;
use crate::query;

pub struct PostgresSalesSource {
    config: Config,
    client: Client,
}

impl PostgresSalesSource {
    /// Validate the config and open a connection.
    pub async fn connect(config: Config) -> Result<Self, ConnectorError> {
        config.validate()?;
        let client = client::connect(&config).await?;
        tracing::debug!(
            host = %config.host,
            database = %config.database,
            table = %config.table,
            "source-postgres: connected"
        );
        Ok(Self { config, client })
    }
}

impl SalesSource for PostgresSalesSource {
    async fn fetch_since(
        &self,
        watermark: Watermark,
    ) -> Result<Vec<TransactionRecord>, ConnectorError> {
        let sql = query::extract_query(&self.config.schema, &self.config.table);
        let rows = self
            .client
            .query(&sql, &[&watermark.value()])
            .await
            .map_err(|e| pg_error("EXTRACT_FAILED", "Extract query failed", &e))?;

        let records = rows
            .iter()
            .map(transaction_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            watermark = watermark.value(),
            rows = records.len(),
            "source-postgres: extracted rows"
        );
        Ok(records)
    }

    async fn max_id(&self) -> Result<Watermark, ConnectorError> {
        let sql = query::max_id_query(&self.config.schema, &self.config.table);
        let row = self
            .client
            .query_one(&sql, &[])
            .await
            .map_err(|e| pg_error("MAX_ID_FAILED", "Max id query failed", &e))?;
        let max: Option<i64> = row
            .try_get(0)
            .map_err(|e| ConnectorError::schema("MAX_ID_TYPE", e.to_string()))?;
        Ok(max.map_or(Watermark::UNSET, Watermark::new))
    }

    async fn validate(&self) -> Result<ValidationResult, ConnectorError> {
        client::validate(&self.client, &self.config).await
    }
}

fn column<'a, T>(row: &'a Row, id_venda: Option<i64>, name: &str) -> Result<T, ConnectorError>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    let value: Option<T> = row.try_get(name).map_err(|e| {
        ConnectorError::schema("COLUMN_TYPE", format!("column '{name}': {e}"))
    })?;
    value.ok_or_else(|| {
        ConnectorError::data("NULL_COLUMN", format!("column '{name}' is NULL"))
            .with_details(row_details(id_venda, name))
    })
}

fn row_details(id_venda: Option<i64>, column: &str) -> serde_json::Value {
    serde_json::json!({ "id_venda": id_venda, "column": column })
}

pub(crate) fn transaction_from_row(row: &Row) -> Result<TransactionRecord, ConnectorError> {
    let id_venda: i64 = column(row, None, "id_venda")?;
    let id = Some(id_venda);
    let id_funcionario: i64 = column(row, id, "id_funcionario")?;
    let id_categoria: i64 = column(row, id, "id_categoria")?;
    let data_venda: NaiveDate = column(row, id, "data_venda")?;
    let venda_text: String = column(row, id, "venda")?;
    let venda = parse_amount(&venda_text).map_err(|e| e.with_details(row_details(id, "venda")))?;

    Ok(TransactionRecord {
        id_venda,
        id_funcionario,
        id_categoria,
        data_venda,
        venda,
    })
}

pub(crate) fn parse_amount(text: &str) -> Result<BigDecimal, ConnectorError> {
    BigDecimal::from_str(text.trim()).map_err(|e| {
        ConnectorError::data("INVALID_AMOUNT", format!("venda '{text}' is not numeric: {e}"))
    })
}
