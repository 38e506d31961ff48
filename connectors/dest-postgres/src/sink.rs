//! [`WarehouseSink`] implementation: one transaction per star batch.

use starsync_sdk::prelude::*;
use tokio_postgres::Client;

use crate::client::{self, pg_error};
use crate::config::Config;
use crate::ddl::{self, CALENDARIO, CATEGORIA, FUNCIONARIOS, VENDAS};
use crate::insert::{write_rows, SqlParamValue};

pub struct PostgresWarehouse {
    config: Config,
    client: Client,
}

impl PostgresWarehouse {
    /// Validate the config and open a connection.
    pub async fn connect(config: Config) -> Result<Self, ConnectorError> {
        config.validate()?;
        let client = client::connect(&config).await?;
        tracing::debug!(
            host = %config.host,
            database = %config.database,
            schema = %config.schema,
            "dest-postgres: connected"
        );
        Ok(Self { config, client })
    }

    async fn write_all(&self, batch: &StarBatch) -> Result<LoadSummary, ConnectorError> {
        let schema = self.config.schema.as_str();
        ddl::ensure_tables(&self.client, schema).await?;

        let employees = write_rows(&self.client, schema, &FUNCIONARIOS, &employee_rows(batch)).await?;
        let categories = write_rows(&self.client, schema, &CATEGORIA, &category_rows(batch)).await?;
        let calendar = write_rows(&self.client, schema, &CALENDARIO, &calendar_rows(batch)).await?;
        let facts = write_rows(&self.client, schema, &VENDAS, &fact_rows(batch)).await?;

        Ok(LoadSummary {
            employees,
            categories,
            calendar,
            facts,
        })
    }
}

impl WarehouseSink for PostgresWarehouse {
    async fn load(&self, batch: &StarBatch) -> Result<LoadSummary, ConnectorError> {
        self.client
            .batch_execute("BEGIN")
            .await
            .map_err(|e| pg_error("BEGIN_FAILED", "BEGIN failed", &e))?;

        let summary = match self.write_all(batch).await {
            Ok(summary) => summary,
            Err(err) => {
                if let Err(e) = self.client.batch_execute("ROLLBACK").await {
                    tracing::warn!(error = %e, "dest-postgres: ROLLBACK failed");
                }
                return Err(err.with_commit_state(CommitState::BeforeCommit));
            }
        };

        self.client.batch_execute("COMMIT").await.map_err(|e| {
            pg_error("COMMIT_FAILED", "COMMIT failed", &e)
                .with_commit_state(CommitState::AfterCommitUnknown)
        })?;

        tracing::info!(
            schema = %self.config.schema,
            employees = summary.employees,
            categories = summary.categories,
            calendar = summary.calendar,
            facts = summary.facts,
            "dest-postgres: star batch committed"
        );
        Ok(summary)
    }

    async fn validate(&self) -> Result<ValidationResult, ConnectorError> {
        client::validate(&self.client, &self.config).await
    }
}

fn employee_rows(batch: &StarBatch) -> Vec<Vec<SqlParamValue<'_>>> {
    batch
        .employees
        .iter()
        .map(|e| {
            vec![
                SqlParamValue::Text(&e.nome_funcionario),
                SqlParamValue::Int64(e.id_funcionario),
            ]
        })
        .collect()
}

fn category_rows(batch: &StarBatch) -> Vec<Vec<SqlParamValue<'_>>> {
    batch
        .categories
        .iter()
        .map(|c| {
            vec![
                SqlParamValue::Text(&c.nome_categoria),
                SqlParamValue::Int64(c.id_categoria),
            ]
        })
        .collect()
}

#[allow(clippy::cast_possible_wrap)]
fn calendar_rows(batch: &StarBatch) -> Vec<Vec<SqlParamValue<'_>>> {
    batch
        .calendar
        .iter()
        .map(|c| {
            vec![
                SqlParamValue::Date(c.data_venda),
                SqlParamValue::Int32(c.dia as i32),
                SqlParamValue::Int32(c.mes as i32),
                SqlParamValue::Int32(c.ano),
                SqlParamValue::Int32(c.bimestre as i32),
            ]
        })
        .collect()
}

fn fact_rows(batch: &StarBatch) -> Vec<Vec<SqlParamValue<'_>>> {
    batch
        .facts
        .iter()
        .map(|f| {
            vec![
                SqlParamValue::OwnedText(f.venda.to_string()),
                SqlParamValue::Int64(f.id_funcionario),
                SqlParamValue::Int64(f.id_categoria),
                SqlParamValue::Date(f.data_venda),
                SqlParamValue::Int64(f.id_venda),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn batch() -> StarBatch {
        let date = NaiveDate::from_ymd_opt(2017, 4, 9).unwrap();
        StarBatch {
            employees: vec![EmployeeDim {
                nome_funcionario: "Ana".into(),
                id_funcionario: 1,
            }],
            categories: vec![CategoryDim {
                nome_categoria: "Bebidas".into(),
                id_categoria: 2,
            }],
            calendar: vec![CalendarDim::from_date(date)],
            facts: vec![SalesFact {
                venda: "99.90".parse().unwrap(),
                id_funcionario: 1,
                id_categoria: 2,
                data_venda: date,
                id_venda: 101,
            }],
            high_watermark: Watermark::new(101),
        }
    }

    #[test]
    fn row_shapes_match_table_specs() {
        let b = batch();
        assert_eq!(employee_rows(&b)[0].len(), FUNCIONARIOS.columns.len());
        assert_eq!(category_rows(&b)[0].len(), CATEGORIA.columns.len());
        assert_eq!(calendar_rows(&b)[0].len(), CALENDARIO.columns.len());
        assert_eq!(fact_rows(&b)[0].len(), VENDAS.columns.len());
    }

    #[test]
    fn fact_amount_is_sent_as_exact_text() {
        let b = batch();
        let rows = fact_rows(&b);
        assert!(matches!(&rows[0][0], SqlParamValue::OwnedText(v) if v == "99.90"));
        assert!(matches!(rows[0][4], SqlParamValue::Int64(101)));
    }

    #[test]
    fn calendar_row_carries_bimestre() {
        let b = batch();
        let rows = calendar_rows(&b);
        assert!(matches!(rows[0][4], SqlParamValue::Int32(2)));
    }

    #[tokio::test]
    #[ignore = "requires TEST_POSTGRES_URL"]
    async fn load_commits_all_tables() {
        let url = std::env::var("TEST_POSTGRES_URL").unwrap();
        let (client, connection) = tokio_postgres::connect(&url, tokio_postgres::NoTls)
            .await
            .unwrap();
        tokio::spawn(connection);
        let config = Config {
            host: "unused".into(),
            port: 5432,
            user: "unused".into(),
            password: String::new(),
            database: "unused".into(),
            schema: "starsync_test".into(),
            connect_timeout_secs: 10,
        };
        let sink = PostgresWarehouse { config, client };
        sink.client
            .batch_execute("DROP SCHEMA IF EXISTS starsync_test CASCADE")
            .await
            .unwrap();

        let summary = sink.load(&batch()).await.unwrap();
        assert_eq!(summary.facts, 1);
        assert_eq!(summary.employees, 1);

        let row = sink
            .client
            .query_one("SELECT venda::text, id_venda FROM starsync_test.vendas", &[])
            .await
            .unwrap();
        assert_eq!(row.get::<_, String>(0), "99.90");
        assert_eq!(row.get::<_, i64>(1), 101);
    }
}
