//! Multi-value INSERT write path.
//!
//! Rows are sent as chunked `INSERT ... VALUES (...), (...)` statements with
//! one bound parameter per cell.

use chrono::NaiveDate;
use starsync_sdk::prelude::*;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;

use crate::client::pg_error;
use crate::ddl::{qualified_table, TableSpec};

/// Maximum rows per multi-value INSERT statement (PG parameter limit).
const CHUNK_SIZE: usize = 1000;

#[derive(Debug)]
pub(crate) enum SqlParamValue<'a> {
    Int32(i32),
    Int64(i64),
    Text(&'a str),
    OwnedText(String),
    Date(NaiveDate),
}

impl SqlParamValue<'_> {
    pub(crate) fn as_tosql(&self) -> &(dyn ToSql + Sync) {
        match self {
            Self::Int32(v) => v,
            Self::Int64(v) => v,
            Self::Text(v) => v,
            Self::OwnedText(v) => v,
            Self::Date(v) => v,
        }
    }
}

/// Build the statement for one chunk of `rows` rows.
pub(crate) fn build_insert_sql(qualified: &str, table: &TableSpec, rows: usize) -> String {
    let col_list = table
        .columns
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(", ");
    let header = format!("INSERT INTO {qualified} ({col_list}) VALUES ");
    let mut sql = String::with_capacity(header.len() + rows * table.columns.len() * 8);
    sql.push_str(&header);

    let mut n = 0usize;
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (pos, column) in table.columns.iter().enumerate() {
            if pos > 0 {
                sql.push_str(", ");
            }
            n += 1;
            sql.push_str(&column.placeholder.replace("{}", &format!("${n}")));
        }
        sql.push(')');
    }
    sql
}

/// Insert `rows` into `schema.table`. Returns rows written.
pub(crate) async fn write_rows(
    client: &Client,
    schema: &str,
    table: &TableSpec,
    rows: &[Vec<SqlParamValue<'_>>],
) -> Result<u64, ConnectorError> {
    if rows.is_empty() {
        return Ok(0);
    }

    let qualified = qualified_table(schema, table.name);
    let mut total_rows: u64 = 0;

    for (chunk_idx, chunk) in rows.chunks(CHUNK_SIZE).enumerate() {
        let sql = build_insert_sql(&qualified, table, chunk.len());
        let params: Vec<&(dyn ToSql + Sync)> = chunk
            .iter()
            .flat_map(|row| row.iter().map(SqlParamValue::as_tosql))
            .collect();

        let chunk_start = chunk_idx * CHUNK_SIZE;
        client.execute(&sql, &params).await.map_err(|e| {
            pg_error(
                "INSERT_FAILED",
                &format!(
                    "INSERT failed for {qualified}, rows {chunk_start}-{}",
                    chunk_start + chunk.len()
                ),
                &e,
            )
        })?;

        total_rows += chunk.len() as u64;
    }

    tracing::debug!(table = %qualified, rows = total_rows, "dest-postgres: wrote rows");
    Ok(total_rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{FUNCIONARIOS, VENDAS};

    #[test]
    fn placeholders_number_across_rows() {
        let sql = build_insert_sql("dw_projeto.funcionarios", &FUNCIONARIOS, 2);
        assert_eq!(
            sql,
            "INSERT INTO dw_projeto.funcionarios (nome_funcionario, id_funcionario) \
             VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn numeric_column_binds_text() {
        let sql = build_insert_sql("dw_projeto.vendas", &VENDAS, 1);
        assert!(sql.ends_with("VALUES ($1::text::numeric, $2, $3, $4, $5)"));
    }

    #[test]
    fn param_variants_expose_tosql() {
        let values = [
            SqlParamValue::Int32(3),
            SqlParamValue::Int64(101),
            SqlParamValue::Text("Ana"),
            SqlParamValue::OwnedText("10.50".into()),
            SqlParamValue::Date(NaiveDate::from_ymd_opt(2017, 3, 1).unwrap()),
        ];
        assert_eq!(values.iter().map(SqlParamValue::as_tosql).count(), 5);
    }
}
