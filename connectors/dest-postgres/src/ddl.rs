//! Star-schema table layout and idempotent provisioning.

use pg_escape::quote_identifier;
use starsync_sdk::prelude::*;
use tokio_postgres::Client;

use crate::client::pg_error;

/// One destination column: name, PostgreSQL type, and the placeholder
/// template used when binding a value for it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnSpec {
    pub(crate) name: &'static str,
    pub(crate) pg_type: &'static str,
    /// `{}` is replaced by `$n`.
    pub(crate) placeholder: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TableSpec {
    pub(crate) name: &'static str,
    pub(crate) columns: &'static [ColumnSpec],
}

const fn col(name: &'static str, pg_type: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        pg_type,
        placeholder: "{}",
    }
}

pub(crate) const FUNCIONARIOS: TableSpec = TableSpec {
    name: "funcionarios",
    columns: &[col("nome_funcionario", "TEXT"), col("id_funcionario", "BIGINT")],
};

pub(crate) const CATEGORIA: TableSpec = TableSpec {
    name: "categoria",
    columns: &[col("nome_categoria", "TEXT"), col("id_categoria", "BIGINT")],
};

pub(crate) const CALENDARIO: TableSpec = TableSpec {
    name: "calendario",
    columns: &[
        col("data_venda", "DATE"),
        col("dia", "INTEGER"),
        col("mes", "INTEGER"),
        col("ano", "INTEGER"),
        col("bimestre", "INTEGER"),
    ],
};

pub(crate) const VENDAS: TableSpec = TableSpec {
    name: "vendas",
    columns: &[
        ColumnSpec {
            name: "venda",
            pg_type: "NUMERIC",
            placeholder: "{}::text::numeric",
        },
        col("id_funcionario", "BIGINT"),
        col("id_categoria", "BIGINT"),
        col("data_venda", "DATE"),
        col("id_venda", "BIGINT"),
    ],
};

/// Load order: dimensions before facts.
pub(crate) const STAR_TABLES: [TableSpec; 4] = [FUNCIONARIOS, CATEGORIA, CALENDARIO, VENDAS];

pub(crate) fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(table))
}

pub(crate) fn create_table_sql(schema: &str, table: &TableSpec) -> String {
    let cols = table
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_identifier(c.name), c.pg_type))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({cols})",
        qualified_table(schema, table.name)
    )
}

/// Create the schema and all star tables if missing. Existing tables are
/// left untouched.
pub async fn ensure_tables(client: &Client, schema: &str) -> Result<(), ConnectorError> {
    let create_schema = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_identifier(schema));
    client
        .batch_execute(&create_schema)
        .await
        .map_err(|e| pg_error("DDL_FAILED", "CREATE SCHEMA failed", &e))?;

    for table in &STAR_TABLES {
        client
            .batch_execute(&create_table_sql(schema, table))
            .await
            .map_err(|e| {
                pg_error(
                    "DDL_FAILED",
                    &format!("CREATE TABLE {} failed", table.name),
                    &e,
                )
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_vendas_sql() {
        assert_eq!(
            create_table_sql("dw_projeto", &VENDAS),
            "CREATE TABLE IF NOT EXISTS dw_projeto.vendas (venda NUMERIC, id_funcionario BIGINT, \
             id_categoria BIGINT, data_venda DATE, id_venda BIGINT)"
        );
    }

    #[test]
    fn dimensions_come_before_facts() {
        let names: Vec<_> = STAR_TABLES.iter().map(|t| t.name).collect();
        assert_eq!(names, ["funcionarios", "categoria", "calendario", "vendas"]);
    }

    #[test]
    fn schema_is_quoted_when_needed() {
        assert_eq!(qualified_table("DW Projeto", "vendas"), "\"DW Projeto\".vendas");
    }
}
