//! SQL for incremental extraction and checkpoint validation.

use pg_escape::quote_identifier;

fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(table))
}

/// Rows strictly past the watermark, bound as `$1`.
///
/// Dates are cast to `date`; amounts come back as text.
pub(crate) fn extract_query(schema: &str, table: &str) -> String {
    format!(
        "SELECT id_venda::bigint AS id_venda, \
         id_funcionario::bigint AS id_funcionario, \
         id_categoria::bigint AS id_categoria, \
         data_venda::date AS data_venda, \
         venda::text AS venda \
         FROM {} WHERE id_venda > $1::bigint ORDER BY id_venda",
        qualified_table(schema, table)
    )
}

/// Current maximum `id_venda`; NULL for an empty table.
pub(crate) fn max_id_query(schema: &str, table: &str) -> String {
    format!(
        "SELECT MAX(id_venda)::bigint FROM {}",
        qualified_table(schema, table)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_query_binds_watermark() {
        let sql = extract_query("public", "venda");
        assert!(sql.contains("FROM public.venda WHERE id_venda > $1::bigint"));
        assert!(sql.ends_with("ORDER BY id_venda"));
        assert!(sql.contains("data_venda::date AS data_venda"));
        assert!(sql.contains("venda::text AS venda"));
    }

    #[test]
    fn identifiers_are_quoted_when_needed() {
        let sql = extract_query("Sales Data", "venda");
        assert!(sql.contains("FROM \"Sales Data\".venda"));
    }

    #[test]
    fn max_id_query_shape() {
        assert_eq!(
            max_id_query("public", "venda"),
            "SELECT MAX(id_venda)::bigint FROM public.venda"
        );
    }
}
