//! PostgreSQL client connection, validation and error mapping.

use std::time::Duration;

use starsync_sdk::prelude::*;
use tokio_postgres::{Client, Config as PgConfig, NoTls};

use crate::config::Config;

/// Connect to PostgreSQL using the provided config.
pub async fn connect(config: &Config) -> Result<Client, ConnectorError> {
    let mut pg = PgConfig::new();
    pg.host(&config.host);
    pg.port(config.port);
    pg.user(&config.user);
    if !config.password.is_empty() {
        pg.password(&config.password);
    }
    pg.dbname(&config.database);
    pg.application_name("starsync-source");
    pg.connect_timeout(Duration::from_secs(config.connect_timeout_secs));
    if let Some(secs) = config.statement_timeout_secs {
        pg.options(&format!("-c statement_timeout={}", secs * 1000));
    }

    let (client, connection) = pg
        .connect(NoTls)
        .await
        .map_err(|e| pg_error("CONNECTION_FAILED", "Connection failed", &e))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "source-postgres: connection error");
        }
    });

    Ok(client)
}

/// Validate PostgreSQL connectivity and that the sales table is readable.
pub async fn validate(client: &Client, config: &Config) -> Result<ValidationResult, ConnectorError> {
    client.query_one("SELECT 1", &[]).await.map_err(|e| {
        ConnectorError::transient_network(
            "CONNECTION_TEST_FAILED",
            format!("Connection test failed: {e}"),
        )
    })?;

    let probe = crate::query::max_id_query(&config.schema, &config.table);
    match client.query_one(&probe, &[]).await {
        Ok(_) => Ok(ValidationResult::success(format!(
            "Connected to {}:{}/{} (table: {}.{})",
            config.host, config.port, config.database, config.schema, config.table
        ))),
        Err(e) => Ok(ValidationResult::failed(format_pg_error(
            "Sales table is not readable",
            &e,
        ))),
    }
}

pub(crate) fn format_pg_error(prefix: &str, error: &tokio_postgres::Error) -> String {
    if let Some(db_error) = error.as_db_error() {
        let detail = db_error.detail().unwrap_or("n/a");
        let hint = db_error.hint().unwrap_or("n/a");
        format!(
            "{prefix}: {} (sqlstate={} severity={} detail={} hint={})",
            db_error.message(),
            db_error.code().code(),
            db_error.severity(),
            detail,
            hint
        )
    } else {
        format!("{prefix}: {error}")
    }
}

/// Retryable SQLSTATE classes (08 connection, 40 rollback, 53 resources, 57 operator).
fn is_transient_sqlstate(code: &str) -> bool {
    ["08", "40", "53", "57"].iter().any(|class| code.starts_with(class))
}

/// Map a driver error onto the connector error model.
pub(crate) fn pg_error(code: &str, prefix: &str, error: &tokio_postgres::Error) -> ConnectorError {
    let message = format_pg_error(prefix, error);
    match error.as_db_error().map(|db| db.code().code()) {
        Some(state) if is_transient_sqlstate(state) => ConnectorError::transient_db(code, message),
        Some(state) if state.starts_with("42") => ConnectorError::schema(code, message),
        Some(_) => ConnectorError::internal(code, message),
        None => ConnectorError::transient_db(code, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_sqlstates() {
        assert!(is_transient_sqlstate("08006"));
        assert!(is_transient_sqlstate("40P01"));
        assert!(is_transient_sqlstate("57014"));
        assert!(!is_transient_sqlstate("42P01"));
        assert!(!is_transient_sqlstate("22P02"));
    }
}
