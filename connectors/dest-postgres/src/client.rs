//! PostgreSQL client connection and validation helpers for dest-postgres.

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
    pg.application_name("starsync-dest");
    pg.connect_timeout(Duration::from_secs(config.connect_timeout_secs));

    let (client, connection) = pg
        .connect(NoTls)
        .await
        .map_err(|e| pg_error("CONNECTION_FAILED", "Connection failed", &e))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "dest-postgres: connection error");
        }
    });

    Ok(client)
}

/// Validate PostgreSQL connectivity and target schema.
pub async fn validate(client: &Client, config: &Config) -> Result<ValidationResult, ConnectorError> {
    client.query_one("SELECT 1", &[]).await.map_err(|e| {
        ConnectorError::transient_network(
            "CONNECTION_TEST_FAILED",
            format!("Connection test failed: {e}"),
        )
    })?;

    let schema_check = client
        .query_opt(
            "SELECT schema_name FROM information_schema.schemata WHERE schema_name = $1",
            &[&config.schema],
        )
        .await
        .map_err(|e| pg_error("SCHEMA_CHECK_FAILED", "Schema check failed", &e))?;

    let message = match schema_check {
        Some(_) => format!(
            "Connected to {}:{}/{} (schema: {})",
            config.host, config.port, config.database, config.schema
        ),
        None => format!(
            "Connected to {}:{}/{} (schema '{}' will be created on first load)",
            config.host, config.port, config.database, config.schema
        ),
    };
    Ok(ValidationResult::success(message))
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

/// Map a driver error onto the connector error model.
///
/// Errors without a SQLSTATE are connection-level and treated as transient.
pub(crate) fn pg_error(code: &str, prefix: &str, error: &tokio_postgres::Error) -> ConnectorError {
    let message = format_pg_error(prefix, error);
    match error.as_db_error().map(|db| db.code().code()) {
        Some(state) if ["08", "40", "53", "57"].iter().any(|c| state.starts_with(c)) => {
            ConnectorError::transient_db(code, message)
        }
        Some(state) if state.starts_with("42") => ConnectorError::schema(code, message),
        Some(state) if state.starts_with("22") || state.starts_with("23") => {
            ConnectorError::data(code, message)
        }
        Some(_) => ConnectorError::internal(code, message),
        None => ConnectorError::transient_db(code, message),
    }
}
