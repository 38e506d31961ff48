//! [`ReferenceSource`] over a remote Parquet file.
//!
//! The file is downloaded in full, staged to a temporary file, read back
//! with the Arrow reader and projected onto `(id_categoria, nome_categoria)`.
//! The staging file is removed when the fetch returns, success or not.

use std::io::Write;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Int64Type};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::ChunkReader;
use starsync_sdk::prelude::*;
use tempfile::NamedTempFile;

use crate::config::{ReferenceConfig, CANONICAL_KEY};
use crate::http::{build_client, request_error, retry_after_ms, status_error};

pub struct ParquetReference {
    config: ReferenceConfig,
    http: reqwest::Client,
}

impl ParquetReference {
    pub fn new(config: ReferenceConfig) -> Result<Self, ConnectorError> {
        config.validate()?;
        let http = build_client(config.timeout_secs)?;
        Ok(Self { config, http })
    }

    async fn download(&self) -> Result<Bytes, ConnectorError> {
        let resp = self
            .http
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| request_error("Reference download failed", &e))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = retry_after_ms(resp.headers());
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(
                "Reference download failed",
                status,
                retry_after,
                &body,
            ));
        }

        resp.bytes()
            .await
            .map_err(|e| request_error("Reference body read failed", &e))
    }

    fn stage(&self, body: &[u8]) -> Result<NamedTempFile, ConnectorError> {
        let io_err = |e: std::io::Error| ConnectorError::internal("STAGING_IO", e.to_string());
        let mut staged = match &self.config.staging_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(io_err)?;
                NamedTempFile::new_in(dir)
            }
            None => NamedTempFile::new(),
        }
        .map_err(io_err)?;
        staged.write_all(body).map_err(io_err)?;
        staged.flush().map_err(io_err)?;
        Ok(staged)
    }
}

impl ReferenceSource for ParquetReference {
    async fn fetch_categories(&self) -> Result<Vec<CategoryRecord>, ConnectorError> {
        let body = self.download().await?;
        let staged = self.stage(&body)?;
        tracing::debug!(
            url = %self.config.url,
            bytes = body.len(),
            staged = %staged.path().display(),
            "reference-http: staged reference file"
        );

        let file = staged
            .reopen()
            .map_err(|e| ConnectorError::internal("STAGING_IO", e.to_string()))?;
        let records =
            read_categories(file, &self.config.key_column, &self.config.name_column)?.records;

        tracing::info!(
            url = %self.config.url,
            categories = records.len(),
            "reference-http: loaded category reference"
        );
        Ok(records)
    }
}

#[derive(Debug)]
struct CategorySnapshot {
    records: Vec<CategoryRecord>,
    /// Keys whose name was null and loaded as "".
    blank_names: Vec<i64>,
}

fn read_categories<R: ChunkReader + 'static>(
    reader: R,
    key_column: &str,
    name_column: &str,
) -> Result<CategorySnapshot, ConnectorError> {
    let parquet_err =
        |e: parquet::errors::ParquetError| ConnectorError::data("INVALID_PARQUET", e.to_string());
    let batches = ParquetRecordBatchReaderBuilder::try_new(reader)
        .map_err(parquet_err)?
        .build()
        .map_err(parquet_err)?;

    let mut snapshot = CategorySnapshot {
        records: Vec::new(),
        blank_names: Vec::new(),
    };
    for batch in batches {
        let batch = batch.map_err(|e| ConnectorError::data("INVALID_PARQUET", e.to_string()))?;
        append_batch(&batch, key_column, name_column, &mut snapshot)?;
    }
    if !snapshot.blank_names.is_empty() {
        tracing::warn!(
            count = snapshot.blank_names.len(),
            ids = ?snapshot.blank_names,
            "reference-http: null {name_column} loaded as empty name"
        );
    }
    Ok(snapshot)
}

fn append_batch(
    batch: &RecordBatch,
    key_column: &str,
    name_column: &str,
    out: &mut CategorySnapshot,
) -> Result<(), ConnectorError> {
    let key_name = resolve_key_column(batch, key_column)?;
    let keys = column_as(batch, key_name, &DataType::Int64)?;
    let names = column_as(batch, name_column, &DataType::Utf8)?;
    let keys = keys.as_primitive::<Int64Type>();
    let names = names.as_string::<i32>();

    out.records.reserve(batch.num_rows());
    for row in 0..batch.num_rows() {
        if keys.is_null(row) {
            return Err(ConnectorError::data(
                "NULL_KEY",
                format!("Reference row {row} has a null or non-integer '{key_name}'"),
            ));
        }
        let id_categoria = keys.value(row);
        let nome_categoria = if names.is_null(row) {
            out.blank_names.push(id_categoria);
            String::new()
        } else {
            names.value(row).to_string()
        };
        out.records.push(CategoryRecord {
            id_categoria,
            nome_categoria,
        });
    }
    Ok(())
}

/// Configured key column, else the canonical one if the file already uses it.
fn resolve_key_column<'a>(
    batch: &RecordBatch,
    key_column: &'a str,
) -> Result<&'a str, ConnectorError> {
    let schema = batch.schema();
    if schema.index_of(key_column).is_ok() {
        return Ok(key_column);
    }
    if schema.index_of(CANONICAL_KEY).is_ok() {
        return Ok(CANONICAL_KEY);
    }
    Err(ConnectorError::schema(
        "MISSING_COLUMN",
        format!("Reference file has neither '{key_column}' nor '{CANONICAL_KEY}'"),
    ))
}

fn column_as(batch: &RecordBatch, name: &str, to: &DataType) -> Result<ArrayRef, ConnectorError> {
    let idx = batch.schema().index_of(name).map_err(|_| {
        ConnectorError::schema(
            "MISSING_COLUMN",
            format!("Reference file has no column '{name}'"),
        )
    })?;
    arrow::compute::cast(batch.column(idx), to).map_err(|e| {
        ConnectorError::schema(
            "COLUMN_TYPE",
            format!("Column '{name}' cannot be read as {to}: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{Int32Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use parquet::arrow::ArrowWriter;

    fn parquet_bytes(batch: &RecordBatch) -> Bytes {
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), None).unwrap();
        writer.write(batch).unwrap();
        writer.close().unwrap();
        Bytes::from(buf)
    }

    fn category_batch(key: &str, ids: Vec<Option<i64>>, names: Vec<Option<&str>>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new(key, DataType::Int64, true),
            Field::new("nome_categoria", DataType::Utf8, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(ids)),
                Arc::new(StringArray::from(names)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn renames_id_to_id_categoria() {
        let batch = category_batch(
            "id",
            vec![Some(1), Some(2)],
            vec![Some("Eletrônicos"), Some("Livros")],
        );
        let rows = read_categories(parquet_bytes(&batch), "id", "nome_categoria")
            .unwrap()
            .records;
        assert_eq!(
            rows,
            vec![
                CategoryRecord {
                    id_categoria: 1,
                    nome_categoria: "Eletrônicos".into()
                },
                CategoryRecord {
                    id_categoria: 2,
                    nome_categoria: "Livros".into()
                },
            ]
        );
    }

    #[test]
    fn canonical_key_accepted_when_configured_key_absent() {
        let batch = category_batch("id_categoria", vec![Some(7)], vec![Some("Moda")]);
        let rows = read_categories(parquet_bytes(&batch), "id", "nome_categoria")
            .unwrap()
            .records;
        assert_eq!(rows[0].id_categoria, 7);
    }

    #[test]
    fn int32_keys_are_widened() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("nome_categoria", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![3])),
                Arc::new(StringArray::from(vec!["Casa"])),
            ],
        )
        .unwrap();
        let rows = read_categories(parquet_bytes(&batch), "id", "nome_categoria")
            .unwrap()
            .records;
        assert_eq!(rows[0].id_categoria, 3);
    }

    #[test]
    fn null_key_is_data_error() {
        let batch = category_batch("id", vec![None], vec![Some("x")]);
        let err = read_categories(parquet_bytes(&batch), "id", "nome_categoria").unwrap_err();
        assert_eq!(err.category, ErrorCategory::Data);
        assert_eq!(err.code, "NULL_KEY");
    }

    #[test]
    fn null_name_becomes_empty_and_is_reported() {
        let batch = category_batch("id", vec![Some(1), Some(2)], vec![None, Some("Livros")]);
        let snapshot = read_categories(parquet_bytes(&batch), "id", "nome_categoria").unwrap();
        assert_eq!(snapshot.records[0].nome_categoria, "");
        assert_eq!(snapshot.records[1].nome_categoria, "Livros");
        assert_eq!(snapshot.blank_names, vec![1]);
    }

    #[test]
    fn missing_name_column_is_schema_error() {
        let batch = category_batch("id", vec![Some(1)], vec![Some("x")]);
        let err = read_categories(parquet_bytes(&batch), "id", "categoria").unwrap_err();
        assert_eq!(err.category, ErrorCategory::Schema);
        assert_eq!(err.code, "MISSING_COLUMN");
    }

    #[test]
    fn garbage_body_is_data_error() {
        let err = read_categories(Bytes::from_static(b"<html>"), "id", "nome_categoria")
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::Data);
    }

    fn reference_for(url: String, staging: &std::path::Path) -> ParquetReference {
        ParquetReference::new(ReferenceConfig {
            url,
            key_column: "id".into(),
            name_column: "nome_categoria".into(),
            staging_dir: Some(staging.to_path_buf()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_downloads_and_cleans_staging() {
        let server = wiremock::MockServer::start().await;
        let batch = category_batch("id", vec![Some(1), Some(2)], vec![Some("A"), Some("B")]);
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/categoria.parquet"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_bytes(parquet_bytes(&batch).to_vec()),
            )
            .mount(&server)
            .await;

        let staging = tempfile::tempdir().unwrap();
        let reference = reference_for(format!("{}/categoria.parquet", server.uri()), staging.path());
        let rows = reference.fetch_categories().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503).set_body_string("boom"))
            .mount(&server)
            .await;

        let staging = tempfile::tempdir().unwrap();
        let reference = reference_for(format!("{}/categoria.parquet", server.uri()), staging.path());
        let err = reference.fetch_categories().await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::TransientNetwork);
        assert!(err.retryable);
    }

    #[tokio::test]
    async fn not_found_is_upstream() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let staging = tempfile::tempdir().unwrap();
        let reference = reference_for(format!("{}/categoria.parquet", server.uri()), staging.path());
        let err = reference.fetch_categories().await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Upstream);
        assert_eq!(err.code, "HTTP_404");
    }

    #[tokio::test]
    async fn corrupt_download_leaves_no_staging_file() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"not parquet".to_vec()))
            .mount(&server)
            .await;

        let staging = tempfile::tempdir().unwrap();
        let reference = reference_for(format!("{}/categoria.parquet", server.uri()), staging.path());
        assert!(reference.fetch_categories().await.is_err());
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }
}
