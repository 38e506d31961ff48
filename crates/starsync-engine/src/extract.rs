//! Incremental extraction and empty-result validation.

use starsync_sdk::connector::SalesSource;
use starsync_types::error::ConnectorError;
use starsync_types::sales::TransactionRecord;
use starsync_types::state::Watermark;

use crate::errors::PipelineError;
use crate::retry::with_retry;

/// Result of the extract stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Rows above the watermark, ordered by `id_venda`.
    Batch(Vec<TransactionRecord>),
    /// Nothing above the watermark and the source agrees with it.
    NoNewData,
}

/// Pull every transaction above `watermark`.
///
/// An empty result is checked against the source maximum id: equal means
/// [`Extraction::NoNewData`], anything else is a
/// [`PipelineError::CheckpointInconsistency`].
///
/// # Errors
///
/// `Extract` when the source fails or returns rows at or below the
/// watermark; `CheckpointInconsistency` as described above.
pub async fn extract<S: SalesSource>(
    source: &S,
    watermark: Watermark,
    max_retries: u32,
) -> Result<Extraction, PipelineError> {
    let mut rows = with_retry("extract", max_retries, || source.fetch_since(watermark))
        .await
        .map_err(PipelineError::Extract)?;

    if rows.is_empty() {
        let source_max = with_retry("max_id", max_retries, || source.max_id())
            .await
            .map_err(PipelineError::Extract)?;
        return classify_empty(watermark, source_max);
    }

    check_rows_above(watermark, &rows).map_err(PipelineError::Extract)?;
    rows.sort_by_key(|r| r.id_venda);

    tracing::info!(
        watermark = %watermark,
        rows = rows.len(),
        first_id = rows.first().map(|r| r.id_venda),
        last_id = rows.last().map(|r| r.id_venda),
        "Extracted new transactions"
    );
    Ok(Extraction::Batch(rows))
}

/// Decide what an empty extraction means given the source's maximum id.
///
/// # Errors
///
/// `CheckpointInconsistency` whenever `source_max != watermark`.
pub fn classify_empty(
    watermark: Watermark,
    source_max: Watermark,
) -> Result<Extraction, PipelineError> {
    if source_max == watermark {
        tracing::info!(watermark = %watermark, "No new data since last run");
        Ok(Extraction::NoNewData)
    } else {
        tracing::error!(
            watermark = %watermark,
            source_max = %source_max,
            "Empty extraction but source maximum id disagrees with watermark"
        );
        Err(PipelineError::CheckpointInconsistency {
            watermark,
            source_max,
        })
    }
}

/// Every row must satisfy `id_venda > watermark`.
///
/// # Errors
///
/// A `data` error naming the first offending row.
pub fn check_rows_above(
    watermark: Watermark,
    rows: &[TransactionRecord],
) -> Result<(), ConnectorError> {
    match rows.iter().find(|r| r.id_venda <= watermark.value()) {
        None => Ok(()),
        Some(bad) => Err(ConnectorError::data(
            "WATERMARK_FILTER_VIOLATED",
            format!(
                "Source returned id_venda {} which is not above watermark {watermark}",
                bad.id_venda
            ),
        )
        .with_details(serde_json::json!({
            "id_venda": bad.id_venda,
            "watermark": watermark.value(),
        }))),
    }
}

/// Maximum `id_venda` of a batch, or `floor` for an empty one.
#[must_use]
pub fn high_watermark(rows: &[TransactionRecord], floor: Watermark) -> Watermark {
    rows.iter()
        .map(|r| Watermark::new(r.id_venda))
        .max()
        .map_or(floor, |max| max.max(floor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn tx(id_venda: i64) -> TransactionRecord {
        TransactionRecord {
            id_venda,
            id_funcionario: 1,
            id_categoria: 1,
            data_venda: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
            venda: BigDecimal::from(10),
        }
    }

    #[test]
    fn empty_with_matching_max_is_no_new_data() {
        let out = classify_empty(Watermark::new(100), Watermark::new(100)).unwrap();
        assert_eq!(out, Extraction::NoNewData);
    }

    #[test]
    fn empty_with_lower_max_is_inconsistent() {
        let err = classify_empty(Watermark::new(100), Watermark::new(87)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::CheckpointInconsistency { watermark, source_max }
                if watermark == Watermark::new(100) && source_max == Watermark::new(87)
        ));
    }

    #[test]
    fn empty_with_higher_max_is_inconsistent() {
        assert!(classify_empty(Watermark::new(100), Watermark::new(120)).is_err());
    }

    #[test]
    fn first_run_against_empty_source_is_no_new_data() {
        let out = classify_empty(Watermark::UNSET, Watermark::UNSET).unwrap();
        assert_eq!(out, Extraction::NoNewData);
    }

    #[test]
    fn rows_at_watermark_rejected() {
        let err = check_rows_above(Watermark::new(100), &[tx(101), tx(100)]).unwrap_err();
        assert_eq!(err.code, "WATERMARK_FILTER_VIOLATED");
        assert!(check_rows_above(Watermark::new(100), &[tx(101), tx(102)]).is_ok());
    }

    #[test]
    fn high_watermark_is_batch_max() {
        let rows = [tx(103), tx(101), tx(102)];
        assert_eq!(high_watermark(&rows, Watermark::new(100)), Watermark::new(103));
        assert_eq!(high_watermark(&[], Watermark::new(100)), Watermark::new(100));
    }
}
