//! Employee name resolution: one lookup per distinct id.

use std::collections::{BTreeMap, BTreeSet};

use futures_util::stream::{self, StreamExt};
use starsync_sdk::connector::NameLookup;
use starsync_types::error::ConnectorError;
use starsync_types::sales::{NameResolution, TransactionRecord};

use crate::errors::{PipelineError, Upstream};
use crate::retry::with_retry;

/// Unresolved ids listed in the error message.
const UNRESOLVED_SAMPLE: usize = 10;

/// `id_funcionario -> nome_funcionario` for every id in the batch.
pub type EmployeeNames = BTreeMap<i64, String>;

#[must_use]
pub fn distinct_employee_ids(rows: &[TransactionRecord]) -> BTreeSet<i64> {
    rows.iter().map(|r| r.id_funcionario).collect()
}

/// Look up every id once, at most `concurrency` calls in flight.
///
/// A lookup that still fails after retries is recorded as
/// [`NameResolution::Unresolved`]; it never becomes a name.
pub async fn resolve_names<L: NameLookup>(
    lookup: &L,
    ids: &BTreeSet<i64>,
    concurrency: usize,
    max_retries: u32,
) -> BTreeMap<i64, NameResolution> {
    let resolutions: BTreeMap<i64, NameResolution> = stream::iter(ids.iter().copied())
        .map(|id| async move {
            let resolution = match with_retry("lookup", max_retries, || lookup.lookup(id)).await {
                Ok(name) => NameResolution::resolved(name),
                Err(e) => {
                    tracing::warn!(id_funcionario = id, error = %e, "Name lookup failed");
                    NameResolution::unresolved(e.to_string())
                }
            };
            (id, resolution)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let unresolved = resolutions.values().filter(|r| r.name().is_none()).count();
    tracing::info!(
        employees = ids.len(),
        unresolved,
        concurrency,
        "Resolved employee names"
    );
    resolutions
}

/// Unwrap resolutions into names, or abort if any id is unresolved.
///
/// # Errors
///
/// `UpstreamUnavailable` listing the unresolved ids.
pub fn require_resolved(
    resolutions: BTreeMap<i64, NameResolution>,
) -> Result<EmployeeNames, PipelineError> {
    let mut names = EmployeeNames::new();
    let mut failed: Vec<(i64, String)> = Vec::new();
    for (id, resolution) in resolutions {
        match resolution {
            NameResolution::Resolved { name } => {
                names.insert(id, name);
            }
            NameResolution::Unresolved { reason } => failed.push((id, reason)),
        }
    }

    if failed.is_empty() {
        return Ok(names);
    }

    let sample: Vec<String> = failed
        .iter()
        .take(UNRESOLVED_SAMPLE)
        .map(|(id, _)| id.to_string())
        .collect();
    let details: Vec<serde_json::Value> = failed
        .iter()
        .map(|(id, reason)| serde_json::json!({ "id_funcionario": id, "reason": reason }))
        .collect();
    Err(PipelineError::UpstreamUnavailable {
        upstream: Upstream::NameLookup,
        error: ConnectorError::upstream(
            "UNRESOLVED_NAMES",
            format!(
                "{} employee id(s) could not be resolved: {}{}",
                failed.len(),
                sample.join(", "),
                if failed.len() > UNRESOLVED_SAMPLE { ", ..." } else { "" }
            ),
        )
        .with_details(serde_json::Value::Array(details)),
    })
}
