//! Category reference snapshot fetch and indexing.

use std::collections::BTreeMap;

use starsync_sdk::connector::ReferenceSource;
use starsync_types::sales::CategoryRecord;

use crate::errors::{PipelineError, Upstream};
use crate::retry::with_retry;

/// `id_categoria -> nome_categoria` for the current snapshot.
pub type CategoryIndex = BTreeMap<i64, String>;

/// Fetch the full category snapshot.
///
/// # Errors
///
/// `UpstreamUnavailable` once retries are spent.
pub async fn fetch_reference<R: ReferenceSource>(
    reference: &R,
    max_retries: u32,
) -> Result<CategoryIndex, PipelineError> {
    let records = with_retry("reference", max_retries, || reference.fetch_categories())
        .await
        .map_err(|error| PipelineError::UpstreamUnavailable {
            upstream: Upstream::ReferenceFile,
            error,
        })?;
    let index = index_categories(records);
    tracing::info!(categories = index.len(), "Fetched category reference");
    Ok(index)
}

/// Index by key. The first row for a repeated key wins.
#[must_use]
pub fn index_categories(records: Vec<CategoryRecord>) -> CategoryIndex {
    let mut index = CategoryIndex::new();
    let mut duplicates = 0usize;
    for record in records {
        if index.contains_key(&record.id_categoria) {
            duplicates += 1;
            continue;
        }
        index.insert(record.id_categoria, record.nome_categoria);
    }
    if duplicates > 0 {
        tracing::warn!(
            duplicates,
            "Category reference has repeated keys; keeping the first row for each"
        );
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(id: i64, name: &str) -> CategoryRecord {
        CategoryRecord {
            id_categoria: id,
            nome_categoria: name.to_string(),
        }
    }

    #[test]
    fn first_duplicate_wins() {
        let index = index_categories(vec![cat(2, "Livros"), cat(1, "Moda"), cat(2, "Outro")]);
        assert_eq!(index.len(), 2);
        assert_eq!(index[&2], "Livros");
        assert_eq!(index[&1], "Moda");
    }

    #[test]
    fn empty_snapshot_indexes_to_empty() {
        assert!(index_categories(Vec::new()).is_empty());
    }
}
