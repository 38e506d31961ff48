//! Source-side records: sales transactions and the reference data that
//! enriches them.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the transactional `venda` table.
///
/// Immutable once extracted. `id_venda` is source-assigned and strictly
/// increasing, which is what makes it usable as a watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id_venda: i64,
    pub id_funcionario: i64,
    pub id_categoria: i64,
    pub data_venda: NaiveDate,
    pub venda: BigDecimal,
}

/// One row of the category reference snapshot, keyed by `id_categoria`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id_categoria: i64,
    pub nome_categoria: String,
}

/// Outcome of looking up a single employee id.
///
/// `Resolved("")` is a legitimate empty name returned by a successful call.
/// `Unresolved` means the lookup itself failed and no name is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NameResolution {
    Resolved { name: String },
    Unresolved { reason: String },
}

impl NameResolution {
    #[must_use]
    pub fn resolved(name: impl Into<String>) -> Self {
        Self::Resolved { name: name.into() }
    }

    #[must_use]
    pub fn unresolved(reason: impl Into<String>) -> Self {
        Self::Unresolved {
            reason: reason.into(),
        }
    }

    /// The resolved name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Resolved { name } => Some(name),
            Self::Unresolved { .. } => None,
        }
    }
}
