//! Star-schema rows produced by the transform stage and written by the
//! warehouse sink.

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::sales::TransactionRecord;
use crate::state::Watermark;

/// Two-month grouping of the calendar year: months 1-2 are 1, 11-12 are 6.
#[must_use]
pub fn bimestre(month: u32) -> u32 {
    (month.saturating_sub(1)) / 2 + 1
}

/// Row of the `funcionarios` dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDim {
    pub nome_funcionario: String,
    pub id_funcionario: i64,
}

/// Row of the `categoria` dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDim {
    pub nome_categoria: String,
    pub id_categoria: i64,
}

/// Row of the `calendario` dimension, derived from one distinct sale date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDim {
    pub data_venda: NaiveDate,
    pub dia: u32,
    pub mes: u32,
    pub ano: i32,
    pub bimestre: u32,
}

impl CalendarDim {
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            data_venda: date,
            dia: date.day(),
            mes: date.month(),
            ano: date.year(),
            bimestre: bimestre(date.month()),
        }
    }
}

/// Row of the `vendas` fact table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesFact {
    pub venda: BigDecimal,
    pub id_funcionario: i64,
    pub id_categoria: i64,
    pub data_venda: NaiveDate,
    pub id_venda: i64,
}

/// A transaction joined with its category and employee names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub transaction: TransactionRecord,
    pub nome_categoria: String,
    pub nome_funcionario: String,
}

impl MergedRecord {
    #[must_use]
    pub fn to_fact(&self) -> SalesFact {
        let t = &self.transaction;
        SalesFact {
            venda: t.venda.clone(),
            id_funcionario: t.id_funcionario,
            id_categoria: t.id_categoria,
            data_venda: t.data_venda,
            id_venda: t.id_venda,
        }
    }
}

/// Which reference key failed to resolve for a dropped transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingKey {
    Category,
    Employee,
    Both,
}

impl MissingKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Employee => "employee",
            Self::Both => "both",
        }
    }
}

/// A transaction that could not be joined against the reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinMiss {
    pub id_venda: i64,
    pub id_funcionario: i64,
    pub id_categoria: i64,
    pub missing: MissingKey,
}

/// Everything one run writes to the warehouse, deduplicated and ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarBatch {
    pub employees: Vec<EmployeeDim>,
    pub categories: Vec<CategoryDim>,
    pub calendar: Vec<CalendarDim>,
    pub facts: Vec<SalesFact>,
    /// Maximum `id_venda` of the extracted batch; the next watermark.
    pub high_watermark: Watermark,
}

impl StarBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Row counts written per table by a successful load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub employees: u64,
    pub categories: u64,
    pub calendar: u64,
    pub facts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bimestre_pairs_months() {
        let expected = [1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6];
        for (i, want) in expected.iter().enumerate() {
            let month = u32::try_from(i).unwrap() + 1;
            assert_eq!(bimestre(month), *want, "month {month}");
        }
    }

    #[test]
    fn calendar_from_date() {
        let date = NaiveDate::from_ymd_opt(2017, 11, 30).unwrap();
        let cal = CalendarDim::from_date(date);
        assert_eq!(cal.dia, 30);
        assert_eq!(cal.mes, 11);
        assert_eq!(cal.ano, 2017);
        assert_eq!(cal.bimestre, 6);
    }

    #[test]
    fn merged_record_projects_fact_columns() {
        let merged = MergedRecord {
            transaction: TransactionRecord {
                id_venda: 101,
                id_funcionario: 3,
                id_categoria: 7,
                data_venda: NaiveDate::from_ymd_opt(2017, 1, 2).unwrap(),
                venda: "1520.50".parse().unwrap(),
            },
            nome_categoria: "Higiene".into(),
            nome_funcionario: "Ana".into(),
        };
        let fact = merged.to_fact();
        assert_eq!(fact.id_venda, 101);
        assert_eq!(fact.id_funcionario, 3);
        assert_eq!(fact.id_categoria, 7);
        assert_eq!(fact.venda.to_string(), "1520.50");
    }

    #[test]
    fn missing_key_as_str() {
        assert_eq!(MissingKey::Category.as_str(), "category");
        assert_eq!(MissingKey::Employee.as_str(), "employee");
        assert_eq!(MissingKey::Both.as_str(), "both");
    }
}
