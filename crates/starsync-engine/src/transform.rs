//! Merge transactions with reference data and shape the star schema.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use starsync_types::sales::TransactionRecord;
use starsync_types::star::{
    CalendarDim, CategoryDim, EmployeeDim, JoinMiss, MergedRecord, MissingKey, StarBatch,
};
use starsync_types::state::Watermark;

use crate::config::types::JoinMissPolicy;
use crate::enrich::EmployeeNames;
use crate::errors::PipelineError;
use crate::reference::CategoryIndex;

/// Output of the join: matched rows plus everything that did not match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutput {
    pub merged: Vec<MergedRecord>,
    pub misses: Vec<JoinMiss>,
}

/// Inner-join transactions against categories and employee names.
#[must_use]
pub fn merge(
    transactions: &[TransactionRecord],
    categories: &CategoryIndex,
    names: &EmployeeNames,
) -> MergeOutput {
    let mut out = MergeOutput::default();
    for t in transactions {
        let category = categories.get(&t.id_categoria);
        let employee = names.get(&t.id_funcionario);
        match (category, employee) {
            (Some(nome_categoria), Some(nome_funcionario)) => out.merged.push(MergedRecord {
                transaction: t.clone(),
                nome_categoria: nome_categoria.clone(),
                nome_funcionario: nome_funcionario.clone(),
            }),
            (cat, emp) => out.misses.push(JoinMiss {
                id_venda: t.id_venda,
                id_funcionario: t.id_funcionario,
                id_categoria: t.id_categoria,
                missing: match (cat.is_none(), emp.is_none()) {
                    (true, true) => MissingKey::Both,
                    (true, false) => MissingKey::Category,
                    _ => MissingKey::Employee,
                },
            }),
        }
    }
    out
}

/// Apply the configured join-miss policy.
///
/// # Errors
///
/// `JoinMiss` under [`JoinMissPolicy::Fail`] when anything missed.
pub fn apply_join_policy(
    output: MergeOutput,
    policy: JoinMissPolicy,
) -> Result<MergeOutput, PipelineError> {
    if output.misses.is_empty() {
        return Ok(output);
    }
    match policy {
        JoinMissPolicy::Drop => {
            tracing::warn!(
                join_misses = output.misses.len(),
                merged = output.merged.len(),
                "Dropping transactions that did not join"
            );
            Ok(output)
        }
        JoinMissPolicy::Fail => Err(PipelineError::JoinMiss {
            misses: output.misses,
        }),
    }
}

/// Build deduplicated, ordered dimension and fact rows.
#[must_use]
pub fn build_star(merged: &[MergedRecord], high_watermark: Watermark) -> StarBatch {
    let mut employees: BTreeMap<i64, EmployeeDim> = BTreeMap::new();
    let mut categories: BTreeMap<i64, CategoryDim> = BTreeMap::new();
    let mut calendar: BTreeMap<NaiveDate, CalendarDim> = BTreeMap::new();
    let mut facts = Vec::with_capacity(merged.len());

    for m in merged {
        let t = &m.transaction;
        employees
            .entry(t.id_funcionario)
            .or_insert_with(|| EmployeeDim {
                nome_funcionario: m.nome_funcionario.clone(),
                id_funcionario: t.id_funcionario,
            });
        categories
            .entry(t.id_categoria)
            .or_insert_with(|| CategoryDim {
                nome_categoria: m.nome_categoria.clone(),
                id_categoria: t.id_categoria,
            });
        calendar
            .entry(t.data_venda)
            .or_insert_with(|| CalendarDim::from_date(t.data_venda));
        facts.push(m.to_fact());
    }
    facts.sort_by_key(|f| f.id_venda);

    StarBatch {
        employees: employees.into_values().collect(),
        categories: categories.into_values().collect(),
        calendar: calendar.into_values().collect(),
        facts,
        high_watermark,
    }
}
