// src/pivot/mod.rs

pub mod policy;

use anyhow::Result;
use arrow::{array::Array, record_batch::RecordBatch};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::columns::{int_column, string_column, ADMISSIONS_POLICY, LA_NAME, ROLL};
pub use policy::AdmissionsPolicy;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Cell {
    sum: i64,
    count: u32,
}

/// Roll per admissions policy for one authority. A cell fed more than once reports
/// the mean of its values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyRolls {
    cells: BTreeMap<AdmissionsPolicy, Cell>,
}

impl PolicyRolls {
    pub fn insert(&mut self, policy: AdmissionsPolicy, roll: i64) {
        let cell = self.cells.entry(policy).or_default();
        cell.sum += roll;
        cell.count += 1;
    }

    pub fn get(&self, policy: AdmissionsPolicy) -> Option<f64> {
        self.cells
            .get(&policy)
            .filter(|c| c.count > 0)
            .map(|c| c.sum as f64 / c.count as f64)
    }

    /// Present policies in label order.
    pub fn iter(&self) -> impl Iterator<Item = (AdmissionsPolicy, f64)> + '_ {
        AdmissionsPolicy::ALL
            .into_iter()
            .filter_map(move |p| self.get(p).map(|v| (p, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Policies that received more than one row.
    pub fn duplicates(&self) -> impl Iterator<Item = AdmissionsPolicy> + '_ {
        self.cells
            .iter()
            .filter(|(_, c)| c.count > 1)
            .map(|(p, _)| *p)
    }

    /// Pupils outside selective schools. Schools with an `Unknown` admissions policy are
    /// counted here: in the published data they are non-selective schools whose policy
    /// was not recorded.
    pub fn non_selective_incl_unknown(&self) -> Option<f64> {
        let parts: Vec<f64> = [AdmissionsPolicy::NonSelective, AdmissionsPolicy::Unknown]
            .into_iter()
            .filter_map(|p| self.get(p))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.iter().sum())
        }
    }

    /// Sum of every non-`Total` category, if any is present.
    pub fn sum_of_parts(&self) -> Option<f64> {
        let parts: Vec<f64> = self
            .iter()
            .filter(|(p, _)| *p != AdmissionsPolicy::Total)
            .map(|(_, v)| v)
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.iter().sum())
        }
    }
}

/// Wide form of the filtered rows: one entry per local authority, one cell per
/// admissions policy, valued by roll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyPivot {
    rows: BTreeMap<String, PolicyRolls>,
}

impl PolicyPivot {
    /// Register an authority even if it never gets a value.
    pub fn touch(&mut self, la_name: &str) -> &mut PolicyRolls {
        self.rows.entry(la_name.to_string()).or_default()
    }

    pub fn insert(&mut self, la_name: &str, policy: AdmissionsPolicy, roll: i64) {
        self.touch(la_name).insert(policy, roll);
    }

    pub fn get(&self, la_name: &str) -> Option<&PolicyRolls> {
        self.rows.get(la_name)
    }

    /// Authorities in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PolicyRolls)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Pivot rows carrying `la_name`, `admissions_policy` and `roll` into a [`PolicyPivot`].
///
/// Rows with a null roll still register their authority. Rows with a null authority or
/// an unrecognised policy label are skipped.
pub fn pivot_by_policy(batch: &RecordBatch) -> Result<PolicyPivot> {
    let names = string_column(batch, LA_NAME)?;
    let policies = string_column(batch, ADMISSIONS_POLICY)?;
    let rolls = int_column(batch, ROLL)?;

    let mut pivot = PolicyPivot::default();
    let mut unknown_labels = BTreeSet::new();
    let mut skipped = 0usize;

    for i in 0..batch.num_rows() {
        if names.is_null(i) {
            skipped += 1;
            continue;
        }
        let rolls_for_la = pivot.touch(names.value(i));
        if rolls.is_null(i) || policies.is_null(i) {
            continue;
        }
        match AdmissionsPolicy::from_label(policies.value(i)) {
            Some(policy) => rolls_for_la.insert(policy, rolls.value(i)),
            None => {
                unknown_labels.insert(policies.value(i).to_string());
            }
        }
    }

    if skipped > 0 {
        debug!(skipped, "rows without a local authority name");
    }
    for label in &unknown_labels {
        warn!(label = %label, "unrecognised admissions policy skipped");
    }
    for (la, rolls) in pivot.iter() {
        for policy in rolls.duplicates() {
            warn!(
                la_name = la,
                policy = policy.as_str(),
                "several rows for one cell; using their mean"
            );
        }
    }

    debug!(authorities = pivot.len(), "pivoted by admissions policy");
    Ok(pivot)
}

/// An authority whose `Total` does not equal the sum of its policy categories.
#[derive(Debug, Clone, PartialEq)]
pub struct Discrepancy {
    pub la_name: String,
    pub total: Option<f64>,
    pub parts: f64,
}

/// Check that `Total` equals Selective + Non-selective + Not applicable + Unknown for
/// every authority. A mismatch means the pinning left double-counted rows in, or a
/// category was suppressed, and the selective share may be off.
pub fn reconcile(pivot: &PolicyPivot) -> Vec<Discrepancy> {
    pivot
        .iter()
        .filter_map(|(la, rolls)| {
            let parts = rolls.sum_of_parts()?;
            let total = rolls.get(AdmissionsPolicy::Total);
            match total {
                Some(t) if (t - parts).abs() < 0.5 => None,
                _ => Some(Discrepancy {
                    la_name: la.to_string(),
                    total,
                    parts,
                }),
            }
        })
        .collect()
}
