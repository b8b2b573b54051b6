// src/check.rs

use prettytable::{format, Cell, Row, Table};
use std::fmt;

use crate::pivot::{AdmissionsPolicy, PolicyPivot, PolicyRolls};

/// Sanity check for one familiar authority: its pivot row and selective share, looked up
/// by policy name.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorityCheck {
    pub la_name: String,
    pub rolls: PolicyRolls,
}

impl AuthorityCheck {
    pub fn for_authority(pivot: &PolicyPivot, la_name: &str) -> Option<Self> {
        pivot.get(la_name).map(|rolls| Self {
            la_name: la_name.to_string(),
            rolls: rolls.clone(),
        })
    }

    pub fn selective(&self) -> Option<f64> {
        self.rolls.get(AdmissionsPolicy::Selective)
    }

    pub fn total(&self) -> Option<f64> {
        self.rolls.get(AdmissionsPolicy::Total)
    }

    pub fn ratio(&self) -> Option<f64> {
        match (self.selective(), self.total()) {
            (Some(s), Some(t)) if t != 0.0 => Some(s / t),
            _ => None,
        }
    }

    /// Authority as the row index, one column per admissions policy present.
    pub fn pivot_table(&self) -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);

        let mut header = vec![Cell::new("la_name").style_spec("bFg")];
        let mut values = vec![Cell::new(&self.la_name)];
        for (policy, roll) in self.rolls.iter() {
            header.push(Cell::new(policy.as_str()).style_spec("bFg"));
            values.push(Cell::new(&fmt_count(roll)).style_spec("r"));
        }
        table.set_titles(Row::new(header));
        table.add_row(Row::new(values));
        table
    }
}

impl fmt::Display for AuthorityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: Option<f64>| v.map(fmt_count).unwrap_or_else(|| "n/a".to_string());
        write!(
            f,
            "CHECK: {} out of {} children in {} are in grammars. This is {} of the total",
            opt(self.selective()),
            opt(self.total()),
            self.la_name,
            self.ratio()
                .map(|r| format!("{:.4}", r))
                .unwrap_or_else(|| "n/a".to_string()),
        )
    }
}

/// Whole numbers without a trailing `.0`.
fn fmt_count(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{:.1}", v)
    }
}
