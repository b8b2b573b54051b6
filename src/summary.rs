// src/summary.rs

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::pivot::{AdmissionsPolicy, PolicyPivot};

/// One bar in the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub la_name: String,
    pub selective: i64,
    pub total: i64,
    /// `selective / total`; `None` when the authority has no recorded pupils.
    pub pct: Option<f64>,
}

impl SummaryRow {
    pub fn new(la_name: impl Into<String>, selective: i64, total: i64) -> Self {
        Self {
            la_name: la_name.into(),
            selective,
            total,
            pct: share(selective, total),
        }
    }
}

fn share(selective: i64, total: i64) -> Option<f64> {
    (total != 0).then(|| selective as f64 / total as f64)
}

/// Reduce the pivot to Selective and Total per authority, sorted for plotting.
///
/// Missing cells count as zero and mean cells are truncated to whole pupils. Rows are
/// ordered by Selective, then Total, both descending; the sort is stable so ties keep
/// authority name order.
pub fn summarise(pivot: &PolicyPivot) -> Vec<SummaryRow> {
    let whole = |v: Option<f64>| v.map(|x| x.trunc() as i64).unwrap_or(0);

    let mut rows: Vec<SummaryRow> = pivot
        .iter()
        .map(|(la, rolls)| {
            SummaryRow::new(
                la,
                whole(rolls.get(AdmissionsPolicy::Selective)),
                whole(rolls.get(AdmissionsPolicy::Total)),
            )
        })
        .collect();
    rows.sort_by(|a, b| {
        b.selective
            .cmp(&a.selective)
            .then_with(|| b.total.cmp(&a.total))
    });

    for row in rows.iter().filter(|r| r.pct.is_none()) {
        warn!(la_name = %row.la_name, "no recorded pupils; percentage left blank");
    }
    info!(
        authorities = rows.len(),
        with_selective = rows.iter().filter(|r| r.selective > 0).count(),
        "summarised"
    );
    rows
}

/// Write the summary as CSV with a header row.
pub fn write_summary_csv(rows: &[SummaryRow], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating summary file {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("writing summary row for {}", row.la_name))?;
    }
    wtr.flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "wrote summary CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn pivot(entries: &[(&str, AdmissionsPolicy, i64)]) -> PolicyPivot {
        let mut p = PolicyPivot::default();
        for (la, policy, roll) in entries {
            p.insert(la, *policy, *roll);
        }
        p
    }

    #[test]
    fn two_county_example() {
        use AdmissionsPolicy::*;
        let rows = summarise(&pivot(&[
            ("County B", Total, 500),
            ("County B", Selective, 0),
            ("County A", Total, 1000),
            ("County A", Selective, 200),
        ]));
        assert_eq!(
            rows,
            vec![
                SummaryRow {
                    la_name: "County A".into(),
                    selective: 200,
                    total: 1000,
                    pct: Some(0.2)
                },
                SummaryRow {
                    la_name: "County B".into(),
                    selective: 0,
                    total: 500,
                    pct: Some(0.0)
                },
            ]
        );
    }

    #[test]
    fn order_is_lexicographic_descending_and_stable() {
        use AdmissionsPolicy::*;
        let rows = summarise(&pivot(&[
            ("Barnet", Total, 800),
            ("Barnet", Selective, 100),
            ("Bexley", Total, 900),
            ("Bexley", Selective, 100),
            ("Sutton", Total, 900),
            ("Sutton", Selective, 100),
            ("Kent", Total, 5000),
            ("Kent", Selective, 1500),
            ("Camden", Total, 700),
            ("Camden", Unknown, 700),
        ]));
        let names: Vec<&str> = rows.iter().map(|r| r.la_name.as_str()).collect();
        assert_eq!(names, vec!["Kent", "Bexley", "Sutton", "Barnet", "Camden"]);

        for w in rows.windows(2) {
            assert!((w[0].selective, w[0].total) >= (w[1].selective, w[1].total));
        }
    }

    #[test]
    fn zero_total_does_not_crash() {
        use AdmissionsPolicy::*;
        let mut p = pivot(&[("Isles of Scilly", Total, 0)]);
        p.touch("City of London");
        let rows = summarise(&p);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.pct.is_none()));
        assert!(rows.iter().all(|r| r.selective == 0 && r.total == 0));
    }

    #[test]
    fn means_are_truncated() {
        use AdmissionsPolicy::*;
        let rows = summarise(&pivot(&[
            ("Kent", Total, 100),
            ("Kent", Total, 101),
            ("Kent", Selective, 10),
        ]));
        assert_eq!(rows[0].total, 100);
        assert_eq!(rows[0].pct, Some(0.1));
    }

    #[test]
    fn writes_csv_with_header() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("summary.csv");
        let rows = vec![SummaryRow::new("Kent", 1, 4), SummaryRow::new("Rutland", 0, 0)];

        write_summary_csv(&rows, &path)?;

        let text = fs::read_to_string(&path)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "la_name,selective,total,pct");
        assert_eq!(lines[1], "Kent,1,4,0.25");
        assert_eq!(lines[2], "Rutland,0,0,");
        Ok(())
    }
}
