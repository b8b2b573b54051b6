// src/pipeline.rs

use anyhow::{bail, Context, Result};
use arrow::record_batch::RecordBatch;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::{
    check::AuthorityCheck,
    config::Config,
    filter::{derive_roll, filter_latest_phase, pin_dimensions},
    load::load_school_csv,
    pivot::{pivot_by_policy, reconcile, PolicyPivot},
    render::{open_in_viewer, render_chart},
    summary::{summarise, write_summary_csv, SummaryRow},
};

/// Filtered rows and their pivot, ready for checking and summarising.
pub struct Prepared {
    pub loaded_rows: usize,
    pub rows: RecordBatch,
    pub time_period: Option<i64>,
    pub pivot: PolicyPivot,
}

/// What a run produced.
#[derive(Debug)]
pub struct RunReport {
    pub time_period: Option<i64>,
    pub loaded_rows: usize,
    pub filtered_rows: usize,
    pub authorities: usize,
    pub discrepancies: usize,
    pub summary: Vec<SummaryRow>,
    pub chart: PathBuf,
}

/// Load → latest period + phase → pin dimensions → roll → pivot.
pub fn prepare(config: &Config) -> Result<Prepared> {
    let raw = load_school_csv(&config.input)
        .with_context(|| format!("loading {}", config.input.display()))?;

    let (latest, time_period) = filter_latest_phase(&raw, &config.phase)?;
    let pinned = pin_dimensions(&latest, &config.pinned_dimensions, &config.sentinel)?;
    let rows = derive_roll(&pinned)?;
    let pivot = pivot_by_policy(&rows)?;

    Ok(Prepared {
        loaded_rows: raw.num_rows(),
        rows,
        time_period,
        pivot,
    })
}

/// Print the sanity-check pivot for `la_name` to stdout. Returns false if the
/// authority is absent.
pub fn print_check(pivot: &PolicyPivot, la_name: &str) -> bool {
    match AuthorityCheck::for_authority(pivot, la_name) {
        Some(check) => {
            check.pivot_table().printstd();
            println!("{}", check);
            true
        }
        None => {
            warn!(la_name, "check authority not found in filtered data");
            false
        }
    }
}

/// Run the whole report: prepare, check, reconcile, summarise, export and render.
pub fn run(config: &Config) -> Result<RunReport> {
    let prepared = prepare(config)?;

    if let Some(name) = &config.check_authority {
        print_check(&prepared.pivot, name);
    }

    let discrepancies = reconcile(&prepared.pivot);
    for d in &discrepancies {
        warn!(
            la_name = %d.la_name,
            total = ?d.total,
            parts = d.parts,
            "Total differs from the sum of admissions policy categories"
        );
    }

    let summary = summarise(&prepared.pivot);
    if summary.is_empty() {
        bail!(
            "no local authorities left after filtering {} for phase `{}`",
            config.input.display(),
            config.phase
        );
    }

    if let Some(path) = &config.summary_csv {
        write_summary_csv(&summary, path)?;
    }

    render_chart(&summary, prepared.time_period, &config.figure, &config.output)
        .with_context(|| format!("rendering {}", config.output.display()))?;
    if config.figure.show {
        open_in_viewer(&config.output);
    }

    let report = RunReport {
        time_period: prepared.time_period,
        loaded_rows: prepared.loaded_rows,
        filtered_rows: prepared.rows.num_rows(),
        authorities: prepared.pivot.len(),
        discrepancies: discrepancies.len(),
        summary,
        chart: config.output.clone(),
    };
    info!(
        loaded = report.loaded_rows,
        filtered = report.filtered_rows,
        authorities = report.authorities,
        chart = %report.chart.display(),
        "report complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::tests::{init_test_logging, row, write_csv};
    use crate::pivot::AdmissionsPolicy;
    use tempfile::NamedTempFile;

    const SECONDARY: &str = "State-funded secondary";

    fn config_for(input: &NamedTempFile) -> Config {
        Config {
            input: input.path().to_path_buf(),
            ..Config::default()
        }
    }

    fn two_counties() -> Result<NamedTempFile> {
        write_csv(&[
            // Older year must be ignored.
            row("202223", "County B", SECONDARY, "Selective", "5000", "5000"),
            row("202324", "County A", SECONDARY, "Total", "600", "400"),
            row("202324", "County A", SECONDARY, "Selective", "120", "80"),
            row("202324", "County A", SECONDARY, "Non-selective", "450", "300"),
            row("202324", "County A", SECONDARY, "Unknown", "30", "20"),
            row("202324", "County B", SECONDARY, "Total", "300", "200"),
            row("202324", "County B", SECONDARY, "Non-selective", "300", "200"),
            row("202324", "County B", "State-funded primary", "Selective", "999", "999"),
            // Breakdown by sex: pinned out.
            "202324,Academic year,County B,Boys,State-funded secondary,Total,Total,Selective,Total,Total,50,50,0"
                .to_string(),
        ])
    }

    #[test]
    fn two_county_end_to_end() -> Result<()> {
        init_test_logging();
        let input = two_counties()?;
        let prepared = prepare(&config_for(&input))?;

        assert_eq!(prepared.loaded_rows, 9);
        assert_eq!(prepared.time_period, Some(202324));
        assert_eq!(prepared.rows.num_rows(), 6);
        assert_eq!(prepared.pivot.len(), 2);
        assert!(reconcile(&prepared.pivot).is_empty());

        let summary = summarise(&prepared.pivot);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].la_name, "County A");
        assert_eq!((summary[0].selective, summary[0].total), (200, 1000));
        assert_eq!(summary[0].pct, Some(0.2));
        assert_eq!(summary[1].la_name, "County B");
        assert_eq!((summary[1].selective, summary[1].total), (0, 500));
        assert_eq!(summary[1].pct, Some(0.0));

        let a = prepared.pivot.get("County A").unwrap();
        assert_eq!(a.non_selective_incl_unknown(), Some(800.0));
        assert_eq!(a.get(AdmissionsPolicy::NotApplicable), None);
        Ok(())
    }

    #[test]
    fn check_print_reports_absence() -> Result<()> {
        let input = two_counties()?;
        let prepared = prepare(&config_for(&input))?;
        assert!(print_check(&prepared.pivot, "County A"));
        assert!(!print_check(&prepared.pivot, "Buckinghamshire"));
        Ok(())
    }

    #[test]
    fn zero_total_authority_survives_prepare_and_summary() -> Result<()> {
        let input = write_csv(&[
            row("202324", "Isles of Scilly", SECONDARY, "Total", "0", "0"),
            row("202324", "Kent", SECONDARY, "Total", "10", "10"),
        ])?;
        let prepared = prepare(&config_for(&input))?;
        let summary = summarise(&prepared.pivot);
        assert_eq!(summary.len(), 2);
        let scilly = summary.iter().find(|r| r.la_name == "Isles of Scilly").unwrap();
        assert_eq!(scilly.pct, None);
        Ok(())
    }

    #[test]
    fn run_fails_on_missing_input() {
        let cfg = Config {
            input: PathBuf::from("/no/such/file.csv"),
            ..Config::default()
        };
        let err = run(&cfg).unwrap_err();
        assert!(format!("{:#}", err).contains("/no/such/file.csv"));
    }

    #[test]
    fn run_with_no_matching_rows_is_an_error() -> Result<()> {
        let input = write_csv(&[row("202324", "Kent", "State-funded primary", "Total", "1", "1")])?;
        let dir = tempfile::tempdir()?;
        let cfg = Config {
            input: input.path().to_path_buf(),
            output: dir.path().join("chart.png"),
            summary_csv: Some(dir.path().join("summary.csv")),
            check_authority: None,
            ..Config::default()
        };
        let err = run(&cfg).unwrap_err().to_string();
        assert!(err.contains("no local authorities"), "{err}");
        assert!(!dir.path().join("summary.csv").exists());
        assert!(!dir.path().join("chart.png").exists());
        Ok(())
    }

    #[test]
    fn run_writes_chart_and_summary() -> Result<()> {
        init_test_logging();
        let input = two_counties()?;
        let dir = tempfile::tempdir()?;
        let mut cfg = config_for(&input);
        cfg.output = dir.path().join("chart.png");
        cfg.summary_csv = Some(dir.path().join("summary.csv"));
        cfg.check_authority = Some("County A".to_string());
        cfg.figure.dpi = 40;

        let report = run(&cfg)?;

        assert_eq!(report.authorities, 2);
        assert_eq!(report.time_period, Some(202324));
        assert_eq!(report.discrepancies, 0);
        let order: Vec<&str> = report.summary.iter().map(|r| r.la_name.as_str()).collect();
        assert_eq!(order, vec!["County A", "County B"]);
        assert_eq!(report.summary[0].pct, Some(0.2));
        assert_eq!(report.summary[1].pct, Some(0.0));

        assert_eq!(report.chart, cfg.output);
        assert!(std::fs::metadata(&cfg.output)?.len() > 0);
        let summary = std::fs::read_to_string(dir.path().join("summary.csv"))?;
        assert!(summary.starts_with("la_name,selective,total,pct\nCounty A,200,1000,0.2\n"));
        Ok(())
    }
}
