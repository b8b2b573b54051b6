use anyhow::Result;
use clap::Parser;
use selective_schools::{config::Cli, pipeline};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    // stdout carries the check table, so logs go to stderr.
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) resolve config ───────────────────────────────────────────
    let config = Cli::parse().resolve()?;
    info!(
        input = %config.input.display(),
        output = %config.output.display(),
        check = ?config.check_authority,
        "startup"
    );

    // ─── 3) run the report ───────────────────────────────────────────
    let report = pipeline::run(&config)?;
    info!(
        authorities = report.authorities,
        discrepancies = report.discrepancies,
        "saved {}",
        report.chart.display()
    );
    Ok(())
}
