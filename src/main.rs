//! churnlens: single-pass churn EDA
//!
//! Parses arguments, sets up logging and runs the pipeline. Any fatal error
//! ends the process with a non-zero status and no report.

use anyhow::{Context, Result};
use churnlens::{logging, run_eda, Args};
use clap::Parser;

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose)?;

    let config = args.resolve_config().context("invalid configuration")?;
    let outcome = run_eda(&config).context("EDA run failed")?;

    tracing::info!(
        figures_dir = %config.figures_dir.display(),
        saved = outcome.figures.saved.len(),
        "figures saved"
    );
    for failed in &outcome.figures.failed {
        tracing::warn!(artifact = %failed.name, reason = %failed.reason, "figure not saved");
    }
    tracing::info!(path = %outcome.report_path.display(), "report saved");

    Ok(())
}
