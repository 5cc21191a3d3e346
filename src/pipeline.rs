//! End-to-end EDA run: load, clean, analyse, chart, report

use crate::analysis::{self, Profile};
use crate::config::EdaConfig;
use crate::data::{clean_dataset, load_dataset};
use crate::report::{render_markdown, write_report, Findings};
use crate::viz::{self, ChartRenderer, RenderedFigures};
use std::path::PathBuf;
use std::time::Instant;

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct EdaOutcome {
    pub report_path: PathBuf,
    pub profile: Profile,
    pub figures: RenderedFigures,
}

/// Run the whole pipeline for one configuration
///
/// Fatal errors (load, schema, empty dataset, report write) abort before the
/// report is written. Chart failures are logged and listed in the report.
pub fn run_eda(config: &EdaConfig) -> crate::Result<EdaOutcome> {
    let start_time = Instant::now();

    std::fs::create_dir_all(&config.reports_dir)?;
    // Charts fail one by one (and are reported) if this directory is unusable
    if let Err(e) = std::fs::create_dir_all(&config.figures_dir) {
        tracing::warn!(
            figures_dir = %config.figures_dir.display(),
            error = %e,
            "cannot create figures directory"
        );
    }

    tracing::info!(path = %config.data_path.display(), "loading data");
    let raw = load_dataset(&config.data_path, config)?;
    tracing::debug!(rows = raw.height(), columns = raw.width(), "raw dataset loaded");

    tracing::info!("cleaning data");
    let cleaned = clean_dataset(&raw, config)?;
    let dataset = &cleaned.dataset;

    let profile = analysis::profile(dataset, &config.target)?;
    tracing::info!(
        rows = profile.rows,
        columns = profile.columns,
        positives = profile.positives,
        negatives = profile.negatives(),
        "dataset shape"
    );
    tracing::debug!(columns = ?dataset.column_names(), "columns after cleaning");
    tracing::info!("churn rate: {:.2}%", profile.churn_rate_pct());

    let segments = analysis::analyze_segments(dataset, &config.target, &config.categorical)?;
    let numeric = analysis::compare_numeric(dataset, &config.target, &config.numeric)?;
    let correlation = analysis::correlation_matrix(dataset)?;

    tracing::info!(figures_dir = %config.figures_dir.display(), "generating plots");
    if !viz::font_available() {
        tracing::warn!("no sans-serif font found; charts with text will fail");
    }
    let chart_start = Instant::now();
    let renderer = ChartRenderer::new(&config.figures_dir, &config.charts, &config.target);
    let figures = renderer.render_all(
        dataset,
        &profile,
        &segments,
        &config.numeric,
        correlation.as_ref(),
    );
    tracing::info!(
        saved = figures.saved.len(),
        failed = figures.failed.len(),
        elapsed_ms = chart_start.elapsed().as_millis() as u64,
        "plots finished"
    );

    let findings = Findings::assemble(
        &config.data_path,
        &config.target.column,
        &profile,
        &cleaned.missing,
        &segments,
        &numeric,
        &figures,
    );
    let markdown = render_markdown(&findings);

    tracing::info!(path = %config.report_path.display(), "writing report");
    write_report(&config.report_path, &markdown)?;

    tracing::info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "EDA complete"
    );

    Ok(EdaOutcome {
        report_path: config.report_path.clone(),
        profile,
        figures,
    })
}
