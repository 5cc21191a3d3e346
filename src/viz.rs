//! Chart rendering with Plotters
//!
//! Every chart is written as its own PNG. A chart that cannot be written is
//! logged and recorded as failed; the remaining charts are still attempted.

use crate::analysis::{self, CorrelationMatrix, Profile, SegmentSummary};
use crate::config::{ChartConfig, TargetConfig};
use crate::data::Dataset;
use crate::error::EdaError;
use anyhow::Context;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use std::path::Path;

/// Target class colours: negative, positive
const CLASS_COLORS: [RGBColor; 2] = [RGBColor(31, 119, 180), RGBColor(255, 127, 14)];

const MISSING_CELL: RGBColor = RGBColor(200, 200, 200);

pub const TARGET_DISTRIBUTION_FILE: &str = "01_churn_distribution.png";
pub const CORRELATION_HEATMAP_FILE: &str = "corr_heatmap_numeric.png";

/// `<kind>_<column>.png`
pub fn column_artifact(kind: &str, column: &str) -> String {
    format!("{kind}_{column}.png")
}

/// A chart that could not be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFigure {
    pub name: String,
    pub reason: String,
}

/// Outcome of a rendering pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedFigures {
    pub saved: Vec<String>,
    pub failed: Vec<FailedFigure>,
}

impl RenderedFigures {
    fn record(&mut self, name: String, result: crate::Result<()>) {
        match result {
            Ok(()) => {
                tracing::debug!(artifact = %name, "chart saved");
                self.saved.push(name);
            }
            Err(EdaError::ArtifactWrite { reason, .. }) => {
                tracing::warn!(artifact = %name, %reason, "chart skipped");
                self.failed.push(FailedFigure { name, reason });
            }
            Err(other) => {
                tracing::warn!(artifact = %name, error = %other, "chart skipped");
                self.failed.push(FailedFigure {
                    name,
                    reason: other.to_string(),
                });
            }
        }
    }

    /// Saved artifact names in sorted order
    pub fn saved_sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.saved.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

struct BarSeries<'a> {
    name: &'a str,
    color: RGBColor,
    values: Vec<f64>,
}

/// Renders the fixed chart set into one directory
pub struct ChartRenderer<'a> {
    figures_dir: &'a Path,
    charts: &'a ChartConfig,
    target: &'a TargetConfig,
}

impl<'a> ChartRenderer<'a> {
    pub fn new(figures_dir: &'a Path, charts: &'a ChartConfig, target: &'a TargetConfig) -> Self {
        Self {
            figures_dir,
            charts,
            target,
        }
    }

    /// Draw one artifact, turning any drawing failure into `ArtifactWrite`
    fn render<F>(&self, name: &str, draw: F) -> crate::Result<()>
    where
        F: FnOnce(&Path) -> anyhow::Result<()>,
    {
        let path = self.figures_dir.join(name);
        draw(&path).map_err(|e| {
            // The bitmap backend flushes on drop, which can leave a half-drawn file
            let _ = std::fs::remove_file(&path);
            EdaError::ArtifactWrite {
                artifact: name.to_string(),
                reason: format!("{e:#}"),
            }
        })
    }

    /// Render every chart for the analysed dataset
    ///
    /// # Arguments
    /// * `dataset` - Cleaned dataset
    /// * `profile` - Dataset profile (target distribution)
    /// * `segments` - Segment summaries, one count and one rate chart each
    /// * `numeric_columns` - Columns that get a histogram and a box plot
    /// * `correlation` - Heatmap input; skipped when `None`
    pub fn render_all(
        &self,
        dataset: &Dataset,
        profile: &Profile,
        segments: &[SegmentSummary],
        numeric_columns: &[String],
        correlation: Option<&CorrelationMatrix>,
    ) -> RenderedFigures {
        let mut figures = RenderedFigures::default();

        figures.record(
            TARGET_DISTRIBUTION_FILE.to_string(),
            self.target_distribution(profile),
        );

        for segment in segments {
            let name = column_artifact("cat_counts", &segment.column);
            let result = self.category_counts(&name, segment);
            figures.record(name, result);

            let name = column_artifact("cat_churn_rate", &segment.column);
            let result = self.category_churn_rate(&name, segment);
            figures.record(name, result);
        }

        for column in numeric_columns {
            let (positive, negative) = match dataset.class_values(column, self.target) {
                Ok(classes) => classes,
                Err(e) => {
                    let reason = e.to_string();
                    for kind in ["num_box", "num_hist"] {
                        let name = column_artifact(kind, column);
                        let failure = EdaError::ArtifactWrite {
                            artifact: name.clone(),
                            reason: reason.clone(),
                        };
                        figures.record(name, Err(failure));
                    }
                    continue;
                }
            };

            let name = column_artifact("num_box", column);
            let result = self.numeric_box(&name, column, &negative, &positive);
            figures.record(name, result);

            let name = column_artifact("num_hist", column);
            let result = self.numeric_histogram(&name, column, &negative, &positive);
            figures.record(name, result);
        }

        match correlation {
            Some(matrix) => figures.record(
                CORRELATION_HEATMAP_FILE.to_string(),
                self.correlation_heatmap(matrix),
            ),
            None => tracing::info!("fewer than two numeric columns, skipping correlation heatmap"),
        }

        figures
    }

    /// Bar chart of target class counts
    pub fn target_distribution(&self, profile: &Profile) -> crate::Result<()> {
        let labels = [self.target.negative.clone(), self.target.positive.clone()];
        let title = format!("{} Distribution", self.target.column);
        self.render(TARGET_DISTRIBUTION_FILE, |path| {
            self.draw_bars(
                path,
                &title,
                "Count",
                &labels,
                &[BarSeries {
                    name: &self.target.column,
                    color: CLASS_COLORS[0],
                    values: vec![profile.negatives() as f64, profile.positives as f64],
                }],
                profile.rows as f64 * 1.1,
            )
        })
    }

    /// Per-category counts split by target class
    pub fn category_counts(&self, name: &str, segment: &SegmentSummary) -> crate::Result<()> {
        let labels: Vec<String> = segment.groups.iter().map(|g| g.category.clone()).collect();
        let negatives: Vec<f64> = segment
            .groups
            .iter()
            .map(|g| (g.count - g.positives) as f64)
            .collect();
        let positives: Vec<f64> = segment.groups.iter().map(|g| g.positives as f64).collect();
        let y_max = segment.groups.iter().map(|g| g.count).max().unwrap_or(1) as f64 * 1.1;
        let title = format!("{} vs {} (Counts)", segment.column, self.target.column);

        self.render(name, |path| {
            self.draw_bars(
                path,
                &title,
                "Count",
                &labels,
                &[
                    BarSeries {
                        name: &self.target.negative,
                        color: CLASS_COLORS[0],
                        values: negatives,
                    },
                    BarSeries {
                        name: &self.target.positive,
                        color: CLASS_COLORS[1],
                        values: positives,
                    },
                ],
                y_max,
            )
        })
    }

    /// Churn rate per category, highest first, limited to `top_n`
    pub fn category_churn_rate(&self, name: &str, segment: &SegmentSummary) -> crate::Result<()> {
        let ranked = segment.by_rate_desc(self.charts.top_n);
        let labels: Vec<String> = ranked.iter().map(|g| g.category.clone()).collect();
        let rates: Vec<f64> = ranked.iter().map(|g| g.churn_rate).collect();
        let title = format!("Churn Rate by {}", segment.column);

        self.render(name, |path| {
            self.draw_bars(
                path,
                &title,
                "Churn Rate",
                &labels,
                &[BarSeries {
                    name: "rate",
                    color: CLASS_COLORS[0],
                    values: rates,
                }],
                1.05,
            )
        })
    }

    /// Box plot of a numeric column per target class
    pub fn numeric_box(
        &self,
        name: &str,
        column: &str,
        negative: &[f64],
        positive: &[f64],
    ) -> crate::Result<()> {
        self.render(name, |path| self.draw_box(path, column, [negative, positive]))
    }

    /// Overlaid histograms of a numeric column per target class
    pub fn numeric_histogram(
        &self,
        name: &str,
        column: &str,
        negative: &[f64],
        positive: &[f64],
    ) -> crate::Result<()> {
        self.render(name, |path| self.draw_histogram(path, column, [negative, positive]))
    }

    /// Heatmap of pairwise correlations
    pub fn correlation_heatmap(&self, matrix: &CorrelationMatrix) -> crate::Result<()> {
        self.render(CORRELATION_HEATMAP_FILE, |path| self.draw_heatmap(path, matrix))
    }

    fn draw_bars(
        &self,
        path: &Path,
        title: &str,
        y_desc: &str,
        labels: &[String],
        series: &[BarSeries<'_>],
        y_max: f64,
    ) -> anyhow::Result<()> {
        let n = labels.len().max(1) as f64;
        let y_max = if y_max > 0.0 { y_max } else { 1.0 };

        let root = BitMapBackend::new(path, (self.charts.width, self.charts.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5f64..(n - 0.5), 0f64..y_max)?;

        let label_at = |x: &f64| category_label(labels, *x);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len() + 1)
            .x_label_formatter(&label_at)
            .y_desc(y_desc)
            .axis_desc_style(("sans-serif", 15))
            .draw()?;

        let width = 0.8 / series.len().max(1) as f64;
        for (s, bars) in series.iter().enumerate() {
            let color = bars.color;
            let offset = -0.4 + width * s as f64;
            let drawn = chart.draw_series(bars.values.iter().enumerate().map(|(i, &v)| {
                let x0 = i as f64 + offset;
                Rectangle::new([(x0, 0.0), (x0 + width, v)], color.filled())
            }))?;
            if series.len() > 1 {
                drawn
                    .label(bars.name)
                    .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
            }
        }

        if series.len() > 1 {
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()?;
        }

        root.present()
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }

    fn draw_histogram(&self, path: &Path, column: &str, classes: [&[f64]; 2]) -> anyhow::Result<()> {
        let (lo, hi) = value_range(classes).context("no non-missing values to plot")?;
        let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
        let bins = self.charts.histogram_bins.max(1);
        let width = (hi - lo) / bins as f64;

        let counts: Vec<Vec<usize>> = classes
            .iter()
            .map(|values| analysis::histogram(values, lo, hi, bins))
            .collect();
        let y_max = counts.iter().flatten().copied().max().unwrap_or(1).max(1) as f64 * 1.1;

        let root = BitMapBackend::new(path, (self.charts.width, self.charts.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("{column} Distribution by {}", self.target.column), ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(lo..hi, 0f64..y_max)?;

        chart
            .configure_mesh()
            .x_desc(column)
            .y_desc("Count")
            .axis_desc_style(("sans-serif", 15))
            .draw()?;

        let names = [self.target.negative.as_str(), self.target.positive.as_str()];
        for (class, class_counts) in counts.iter().enumerate() {
            let color = CLASS_COLORS[class];
            chart
                .draw_series(class_counts.iter().enumerate().map(|(i, &c)| {
                    let x0 = lo + width * i as f64;
                    Rectangle::new([(x0, 0.0), (x0 + width, c as f64)], color.mix(0.5).filled())
                }))?
                .label(names[class])
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        root.present()
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }

    fn draw_box(&self, path: &Path, column: &str, classes: [&[f64]; 2]) -> anyhow::Result<()> {
        let (lo, hi) = value_range(classes).context("no non-missing values to plot")?;
        let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
        let labels = [self.target.negative.clone(), self.target.positive.clone()];

        let root = BitMapBackend::new(path, (self.charts.width, self.charts.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("{column} by {}", self.target.column), ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5f64..1.5f64, (lo - pad)..(hi + pad))?;

        let label_at = |x: &f64| category_label(&labels, *x);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(3)
            .x_label_formatter(&label_at)
            .x_desc(self.target.column.as_str())
            .y_desc(column)
            .axis_desc_style(("sans-serif", 15))
            .draw()?;

        for (class, values) in classes.iter().enumerate() {
            let Some(stats) = analysis::box_stats(values) else {
                continue;
            };
            let x = class as f64;
            let color = CLASS_COLORS[class];

            chart.draw_series(std::iter::once(Rectangle::new(
                [(x - 0.3, stats.q1), (x + 0.3, stats.q3)],
                color.mix(0.6).filled(),
            )))?;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x - 0.3, stats.q1), (x + 0.3, stats.q3)],
                BLACK.stroke_width(1),
            )))?;
            chart.draw_series(
                [
                    vec![(x - 0.3, stats.median), (x + 0.3, stats.median)],
                    vec![(x, stats.q3), (x, stats.upper_whisker)],
                    vec![(x, stats.q1), (x, stats.lower_whisker)],
                    vec![(x - 0.15, stats.upper_whisker), (x + 0.15, stats.upper_whisker)],
                    vec![(x - 0.15, stats.lower_whisker), (x + 0.15, stats.lower_whisker)],
                ]
                .into_iter()
                .map(|points| PathElement::new(points, BLACK.stroke_width(2))),
            )?;
            chart.draw_series(
                values
                    .iter()
                    .filter(|&&v| v < stats.lower_whisker || v > stats.upper_whisker)
                    .map(|&v| Circle::new((x, v), 3, BLACK.mix(0.6).filled())),
            )?;
        }

        root.present()
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }

    fn draw_heatmap(&self, path: &Path, matrix: &CorrelationMatrix) -> anyhow::Result<()> {
        let k = matrix.columns.len() as f64;

        let root = BitMapBackend::new(path, (self.charts.width, self.charts.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Correlation Heatmap (Numeric Features)", ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(120)
            .build_cartesian_2d(-0.5f64..(k - 0.5), -0.5f64..(k - 0.5))?;

        let label_at = |x: &f64| category_label(&matrix.columns, *x);
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(matrix.columns.len() + 1)
            .y_labels(matrix.columns.len() + 1)
            .x_label_formatter(&label_at)
            .y_label_formatter(&label_at)
            .draw()?;

        chart.draw_series(matrix.values.indexed_iter().map(|((i, j), &r)| {
            let (x, y) = (j as f64, i as f64);
            Rectangle::new(
                [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                diverging_color(r).filled(),
            )
        }))?;

        root.present()
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }
}

/// Whether the sans-serif font used for captions and labels can be loaded
pub fn font_available() -> bool {
    FontDesc::new(FontFamily::SansSerif, 12.0, FontStyle::Normal)
        .box_size("Churn")
        .is_ok()
}

/// Axis label for integer tick positions, blank elsewhere
fn category_label(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() > 1e-6 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn value_range(classes: [&[f64]; 2]) -> Option<(f64, f64)> {
    classes
        .iter()
        .flat_map(|values| values.iter().copied())
        .filter(|v| v.is_finite())
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
}

/// Blue (-1) through light grey (0) to red (+1); NaN is drawn grey
fn diverging_color(r: f64) -> RGBColor {
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const NEUTRAL: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

    if r.is_nan() {
        return MISSING_CELL;
    }
    let r = r.clamp(-1.0, 1.0);
    let (from, to, t) = if r < 0.0 { (NEUTRAL, COLD, -r) } else { (NEUTRAL, WARM, r) };
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SegmentGroup;
    use polars::prelude::df;
    use tempfile::tempdir;

    fn segment() -> SegmentSummary {
        SegmentSummary {
            column: "Contract".to_string(),
            label: "Contract".to_string(),
            highlight: true,
            groups: vec![
                SegmentGroup {
                    category: "Month-to-month".to_string(),
                    count: 4,
                    positives: 3,
                    churn_rate: 0.75,
                },
                SegmentGroup {
                    category: "Two year".to_string(),
                    count: 6,
                    positives: 0,
                    churn_rate: 0.0,
                },
            ],
        }
    }

    #[test]
    fn test_artifact_names() {
        assert_eq!(column_artifact("num_box", "tenure"), "num_box_tenure.png");
        assert_eq!(
            column_artifact("cat_churn_rate", "Contract"),
            "cat_churn_rate_Contract.png"
        );
    }

    #[test]
    fn test_category_label() {
        let labels = vec!["No".to_string(), "Yes".to_string()];
        assert_eq!(category_label(&labels, 0.0), "No");
        assert_eq!(category_label(&labels, 1.0000000001), "Yes");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, -1.0), "");
        assert_eq!(category_label(&labels, 2.0), "");
    }

    #[test]
    fn test_diverging_color_endpoints() {
        assert_eq!(diverging_color(-1.0), RGBColor(59, 76, 192));
        assert_eq!(diverging_color(0.0), RGBColor(221, 221, 221));
        assert_eq!(diverging_color(1.0), RGBColor(180, 4, 38));
        assert_eq!(diverging_color(f64::NAN), MISSING_CELL);
    }

    #[test]
    fn test_value_range() {
        assert_eq!(value_range([&[3.0, 1.0], &[7.0]]), Some((1.0, 7.0)));
        assert_eq!(value_range([&[], &[]]), None);
    }

    #[test]
    fn test_unwritable_directory_is_artifact_error() {
        let dir = tempdir().unwrap();
        let missing_dir = dir.path().join("does").join("not").join("exist");
        let charts = ChartConfig::default();
        let target = TargetConfig::default();
        let renderer = ChartRenderer::new(&missing_dir, &charts, &target);

        let result = renderer.category_counts("cat_counts_Contract.png", &segment());
        match result {
            Err(EdaError::ArtifactWrite { artifact, .. }) => {
                assert_eq!(artifact, "cat_counts_Contract.png");
            }
            other => panic!("expected artifact error, got {other:?}"),
        }
        assert!(!missing_dir.join("cat_counts_Contract.png").exists());
    }

    #[test]
    fn test_empty_numeric_column_is_recorded_as_failed() {
        let dir = tempdir().unwrap();
        let charts = ChartConfig::default();
        let target = TargetConfig::default();
        let renderer = ChartRenderer::new(dir.path(), &charts, &target);

        let mut figures = RenderedFigures::default();
        figures.record(
            "num_hist_tenure.png".to_string(),
            renderer.numeric_histogram("num_hist_tenure.png", "tenure", &[], &[]),
        );
        assert!(figures.saved.is_empty());
        assert_eq!(figures.failed.len(), 1);
        assert!(figures.failed[0].reason.contains("no non-missing values"));
    }

    #[test]
    fn test_missing_numeric_column_fails_both_charts() {
        let dir = tempdir().unwrap();
        let charts = ChartConfig::default();
        let target = TargetConfig::default();
        let renderer = ChartRenderer::new(dir.path(), &charts, &target);
        let frame = df!("Churn" => &["Yes", "No"]).unwrap();
        let profile = Profile {
            rows: 2,
            columns: 1,
            positives: 1,
            churn_rate: 0.5,
        };

        let figures = renderer.render_all(
            &Dataset::from(frame),
            &profile,
            &[],
            &["tenure".to_string()],
            None,
        );

        let failed: Vec<&FailedFigure> = figures
            .failed
            .iter()
            .filter(|f| f.name.starts_with("num_"))
            .collect();
        let names: Vec<&str> = failed.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["num_box_tenure.png", "num_hist_tenure.png"]);
        assert!(failed.iter().all(|f| f.reason.contains("tenure")));
    }

    #[test]
    fn test_rendered_chart_is_written() {
        if !font_available() {
            eprintln!("skipping: no sans-serif font for plotters on this machine");
            return;
        }
        let dir = tempdir().unwrap();
        let charts = ChartConfig::default();
        let target = TargetConfig::default();
        let renderer = ChartRenderer::new(dir.path(), &charts, &target);

        renderer
            .category_churn_rate("cat_churn_rate_Contract.png", &segment())
            .unwrap();
        let written = std::fs::metadata(dir.path().join("cat_churn_rate_Contract.png")).unwrap();
        assert!(written.len() > 0);
    }
}
