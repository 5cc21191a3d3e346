//! Markdown findings report
//!
//! [`Findings`] gathers every derived value; [`render_markdown`] only formats
//! them. Keeping the two apart lets each be checked on its own.

use crate::analysis::{NumericComparison, Profile, SegmentSummary};
use crate::data::MissingCount;
use crate::error::EdaError;
use crate::viz::RenderedFigures;
use std::path::Path;

/// Highest-churn category of a highlighted segment column
#[derive(Debug, Clone, PartialEq)]
pub struct Insight {
    pub label: String,
    pub category: String,
    pub churn_rate: f64,
}

/// Everything the report template needs
#[derive(Debug, Clone, PartialEq)]
pub struct Findings {
    pub data_path: String,
    pub target: String,
    pub profile: Profile,
    pub missing: Vec<MissingCount>,
    pub insights: Vec<Insight>,
    /// Comparisons for columns with at least one present value
    pub numeric: Vec<NumericComparison>,
    pub figures: RenderedFigures,
}

impl Findings {
    /// Pick the report-worthy facts out of the analysis results
    pub fn assemble(
        data_path: &Path,
        target: &str,
        profile: &Profile,
        missing: &[MissingCount],
        segments: &[SegmentSummary],
        numeric: &[NumericComparison],
        figures: &RenderedFigures,
    ) -> Self {
        let insights = segments
            .iter()
            .filter(|s| s.highlight)
            .filter_map(|s| {
                s.highest_churn().map(|top| Insight {
                    label: s.label.clone(),
                    category: top.category.clone(),
                    churn_rate: top.churn_rate,
                })
            })
            .collect();

        Self {
            data_path: data_path.display().to_string(),
            target: target.to_string(),
            profile: profile.clone(),
            missing: missing.to_vec(),
            insights,
            numeric: numeric.iter().filter(|n| n.non_missing > 0).cloned().collect(),
            figures: figures.clone(),
        }
    }
}

const NEXT_STEPS: &str = "\
- Encode categorical variables (one-hot)
- Handle missing numeric values (impute)
- Create train/test split with stratification
- Start feature engineering (tenure buckets, charge ratios, contract flags)
";

/// Render the findings as the fixed-layout markdown report
pub fn render_markdown(findings: &Findings) -> String {
    let missing = if findings.missing.is_empty() {
        "None".to_string()
    } else {
        findings
            .missing
            .iter()
            .map(|m| format!("- `{}`: {}", m.column, m.count))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let insights = if findings.insights.is_empty() {
        "- (Not enough categorical columns found for auto-insights.)".to_string()
    } else {
        findings
            .insights
            .iter()
            .map(|i| {
                format!(
                    "- Highest churn by **{}**: `{}` (~{:.1}%).",
                    i.label,
                    i.category,
                    i.churn_rate * 100.0
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let numeric = if findings.numeric.is_empty() {
        "- (Not enough numeric columns found.)".to_string()
    } else {
        findings
            .numeric
            .iter()
            .map(|n| {
                format!(
                    "- Mean **{}**: churn=**{:.2}**, non-churn=**{:.2}**",
                    n.column, n.positive_mean, n.negative_mean
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut figures: Vec<String> = findings
        .figures
        .saved_sorted()
        .into_iter()
        .map(|name| format!("- {name}"))
        .collect();
    let mut failed: Vec<&str> = findings.figures.failed.iter().map(|f| f.name.as_str()).collect();
    failed.sort_unstable();
    figures.extend(failed.into_iter().map(|name| format!("- {name} (not saved)")));
    let figures = if figures.is_empty() {
        "- (No plots saved)".to_string()
    } else {
        figures.join("\n")
    };

    let p = &findings.profile;
    format!(
        "# Week 1 – Data Understanding & EDA

## Dataset
- Path: `{path}`
- Rows: **{rows}**
- Columns: **{columns}**
- Target: **{target}**
- Churn Rate: **{rate:.2}%**

## Data Quality
### Missing Values (after cleaning)
{missing}

## Key Observations (auto-generated)
{insights}

## Numeric Signals (quick comparison)
{numeric}

## Saved Figures
{figures}

## Suggested Next Steps (Week 2)
{NEXT_STEPS}",
        path = findings.data_path,
        rows = p.rows,
        columns = p.columns,
        target = findings.target,
        rate = p.churn_rate_pct(),
    )
}

/// Write the report, creating its parent directory if needed
pub fn write_report(path: &Path, markdown: &str) -> crate::Result<()> {
    let report_error = |source| EdaError::ReportWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(report_error)?;
    }
    std::fs::write(path, markdown).map_err(report_error)
}
