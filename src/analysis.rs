//! Descriptive statistics: dataset profile, churn by segment, numeric comparisons
//! and pairwise correlation

use crate::config::{SegmentColumn, TargetConfig};
use crate::data::{is_positive, Dataset};
use crate::error::EdaError;
use ndarray::Array2;
use polars::prelude::*;

/// Group label used for rows whose category is missing
pub const MISSING_CATEGORY: &str = "(missing)";

const ROWS: &str = "__rows";
const POSITIVES: &str = "__positives";

/// Dataset-level facts
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub rows: usize,
    pub columns: usize,
    pub positives: usize,
    /// Fraction of rows in the positive class, in [0, 1]
    pub churn_rate: f64,
}

impl Profile {
    pub fn negatives(&self) -> usize {
        self.rows - self.positives
    }

    pub fn churn_rate_pct(&self) -> f64 {
        self.churn_rate * 100.0
    }
}

fn first_u64(frame: &DataFrame, name: &str) -> crate::Result<u64> {
    Ok(frame
        .column(name)?
        .as_materialized_series()
        .u64()?
        .get(0)
        .unwrap_or(0))
}

fn first_f64(frame: &DataFrame, name: &str) -> crate::Result<f64> {
    Ok(frame
        .column(name)?
        .as_materialized_series()
        .f64()?
        .get(0)
        .unwrap_or(f64::NAN))
}

/// Row/column counts and the positive-class rate
pub fn profile(dataset: &Dataset, target: &TargetConfig) -> crate::Result<Profile> {
    let rows = dataset.height();
    if rows == 0 {
        return Err(EdaError::EmptyDataset);
    }
    dataset.require(&target.column)?;

    let counts = dataset
        .frame()
        .clone()
        .lazy()
        .select([is_positive(target)
            .sum()
            .cast(DataType::UInt64)
            .alias(POSITIVES)])
        .collect()?;
    let positives = first_u64(&counts, POSITIVES)? as usize;

    Ok(Profile {
        rows,
        columns: dataset.width(),
        positives,
        churn_rate: positives as f64 / rows as f64,
    })
}

/// One category of a segmented column
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentGroup {
    pub category: String,
    pub count: usize,
    pub positives: usize,
    pub churn_rate: f64,
}

impl SegmentGroup {
    pub fn new(category: impl Into<String>, count: usize, positives: usize) -> Self {
        Self {
            category: category.into(),
            count,
            positives,
            churn_rate: positives as f64 / count as f64,
        }
    }
}

/// Churn broken down by the categories of one column
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSummary {
    pub column: String,
    pub label: String,
    pub highlight: bool,
    /// Groups in natural category order, missing last
    pub groups: Vec<SegmentGroup>,
}

impl SegmentSummary {
    /// Category with the highest churn rate; ties go to the earliest group
    pub fn highest_churn(&self) -> Option<&SegmentGroup> {
        self.groups.iter().fold(None, |best, group| match best {
            Some(b) if group.churn_rate <= b.churn_rate => Some(b),
            _ => Some(group),
        })
    }

    /// Groups sorted by churn rate, highest first, keeping natural order on ties
    pub fn by_rate_desc(&self, top_n: usize) -> Vec<&SegmentGroup> {
        let mut groups: Vec<&SegmentGroup> = self.groups.iter().collect();
        groups.sort_by(|a, b| b.churn_rate.total_cmp(&a.churn_rate));
        groups.truncate(top_n);
        groups
    }

    pub fn total_count(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum()
    }
}

/// Group keys rendered as category labels; numeric keys print without a
/// trailing `.0`
fn category_labels(keys: &Series) -> crate::Result<Vec<Option<String>>> {
    let labels = if keys.dtype() == &DataType::String {
        keys.str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    } else {
        keys.cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map(|x| x.to_string()))
            .collect()
    };
    Ok(labels)
}

/// Count and positive count per category, sorted by key with missing last
fn group_column(
    dataset: &Dataset,
    target: &TargetConfig,
    name: &str,
) -> crate::Result<Vec<SegmentGroup>> {
    let table = dataset
        .frame()
        .clone()
        .lazy()
        .group_by([col(name)])
        .agg([
            len().cast(DataType::UInt64).alias(ROWS),
            is_positive(target)
                .sum()
                .cast(DataType::UInt64)
                .alias(POSITIVES),
        ])
        .sort_by_exprs(
            [col(name)],
            SortMultipleOptions::default().with_nulls_last(true),
        )
        .collect()?;

    let categories = category_labels(table.column(name)?.as_materialized_series())?;
    let counts = table.column(ROWS)?.as_materialized_series().u64()?;
    let positives = table.column(POSITIVES)?.as_materialized_series().u64()?;

    let groups = categories
        .into_iter()
        .zip(counts.into_no_null_iter())
        .zip(positives.into_no_null_iter())
        .map(|((category, count), positives)| {
            SegmentGroup::new(
                category.unwrap_or_else(|| MISSING_CATEGORY.to_string()),
                count as usize,
                positives as usize,
            )
        })
        .collect();
    Ok(groups)
}

/// Group-wise churn rates for each configured categorical column
///
/// # Arguments
/// * `dataset` - Cleaned dataset
/// * `target` - Target column and its positive label
/// * `columns` - Ordered segment descriptors
pub fn analyze_segments(
    dataset: &Dataset,
    target: &TargetConfig,
    columns: &[SegmentColumn],
) -> crate::Result<Vec<SegmentSummary>> {
    dataset.require(&target.column)?;
    columns
        .iter()
        .map(|descriptor| {
            dataset.require(&descriptor.name)?;
            Ok(SegmentSummary {
                column: descriptor.name.clone(),
                label: descriptor.display_label().to_string(),
                highlight: descriptor.highlight,
                groups: group_column(dataset, target, &descriptor.name)?,
            })
        })
        .collect()
}

/// Mean of one numeric column within each target class
#[derive(Debug, Clone, PartialEq)]
pub struct NumericComparison {
    pub column: String,
    /// Mean over positive-class rows; NaN if none are present
    pub positive_mean: f64,
    /// Mean over negative-class rows; NaN if none are present
    pub negative_mean: f64,
    pub non_missing: usize,
}

/// Mean of the present values selected by `predicate`
///
/// Values are sorted before summing so the result does not depend on row order.
fn class_mean(values: Expr, predicate: Expr) -> Expr {
    values
        .filter(predicate)
        .drop_nulls()
        .sort(SortOptions::default())
        .mean()
}

/// Per-class means for each configured numeric column
pub fn compare_numeric(
    dataset: &Dataset,
    target: &TargetConfig,
    columns: &[String],
) -> crate::Result<Vec<NumericComparison>> {
    dataset.require(&target.column)?;
    columns
        .iter()
        .map(|name| {
            let values = dataset.float_expr(name)?;
            let stats = dataset
                .frame()
                .clone()
                .lazy()
                .select([
                    class_mean(values.clone(), is_positive(target)).alias("positive"),
                    class_mean(values.clone(), is_positive(target).not()).alias("negative"),
                    values.count().cast(DataType::UInt64).alias("present"),
                ])
                .collect()?;

            Ok(NumericComparison {
                column: name.clone(),
                positive_mean: first_f64(&stats, "positive")?,
                negative_mean: first_f64(&stats, "negative")?,
                non_missing: first_u64(&stats, "present")? as usize,
            })
        })
        .collect()
}

/// Pairwise Pearson correlations between numeric columns
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Array2<f64>,
}

/// Pearson coefficient over rows where both values are present
///
/// NaN with fewer than two complete pairs or when either side is constant.
pub fn pearson(x: &Float64Chunked, y: &Float64Chunked) -> crate::Result<f64> {
    let complete = &x.is_not_null() & &y.is_not_null();
    let (x, y) = (x.filter(&complete)?, y.filter(&complete)?);
    if x.len() < 2 {
        return Ok(f64::NAN);
    }
    Ok(polars::prelude::cov::pearson_corr(&x, &y)
        .filter(|r| r.is_finite())
        .map(|r| r.clamp(-1.0, 1.0))
        .unwrap_or(f64::NAN))
}

/// Correlation over every numeric column; None with fewer than two
pub fn correlation_matrix(dataset: &Dataset) -> crate::Result<Option<CorrelationMatrix>> {
    let numeric: Vec<Series> = dataset
        .frame()
        .get_columns()
        .iter()
        .filter(|c| c.dtype().is_primitive_numeric())
        .map(|c| c.as_materialized_series().cast(&DataType::Float64))
        .collect::<PolarsResult<_>>()?;
    if numeric.len() < 2 {
        return Ok(None);
    }

    let k = numeric.len();
    let mut values = Array2::<f64>::zeros((k, k));
    for i in 0..k {
        for j in i..k {
            let r = pearson(numeric[i].f64()?, numeric[j].f64()?)?;
            values[[i, j]] = r;
            values[[j, i]] = r;
        }
    }

    Ok(Some(CorrelationMatrix {
        columns: numeric.iter().map(|s| s.name().to_string()).collect(),
        values,
    }))
}

/// Five-number summary with Tukey whiskers, as drawn in a box plot
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Quartiles by linear interpolation; whiskers reach the furthest values within 1.5 IQR
pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25);
    let median = quantile(&sorted, 0.5);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let (low_fence, high_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    let lower_whisker = sorted.iter().copied().find(|&v| v >= low_fence).unwrap_or(q1);
    let upper_whisker = sorted.iter().rev().copied().find(|&v| v <= high_fence).unwrap_or(q3);

    Some(BoxStats {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
    })
}

/// Bin counts over `[lo, hi]` with `bins` equal-width bins; the last bin is closed
pub fn histogram(values: &[f64], lo: f64, hi: f64, bins: usize) -> Vec<usize> {
    let mut counts = vec![0; bins];
    if bins == 0 || hi <= lo {
        return counts;
    }
    let width = (hi - lo) / bins as f64;
    for &v in values {
        if !(lo..=hi).contains(&v) {
            continue;
        }
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
}
