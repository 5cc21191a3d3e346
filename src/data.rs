//! Dataset model, CSV loading with Polars, and cleaning

use crate::config::{EdaConfig, TargetConfig};
use crate::error::EdaError;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Cleaned or raw tabular data backed by a Polars frame
///
/// Columns are either `String` (text) or `Float64` (numeric); nulls mark
/// missing values.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
}

impl From<DataFrame> for Dataset {
    fn from(frame: DataFrame) -> Self {
        Self { frame }
    }
}

impl Dataset {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_index(name).is_some()
    }

    /// Column lookup that reports an absent column as a schema error
    pub fn require(&self, name: &str) -> crate::Result<&Column> {
        self.frame.column(name).map_err(|_| EdaError::schema(name))
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.frame
            .column(name)
            .map(|c| c.dtype().is_primitive_numeric())
            .unwrap_or(false)
    }

    /// Float view of a column; text is coerced with [`numeric_expr`]
    pub(crate) fn float_expr(&self, name: &str) -> crate::Result<Expr> {
        let column = self.require(name)?;
        Ok(if column.dtype() == &DataType::String {
            numeric_expr(name)
        } else {
            col(name).cast(DataType::Float64)
        })
    }

    /// Present values of `column` split by target class: (positive, negative)
    pub fn class_values(
        &self,
        column: &str,
        target: &TargetConfig,
    ) -> crate::Result<(Vec<f64>, Vec<f64>)> {
        self.require(&target.column)?;
        let values = self.float_expr(column)?;
        let positive = self.present_values(values.clone(), is_positive(target))?;
        let negative = self.present_values(values, is_positive(target).not())?;
        Ok((positive, negative))
    }

    fn present_values(&self, values: Expr, predicate: Expr) -> crate::Result<Vec<f64>> {
        let selected = self
            .frame
            .clone()
            .lazy()
            .select([values.filter(predicate).drop_nulls().alias("value")])
            .collect()?;
        let values = selected
            .column("value")?
            .as_materialized_series()
            .f64()?
            .into_no_null_iter()
            .collect();
        Ok(values)
    }
}

/// Rows whose target equals the positive label
pub(crate) fn is_positive(target: &TargetConfig) -> Expr {
    col(target.column.as_str()).eq(lit(target.positive.as_str()))
}

/// Text column parsed as `Float64`
///
/// Values are trimmed first. Anything that does not parse to a finite number
/// (blank, `N/A`, `NaN`, `inf`) becomes null.
pub(crate) fn numeric_expr(name: &str) -> Expr {
    let parsed = col(name)
        .str()
        .strip_chars(lit(NULL))
        .cast(DataType::Float64);
    when(parsed.clone().is_finite())
        .then(parsed)
        .otherwise(lit(NULL))
        .alias(name)
}

/// Load the CSV file and coerce column types
///
/// # Arguments
/// * `path` - Path to the CSV file
/// * `config` - Pipeline configuration naming the expected columns
///
/// # Returns
/// * `Dataset` with numeric columns detected, or `Load`/`Schema` errors
pub fn load_dataset(path: &Path, config: &EdaConfig) -> crate::Result<Dataset> {
    let load_error = |reason: String| EdaError::Load {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| load_error(e.to_string()))?;

    // Read every column as text; type coercion happens below
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| load_error(e.to_string()))?;

    tracing::debug!(rows = df.height(), columns = df.width(), "parsed CSV");

    let renamed: Vec<Expr> = df
        .get_column_names()
        .into_iter()
        .map(|name| col(name.as_str()).alias(name.trim()))
        .collect();
    let mut df = df
        .lazy()
        .select(renamed)
        .collect()
        .map_err(|e| load_error(e.to_string()))?;

    let missing: Vec<String> = config
        .required_columns()
        .into_iter()
        .filter(|name| df.get_column_index(name).is_none())
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(EdaError::Schema { missing });
    }

    let candidates: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != config.target.column)
        .map(|name| name.to_string())
        .collect();
    let parsed = df
        .clone()
        .lazy()
        .select(candidates.iter().map(|name| numeric_expr(name)).collect::<Vec<_>>())
        .collect()
        .map_err(|e| load_error(e.to_string()))?;

    // Promote a column only when every present value parsed
    for name in &candidates {
        let raw_missing = df.column(name)?.null_count();
        let column = parsed.column(name)?;
        if raw_missing < df.height() && column.null_count() == raw_missing {
            df.with_column(column.clone())?;
        }
    }

    Ok(Dataset::from(df))
}

/// Missing-value count for one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCount {
    pub column: String,
    pub count: usize,
}

/// Output of the cleaning stage
#[derive(Debug, Clone)]
pub struct CleanedData {
    pub dataset: Dataset,
    /// Columns with at least one missing value, most missing first
    pub missing: Vec<MissingCount>,
    pub duplicates_dropped: usize,
    pub invalid_target_dropped: usize,
}

/// Target labels trimmed and mapped through the alias table
fn normalized_target(target: &TargetConfig) -> Expr {
    let label = col(target.column.as_str())
        .cast(DataType::String)
        .str()
        .strip_chars(lit(NULL));
    target
        .aliases
        .iter()
        .fold(label.clone(), |expr, (raw, canonical)| {
            when(label.clone().eq(lit(raw.as_str())))
                .then(lit(canonical.as_str()))
                .otherwise(expr)
        })
}

/// Fix known data-quality issues without imputing anything
///
/// Steps, in order: drop duplicate rows, strip text whitespace, drop ID
/// columns, coerce the charge column to numeric, normalise target labels and
/// drop rows whose target is not one of the two classes.
pub fn clean_dataset(raw: &Dataset, config: &EdaConfig) -> crate::Result<CleanedData> {
    let target = &config.target;
    raw.require(&target.column)?;

    // Exact duplicates, first occurrence wins
    let deduped = raw
        .frame
        .clone()
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;
    let duplicates_dropped = raw.height() - deduped.height();

    let mut columns = Vec::with_capacity(deduped.width());
    for column in deduped.get_columns() {
        let name = column.name().as_str();
        if config.id_columns.iter().any(|id| id == name) {
            continue;
        }
        let is_text = column.dtype() == &DataType::String;
        let expr = if name == target.column {
            normalized_target(target)
        } else if name == config.charge_column && is_text {
            numeric_expr(name)
        } else if is_text {
            col(name).str().strip_chars(lit(NULL))
        } else {
            col(name)
        };
        columns.push(expr.alias(name));
    }

    let label = || col(target.column.as_str());
    let frame = deduped
        .clone()
        .lazy()
        .select(columns)
        .filter(
            label()
                .eq(lit(target.positive.as_str()))
                .or(label().eq(lit(target.negative.as_str()))),
        )
        .collect()?;
    let invalid_target_dropped = deduped.height() - frame.height();

    let mut missing: Vec<MissingCount> = frame
        .get_columns()
        .iter()
        .map(|c| MissingCount {
            column: c.name().to_string(),
            count: c.null_count(),
        })
        .filter(|m| m.count > 0)
        .collect();
    missing.sort_by(|a, b| b.count.cmp(&a.count));

    tracing::debug!(
        duplicates_dropped,
        invalid_target_dropped,
        rows = frame.height(),
        "cleaning finished"
    );

    Ok(CleanedData {
        dataset: Dataset::from(frame),
        missing,
        duplicates_dropped,
        invalid_target_dropped,
    })
}
