//! Pipeline configuration: paths, target definition and the column lists to analyse
//!
//! Defaults describe the Telco customer-churn dataset. Any field can be
//! overridden from a TOML file; omitted fields keep their defaults.

use crate::error::EdaError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level configuration threaded through every pipeline stage
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EdaConfig {
    /// Input CSV file
    pub data_path: PathBuf,
    /// Directory holding the markdown report
    pub reports_dir: PathBuf,
    /// Directory holding the PNG charts
    pub figures_dir: PathBuf,
    /// Markdown report output path
    pub report_path: PathBuf,
    pub target: TargetConfig,
    /// Identifier columns dropped during cleaning
    pub id_columns: Vec<String>,
    /// Nominally numeric column that may hold placeholder text
    pub charge_column: String,
    /// Categorical columns for segment analysis, in report order
    pub categorical: Vec<SegmentColumn>,
    /// Numeric columns compared across target classes, in report order
    pub numeric: Vec<String>,
    pub charts: ChartConfig,
}

impl Default for EdaConfig {
    fn default() -> Self {
        let reports_dir = PathBuf::from("reports");
        Self {
            data_path: PathBuf::from("data").join("telco_churn.csv"),
            figures_dir: reports_dir.join("figures"),
            report_path: reports_dir.join("week1_findings.md"),
            reports_dir,
            target: TargetConfig::default(),
            id_columns: vec!["customerID".to_string()],
            charge_column: "TotalCharges".to_string(),
            categorical: vec![
                SegmentColumn::new("gender"),
                SegmentColumn::new("SeniorCitizen"),
                SegmentColumn::new("Partner"),
                SegmentColumn::new("Dependents"),
                SegmentColumn::highlighted("Contract", "Contract"),
                SegmentColumn::highlighted("PaymentMethod", "Payment Method"),
                SegmentColumn::highlighted("InternetService", "Internet Service"),
                SegmentColumn::new("OnlineSecurity"),
                SegmentColumn::new("TechSupport"),
                SegmentColumn::new("PaperlessBilling"),
            ],
            numeric: vec![
                "tenure".to_string(),
                "MonthlyCharges".to_string(),
                "TotalCharges".to_string(),
            ],
            charts: ChartConfig::default(),
        }
    }
}

impl EdaConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            EdaError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> crate::Result<Self> {
        toml::from_str(text).map_err(|e| EdaError::Config(e.to_string()))
    }

    /// Place all outputs under `reports_dir`, keeping the default layout
    pub fn with_reports_dir(mut self, reports_dir: impl Into<PathBuf>) -> Self {
        let reports_dir = reports_dir.into();
        self.figures_dir = reports_dir.join("figures");
        self.report_path = reports_dir.join("week1_findings.md");
        self.reports_dir = reports_dir;
        self
    }

    /// Columns the loader insists on, deduplicated, in first-mention order
    pub fn required_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        let candidates = std::iter::once(self.target.column.as_str())
            .chain(std::iter::once(self.charge_column.as_str()))
            .chain(self.categorical.iter().map(|c| c.name.as_str()))
            .chain(self.numeric.iter().map(String::as_str));
        for name in candidates {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
        columns
    }
}

/// Binary target column definition
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    pub column: String,
    pub positive: String,
    pub negative: String,
    /// Raw label → canonical label rewrites applied before validation
    pub aliases: BTreeMap<String, String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        let aliases = [
            ("yes", "Yes"),
            ("no", "No"),
            ("1", "Yes"),
            ("0", "No"),
            ("True", "Yes"),
            ("False", "No"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        Self {
            column: "Churn".to_string(),
            positive: "Yes".to_string(),
            negative: "No".to_string(),
            aliases,
        }
    }
}

impl TargetConfig {
    /// Map a raw label to its canonical form
    pub fn normalize<'a>(&'a self, raw: &'a str) -> &'a str {
        self.aliases.get(raw).map(String::as_str).unwrap_or(raw)
    }
}

/// A categorical column to segment by
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentColumn {
    pub name: String,
    /// Display name used in the report's key observations
    #[serde(default)]
    pub label: Option<String>,
    /// Whether the highest-churn category is called out in the report
    #[serde(default)]
    pub highlight: bool,
}

impl SegmentColumn {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: None,
            highlight: false,
        }
    }

    pub fn highlighted(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: Some(label.to_string()),
            highlight: true,
        }
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// Chart rendering knobs
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartConfig {
    /// Maximum categories drawn in a churn-rate chart
    pub top_n: usize,
    pub histogram_bins: usize,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            top_n: 20,
            histogram_bins: 30,
            width: 1000,
            height: 700,
        }
    }
}
