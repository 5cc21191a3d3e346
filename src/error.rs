//! Error types for the churn EDA pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used throughout the library
pub type Result<T> = std::result::Result<T, EdaError>;

/// Every failure the pipeline can report.
///
/// Only [`EdaError::ArtifactWrite`] is recoverable: the chart is skipped and
/// the run continues. Everything else aborts before the report is written.
#[derive(Error, Debug)]
pub enum EdaError {
    #[error("failed to load dataset from {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("dataset is missing expected column(s): {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("dataset has no rows after cleaning")]
    EmptyDataset,

    #[error("failed to write chart {artifact}: {reason}")]
    ArtifactWrite { artifact: String, reason: String },

    #[error("failed to write report to {}: {source}", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("dataframe operation failed: {0}")]
    Frame(#[from] polars::prelude::PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EdaError {
    /// Whether this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ArtifactWrite { .. })
    }

    pub(crate) fn schema(column: impl Into<String>) -> Self {
        Self::Schema {
            missing: vec![column.into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_artifact_errors_are_recoverable() {
        let artifact = EdaError::ArtifactWrite {
            artifact: "num_box_tenure.png".to_string(),
            reason: "permission denied".to_string(),
        };
        assert!(!artifact.is_fatal());
        assert!(EdaError::EmptyDataset.is_fatal());
        assert!(EdaError::schema("Churn").is_fatal());
    }

    #[test]
    fn test_schema_message_lists_columns() {
        let err = EdaError::Schema {
            missing: vec!["Contract".to_string(), "tenure".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "dataset is missing expected column(s): Contract, tenure"
        );
    }
}
