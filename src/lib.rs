//! churnlens: exploratory data analysis for customer-churn datasets
//!
//! Loads a churn CSV with Polars, cleans it, profiles churn overall, by
//! category and across numeric columns, renders PNG charts with Plotters and
//! writes a markdown findings report.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use config::{EdaConfig, SegmentColumn, TargetConfig};
pub use data::{clean_dataset, load_dataset, CleanedData, Dataset};
pub use error::{EdaError, Result};
pub use pipeline::{run_eda, EdaOutcome};
pub use report::{render_markdown, Findings};
pub use viz::{ChartRenderer, RenderedFigures};
