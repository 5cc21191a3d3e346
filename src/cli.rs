//! Command-line interface definitions and argument parsing

use crate::config::EdaConfig;
use clap::Parser;
use std::path::PathBuf;

/// Exploratory data analysis for a customer-churn CSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file (overrides the configured data path)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// TOML configuration file; built-in Telco defaults are used otherwise
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build the effective configuration from the config file and overrides
    pub fn resolve_config(&self) -> crate::Result<EdaConfig> {
        let mut config = match &self.config {
            Some(path) => EdaConfig::from_toml_file(path)?,
            None => EdaConfig::default(),
        };
        if let Some(input) = &self.input {
            config.data_path = input.clone();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EdaError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_args() {
        let args = Args::parse_from(["churnlens", "-i", "custom.csv", "-v"]);
        assert_eq!(args.input, Some(PathBuf::from("custom.csv")));
        assert!(args.config.is_none());
        assert!(args.verbose);
    }

    #[test]
    fn test_resolve_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "data_path = \"from_config.csv\"").unwrap();
        writeln!(file, "charge_column = \"Charges\"").unwrap();

        let mut args = Args {
            input: None,
            config: Some(file.path().to_path_buf()),
            verbose: false,
        };
        let config = args.resolve_config().unwrap();
        assert_eq!(config.data_path, PathBuf::from("from_config.csv"));
        assert_eq!(config.charge_column, "Charges");

        args.input = Some(PathBuf::from("override.csv"));
        let config = args.resolve_config().unwrap();
        assert_eq!(config.data_path, PathBuf::from("override.csv"));

        args.config = Some(PathBuf::from("/nonexistent/churnlens.toml"));
        assert!(matches!(args.resolve_config(), Err(EdaError::Config(_))));
    }
}
