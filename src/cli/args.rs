//! Command-line argument definitions for the catalog builder
//!
//! Defines the CLI interface using the clap derive API. The tool is a
//! single-purpose command: point it at a root directory containing an
//! `assets/` subtree of GeoParquet files and it writes the catalog next to
//! them.

use crate::constants::ASSETS_DIR_NAME;
use crate::{Error, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the SAR GeoParquet catalog builder
///
/// Scans GeoParquet files under `<ROOT>/assets/` and builds one STAC
/// collection with an item per Parquet file. Items are saved under
/// `<ROOT>/items/` and link to assets with relative hrefs.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "build-catalog",
    version,
    about = "Build a STAC catalog for SAR GeoParquet files",
    long_about = "Scans GeoParquet files under <ROOT>/assets/ and builds one STAC collection \
                  with an item per Parquet file. Each item carries the file's spatial bounding \
                  box, temporal range, row count, and the fixed wind-field column schema. The \
                  collection document lands at <ROOT>/collection.json and items under \
                  <ROOT>/items/."
)]
pub struct Args {
    /// Root directory containing the assets/ subdirectory
    #[arg(value_name = "ROOT", help = "Root directory containing assets/")]
    pub root: PathBuf,

    /// Identifier for the generated collection
    #[arg(
        long = "collection-id",
        value_name = "ID",
        help = "Identifier for the generated collection"
    )]
    pub collection_id: String,

    /// JSON file with extra properties merged into every item
    ///
    /// Computed properties (start_datetime, end_datetime, table extension
    /// fields) always win over overlay keys.
    #[arg(
        long = "item-properties",
        value_name = "PATH",
        help = "JSON file with extra properties for every item"
    )]
    pub item_properties: Option<PathBuf>,

    /// JSON file with extra top-level properties for the collection
    #[arg(
        long = "collection-properties",
        value_name = "PATH",
        help = "JSON file with extra top-level collection properties"
    )]
    pub collection_properties: Option<PathBuf>,

    /// Output format for the final build report
    #[arg(
        long = "output-format",
        value_enum,
        default_value = "human",
        help = "Output format for the build report"
    )]
    pub output_format: OutputFormat,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show errors and critical messages. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Output format options for the build report
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON format for scripting
    Json,
}

impl Args {
    /// Validate the command arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if !self.root.exists() {
            return Err(Error::configuration(format!(
                "Root path does not exist: {}",
                self.root.display()
            )));
        }

        if !self.root.is_dir() {
            return Err(Error::configuration(format!(
                "Root path is not a directory: {}",
                self.root.display()
            )));
        }

        let assets_dir = self.root.join(ASSETS_DIR_NAME);
        if !assets_dir.is_dir() {
            return Err(Error::configuration(format!(
                "Root must contain an '{}' directory: {}",
                ASSETS_DIR_NAME,
                self.root.display()
            )));
        }

        if self.collection_id.trim().is_empty() {
            return Err(Error::configuration(
                "Collection identifier cannot be empty".to_string(),
            ));
        }

        for properties_file in [&self.item_properties, &self.collection_properties]
            .into_iter()
            .flatten()
        {
            if !properties_file.exists() {
                return Err(Error::configuration(format!(
                    "Properties file does not exist: {}",
                    properties_file.display()
                )));
            }
        }

        Ok(())
    }

    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid_args(temp_dir: &TempDir) -> Args {
        std::fs::create_dir_all(temp_dir.path().join(ASSETS_DIR_NAME)).unwrap();
        Args {
            root: temp_dir.path().to_path_buf(),
            collection_id: "sar-wind".to_string(),
            item_properties: None,
            collection_properties: None,
            output_format: OutputFormat::Human,
            verbose: 0,
            quiet: false,
        }
    }

    #[test]
    fn test_args_validation() {
        let temp_dir = TempDir::new().unwrap();
        let args = valid_args(&temp_dir);
        assert!(args.validate().is_ok());

        // Nonexistent root
        let mut invalid = args.clone();
        invalid.root = PathBuf::from("/nonexistent/path");
        assert!(invalid.validate().is_err());

        // Empty collection id
        let mut invalid = args.clone();
        invalid.collection_id = "  ".to_string();
        assert!(invalid.validate().is_err());

        // Missing properties file
        let mut invalid = args.clone();
        invalid.item_properties = Some(temp_dir.path().join("missing.json"));
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_root_without_assets_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let args = Args {
            root: temp_dir.path().to_path_buf(),
            collection_id: "sar-wind".to_string(),
            item_properties: None,
            collection_properties: None,
            output_format: OutputFormat::Human,
            verbose: 0,
            quiet: false,
        };

        let err = args.validate().unwrap_err();
        assert!(err.to_string().contains("assets"));
    }

    #[test]
    fn test_log_level() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = valid_args(&temp_dir);

        // Default level
        assert_eq!(args.get_log_level(), "warn");

        // Verbose levels
        args.verbose = 1;
        assert_eq!(args.get_log_level(), "info");

        args.verbose = 2;
        assert_eq!(args.get_log_level(), "debug");

        args.verbose = 3;
        assert_eq!(args.get_log_level(), "trace");

        // Quiet mode
        args.quiet = true;
        assert_eq!(args.get_log_level(), "error");
    }

    #[test]
    fn test_show_progress() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = valid_args(&temp_dir);

        assert!(args.show_progress());

        args.quiet = true;
        assert!(!args.show_progress());
    }

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from([
            "build-catalog",
            "/data/sar",
            "--collection-id",
            "sar-wind",
            "--item-properties",
            "/data/item_props.json",
        ]);

        assert_eq!(args.root, PathBuf::from("/data/sar"));
        assert_eq!(args.collection_id, "sar-wind");
        assert_eq!(
            args.item_properties,
            Some(PathBuf::from("/data/item_props.json"))
        );
        assert!(args.collection_properties.is_none());
    }
}
