//! Command implementation for the catalog builder CLI
//!
//! Contains the main command execution logic, logging setup, and the final
//! build report in human-readable or JSON form.

use crate::app::adapters::storage::StorageAdapter;
use crate::app::models::{Collection, format_rfc3339_z};
use crate::app::services::catalog_builder::CatalogBuilder;
use crate::cli::args::{Args, OutputFormat};
use crate::config::CatalogConfig;
use crate::{Error, Result};
use indicatif::HumanDuration;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Summary of one catalog build for reporting
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Collection identifier
    pub collection_id: String,
    /// Number of items built
    pub items_built: usize,
    /// Aggregate row count over all items
    pub total_rows: u64,
    /// Aggregate spatial extent as [minx, miny, maxx, maxy]
    pub spatial_extent: [f64; 4],
    /// Aggregate temporal extent as RFC3339-Z strings
    pub temporal_extent: (String, String),
    /// Total processing time
    pub processing_time: std::time::Duration,
}

impl BuildReport {
    fn from_collection(collection: &Collection, processing_time: std::time::Duration) -> Self {
        Self {
            collection_id: collection.id.clone(),
            items_built: collection.items.len(),
            total_rows: collection.row_count,
            spatial_extent: collection.extent.spatial.to_array(),
            temporal_extent: (
                format_rfc3339_z(&collection.extent.temporal.start),
                format_rfc3339_z(&collection.extent.temporal.end),
            ),
            processing_time,
        }
    }
}

/// Main command runner for the catalog builder
///
/// Orchestrates the workflow:
/// 1. Set up logging and validate arguments
/// 2. Load property overlays
/// 3. Build, persist, and validate the catalog
/// 4. Generate the final report
pub async fn run(args: Args) -> Result<BuildReport> {
    let start_time = Instant::now();

    setup_logging(&args);

    info!("Starting catalog build");
    debug!("Command line arguments: {:?}", args);

    args.validate()?;

    let item_properties = load_properties(args.item_properties.as_deref())?;
    let collection_properties = load_properties(args.collection_properties.as_deref())?;

    let storage = StorageAdapter::new();
    let config = if args.show_progress() {
        CatalogConfig::default()
    } else {
        CatalogConfig::default().without_progress()
    };

    let collection = CatalogBuilder::new(&args.root, &args.collection_id, &storage)
        .with_item_properties(item_properties)
        .with_collection_properties(collection_properties)
        .with_config(config)
        .build()
        .await?;

    let report = BuildReport::from_collection(&collection, start_time.elapsed());
    generate_report(&args, &report);

    Ok(report)
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sar_catalog={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .init();

    debug!("Logging initialized at level: {}", log_level);
}

/// Load a JSON property overlay file, or an empty overlay if none was given
fn load_properties(path: Option<&Path>) -> Result<Map<String, Value>> {
    let Some(path) = path else {
        return Ok(Map::new());
    };

    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("failed to read properties file '{}'", path.display()), e))?;
    let value: Value = serde_json::from_str(&text).map_err(|e| {
        Error::json(
            format!("properties file '{}' is not valid JSON", path.display()),
            e,
        )
    })?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(Error::configuration(format!(
            "Properties file '{}' must contain a JSON object",
            path.display()
        ))),
    }
}

/// Generate the final build report
fn generate_report(args: &Args, report: &BuildReport) {
    if args.quiet {
        return;
    }
    match args.output_format {
        OutputFormat::Human => generate_human_report(report),
        OutputFormat::Json => generate_json_report(report),
    }
}

/// Generate human-readable report
fn generate_human_report(report: &BuildReport) {
    let duration = HumanDuration(report.processing_time);
    let [minx, miny, maxx, maxy] = report.spatial_extent;

    println!();
    println!("Catalog build complete: '{}'", report.collection_id);
    println!("  Items built:     {}", report.items_built);
    println!("  Total rows:      {}", report.total_rows);
    println!("  Spatial extent:  [{minx}, {miny}, {maxx}, {maxy}]");
    println!(
        "  Temporal extent: {} .. {}",
        report.temporal_extent.0, report.temporal_extent.1
    );
    println!("  Processing time: {}", duration);
    println!();
}

/// Generate JSON report for machine consumption
fn generate_json_report(report: &BuildReport) {
    let json_report = serde_json::json!({
        "collection_id": report.collection_id,
        "items_built": report.items_built,
        "total_rows": report.total_rows,
        "spatial_extent": report.spatial_extent,
        "temporal_extent": [report.temporal_extent.0, report.temporal_extent.1],
        "processing_time_seconds": report.processing_time.as_secs_f64(),
    });

    println!(
        "{}",
        serde_json::to_string_pretty(&json_report).expect("report serializes")
    );
}
