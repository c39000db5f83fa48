//! Catalog builder orchestration
//!
//! Drives a full catalog run: discover every GeoParquet file under the
//! root's `assets/` directory (sorted by path, so re-runs over an unchanged
//! tree enumerate identically), summarize each file, build and validate an
//! item per file, aggregate the collection extent, assign the on-disk
//! layout, persist every document through the storage adapter, and
//! re-validate the persisted hierarchy.
//!
//! Validation runs twice on purpose. Items are checked immediately after
//! construction because schema violations are far cheaper to localize per
//! item than after the whole collection is assembled. The collection and
//! the items are checked again after persistence because structural links
//! only resolve to concrete hrefs once the layout is assigned; validating
//! them earlier would spuriously fail on the still-unset references.

use crate::app::adapters::storage::ObjectIo;
use crate::app::models::{
    Asset, BoundingBox, Collection, Extent, Item, Layout, TableColumn, TimeRange,
};
use crate::app::services::summarizer::{self, FileSummary};
use crate::app::services::validation::{self, ValidationError};
use crate::config::CatalogConfig;
use crate::constants::{ASSETS_DIR_NAME, GEOMETRY_COLUMN};
use crate::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Builder for one catalog run over a root directory
pub struct CatalogBuilder<'a> {
    root: PathBuf,
    collection_id: String,
    item_properties: Map<String, Value>,
    collection_properties: Map<String, Value>,
    config: CatalogConfig,
    storage: &'a dyn ObjectIo,
}

impl<'a> CatalogBuilder<'a> {
    /// Create a builder for the given root and collection identifier.
    ///
    /// The storage adapter is passed explicitly; the builder never installs
    /// process-wide I/O defaults.
    pub fn new(
        root: impl Into<PathBuf>,
        collection_id: impl Into<String>,
        storage: &'a dyn ObjectIo,
    ) -> Self {
        Self {
            root: root.into(),
            collection_id: collection_id.into(),
            item_properties: Map::new(),
            collection_properties: Map::new(),
            config: CatalogConfig::default(),
            storage,
        }
    }

    /// Set the user-supplied property overlay merged into every item
    pub fn with_item_properties(mut self, properties: Map<String, Value>) -> Self {
        self.item_properties = properties;
        self
    }

    /// Set the user-supplied extra top-level collection properties
    pub fn with_collection_properties(mut self, properties: Map<String, Value>) -> Self {
        self.collection_properties = properties;
        self
    }

    /// Override the run configuration
    pub fn with_config(mut self, config: CatalogConfig) -> Self {
        self.config = config;
        self
    }

    /// Build, persist, and validate the complete catalog.
    ///
    /// Any failure aborts the run before metadata is persisted (or, for
    /// post-save validation, after persistence but with the error
    /// propagated); no partially linked catalog is ever reported as
    /// success.
    pub async fn build(&self) -> Result<Collection> {
        let assets_dir = self.root.join(ASSETS_DIR_NAME);
        if !assets_dir.is_dir() {
            return Err(Error::configuration(format!(
                "Root must contain an '{}' directory: {}",
                ASSETS_DIR_NAME,
                self.root.display()
            )));
        }

        let files = discover_parquet_files(&assets_dir)?;
        info!(
            "Discovered {} Parquet file(s) under {}",
            files.len(),
            assets_dir.display()
        );

        let progress = summarize_progress(files.len(), self.config.show_progress);

        let mut items: Vec<Item> = Vec::with_capacity(files.len());
        let mut overall_bbox = BoundingBox::seed();
        let mut overall_range: Option<TimeRange> = None;
        let mut total_rows: u64 = 0;

        for file in &files {
            progress.set_message(
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );

            // One bad file aborts the whole run; no partial catalog
            let summary = summarizer::summarize_file(file)?;
            let item = self.build_item(file, &assets_dir, &summary)?;
            self.validate_item_early(&item)?;

            overall_bbox.merge(&summary.bbox);
            match &mut overall_range {
                None => overall_range = Some(summary.time_range),
                Some(range) => range.merge(&summary.time_range),
            }
            total_rows += summary.row_count;
            items.push(item);
            progress.inc(1);
        }
        progress.finish_and_clear();

        if items.is_empty() {
            return Err(Error::empty_catalog(assets_dir.display().to_string()));
        }
        let temporal = overall_range.expect("non-empty item list has a time range");

        let mut collection = Collection {
            id: self.collection_id.clone(),
            description: self.config.description.clone(),
            extent: Extent {
                spatial: overall_bbox,
                temporal,
            },
            extra_fields: self.collection_properties.clone(),
            columns: TableColumn::fixed_set(),
            row_count: total_rows,
            items: Vec::new(),
            links: Vec::new(),
            self_href: None,
        };
        for item in items {
            collection.add_item(item);
        }

        // Layout must be assigned before persistence so every persisted
        // document carries resolved references
        let layout = Layout::new(self.root.to_string_lossy());
        layout.apply(&mut collection);

        self.persist(&collection).await?;
        self.validate_after_save(&collection)?;

        info!(
            "Catalog '{}' built: {} item(s), {} rows",
            collection.id,
            collection.items.len(),
            collection.row_count
        );
        Ok(collection)
    }

    /// Build the item record for one summarized file
    fn build_item(&self, file: &Path, assets_dir: &Path, summary: &FileSummary) -> Result<Item> {
        let id = file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| {
                Error::configuration(format!(
                    "Asset file name is not valid UTF-8: {}",
                    file.display()
                ))
            })?
            .to_string();

        let relative = file.strip_prefix(assets_dir).map_err(|_| {
            Error::configuration(format!(
                "Asset file escaped the assets directory: {}",
                file.display()
            ))
        })?;

        debug!("Built item '{id}' with {} rows", summary.row_count);

        Ok(Item {
            id,
            bbox: summary.bbox,
            time_range: summary.time_range,
            extra_properties: self.item_properties.clone(),
            asset: Asset::parquet_data(asset_href(relative)),
            columns: TableColumn::fixed_set(),
            primary_geometry: GEOMETRY_COLUMN.to_string(),
            row_count: summary.row_count,
            links: Vec::new(),
            collection_id: None,
            self_href: None,
        })
    }

    /// Validate an item immediately after construction
    fn validate_item_early(&self, item: &Item) -> Result<()> {
        if let Err(violation) = validation::validate_item(&item.to_document()) {
            let wrapped = Error::item_validation(&item.id, violation.clone());
            emit_combined_diagnostic(
                format!(
                    "ERROR: Item validation failed for item ID {}: {violation}",
                    item.id
                ),
                &violation,
                &wrapped,
            );
            return Err(wrapped);
        }
        Ok(())
    }

    /// Persist every document through the storage adapter.
    ///
    /// The strategy is self-contained: each document embeds relative links
    /// to its neighbors and can be read independently, with no shared root
    /// catalog document.
    async fn persist(&self, collection: &Collection) -> Result<()> {
        let collection_href = collection
            .self_href
            .as_deref()
            .ok_or_else(|| Error::configuration("Layout must be assigned before persistence"))?;
        let text = serde_json::to_string_pretty(&collection.to_document())?;
        self.storage.write_text(collection_href, &text).await?;

        for item in &collection.items {
            let item_href = item.self_href.as_deref().ok_or_else(|| {
                Error::configuration("Layout must be assigned before persistence")
            })?;
            let text = serde_json::to_string_pretty(&item.to_document())?;
            self.storage.write_text(item_href, &text).await?;
        }

        debug!(
            "Persisted collection and {} item document(s)",
            collection.items.len()
        );
        Ok(())
    }

    /// Re-validate the hierarchy once hrefs are concrete
    fn validate_after_save(&self, collection: &Collection) -> Result<()> {
        let result = validation::validate_collection(&collection.to_document()).and_then(|()| {
            for item in &collection.items {
                validation::validate_item(&item.to_document())?;
            }
            Ok(())
        });

        if let Err(violation) = result {
            let wrapped = Error::collection_validation(&collection.id, violation.clone());
            emit_combined_diagnostic(
                format!(
                    "ERROR: Post-save validation failed for collection '{}': {violation}",
                    collection.id
                ),
                &violation,
                &wrapped,
            );
            return Err(wrapped);
        }
        Ok(())
    }
}

/// Enumerate every Parquet file under the assets directory, sorted by path
fn discover_parquet_files(assets_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(assets_dir) {
        let entry = entry?;
        if entry.file_type().is_file() && crate::constants::is_parquet_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    // Deterministic item ordering across re-runs
    files.sort();
    Ok(files)
}

/// Asset href relative to the catalog root, always with forward slashes
fn asset_href(relative: &Path) -> String {
    let mut segments = vec![ASSETS_DIR_NAME.to_string()];
    for component in relative.components() {
        segments.push(component.as_os_str().to_string_lossy().into_owned());
    }
    segments.join("/")
}

fn summarize_progress(total: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress
}

/// Emit the single combined diagnostic line for a validation failure: the
/// top-level message, every nested sub-error, then the wrapped error's
/// source trace.
fn emit_combined_diagnostic(header: String, violation: &ValidationError, wrapped: &Error) {
    let mut parts = vec![header];
    parts.extend(violation.sub_errors.iter().cloned());

    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(wrapped);
    while let Some(err) = source {
        parts.push(err.to_string());
        source = err.source();
    }

    println!("{}", parts.join(" | "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::adapters::storage::{MemoryStore, ObjectIo};
    use crate::constants::{FIRST_TIME_COLUMN, LAST_TIME_COLUMN};
    use chrono::{TimeZone, Utc};
    use polars::prelude::{
        BinaryChunked, Column, DataFrame, DataType, IntoColumn, IntoSeries, ParquetWriter,
        TimeUnit,
    };
    use serde_json::json;
    use tempfile::TempDir;

    fn wkb_point(x: f64, y: f64) -> Vec<u8> {
        let mut buf = Vec::with_capacity(21);
        buf.push(1u8);
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&x.to_le_bytes());
        buf.extend_from_slice(&y.to_le_bytes());
        buf
    }

    fn write_asset(
        root: &Path,
        name: &str,
        points: &[(f64, f64)],
        first_micros: &[i64],
        last_micros: &[i64],
    ) {
        let path = root.join(ASSETS_DIR_NAME).join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let mut geometry: BinaryChunked = points
            .iter()
            .map(|(x, y)| Some(wkb_point(*x, *y)))
            .collect();
        geometry.rename(GEOMETRY_COLUMN.into());

        let first = Column::new(FIRST_TIME_COLUMN.into(), first_micros)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
            .unwrap();
        let last = Column::new(LAST_TIME_COLUMN.into(), last_micros)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
            .unwrap();

        let mut df =
            DataFrame::new(vec![geometry.into_series().into_column(), first, last]).unwrap();
        let file = std::fs::File::create(&path).unwrap();
        ParquetWriter::new(file).finish(&mut df).unwrap();
    }

    fn micros(y: i32, mo: u32, d: u32, h: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0)
            .unwrap()
            .timestamp_micros()
    }

    /// Two files matching the reference scenario: bboxes [-10,40,-9,41] and
    /// [-9,41,-8,42], one day apart, 3 and 5 rows
    fn seed_reference_assets(root: &Path) {
        write_asset(
            root,
            "a.parquet",
            &[(-10.0, 40.0), (-9.0, 41.0), (-9.5, 40.5)],
            &[micros(2021, 1, 1, 0), micros(2021, 1, 1, 0), micros(2021, 1, 1, 0)],
            &[micros(2021, 1, 1, 1), micros(2021, 1, 1, 1), micros(2021, 1, 1, 1)],
        );
        write_asset(
            root,
            "b.parquet",
            &[(-9.0, 41.0), (-8.0, 42.0), (-8.5, 41.5), (-8.2, 41.2), (-8.9, 41.9)],
            &[micros(2021, 1, 2, 0); 5],
            &[micros(2021, 1, 2, 1); 5],
        );
    }

    fn quiet_config() -> CatalogConfig {
        CatalogConfig::default().without_progress()
    }

    #[tokio::test]
    async fn test_build_aggregates_extent_and_rows() {
        let temp_dir = TempDir::new().unwrap();
        seed_reference_assets(temp_dir.path());
        let store = MemoryStore::new();

        let collection = CatalogBuilder::new(temp_dir.path(), "sar-wind", &store)
            .with_config(quiet_config())
            .build()
            .await
            .unwrap();

        assert_eq!(collection.items.len(), 2);
        assert_eq!(collection.row_count, 8);
        assert_eq!(collection.extent.spatial.to_array(), [-10.0, 40.0, -8.0, 42.0]);
        assert_eq!(
            collection.extent.temporal.start,
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            collection.extent.temporal.end,
            Utc.with_ymd_and_hms(2021, 1, 2, 1, 0, 0).unwrap()
        );

        // Sorted discovery fixes item order
        assert_eq!(collection.items[0].id, "a");
        assert_eq!(collection.items[1].id, "b");
        assert_eq!(collection.items[0].asset.href, "assets/a.parquet");

        // Collection extent bounds every item
        for item in &collection.items {
            assert!(collection.extent.spatial.contains(&item.bbox));
        }
    }

    #[tokio::test]
    async fn test_build_persists_collection_and_items() {
        let temp_dir = TempDir::new().unwrap();
        seed_reference_assets(temp_dir.path());
        let store = MemoryStore::new();

        CatalogBuilder::new(temp_dir.path(), "sar-wind", &store)
            .with_config(quiet_config())
            .build()
            .await
            .unwrap();

        let paths = store.paths();
        assert_eq!(paths.len(), 3);
        assert!(paths.iter().any(|p| p.ends_with("/collection.json")));
        assert!(paths.iter().any(|p| p.ends_with("/items/a.json")));
        assert!(paths.iter().any(|p| p.ends_with("/items/b.json")));

        let collection_path = paths.iter().find(|p| p.ends_with("/collection.json")).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&store.read_text(collection_path).await.unwrap()).unwrap();
        assert_eq!(doc["id"], "sar-wind");
        assert_eq!(doc["table:tables"][0]["row_count"], 8);
        assert_eq!(
            doc["links"]
                .as_array()
                .unwrap()
                .iter()
                .filter(|l| l["rel"] == "item")
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        seed_reference_assets(temp_dir.path());

        let mut documents = Vec::new();
        for _ in 0..2 {
            let store = MemoryStore::new();
            CatalogBuilder::new(temp_dir.path(), "sar-wind", &store)
                .with_config(quiet_config())
                .build()
                .await
                .unwrap();
            let collection_path = store
                .paths()
                .into_iter()
                .find(|p| p.ends_with("/collection.json"))
                .unwrap();
            documents.push(store.read_text(&collection_path).await.unwrap());
        }

        assert_eq!(documents[0], documents[1]);
    }

    #[tokio::test]
    async fn test_property_overlays_are_merged() {
        let temp_dir = TempDir::new().unwrap();
        seed_reference_assets(temp_dir.path());
        let store = MemoryStore::new();

        let mut item_props = serde_json::Map::new();
        item_props.insert("platform".to_string(), json!("sentinel-1a"));
        let mut collection_props = serde_json::Map::new();
        collection_props.insert("keywords".to_string(), json!(["sar", "wind"]));

        let collection = CatalogBuilder::new(temp_dir.path(), "sar-wind", &store)
            .with_item_properties(item_props)
            .with_collection_properties(collection_props)
            .with_config(quiet_config())
            .build()
            .await
            .unwrap();

        let item_doc = collection.items[0].to_document();
        assert_eq!(item_doc["properties"]["platform"], "sentinel-1a");

        let collection_doc = collection.to_document();
        assert_eq!(collection_doc["keywords"], json!(["sar", "wind"]));
    }

    #[tokio::test]
    async fn test_empty_assets_dir_fails_with_empty_catalog() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join(ASSETS_DIR_NAME)).unwrap();
        let store = MemoryStore::new();

        let result = CatalogBuilder::new(temp_dir.path(), "sar-wind", &store)
            .with_config(quiet_config())
            .build()
            .await;

        assert!(matches!(result, Err(Error::EmptyCatalog { .. })));
        assert!(store.paths().is_empty());
    }

    #[tokio::test]
    async fn test_missing_assets_dir_is_a_configuration_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = MemoryStore::new();

        let result = CatalogBuilder::new(temp_dir.path(), "sar-wind", &store)
            .with_config(quiet_config())
            .build()
            .await;

        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_empty_file_aborts_run_without_persisting() {
        let temp_dir = TempDir::new().unwrap();
        seed_reference_assets(temp_dir.path());
        write_asset(temp_dir.path(), "aa_empty.parquet", &[], &[], &[]);
        let store = MemoryStore::new();

        let result = CatalogBuilder::new(temp_dir.path(), "sar-wind", &store)
            .with_config(quiet_config())
            .build()
            .await;

        assert!(matches!(result, Err(Error::EmptyFile { .. })));
        // No partial catalog left behind
        assert!(store.paths().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_coordinates_fail_item_validation_early() {
        let temp_dir = TempDir::new().unwrap();
        // Longitude 200 is outside WGS84 bounds, so the built item violates
        // its schema
        write_asset(
            temp_dir.path(),
            "broken.parquet",
            &[(200.0, 40.0)],
            &[micros(2021, 1, 1, 0)],
            &[micros(2021, 1, 1, 1)],
        );
        let store = MemoryStore::new();

        let result = CatalogBuilder::new(temp_dir.path(), "sar-wind", &store)
            .with_config(quiet_config())
            .build()
            .await;

        match result.unwrap_err() {
            Error::ItemValidation { id, source } => {
                assert_eq!(id, "broken");
                assert!(source.sub_errors.iter().any(|e| e.contains("longitudes")));
            }
            other => panic!("Expected ItemValidation error, got {other:?}"),
        }
        // Validate-early aborts before anything is persisted
        assert!(store.paths().is_empty());
    }

    #[tokio::test]
    async fn test_post_save_validation_failure_references_collection() {
        let temp_dir = TempDir::new().unwrap();
        seed_reference_assets(temp_dir.path());
        let store = MemoryStore::new();

        // An empty collection id passes item-level checks but violates the
        // collection schema, which is only validated after persistence
        let result = CatalogBuilder::new(temp_dir.path(), "", &store)
            .with_config(quiet_config())
            .build()
            .await;

        match result.unwrap_err() {
            Error::CollectionValidation { id, source } => {
                assert_eq!(id, "");
                assert!(!source.sub_errors.is_empty());
            }
            other => panic!("Expected CollectionValidation error, got {other:?}"),
        }
        // The documents were already written when the second pass ran
        assert_eq!(store.paths().len(), 3);
    }

    #[tokio::test]
    async fn test_nested_assets_keep_relative_hrefs() {
        let temp_dir = TempDir::new().unwrap();
        write_asset(
            temp_dir.path(),
            "2021/01/day1.parquet",
            &[(-9.5, 43.0)],
            &[micros(2021, 1, 1, 0)],
            &[micros(2021, 1, 1, 1)],
        );
        let store = MemoryStore::new();

        let collection = CatalogBuilder::new(temp_dir.path(), "sar-wind", &store)
            .with_config(quiet_config())
            .build()
            .await
            .unwrap();

        assert_eq!(collection.items[0].id, "day1");
        assert_eq!(collection.items[0].asset.href, "assets/2021/01/day1.parquet");
    }
}
