//! Application constants for the SAR catalog builder
//!
//! This module contains the fixed dataset contract (column definitions,
//! layout names, media types), retry defaults, and the collection
//! description used throughout the catalog builder.

// =============================================================================
// Dataset Column Contract
// =============================================================================

/// Fixed column definitions shared by every item and the collection table
/// schema: (name, description, semantic type).
///
/// This is a contract for the dataset family, not something derived from the
/// files themselves.
pub const COLUMN_DEFINITIONS: &[(&str, &str, &str)] = &[
    ("rowid", "Unique row identifier", "integer"),
    (
        "firstMeasurementTime",
        "Time of the first measurement (UTC)",
        "datetime",
    ),
    (
        "lastMeasurementTime",
        "Time of the last measurement (UTC)",
        "datetime",
    ),
    ("owiLon", "Longitude of the pixel center (degrees East)", "number"),
    ("owiLat", "Latitude of the pixel center (degrees North)", "number"),
    ("owiWindSpeed", "Surface wind speed (m/s)", "number"),
    (
        "owiWindDirection",
        "Direction of the surface wind vector (degrees clockwise from North)",
        "number",
    ),
    ("owiMask", "Wind field mask", "number"),
    ("owiInversionQuality", "Wind inversion quality index", "number"),
    (
        "owiHeading",
        "Satellite heading (degrees clockwise from North)",
        "number",
    ),
    ("owiWindQuality", "Wind quality flag", "number"),
    ("owiRadVel", "Radial wind velocity (m/s)", "number"),
    ("date", "Date of the observation (UTC)", "date"),
    (
        "geometry",
        "Point geometry of the observation in WGS84 encoded as WKB",
        "binary",
    ),
];

/// Name of the WKB-encoded point geometry column
pub const GEOMETRY_COLUMN: &str = "geometry";

/// Name of the first-measurement timestamp column
pub const FIRST_TIME_COLUMN: &str = "firstMeasurementTime";

/// Name of the last-measurement timestamp column
pub const LAST_TIME_COLUMN: &str = "lastMeasurementTime";

/// Table name used in the collection's table extension block
pub const TABLE_NAME: &str = "owi";

/// Table description used in the collection's table extension block
pub const TABLE_DESCRIPTION: &str = "Sentinel-1 Ocean Wind Field measurements";

// =============================================================================
// Catalog Layout
// =============================================================================

/// Assets subdirectory searched for Parquet files
pub const ASSETS_DIR_NAME: &str = "assets";

/// Items subdirectory for per-file metadata documents
pub const ITEMS_DIR_NAME: &str = "items";

/// Root collection document name
pub const COLLECTION_DOC_NAME: &str = "collection.json";

/// Asset key for the Parquet data file of each item
pub const DATA_ASSET_KEY: &str = "data";

/// Extension used to discover tabular asset files
pub const PARQUET_EXTENSION: &str = "parquet";

/// Media type declared on Parquet data assets
pub const PARQUET_MEDIA_TYPE: &str = "application/x-parquet";

// =============================================================================
// STAC Schema Constants
// =============================================================================

/// STAC specification version written into every document
pub const STAC_VERSION: &str = "1.0.0";

/// Table extension schema URI declared on items and the collection
pub const TABLE_EXTENSION_URI: &str =
    "https://stac-extensions.github.io/table/v1.2.0/schema.json";

/// License recorded on the collection document
pub const COLLECTION_LICENSE: &str = "proprietary";

/// Fixed free-text description for the SAR wind dataset family
pub const COLLECTION_DESCRIPTION: &str = "Synthetic Aperture Radar wind vectors for HF-EOLUS \
Project area of interest (NW Iberian Peninsula and S Bay of Biscay) derived from Copernicus \
Sentinel-1 Level-2 OCN OWI products, processed into a GeoParquet dataset. The dataset contains \
wind speed, direction, and quality flag at approximately 10 m above sea level, along with \
satellite metadata. Data is provided in daily files covering the period from November 2020 to \
February 2023. Each file contains point geometries in WGS84 (EPSG:4326) with associated \
attributes.";

// =============================================================================
// Storage and Retry Constants
// =============================================================================

/// URL scheme prefix routed through the remote object store
pub const S3_SCHEME: &str = "s3://";

/// Marker embedded in error text when the object store throttles writes
pub const THROTTLING_MARKER: &str = "SLOW_DOWN";

/// Default number of write attempts before giving up
pub const DEFAULT_RETRIES: usize = 5;

/// Default base backoff delay in seconds; retry N waits `backoff * 2^(N-1)`
pub const DEFAULT_BACKOFF_SECS: u64 = 5;

// =============================================================================
// Helper Functions
// =============================================================================

/// Get the relative document path for an item with the given identifier
pub fn item_doc_path(item_id: &str) -> String {
    format!("{}/{}.json", ITEMS_DIR_NAME, item_id)
}

/// Check if a path is a Parquet file
pub fn is_parquet_file(path: &std::path::Path) -> bool {
    path.extension().is_some_and(|ext| ext == PARQUET_EXTENSION)
}
