//! SAR Catalog Library
//!
//! A Rust library for building SpatioTemporal Asset Catalog (STAC) metadata
//! over directories of SAR-derived ocean wind GeoParquet files.
//!
//! This library provides tools for:
//! - Summarizing GeoParquet files (spatial bounds, temporal range, row count)
//!   using column projection so unrelated measurement columns stay on disk
//! - Building a collection/item/asset hierarchy with the STAC Table extension
//! - Validating every record before and after persistence, with structured
//!   sub-error reporting
//! - Persisting metadata documents through a storage adapter that routes
//!   between S3 and the local filesystem
//! - Writing partitioned Parquet datasets with retry on S3 throttling

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod catalog_builder;
        pub mod dataset_writer;
        pub mod summarizer;
        pub mod validation;
    }
    pub mod adapters {
        pub mod storage;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{BoundingBox, Collection, Item, TimeRange};
pub use app::services::summarizer::FileSummary;
pub use config::CatalogConfig;

use app::services::validation::ValidationError;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for catalog building operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Parquet read or write failed
    #[error("Parquet error: {message}")]
    Parquet {
        message: String,
        #[source]
        source: polars::error::PolarsError,
    },

    /// A file has no rows in its geometry column
    #[error("No geometry rows found in {path}")]
    EmptyFile { path: String },

    /// No Parquet files were discovered under the assets directory
    #[error("No Parquet files found under assets directory: {path}")]
    EmptyCatalog { path: String },

    /// WKB geometry decoding failed
    #[error("Geometry decoding error in {path}: {message}")]
    Geometry { path: String, message: String },

    /// An item record violated its schema
    #[error("Validation failed for STAC item '{id}': {source}")]
    ItemValidation {
        id: String,
        #[source]
        source: ValidationError,
    },

    /// The persisted collection hierarchy violated its schema
    #[error("Validation failed after saving STAC catalog for '{id}': {source}")]
    CollectionValidation {
        id: String,
        #[source]
        source: ValidationError,
    },

    /// Storage backend failure (local or remote)
    #[error("Storage error at '{path}': {message}")]
    Storage { path: String, message: String },

    /// Remote object store failure
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Directory traversal error
    #[error("Directory traversal error: {message}")]
    DirectoryTraversal {
        message: String,
        #[source]
        source: walkdir::Error,
    },

    /// JSON serialization or parsing error
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a Parquet error with context
    pub fn parquet(message: impl Into<String>, source: polars::error::PolarsError) -> Self {
        Self::Parquet {
            message: message.into(),
            source,
        }
    }

    /// Create an empty file error
    pub fn empty_file(path: impl Into<String>) -> Self {
        Self::EmptyFile { path: path.into() }
    }

    /// Create an empty catalog error
    pub fn empty_catalog(path: impl Into<String>) -> Self {
        Self::EmptyCatalog { path: path.into() }
    }

    /// Create a geometry decoding error
    pub fn geometry(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Geometry {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an item validation error wrapping the structured violation
    pub fn item_validation(id: impl Into<String>, source: ValidationError) -> Self {
        Self::ItemValidation {
            id: id.into(),
            source,
        }
    }

    /// Create a post-save collection validation error
    pub fn collection_validation(id: impl Into<String>, source: ValidationError) -> Self {
        Self::CollectionValidation {
            id: id.into(),
            source,
        }
    }

    /// Create a storage error
    pub fn storage(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a JSON error with context
    pub fn json(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            message: message.into(),
            source,
        }
    }

    /// Check whether this error carries the object store's transient
    /// throttling signature anywhere in its message chain.
    ///
    /// The store reports throttling as a generic failure with a marker
    /// embedded in the message text, not as a distinct error kind.
    pub fn is_throttling(&self) -> bool {
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self);
        while let Some(err) = current {
            if err.to_string().contains(constants::THROTTLING_MARKER) {
                return true;
            }
            current = err.source();
        }
        false
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<polars::error::PolarsError> for Error {
    fn from(error: polars::error::PolarsError) -> Self {
        Self::Parquet {
            message: "Parquet operation failed".to_string(),
            source: error,
        }
    }
}

impl From<walkdir::Error> for Error {
    fn from(error: walkdir::Error) -> Self {
        Self::DirectoryTraversal {
            message: "Directory traversal failed".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Json {
            message: "JSON serialization failed".to_string(),
            source: error,
        }
    }
}
