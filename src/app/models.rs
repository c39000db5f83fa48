//! Metadata record model for the SAR wind catalog
//!
//! This module contains the entity definitions for the two-level catalog
//! hierarchy (collection, items, assets, table schema) and their structural
//! building blocks, independent of how the catalog builder assembles them.
//! Serialization targets the STAC item/collection document shapes with the
//! Table extension.

use crate::constants::{
    self, COLLECTION_LICENSE, DATA_ASSET_KEY, STAC_VERSION, TABLE_DESCRIPTION,
    TABLE_EXTENSION_URI, TABLE_NAME,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

// =============================================================================
// Spatial and Temporal Primitives
// =============================================================================

/// Axis-aligned bounding box in WGS84 decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl BoundingBox {
    /// Create a bounding box from explicit bounds
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    /// Seed value for pairwise min/max reduction.
    ///
    /// Lower bounds start at +infinity and upper bounds at -infinity so a
    /// single point produces a degenerate box instead of an error.
    pub fn seed() -> Self {
        Self {
            minx: f64::INFINITY,
            miny: f64::INFINITY,
            maxx: f64::NEG_INFINITY,
            maxy: f64::NEG_INFINITY,
        }
    }

    /// Grow the box to include a point
    pub fn include_point(&mut self, x: f64, y: f64) {
        self.minx = self.minx.min(x);
        self.miny = self.miny.min(y);
        self.maxx = self.maxx.max(x);
        self.maxy = self.maxy.max(y);
    }

    /// Grow the box to cover another box
    pub fn merge(&mut self, other: &BoundingBox) {
        self.minx = self.minx.min(other.minx);
        self.miny = self.miny.min(other.miny);
        self.maxx = self.maxx.max(other.maxx);
        self.maxy = self.maxy.max(other.maxy);
    }

    /// Whether this box fully contains another box
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.minx <= other.minx
            && self.miny <= other.miny
            && self.maxx >= other.maxx
            && self.maxy >= other.maxy
    }

    /// Bounds as the `[minx, miny, maxx, maxy]` array STAC documents use
    pub fn to_array(&self) -> [f64; 4] {
        [self.minx, self.miny, self.maxx, self.maxy]
    }
}

/// Closed time range as UTC instants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Widen the range to cover another range (min of starts, max of ends)
    pub fn merge(&mut self, other: &TimeRange) {
        if other.start < self.start {
            self.start = other.start;
        }
        if other.end > self.end {
            self.end = other.end;
        }
    }
}

/// Format a UTC instant as RFC3339 with a literal trailing `Z`.
///
/// Catalog schemas require the `Z` suffix form; `+00:00` would be rejected,
/// so every timestamp written into a document goes through this helper.
pub fn format_rfc3339_z(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// =============================================================================
// Table Extension Building Blocks
// =============================================================================

/// One column definition in the table extension block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

impl TableColumn {
    /// The fixed column set shared verbatim by every item and the collection
    pub fn fixed_set() -> Vec<TableColumn> {
        constants::COLUMN_DEFINITIONS
            .iter()
            .map(|(name, description, column_type)| TableColumn {
                name: (*name).to_string(),
                description: (*description).to_string(),
                column_type: (*column_type).to_string(),
            })
            .collect()
    }
}

// =============================================================================
// Assets and Links
// =============================================================================

/// A data asset referenced by an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Path to the asset file, relative to the catalog root
    pub href: String,

    /// Declared media type
    #[serde(rename = "type")]
    pub media_type: String,

    /// Roles this asset plays ("data" for the Parquet file)
    pub roles: Vec<String>,
}

impl Asset {
    /// Create the data asset for a Parquet file
    pub fn parquet_data(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            media_type: constants::PARQUET_MEDIA_TYPE.to_string(),
            roles: vec![DATA_ASSET_KEY.to_string()],
        }
    }
}

/// A structural link between catalog records.
///
/// The href stays unset until layout assignment resolves it; persisted
/// documents must never contain a null href.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: Option<String>,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: Some(href.into()),
        }
    }

    fn to_document(&self) -> Value {
        json!({
            "rel": self.rel,
            "href": self.href,
            "type": "application/json",
        })
    }
}

// =============================================================================
// Item
// =============================================================================

/// One catalog item per GeoParquet file.
///
/// Created from a file summary during the build pass; immutable afterwards
/// except for link and href assignment during layout normalization.
#[derive(Debug, Clone)]
pub struct Item {
    /// Identifier derived from the file name, unique within the collection
    pub id: String,

    /// File-level bounding box, also the source of the rectangle geometry
    pub bbox: BoundingBox,

    /// File-level temporal range
    pub time_range: TimeRange,

    /// User-supplied property overlay; computed properties win on conflict
    pub extra_properties: Map<String, Value>,

    /// The single Parquet data asset
    pub asset: Asset,

    /// Table extension: fixed column definitions
    pub columns: Vec<TableColumn>,

    /// Table extension: name of the primary geometry column
    pub primary_geometry: String,

    /// Table extension: number of rows in the asset file
    pub row_count: u64,

    /// Structural links, resolved during layout assignment
    pub links: Vec<Link>,

    /// Back-reference to the owning collection, set when linked
    pub collection_id: Option<String>,

    /// Absolute persistence target, set during layout assignment
    pub self_href: Option<String>,
}

impl Item {
    /// Rectangle geometry covering the item's bounding box as a closed
    /// GeoJSON polygon ring
    pub fn geometry(&self) -> Value {
        let b = &self.bbox;
        json!({
            "type": "Polygon",
            "coordinates": [[
                [b.minx, b.miny],
                [b.maxx, b.miny],
                [b.maxx, b.maxy],
                [b.minx, b.maxy],
                [b.minx, b.miny],
            ]],
        })
    }

    /// Serialize to the STAC item document shape
    pub fn to_document(&self) -> Value {
        let mut properties = self.extra_properties.clone();
        properties.insert(
            "datetime".to_string(),
            Value::String(format_rfc3339_z(&self.time_range.start)),
        );
        properties.insert(
            "start_datetime".to_string(),
            Value::String(format_rfc3339_z(&self.time_range.start)),
        );
        properties.insert(
            "end_datetime".to_string(),
            Value::String(format_rfc3339_z(&self.time_range.end)),
        );
        properties.insert(
            "table:columns".to_string(),
            serde_json::to_value(&self.columns).expect("column definitions serialize"),
        );
        properties.insert(
            "table:primary_geometry".to_string(),
            Value::String(self.primary_geometry.clone()),
        );
        properties.insert("table:row_count".to_string(), json!(self.row_count));

        let links: Vec<Value> = self.links.iter().map(Link::to_document).collect();

        let mut assets = Map::new();
        assets.insert(
            DATA_ASSET_KEY.to_string(),
            serde_json::to_value(&self.asset).expect("asset serializes"),
        );

        let mut doc = json!({
            "type": "Feature",
            "stac_version": STAC_VERSION,
            "stac_extensions": [TABLE_EXTENSION_URI],
            "id": self.id,
            "geometry": self.geometry(),
            "bbox": self.bbox.to_array(),
            "properties": properties,
            "links": links,
            "assets": assets,
        });
        if let Some(collection_id) = &self.collection_id {
            doc["collection"] = Value::String(collection_id.clone());
        }
        doc
    }
}

// =============================================================================
// Collection
// =============================================================================

/// Spatial and temporal extent of the whole collection
#[derive(Debug, Clone, PartialEq)]
pub struct Extent {
    pub spatial: BoundingBox,
    pub temporal: TimeRange,
}

impl Extent {
    fn to_document(&self) -> Value {
        json!({
            "spatial": { "bbox": [self.spatial.to_array()] },
            "temporal": {
                "interval": [[
                    format_rfc3339_z(&self.temporal.start),
                    format_rfc3339_z(&self.temporal.end),
                ]],
            },
        })
    }
}

/// The single collection record owning all items of a catalog run
#[derive(Debug, Clone)]
pub struct Collection {
    /// Caller-supplied identifier
    pub id: String,

    /// Fixed free-text description for the dataset family
    pub description: String,

    /// Aggregate extent covering every item
    pub extent: Extent,

    /// User-supplied extra top-level properties
    pub extra_fields: Map<String, Value>,

    /// Table extension: the shared column definitions
    pub columns: Vec<TableColumn>,

    /// Table extension: sum of item row counts
    pub row_count: u64,

    /// Owned items, in discovery order
    pub items: Vec<Item>,

    /// Structural links, resolved during layout assignment
    pub links: Vec<Link>,

    /// Absolute persistence target, set during layout assignment
    pub self_href: Option<String>,
}

impl Collection {
    /// Link an item into the collection (bidirectional reference).
    ///
    /// The collection-side link href stays unresolved until layout
    /// assignment.
    pub fn add_item(&mut self, mut item: Item) {
        item.collection_id = Some(self.id.clone());
        self.items.push(item);
    }

    /// Serialize to the STAC collection document shape
    pub fn to_document(&self) -> Value {
        let table = json!({
            "name": TABLE_NAME,
            "description": TABLE_DESCRIPTION,
            "columns": serde_json::to_value(&self.columns).expect("column definitions serialize"),
            "row_count": self.row_count,
        });

        let links: Vec<Value> = self.links.iter().map(Link::to_document).collect();

        let mut doc = Map::new();
        // Extra fields first so reserved keys below always win
        for (key, value) in &self.extra_fields {
            doc.insert(key.clone(), value.clone());
        }
        doc.insert("type".to_string(), json!("Collection"));
        doc.insert("stac_version".to_string(), json!(STAC_VERSION));
        doc.insert("stac_extensions".to_string(), json!([TABLE_EXTENSION_URI]));
        doc.insert("id".to_string(), json!(self.id));
        doc.insert("description".to_string(), json!(self.description));
        doc.insert("license".to_string(), json!(COLLECTION_LICENSE));
        doc.insert("extent".to_string(), self.extent.to_document());
        doc.insert("table:tables".to_string(), json!([table]));
        doc.insert("links".to_string(), Value::Array(links));
        Value::Object(doc)
    }
}

// =============================================================================
// Layout
// =============================================================================

/// Deterministic mapping from each record to its on-disk document path.
///
/// The collection lands at `<root>/collection.json`, items at
/// `<root>/items/<id>.json`; links between the persisted documents are
/// relative so the catalog is self-contained.
#[derive(Debug, Clone)]
pub struct Layout {
    root: String,
}

impl Layout {
    /// Create a layout rooted at the given directory or URL prefix
    pub fn new(root: impl Into<String>) -> Self {
        let mut root = root.into();
        while root.ends_with('/') {
            root.pop();
        }
        Self { root }
    }

    /// Absolute persistence target of the collection document
    pub fn collection_href(&self) -> String {
        format!("{}/{}", self.root, constants::COLLECTION_DOC_NAME)
    }

    /// Absolute persistence target of an item document
    pub fn item_href(&self, item_id: &str) -> String {
        format!("{}/{}", self.root, constants::item_doc_path(item_id))
    }

    /// Assign hrefs and resolve structural links across the hierarchy.
    ///
    /// Must run after all items are linked and before persistence; the
    /// persisted documents may not contain unresolved references.
    pub fn apply(&self, collection: &mut Collection) {
        collection.self_href = Some(self.collection_href());

        let mut collection_links = vec![Link::new("root", "./collection.json")];
        for item in &collection.items {
            collection_links.push(Link::new(
                "item",
                format!("./{}", constants::item_doc_path(&item.id)),
            ));
        }
        collection.links = collection_links;

        for item in &mut collection.items {
            item.self_href = Some(self.item_href(&item.id));
            item.links = vec![
                Link::new("root", "../collection.json"),
                Link::new("parent", "../collection.json"),
                Link::new("collection", "../collection.json"),
            ];
        }
    }
}
