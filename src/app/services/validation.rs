//! Metadata validation engine
//!
//! Validates serialized catalog documents against the structural rules of
//! the item and collection schemas. Unlike the early-return style used for
//! input checks elsewhere, the validator walks the whole document and
//! reports every violation it finds as an ordered list of sub-errors, so a
//! multi-cause failure is diagnosable from a single run.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Structured schema violation carrying an ordered list of sub-errors.
///
/// Reused identically for item-level and collection-level validation; the
/// caller wraps it with the record identifier.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub sub_errors: Vec<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, sub_errors: Vec<String>) -> Self {
        Self {
            message: message.into(),
            sub_errors,
        }
    }
}

/// RFC3339 instant with the literal `Z` suffix; `+00:00` is rejected
fn rfc3339_z_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?Z$")
            .expect("RFC3339 pattern compiles")
    })
}

/// Validate a serialized item document
pub fn validate_item(doc: &Value) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    check_string_field(doc, "type", Some("Feature"), &mut errors);
    check_string_field(doc, "stac_version", None, &mut errors);
    check_string_field(doc, "id", None, &mut errors);
    check_bbox(doc.get("bbox"), "bbox", &mut errors);
    check_geometry(doc.get("geometry"), &mut errors);
    check_links(doc.get("links"), &mut errors);

    match doc.get("properties") {
        Some(Value::Object(properties)) => {
            for field in ["datetime", "start_datetime", "end_datetime"] {
                check_datetime_property(properties.get(field), field, &mut errors);
            }
            check_table_block(properties, &mut errors);
        }
        _ => errors.push("'properties' must be an object".to_string()),
    }

    match doc.get("assets").and_then(|a| a.get(crate::constants::DATA_ASSET_KEY)) {
        Some(asset) => check_asset(asset, &mut errors),
        None => errors.push("'assets' must contain a 'data' asset".to_string()),
    }

    finish("item", errors)
}

/// Validate a serialized collection document
pub fn validate_collection(doc: &Value) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    check_string_field(doc, "type", Some("Collection"), &mut errors);
    check_string_field(doc, "stac_version", None, &mut errors);
    check_string_field(doc, "id", None, &mut errors);
    check_string_field(doc, "description", None, &mut errors);
    check_string_field(doc, "license", None, &mut errors);
    check_extent(doc.get("extent"), &mut errors);
    check_links(doc.get("links"), &mut errors);

    match doc.get("table:tables") {
        Some(Value::Array(tables)) if !tables.is_empty() => {
            for (index, table) in tables.iter().enumerate() {
                if table.get("name").and_then(Value::as_str).is_none_or(str::is_empty) {
                    errors.push(format!("'table:tables[{index}]' is missing a name"));
                }
                match table.get("columns") {
                    Some(Value::Array(columns)) if !columns.is_empty() => {}
                    _ => errors.push(format!(
                        "'table:tables[{index}]' must declare a non-empty column list"
                    )),
                }
                if table.get("row_count").and_then(Value::as_u64).is_none() {
                    errors.push(format!(
                        "'table:tables[{index}]' must declare an integer row_count"
                    ));
                }
            }
        }
        _ => errors.push("'table:tables' must be a non-empty array".to_string()),
    }

    finish("collection", errors)
}

fn finish(kind: &str, errors: Vec<String>) -> Result<(), ValidationError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(
            format!(
                "{kind} document does not conform to its schema ({} violation(s))",
                errors.len()
            ),
            errors,
        ))
    }
}

fn check_string_field(
    doc: &Value,
    field: &str,
    expected: Option<&str>,
    errors: &mut Vec<String>,
) {
    match doc.get(field).and_then(Value::as_str) {
        Some(value) if value.is_empty() => errors.push(format!("'{field}' must not be empty")),
        Some(value) => {
            if let Some(expected) = expected {
                if value != expected {
                    errors.push(format!("'{field}' must be '{expected}', found '{value}'"));
                }
            }
        }
        None => errors.push(format!("'{field}' is a required string field")),
    }
}

fn check_bbox(bbox: Option<&Value>, field: &str, errors: &mut Vec<String>) {
    let Some(values) = bbox.and_then(Value::as_array) else {
        errors.push(format!("'{field}' is a required array field"));
        return;
    };
    if values.len() != 4 {
        errors.push(format!("'{field}' must have 4 elements, found {}", values.len()));
        return;
    }
    let numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
    if numbers.len() != 4 || numbers.iter().any(|n| !n.is_finite()) {
        errors.push(format!("'{field}' must contain 4 finite numbers"));
        return;
    }
    let (minx, miny, maxx, maxy) = (numbers[0], numbers[1], numbers[2], numbers[3]);
    if minx > maxx || miny > maxy {
        errors.push(format!("'{field}' lower bounds must not exceed upper bounds"));
    }
    if !(-180.0..=180.0).contains(&minx) || !(-180.0..=180.0).contains(&maxx) {
        errors.push(format!("'{field}' longitudes must be within [-180, 180]"));
    }
    if !(-90.0..=90.0).contains(&miny) || !(-90.0..=90.0).contains(&maxy) {
        errors.push(format!("'{field}' latitudes must be within [-90, 90]"));
    }
}

fn check_geometry(geometry: Option<&Value>, errors: &mut Vec<String>) {
    let Some(geometry) = geometry else {
        errors.push("'geometry' is a required field".to_string());
        return;
    };
    if geometry.get("type").and_then(Value::as_str) != Some("Polygon") {
        errors.push("'geometry.type' must be 'Polygon'".to_string());
        return;
    }
    let ring = geometry
        .get("coordinates")
        .and_then(Value::as_array)
        .and_then(|rings| rings.first())
        .and_then(Value::as_array);
    match ring {
        Some(ring) if ring.len() >= 4 => {
            if ring.first() != ring.last() {
                errors.push("'geometry' ring must be closed".to_string());
            }
        }
        _ => errors.push("'geometry' must have a ring of at least 4 positions".to_string()),
    }
}

fn check_datetime_property(value: Option<&Value>, field: &str, errors: &mut Vec<String>) {
    match value.and_then(Value::as_str) {
        Some(text) => {
            if !rfc3339_z_pattern().is_match(text) {
                errors.push(format!(
                    "'properties.{field}' must be an RFC3339 UTC instant with a 'Z' suffix, \
                     found '{text}'"
                ));
            }
        }
        None => errors.push(format!("'properties.{field}' is a required string field")),
    }
}

fn check_table_block(properties: &serde_json::Map<String, Value>, errors: &mut Vec<String>) {
    let column_names: Vec<&str> = match properties.get("table:columns") {
        Some(Value::Array(columns)) if !columns.is_empty() => {
            let mut names = Vec::with_capacity(columns.len());
            for (index, column) in columns.iter().enumerate() {
                match column.get("name").and_then(Value::as_str) {
                    Some(name) if !name.is_empty() => names.push(name),
                    _ => errors.push(format!("'table:columns[{index}]' is missing a name")),
                }
                if column.get("type").and_then(Value::as_str).is_none_or(str::is_empty) {
                    errors.push(format!("'table:columns[{index}]' is missing a type"));
                }
            }
            names
        }
        _ => {
            errors.push("'table:columns' must be a non-empty array".to_string());
            Vec::new()
        }
    };

    match properties.get("table:primary_geometry").and_then(Value::as_str) {
        Some(primary) => {
            if !column_names.is_empty() && !column_names.contains(&primary) {
                errors.push(format!(
                    "'table:primary_geometry' names unknown column '{primary}'"
                ));
            }
        }
        None => errors.push("'table:primary_geometry' is a required string field".to_string()),
    }

    match properties.get("table:row_count").and_then(Value::as_u64) {
        Some(0) | None => {
            errors.push("'table:row_count' must be a positive integer".to_string());
        }
        Some(_) => {}
    }
}

fn check_asset(asset: &Value, errors: &mut Vec<String>) {
    if asset.get("href").and_then(Value::as_str).is_none_or(str::is_empty) {
        errors.push("'assets.data.href' must be a non-empty string".to_string());
    }
    if asset.get("type").and_then(Value::as_str).is_none_or(str::is_empty) {
        errors.push("'assets.data.type' must be a non-empty string".to_string());
    }
    let has_data_role = asset
        .get("roles")
        .and_then(Value::as_array)
        .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some("data")));
    if !has_data_role {
        errors.push("'assets.data.roles' must include 'data'".to_string());
    }
}

/// Every structural link must carry a resolved, non-null href.
///
/// Records are built with no links at all, so pre-save validation passes;
/// once layout assignment has materialized the links, an unresolved href is
/// a schema violation.
fn check_links(links: Option<&Value>, errors: &mut Vec<String>) {
    let Some(links) = links.and_then(Value::as_array) else {
        errors.push("'links' must be an array".to_string());
        return;
    };
    for (index, link) in links.iter().enumerate() {
        if link.get("rel").and_then(Value::as_str).is_none_or(str::is_empty) {
            errors.push(format!("'links[{index}]' is missing a rel"));
        }
        if link.get("href").and_then(Value::as_str).is_none_or(str::is_empty) {
            errors.push(format!("'links[{index}]' has an unresolved href"));
        }
    }
}

fn check_extent(extent: Option<&Value>, errors: &mut Vec<String>) {
    let Some(extent) = extent else {
        errors.push("'extent' is a required field".to_string());
        return;
    };

    let spatial = extent
        .get("spatial")
        .and_then(|s| s.get("bbox"))
        .and_then(Value::as_array);
    match spatial {
        Some(boxes) if !boxes.is_empty() => {
            for (index, bbox) in boxes.iter().enumerate() {
                check_bbox(Some(bbox), &format!("extent.spatial.bbox[{index}]"), errors);
            }
        }
        _ => errors.push("'extent.spatial.bbox' must be a non-empty array".to_string()),
    }

    let temporal = extent
        .get("temporal")
        .and_then(|t| t.get("interval"))
        .and_then(Value::as_array);
    match temporal {
        Some(intervals) if !intervals.is_empty() => {
            for (index, interval) in intervals.iter().enumerate() {
                let bounds = interval.as_array();
                if bounds.is_none_or(|b| b.len() != 2) {
                    errors.push(format!(
                        "'extent.temporal.interval[{index}]' must have two bounds"
                    ));
                    continue;
                }
                for bound in bounds.unwrap() {
                    match bound.as_str() {
                        Some(text) if rfc3339_z_pattern().is_match(text) => {}
                        _ => errors.push(format!(
                            "'extent.temporal.interval[{index}]' bounds must be RFC3339 UTC \
                             instants with a 'Z' suffix"
                        )),
                    }
                }
            }
        }
        _ => errors.push("'extent.temporal.interval' must be a non-empty array".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::{
        Asset, BoundingBox, Collection, Extent, Item, Layout, TableColumn, TimeRange,
    };
    use chrono::{TimeZone, Utc};
    use serde_json::{Map, json};

    fn sample_item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            bbox: BoundingBox::new(-10.0, 40.0, -9.0, 41.0),
            time_range: TimeRange::new(
                Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2021, 1, 1, 1, 0, 0).unwrap(),
            ),
            extra_properties: Map::new(),
            asset: Asset::parquet_data("assets/a.parquet"),
            columns: TableColumn::fixed_set(),
            primary_geometry: "geometry".to_string(),
            row_count: 3,
            links: Vec::new(),
            collection_id: None,
            self_href: None,
        }
    }

    fn sample_collection_with_items() -> Collection {
        let mut collection = Collection {
            id: "sar-wind".to_string(),
            description: "test collection".to_string(),
            extent: Extent {
                spatial: BoundingBox::new(-10.0, 40.0, -8.0, 42.0),
                temporal: TimeRange::new(
                    Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
                    Utc.with_ymd_and_hms(2021, 1, 2, 1, 0, 0).unwrap(),
                ),
            },
            extra_fields: Map::new(),
            columns: TableColumn::fixed_set(),
            row_count: 8,
            items: Vec::new(),
            links: Vec::new(),
            self_href: None,
        };
        collection.add_item(sample_item("a"));
        collection.add_item(sample_item("b"));
        collection
    }

    #[test]
    fn test_freshly_built_item_passes() {
        let doc = sample_item("a").to_document();
        validate_item(&doc).unwrap();
    }

    #[test]
    fn test_item_with_resolved_links_passes() {
        let mut collection = sample_collection_with_items();
        Layout::new("/data/catalog").apply(&mut collection);

        for item in &collection.items {
            validate_item(&item.to_document()).unwrap();
        }
        validate_collection(&collection.to_document()).unwrap();
    }

    #[test]
    fn test_item_with_unresolved_link_fails() {
        let mut item = sample_item("a");
        item.links.push(crate::app::models::Link {
            rel: "collection".to_string(),
            href: None,
        });

        let err = validate_item(&item.to_document()).unwrap_err();
        assert!(err.sub_errors.iter().any(|e| e.contains("unresolved href")));
    }

    #[test]
    fn test_offset_datetime_rejected() {
        let mut doc = sample_item("a").to_document();
        doc["properties"]["start_datetime"] = json!("2021-01-01T00:00:00+00:00");

        let err = validate_item(&doc).unwrap_err();
        assert!(
            err.sub_errors
                .iter()
                .any(|e| e.contains("start_datetime") && e.contains("Z"))
        );
    }

    #[test]
    fn test_multiple_violations_all_reported() {
        let mut doc = sample_item("a").to_document();
        doc.as_object_mut().unwrap().remove("bbox");
        doc["properties"]
            .as_object_mut()
            .unwrap()
            .remove("table:row_count");
        doc["properties"]["datetime"] = json!("yesterday");

        let err = validate_item(&doc).unwrap_err();
        assert!(err.sub_errors.len() >= 3);
        assert!(err.message.contains("violation"));
    }

    #[test]
    fn test_primary_geometry_must_name_a_column() {
        let mut doc = sample_item("a").to_document();
        doc["properties"]["table:primary_geometry"] = json!("wkt");

        let err = validate_item(&doc).unwrap_err();
        assert!(err.sub_errors.iter().any(|e| e.contains("unknown column 'wkt'")));
    }

    #[test]
    fn test_open_geometry_ring_rejected() {
        let mut doc = sample_item("a").to_document();
        doc["geometry"]["coordinates"][0]
            .as_array_mut()
            .unwrap()
            .pop();

        let err = validate_item(&doc).unwrap_err();
        assert!(err.sub_errors.iter().any(|e| e.contains("closed")));
    }

    #[test]
    fn test_collection_without_tables_fails() {
        let mut collection = sample_collection_with_items();
        Layout::new("/data/catalog").apply(&mut collection);
        let mut doc = collection.to_document();
        doc.as_object_mut().unwrap().remove("table:tables");

        let err = validate_collection(&doc).unwrap_err();
        assert!(err.sub_errors.iter().any(|e| e.contains("table:tables")));
    }

    #[test]
    fn test_collection_bbox_out_of_range_fails() {
        let mut collection = sample_collection_with_items();
        collection.extent.spatial = BoundingBox::new(-200.0, 40.0, -8.0, 42.0);
        Layout::new("/data/catalog").apply(&mut collection);

        let err = validate_collection(&collection.to_document()).unwrap_err();
        assert!(err.sub_errors.iter().any(|e| e.contains("longitudes")));
    }
}
