//! File summarizer for GeoParquet assets
//!
//! Derives the per-file summary a catalog item is built from: spatial
//! bounding box, temporal range, and row count. Only the geometry and the
//! two measurement-time columns are read (column projection), and the row
//! count comes from Parquet metadata rather than a full scan.

use crate::app::models::{BoundingBox, TimeRange};
use crate::constants::{FIRST_TIME_COLUMN, GEOMETRY_COLUMN, LAST_TIME_COLUMN};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Derived summary of one GeoParquet file
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    /// Coordinate-wise min/max over all decoded point geometries
    pub bbox: BoundingBox,

    /// Min of first-measurement times, max of last-measurement times.
    ///
    /// Both bounds are normalized to UTC; the min and max may come from
    /// different rows.
    pub time_range: TimeRange,

    /// Total rows in the file, from Parquet metadata
    pub row_count: u64,
}

/// Summarize one GeoParquet file.
///
/// Fails with [`Error::EmptyFile`] if the geometry column has zero rows; a
/// single row produces a degenerate bounding box, not an error.
pub fn summarize_file(path: &Path) -> Result<FileSummary> {
    let df = LazyFrame::scan_parquet(path.to_path_buf(), Default::default())?
        .select([
            col(GEOMETRY_COLUMN),
            col(FIRST_TIME_COLUMN),
            col(LAST_TIME_COLUMN),
        ])
        .collect()?;

    let geometries = df.column(GEOMETRY_COLUMN)?.as_materialized_series().binary()?;
    if geometries.is_empty() {
        return Err(Error::empty_file(path.display().to_string()));
    }

    let mut bbox = BoundingBox::seed();
    for (row, value) in geometries.into_iter().enumerate() {
        let wkb = value.ok_or_else(|| {
            Error::geometry(
                path.display().to_string(),
                format!("null geometry at row {row}"),
            )
        })?;
        let (x, y) = decode_wkb_point(wkb)
            .map_err(|message| Error::geometry(path.display().to_string(), message))?;
        bbox.include_point(x, y);
    }

    let start = timestamp_bound(df.column(FIRST_TIME_COLUMN)?, Bound::Min)?;
    let end = timestamp_bound(df.column(LAST_TIME_COLUMN)?, Bound::Max)?;

    let row_count = read_row_count(path)?;

    debug!(
        "Summarized {}: bbox {:?}, {} rows",
        path.display(),
        bbox.to_array(),
        row_count
    );

    Ok(FileSummary {
        bbox,
        time_range: TimeRange::new(start, end),
        row_count,
    })
}

/// Read the file's total row count from Parquet metadata.
///
/// A `select([len()])` over a lazy scan resolves from footer metadata
/// without materializing any data columns.
fn read_row_count(path: &Path) -> Result<u64> {
    let count_df = LazyFrame::scan_parquet(path.to_path_buf(), Default::default())?
        .select([len()])
        .collect()?;
    let row_count = count_df.column("len")?.get(0)?.try_extract::<u64>()?;
    Ok(row_count)
}

enum Bound {
    Min,
    Max,
}

/// Reduce a timestamp column to its min or max as a UTC instant.
///
/// A column without a timezone is assumed to already hold UTC instants; a
/// timezone-aware column stores UTC epoch values physically, so both cases
/// convert identically. Normalizing here keeps downstream RFC3339
/// formatting independent of how the file encoded its timestamps.
fn timestamp_bound(column: &Column, bound: Bound) -> Result<DateTime<Utc>> {
    let ca = column.as_materialized_series().datetime()?;
    let raw = match bound {
        Bound::Min => ca.min(),
        Bound::Max => ca.max(),
    };
    let raw = raw.ok_or_else(|| {
        Error::parquet(
            format!("timestamp column '{}' has no values", column.name()),
            PolarsError::NoData("all-null timestamp column".into()),
        )
    })?;

    let dt = match ca.time_unit() {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(raw)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(raw),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(raw),
    };
    dt.ok_or_else(|| {
        Error::parquet(
            format!("timestamp value {raw} is out of range"),
            PolarsError::ComputeError("timestamp out of range".into()),
        )
    })
}

const WKB_POINT: u32 = 1;
const EWKB_SRID_FLAG: u32 = 0x2000_0000;

/// Decode a WKB-encoded 2D point, tolerating the PostGIS extended form
/// with an embedded SRID. Returns `(x, y)` in the geometry's native order
/// (longitude, latitude for WGS84).
fn decode_wkb_point(buf: &[u8]) -> std::result::Result<(f64, f64), String> {
    if buf.len() < 21 {
        return Err(format!("WKB buffer too short: {} bytes", buf.len()));
    }

    let little_endian = match buf[0] {
        0 => false,
        1 => true,
        other => return Err(format!("invalid WKB byte-order marker {other}")),
    };

    let read_u32 = |bytes: &[u8]| {
        let bytes: [u8; 4] = bytes.try_into().expect("u32 slice length checked");
        if little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        }
    };
    let read_f64 = |bytes: &[u8]| {
        let bytes: [u8; 8] = bytes.try_into().expect("f64 slice length checked");
        if little_endian {
            f64::from_le_bytes(bytes)
        } else {
            f64::from_be_bytes(bytes)
        }
    };

    let geometry_type = read_u32(&buf[1..5]);
    let mut offset = 5;
    if geometry_type & EWKB_SRID_FLAG != 0 {
        offset += 4;
    }

    let kind = geometry_type & 0xFFFF;
    if kind != WKB_POINT {
        return Err(format!(
            "unsupported WKB geometry type {kind}, expected Point"
        ));
    }

    if buf.len() < offset + 16 {
        return Err(format!(
            "WKB point truncated: {} bytes, need {}",
            buf.len(),
            offset + 16
        ));
    }

    let x = read_f64(&buf[offset..offset + 8]);
    let y = read_f64(&buf[offset + 8..offset + 16]);
    Ok((x, y))
}
