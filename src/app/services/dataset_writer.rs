//! Resilient partitioned dataset writer
//!
//! Writes a Parquet dataset partitioned by the given columns through a
//! storage backend, retrying automatically when the store throttles. The
//! object store reports throttling as a generic failure with a marker
//! embedded in the message text, so detection inspects the error chain
//! rather than matching on a structured kind.
//!
//! The writer retries the whole write call; partial partitions written
//! before a throttled failure are not rolled back, the backend's own
//! partial-write semantics apply.

use crate::app::adapters::storage::ObjectIo;
use crate::config::RetryConfig;
use crate::{Error, Result};
use bytes::Bytes;
use polars::prelude::*;
use tracing::{debug, warn};

/// Write `df` under `root_path`, partitioned by `partition_cols`, retrying
/// on throttling with exponential backoff.
///
/// Up to `retry.retries` attempts are made; retry N sleeps
/// `backoff * 2^(N-1)` first. Any non-throttling failure, or exhaustion of
/// the budget, propagates the error unchanged.
pub async fn write_dataset_with_retry(
    df: &DataFrame,
    root_path: &str,
    partition_cols: &[&str],
    storage: &dyn ObjectIo,
    retry: &RetryConfig,
) -> Result<()> {
    if retry.retries == 0 {
        return Err(Error::configuration(
            "retry budget must allow at least one attempt",
        ));
    }

    let mut attempt = 1;
    loop {
        match write_dataset(df, root_path, partition_cols, storage).await {
            Ok(()) => return Ok(()),
            Err(error) if error.is_throttling() && attempt < retry.retries => {
                let wait = retry.delay_before_retry(attempt);
                warn!(
                    "Dataset write throttled on attempt {attempt}/{}, retrying in {:?}",
                    retry.retries, wait
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Single write pass over every partition
async fn write_dataset(
    df: &DataFrame,
    root_path: &str,
    partition_cols: &[&str],
    storage: &dyn ObjectIo,
) -> Result<()> {
    let root = root_path.trim_end_matches('/');

    if partition_cols.is_empty() {
        let payload = serialize_partition(df.clone())?;
        storage
            .write(&format!("{root}/part-0.parquet"), payload)
            .await?;
        return Ok(());
    }

    let keys: Vec<PlSmallStr> = partition_cols.iter().map(|c| PlSmallStr::from(*c)).collect();
    let partitions = df.partition_by_stable(keys, true)?;
    debug!(
        "Writing {} partition(s) under {root} by {:?}",
        partitions.len(),
        partition_cols
    );

    for partition in partitions {
        let mut segments = Vec::with_capacity(partition_cols.len());
        for column in partition_cols {
            let value = partition.column(column)?.get(0)?;
            segments.push(format!("{column}={}", segment_value(&value)));
        }

        // Hive-style layout; the key columns live in the path, not the file
        let data = partition.drop_many(partition_cols.iter().map(|c| PlSmallStr::from(*c)));
        let payload = serialize_partition(data)?;
        let target = format!("{root}/{}/part-0.parquet", segments.join("/"));
        storage.write(&target, payload).await?;
    }

    Ok(())
}

/// Render a partition key value as a path segment
fn segment_value(value: &AnyValue) -> String {
    match value {
        AnyValue::String(s) => (*s).to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn serialize_partition(mut df: DataFrame) -> Result<Bytes> {
    let mut buffer = Vec::new();
    ParquetWriter::new(&mut buffer).finish(&mut df)?;
    Ok(Bytes::from(buffer))
}
