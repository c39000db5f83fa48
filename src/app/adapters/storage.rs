//! Storage adapter for catalog metadata documents
//!
//! Catalog persistence always goes through one uniform byte/text interface;
//! this module routes each path to the right backend instead of letting the
//! builder special-case storage schemes. Paths with the `s3://` prefix are
//! served by the remote object store with credentials sourced from the
//! ambient environment; every other path uses the local filesystem.

use crate::constants::S3_SCHEME;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as StorePath;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

/// Uniform read/write of byte content at a path.
///
/// Implementations must be safe to call from async contexts; all catalog
/// documents and dataset partitions are persisted through this trait.
#[async_trait]
pub trait ObjectIo: Send + Sync {
    /// Read the full content at `location`
    async fn read(&self, location: &str) -> Result<Bytes>;

    /// Write `bytes` at `location`, creating parent directories as needed
    async fn write(&self, location: &str, bytes: Bytes) -> Result<()>;

    /// Read UTF-8 text at `location`
    async fn read_text(&self, location: &str) -> Result<String> {
        let bytes = self.read(location).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::storage(location, "content is not valid UTF-8"))
    }

    /// Write UTF-8 text at `location`
    async fn write_text(&self, location: &str, text: &str) -> Result<()> {
        self.write(location, Bytes::copy_from_slice(text.as_bytes()))
            .await
    }
}

/// Default adapter routing between S3 and the local filesystem.
///
/// A fresh S3 client is built per call from environment credentials, so a
/// long-running caller picks up rotated credentials without replumbing.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageAdapter;

impl StorageAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Split an `s3://bucket/key` location into bucket and key
    fn split_s3(location: &str) -> Result<(&str, &str)> {
        let remainder = &location[S3_SCHEME.len()..];
        match remainder.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok((bucket, key)),
            _ => Err(Error::storage(
                location,
                "S3 location must have the form s3://bucket/key",
            )),
        }
    }

    fn s3_store(bucket: &str) -> Result<impl ObjectStore> {
        Ok(AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()?)
    }
}

#[async_trait]
impl ObjectIo for StorageAdapter {
    async fn read(&self, location: &str) -> Result<Bytes> {
        if location.starts_with(S3_SCHEME) {
            let (bucket, key) = Self::split_s3(location)?;
            let store = Self::s3_store(bucket)?;
            let result = store.get(&StorePath::from(key)).await?;
            Ok(result.bytes().await?)
        } else {
            let bytes = std::fs::read(location)
                .map_err(|e| Error::io(format!("failed to read '{location}'"), e))?;
            Ok(Bytes::from(bytes))
        }
    }

    async fn write(&self, location: &str, bytes: Bytes) -> Result<()> {
        if location.starts_with(S3_SCHEME) {
            let (bucket, key) = Self::split_s3(location)?;
            let store = Self::s3_store(bucket)?;
            store.put(&StorePath::from(key), bytes.into()).await?;
            Ok(())
        } else {
            if let Some(parent) = Path::new(location).parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::io(format!("failed to create directory '{}'", parent.display()), e)
                })?;
            }
            std::fs::write(location, &bytes)
                .map_err(|e| Error::io(format!("failed to write '{location}'"), e))
        }
    }
}

/// In-memory storage backend for tests.
///
/// Thread-safe via `RwLock`; not suitable for production.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of every stored object, sorted
    pub fn paths(&self) -> Vec<String> {
        let objects = self.objects.read().expect("memory store lock poisoned");
        let mut paths: Vec<String> = objects.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ObjectIo for MemoryStore {
    async fn read(&self, location: &str) -> Result<Bytes> {
        let objects = self.objects.read().expect("memory store lock poisoned");
        objects
            .get(location)
            .cloned()
            .ok_or_else(|| Error::storage(location, "object not found"))
    }

    async fn write(&self, location: &str, bytes: Bytes) -> Result<()> {
        let mut objects = self.objects.write().expect("memory store lock poisoned");
        objects.insert(location.to_string(), bytes);
        Ok(())
    }
}
