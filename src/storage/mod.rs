//! Storage backends for posters and listing records.
//!
//! Every backend addresses content by a `/`-separated key relative to its
//! own root, so the pipeline never needs to know where output lands:
//! - `local`: files under a root directory
//! - `object_store`: objects in an S3-compatible bucket
//! - `in_memory`: a map, for development and tests

pub mod in_memory;
pub mod local;
pub mod object_store;

use crate::constants::{IMAGES_DIR, MOVIES_DIR};
use crate::error::{Result, ScraperError};
use crate::types::ListingRecord;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub use in_memory::InMemoryBackend;
pub use local::LocalBackend;
pub use object_store::ObjectStoreBackend;

pub const RECORD_CONTENT_TYPE: &str = "application/x-ndjson";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum StorageKind {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "s3")]
    ObjectStore,
    #[serde(rename = "memory")]
    Memory,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Local => write!(f, "local"),
            StorageKind::ObjectStore => write!(f, "s3"),
            StorageKind::Memory => write!(f, "memory"),
        }
    }
}

/// Immutable for the process lifetime; picks the backend at start-up.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Local root directory, and key prefix inside the bucket for object stores.
    pub local_root: PathBuf,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> StorageKind;

    /// Store binary content at `key` and return where it landed.
    async fn write_bytes(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String>;

    /// All keys under `prefix`, relative to the backend root.
    async fn list_keys(&self, prefix: &str) -> Result<BTreeSet<String>>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Store `record` as the sole content of `key`: one JSON line.
    async fn write_record(&self, key: &str, record: &ListingRecord) -> Result<()> {
        let line = record.to_json_line().map_err(|e| ScraperError::StorageWrite {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.write_bytes(key, line.as_bytes(), RECORD_CONTENT_TYPE).await?;
        Ok(())
    }
}

/// Join key segments with exactly one `/` between them.
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// `memory` keeps everything in process, for dry runs against a live page.
pub async fn build_backend(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match config.kind {
        StorageKind::Local => {
            let backend = LocalBackend::new(config.local_root.clone());
            backend.ensure_prefixes(&[IMAGES_DIR, MOVIES_DIR])?;
            Arc::new(backend)
        }
        StorageKind::ObjectStore => {
            let bucket = config
                .bucket
                .clone()
                .ok_or_else(|| ScraperError::Config("object store requires a bucket".to_string()))?;
            Arc::new(
                ObjectStoreBackend::connect(
                    bucket,
                    config.region.clone(),
                    config.endpoint.clone(),
                    config.local_root.to_string_lossy().into_owned(),
                )
                .await,
            )
        }
        StorageKind::Memory => Arc::new(InMemoryBackend::new()),
    };
    info!("Storage backend ready: {}", backend.kind());
    Ok(backend)
}
