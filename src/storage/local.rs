use super::{join_key, StorageBackend, StorageKind};
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// Files under a root directory. Writes overwrite.
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    /// Create the prefix directories up front so an empty run still leaves
    /// the expected layout behind.
    pub fn ensure_prefixes(&self, prefixes: &[&str]) -> Result<()> {
        for prefix in prefixes {
            std::fs::create_dir_all(self.path_for(prefix))?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    async fn write_bytes(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        let path = self.path_for(key);
        let write_err = |e: std::io::Error| ScraperError::StorageWrite {
            key: key.to_string(),
            reason: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(&path, bytes).await.map_err(write_err)?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path.to_string_lossy().into_owned())
    }

    async fn list_keys(&self, prefix: &str) -> Result<BTreeSet<String>> {
        let dir = self.path_for(prefix);
        let listing_err = |e: std::io::Error| ScraperError::Listing {
            prefix: prefix.to_string(),
            reason: e.to_string(),
        };
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(listing_err(e)),
        };

        let mut keys = BTreeSet::new();
        while let Some(entry) = entries.next_entry().await.map_err(listing_err)? {
            if !entry.file_type().await.map_err(listing_err)?.is_file() {
                continue;
            }
            keys.insert(join_key(prefix, &entry.file_name().to_string_lossy()));
        }
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path_for(key)).await?)
    }
}
