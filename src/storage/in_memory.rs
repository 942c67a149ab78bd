use super::{StorageBackend, StorageKind};
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory backend for development/testing.
#[derive(Default)]
pub struct InMemoryBackend {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failing_keys: Mutex<HashSet<String>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later write to `key` fail with a storage error.
    pub fn fail_writes_to(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::Memory
    }

    async fn write_bytes(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(ScraperError::StorageWrite {
                key: key.to_string(),
                reason: "write rejected".to_string(),
            });
        }
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        debug!("Stored {} bytes at {}", bytes.len(), key);
        Ok(format!("memory://{key}"))
    }

    async fn list_keys(&self, prefix: &str) -> Result<BTreeSet<String>> {
        let dir = format!("{}/", prefix.trim_end_matches('/'));
        let objects = self.objects.lock().unwrap();
        Ok(objects.keys().filter(|k| k.starts_with(&dir)).cloned().collect())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }
}
