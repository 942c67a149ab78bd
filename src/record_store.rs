use crate::constants::RECORD_EXTENSION;
use crate::storage::StorageBackend;
use std::collections::BTreeSet;
use tracing::{error, info};

/// Identifiers of records persisted by earlier runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedSet {
    ids: BTreeSet<String>,
}

impl ProcessedSet {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl FromIterator<String> for ProcessedSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// `movies/3.jsonl` -> `3`. Keys without the record extension are not records.
pub fn record_id_from_key(key: &str) -> Option<&str> {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    file_name
        .strip_suffix(RECORD_EXTENSION)
        .filter(|id| !id.is_empty())
}

/// Seed the processed set from what the backend already holds under
/// `movies_prefix`. Listing failures leave the set empty.
pub async fn load_processed(backend: &dyn StorageBackend, movies_prefix: &str) -> ProcessedSet {
    let processed: ProcessedSet = match backend.list_keys(movies_prefix).await {
        Ok(keys) => keys
            .iter()
            .filter_map(|key| record_id_from_key(key))
            .map(str::to_string)
            .collect(),
        Err(e) => {
            error!("Error loading processed records from {} storage: {}", backend.kind(), e);
            ProcessedSet::default()
        }
    };
    info!("Found {} previously processed records", processed.len());
    processed
}
