use crate::constants::{SOURCE_TAG, UNKNOWN};
use serde::{Deserialize, Serialize};

/// Descriptive fields of one listing entry. Every field is always present;
/// values missing on the page hold [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub title: String,
    pub genre: String,
    pub cast: String,
    pub director: String,
}

impl Default for ListingDetails {
    fn default() -> Self {
        Self {
            title: UNKNOWN.to_string(),
            genre: UNKNOWN.to_string(),
            cast: UNKNOWN.to_string(),
            director: UNKNOWN.to_string(),
        }
    }
}

/// One scraped entry as persisted to `{movies}/{sequence_id}.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub source: String,
    /// Position within the current run, not a stable identifier across runs.
    pub sequence_id: usize,
    pub image_path: String,
    pub image_url: String,
    pub details: ListingDetails,
}

impl ListingRecord {
    pub fn new(sequence_id: usize, image_url: String, details: ListingDetails) -> Self {
        Self {
            source: SOURCE_TAG.to_string(),
            sequence_id,
            image_path: String::new(),
            image_url,
            details,
        }
    }

    pub fn with_image_path(self, image_path: String) -> Self {
        Self { image_path, ..self }
    }

    /// Identifier used for the record key and for ProcessedSet membership.
    pub fn record_id(&self) -> String {
        self.sequence_id.to_string()
    }

    /// Single JSON line, newline terminated. Non-ASCII text is kept literal.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
