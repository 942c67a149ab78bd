use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    /// The listing page could not be fetched or rendered. Aborts the run.
    #[error("Failed to load page {url}: {reason}")]
    PageLoad { url: String, reason: String },

    /// An entry has no poster image. Aborts that entry only.
    #[error("Entry {index} has no poster image")]
    MissingPoster { index: usize },

    #[error("Failed to download image {url}: {reason}")]
    ImageDownload { url: String, reason: String },

    #[error("Failed to write {key}: {reason}")]
    StorageWrite { key: String, reason: String },

    #[error("Failed to list keys under {prefix}: {reason}")]
    Listing { prefix: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Object store request for {key} failed: {reason}")]
    ObjectStore { key: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid selector '{0}'")]
    Selector(String),
}

impl ScraperError {
    /// True for failures that end the whole run rather than a single entry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScraperError::PageLoad { .. } | ScraperError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
