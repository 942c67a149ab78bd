use crate::app::ports::HttpClientPort;
use crate::constants::VALID_IMAGE_EXTENSIONS;
use crate::error::{Result, ScraperError};
use crate::storage::{join_key, StorageBackend};
use std::sync::Arc;
use tracing::{debug, warn};

/// Downloads poster images and hands them to a storage backend.
#[derive(Clone)]
pub struct ImageFetcher {
    http: Arc<dyn HttpClientPort>,
}

impl ImageFetcher {
    pub fn new(http: Arc<dyn HttpClientPort>) -> Self {
        Self { http }
    }

    /// One GET, one write, no retry. Any failure is reported as an image
    /// download error so the caller can drop the entry.
    pub async fn fetch_and_store(
        &self,
        backend: &dyn StorageBackend,
        image_url: &str,
        images_prefix: &str,
    ) -> Result<String> {
        let download_err = |reason: String| ScraperError::ImageDownload {
            url: image_url.to_string(),
            reason,
        };

        let filename = image_filename(image_url)
            .ok_or_else(|| download_err("URL has no file name".to_string()))?;
        if !has_valid_extension(&filename) {
            warn!("Poster {} has an unexpected extension", filename);
        }

        let resp = self
            .http
            .get(image_url)
            .await
            .map_err(|e| download_err(e.to_string()))?;
        if !resp.is_success() {
            return Err(download_err(format!("HTTP status {}", resp.status)));
        }

        let content_type = content_type_for(&filename);
        let key = join_key(images_prefix, &filename);
        debug!("Storing {} ({}, {} bytes)", key, content_type, resp.bytes.len());
        backend
            .write_bytes(&key, &resp.bytes, content_type)
            .await
            .map_err(|e| download_err(e.to_string()))
    }
}

/// Last path segment of the URL, ignoring query string and fragment.
pub fn image_filename(image_url: &str) -> Option<String> {
    let path = match reqwest::Url::parse(image_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => image_url
            .split(['?', '#'])
            .next()
            .unwrap_or(image_url)
            .to_string(),
    };
    path.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Extension heuristic only, the bytes are never inspected. The match is
/// case-sensitive: `POSTER.JPG` is stored as `image/png`.
pub fn content_type_for(filename: &str) -> &'static str {
    if filename.ends_with(".jpg") || filename.ends_with(".jpeg") {
        "image/jpeg"
    } else {
        "image/png"
    }
}

pub fn has_valid_extension(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    VALID_IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
