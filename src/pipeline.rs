use crate::app::ports::{PageFetcherPort, PageSession};
use crate::constants::{DEFAULT_MAX_ENTRIES, IMAGES_DIR, MOVIES_DIR, RECORD_EXTENSION};
use crate::error::{Result, ScraperError};
use crate::image_fetcher::ImageFetcher;
use crate::parser::{Extraction, ListingExtractor, RenderedPage};
use crate::record_store::{load_processed, ProcessedSet};
use crate::storage::{join_key, StorageBackend};
use crate::types::ListingRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_entries: usize,
    pub images_prefix: String,
    pub movies_prefix: String,
    /// Skip entries whose id is already persisted. Off by default: every run
    /// re-scrapes and overwrites.
    pub skip_already_processed: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            images_prefix: IMAGES_DIR.to_string(),
            movies_prefix: MOVIES_DIR.to_string(),
            skip_already_processed: false,
        }
    }
}

/// Result of a complete run
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub listing_url: String,
    pub storage: String,
    pub entries_found: usize,
    pub entries_considered: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    fn record_failure(&mut self, message: String) {
        self.failed += 1;
        self.errors.push(message);
    }
}

enum EntryOutcome {
    Persisted,
    Skipped,
}

pub struct ScraperOrchestrator {
    fetcher: Arc<dyn PageFetcherPort>,
    backend: Arc<dyn StorageBackend>,
    images: ImageFetcher,
    extractor: ListingExtractor,
    options: PipelineOptions,
}

impl ScraperOrchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcherPort>,
        backend: Arc<dyn StorageBackend>,
        images: ImageFetcher,
        extractor: ListingExtractor,
        options: PipelineOptions,
    ) -> Self {
        Self {
            fetcher,
            backend,
            images,
            extractor,
            options,
        }
    }

    /// Key of the persisted record for `sequence_id`.
    pub fn record_key(&self, sequence_id: usize) -> String {
        join_key(
            &self.options.movies_prefix,
            &format!("{sequence_id}{RECORD_EXTENSION}"),
        )
    }

    /// Scrape one listing page. Only a page load failure aborts the run;
    /// every entry failure is logged, counted and skipped.
    #[instrument(skip(self), fields(storage = %self.backend.kind()))]
    pub async fn run(&self, listing_url: &str) -> Result<RunSummary> {
        let mut summary = RunSummary {
            run_id: Uuid::new_v4(),
            listing_url: listing_url.to_string(),
            storage: self.backend.kind().to_string(),
            entries_found: 0,
            entries_considered: 0,
            persisted: 0,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        info!("Starting movie scraping run {}", summary.run_id);

        let processed = load_processed(self.backend.as_ref(), &self.options.movies_prefix).await;

        let mut session = self
            .fetcher
            .open()
            .await
            .map_err(|e| as_page_load(listing_url, e))?;

        let outcome = self
            .process_page(session.as_mut(), listing_url, &processed, &mut summary)
            .await;

        // Released on every path, including a failed page load.
        if let Err(e) = session.close().await {
            warn!("Failed to close page session: {}", e);
        }
        outcome?;

        summary.finished_at = Utc::now();
        info!(
            "Finished scraping movies: {} persisted, {} skipped, {} failed",
            summary.persisted, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    async fn process_page(
        &self,
        session: &mut dyn PageSession,
        listing_url: &str,
        processed: &ProcessedSet,
        summary: &mut RunSummary,
    ) -> Result<()> {
        session
            .goto(listing_url)
            .await
            .map_err(|e| as_page_load(listing_url, e))?;
        let html = session
            .content()
            .await
            .map_err(|e| as_page_load(listing_url, e))?;
        let page_url = session.current_url().unwrap_or(listing_url).to_string();

        let Extraction {
            entries_found,
            entries,
        } = {
            let page = RenderedPage::parse(&html, Some(&page_url));
            self.extractor.extract(&page, self.options.max_entries)
        };
        summary.entries_found = entries_found;
        summary.entries_considered = entries.len();

        for (index, entry) in entries.into_iter().enumerate() {
            let record = match entry {
                Ok(record) => record,
                Err(e) => {
                    error!("Skipping entry {}: {}", index, e);
                    summary.record_failure(format!("entry {index}: {e}"));
                    continue;
                }
            };

            let span = info_span!("entry", index, image_url = %record.image_url);
            match self.process_record(record, processed).instrument(span).await {
                Ok(EntryOutcome::Persisted) => summary.persisted += 1,
                Ok(EntryOutcome::Skipped) => summary.skipped += 1,
                Err(e) => summary.record_failure(format!("entry {index}: {e}")),
            }
        }
        Ok(())
    }

    async fn process_record(&self, record: ListingRecord, processed: &ProcessedSet) -> Result<EntryOutcome> {
        if self.options.skip_already_processed && processed.contains(&record.record_id()) {
            info!("Entry {} already processed, skipping", record.sequence_id);
            return Ok(EntryOutcome::Skipped);
        }

        let location = match self
            .images
            .fetch_and_store(self.backend.as_ref(), &record.image_url, &self.options.images_prefix)
            .await
        {
            Ok(location) => location,
            Err(e) => {
                error!("Failed to save image for entry {}: {}", record.sequence_id, e);
                return Err(e);
            }
        };

        let record = record.with_image_path(location);
        let key = self.record_key(record.sequence_id);
        if let Err(e) = self.backend.write_record(&key, &record).await {
            // The poster stays behind without a record.
            error!("Failed to save entry {} to {}: {}", record.sequence_id, key, e);
            return Err(e);
        }
        debug!("Saved entry {} to {}", record.sequence_id, key);
        Ok(EntryOutcome::Persisted)
    }
}

fn as_page_load(url: &str, err: ScraperError) -> ScraperError {
    match err {
        ScraperError::PageLoad { .. } => err,
        other => ScraperError::PageLoad {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}
