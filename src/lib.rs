//! Movie listing scraper.
//!
//! Extracts entries from a catalog page, downloads each poster and persists
//! poster plus JSON record through a [`storage::StorageBackend`].

pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod image_fetcher;
pub mod infra;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod record_store;
pub mod storage;
pub mod types;

pub use error::{Result, ScraperError};
pub use pipeline::{PipelineOptions, RunSummary, ScraperOrchestrator};
pub use types::{ListingDetails, ListingRecord};
