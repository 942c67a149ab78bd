use super::{compile, PageNode, RenderedPage};
use crate::constants::{
    ENTRY_SELECTOR, METADATA_SELECTOR, POSTER_ATTR, POSTER_SELECTOR, TITLE_SELECTOR, UNKNOWN,
};
use crate::error::{Result, ScraperError};
use crate::types::{ListingDetails, ListingRecord};
use scraper::Selector;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailField {
    Genre,
    Director,
    Cast,
}

/// Position of the cast node in an entry's metadata block.
pub const CAST_POSITION: usize = 2;

/// Metadata nodes carry no labels, so fields are assigned by position.
/// A page that reorders or drops a node mislabels the fields after it.
/// Nodes past the last mapped position are ignored.
pub const FIELD_MAPPING: [(usize, DetailField); 3] = [
    (0, DetailField::Genre),
    (1, DetailField::Director),
    (CAST_POSITION, DetailField::Cast),
];

pub fn field_for_position(position: usize) -> Option<DetailField> {
    FIELD_MAPPING
        .iter()
        .find(|(pos, _)| *pos == position)
        .map(|(_, field)| *field)
}

/// Fill genre/director/cast from trimmed metadata texts in page order.
/// Slots without a node keep the sentinel.
pub fn apply_metadata<I, S>(details: &mut ListingDetails, values: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for (position, value) in values.into_iter().enumerate() {
        let value = value.as_ref().trim().to_string();
        match field_for_position(position) {
            Some(DetailField::Genre) => details.genre = value,
            Some(DetailField::Director) => details.director = value,
            Some(DetailField::Cast) => details.cast = value,
            None => debug!("Dropping metadata node at position {}: {}", position, value),
        }
    }
}

/// CSS selectors describing the catalog markup.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    pub entry: String,
    pub title: String,
    pub metadata: String,
    pub poster: String,
    pub poster_attr: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            entry: ENTRY_SELECTOR.to_string(),
            title: TITLE_SELECTOR.to_string(),
            metadata: METADATA_SELECTOR.to_string(),
            poster: POSTER_SELECTOR.to_string(),
            poster_attr: POSTER_ATTR.to_string(),
        }
    }
}

/// Outcome of one extraction pass. Entries fail independently.
#[derive(Debug)]
pub struct Extraction {
    pub entries_found: usize,
    pub entries: Vec<Result<ListingRecord>>,
}

pub struct ListingExtractor {
    entry: Selector,
    title: Selector,
    metadata: Selector,
    poster: Selector,
    poster_attr: String,
}

impl ListingExtractor {
    pub fn new() -> Result<Self> {
        Self::with_selectors(&ListingSelectors::default())
    }

    pub fn with_selectors(selectors: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            entry: compile(&selectors.entry)?,
            title: compile(&selectors.title)?,
            metadata: compile(&selectors.metadata)?,
            poster: compile(&selectors.poster)?,
            poster_attr: selectors.poster_attr.clone(),
        })
    }

    /// Extract at most `max_entries` records in page order. `sequence_id` is
    /// the entry's index on the page.
    pub fn extract(&self, page: &RenderedPage, max_entries: usize) -> Extraction {
        let entries = page.locate(&self.entry);
        let entries_found = entries.count();
        let count = max_entries.min(entries_found);
        info!("Found {} entries, extracting {}", entries_found, count);
        if entries_found == 0 {
            warn!("No entries found - the page structure may have changed");
        }

        let entries = entries
            .iter()
            .take(count)
            .enumerate()
            .map(|(index, node)| self.extract_entry(page, index, node))
            .collect();

        Extraction {
            entries_found,
            entries,
        }
    }

    fn extract_entry(&self, page: &RenderedPage, index: usize, entry: PageNode<'_>) -> Result<ListingRecord> {
        let mut details = ListingDetails::default();

        // Title text is kept verbatim.
        match entry.locate(&self.title).first() {
            Some(node) => details.title = node.text_content(),
            None => debug!("Entry {} has no title, using {}", index, UNKNOWN),
        }

        let metadata = entry.locate(&self.metadata);
        apply_metadata(&mut details, metadata.iter().map(|node| node.text_content()));

        let poster_src = entry
            .locate(&self.poster)
            .first()
            .and_then(|img| img.attr(&self.poster_attr))
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .ok_or(ScraperError::MissingPoster { index })?;

        Ok(ListingRecord::new(index, page.resolve_url(poster_src), details))
    }
}
