//! Queryable view over a rendered page.
//!
//! Mirrors the locator style of browser automation APIs: locate nodes by CSS
//! selector, count them, pick the nth, read text and attributes.

pub mod listing;

use crate::error::{Result, ScraperError};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

pub use listing::{DetailField, Extraction, ListingExtractor, ListingSelectors};

pub fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| ScraperError::Selector(selector.to_string()))
}

pub struct RenderedPage {
    url: Option<Url>,
    document: Html,
}

impl RenderedPage {
    pub fn parse(html: &str, url: Option<&str>) -> Self {
        Self {
            url: url.and_then(|u| Url::parse(u).ok()),
            document: Html::parse_document(html),
        }
    }

    pub fn locate(&self, selector: &Selector) -> Locator<'_> {
        Locator {
            nodes: self.document.select(selector).map(PageNode).collect(),
        }
    }

    /// Absolute form of a link found on the page. Left untouched when it is
    /// already absolute or the page URL is unknown.
    pub fn resolve_url(&self, href: &str) -> String {
        if Url::parse(href).is_ok() {
            return href.to_string();
        }
        self.url
            .as_ref()
            .and_then(|base| base.join(href).ok())
            .map(String::from)
            .unwrap_or_else(|| href.to_string())
    }
}

/// Ordered set of nodes matched by one selector.
pub struct Locator<'a> {
    nodes: Vec<PageNode<'a>>,
}

impl<'a> Locator<'a> {
    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nth(&self, index: usize) -> Option<PageNode<'a>> {
        self.nodes.get(index).copied()
    }

    pub fn first(&self) -> Option<PageNode<'a>> {
        self.nth(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = PageNode<'a>> + '_ {
        self.nodes.iter().copied()
    }
}

#[derive(Clone, Copy)]
pub struct PageNode<'a>(ElementRef<'a>);

impl<'a> PageNode<'a> {
    pub fn locate(&self, selector: &Selector) -> Locator<'a> {
        Locator {
            nodes: self.0.select(selector).map(PageNode).collect(),
        }
    }

    /// Concatenated text of the node and its descendants, untrimmed.
    pub fn text_content(&self) -> String {
        self.0.text().collect()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }
}
