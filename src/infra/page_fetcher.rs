use crate::app::ports::{HttpClientPort, PageFetcherPort, PageSession};
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Page fetcher that loads server-rendered HTML over plain HTTP.
///
/// The catalog renders its listing server side, so no script execution is
/// needed. A browser-backed fetcher can implement [`PageFetcherPort`] instead.
pub struct HttpPageFetcher {
    http: Arc<dyn HttpClientPort>,
}

impl HttpPageFetcher {
    pub fn new(http: Arc<dyn HttpClientPort>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PageFetcherPort for HttpPageFetcher {
    async fn open(&self) -> Result<Box<dyn PageSession>> {
        debug!("Opening HTTP page session");
        Ok(Box::new(HttpPageSession {
            http: self.http.clone(),
            url: None,
            html: None,
            closed: false,
        }))
    }
}

pub struct HttpPageSession {
    http: Arc<dyn HttpClientPort>,
    url: Option<String>,
    html: Option<String>,
    closed: bool,
}

#[async_trait]
impl PageSession for HttpPageSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        if self.closed {
            return Err(ScraperError::PageLoad {
                url: url.to_string(),
                reason: "session already closed".to_string(),
            });
        }
        let resp = self.http.get(url).await.map_err(|e| ScraperError::PageLoad {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !resp.is_success() {
            return Err(ScraperError::PageLoad {
                url: url.to_string(),
                reason: format!("HTTP status {}", resp.status),
            });
        }
        debug!("Loaded {} ({} bytes)", url, resp.bytes.len());
        self.url = Some(url.to_string());
        self.html = Some(String::from_utf8_lossy(&resp.bytes).into_owned());
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        self.html.clone().ok_or_else(|| ScraperError::PageLoad {
            url: self.url.clone().unwrap_or_default(),
            reason: "no page loaded".to_string(),
        })
    }

    fn current_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.html = None;
        debug!("Closed HTTP page session");
        Ok(())
    }
}

impl Drop for HttpPageSession {
    fn drop(&mut self) {
        if !self.closed {
            warn!("Page session dropped without being closed");
        }
    }
}
