use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpGetResult>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Launches page sessions. A session is the unit of browser-like state that
/// must be released once the run is done.
#[async_trait]
pub trait PageFetcherPort: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageSession>>;
}

#[async_trait]
pub trait PageSession: Send {
    /// Navigate to `url` and block until the page is loaded.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Rendered HTML of the current page.
    async fn content(&self) -> Result<String>;

    /// URL of the current page, used to resolve relative links.
    fn current_url(&self) -> Option<&str>;

    async fn close(&mut self) -> Result<()>;
}
