//! Mock page fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, PageFetcher};

/// Mock implementation of the PageFetcher trait.
///
/// Serves canned pages by URL and records every request. Unknown URLs
/// answer with [`FetchError::NotFound`], like a remote 404.
///
/// # Example
///
/// ```rust,ignore
/// let fetcher = MockPageFetcher::new();
/// fetcher.set_page("https://site.example/movie/", "<html>...</html>").await;
///
/// let html = fetcher.fetch("https://site.example/movie/").await?;
/// assert_eq!(fetcher.requested_urls().await.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockPageFetcher {
    /// Canned page bodies by URL.
    pages: Arc<RwLock<HashMap<String, String>>>,
    /// Recorded fetch calls.
    requests: Arc<RwLock<Vec<String>>>,
    /// If set, the next fetch will fail with this error.
    next_error: Arc<RwLock<Option<FetchError>>>,
}

impl MockPageFetcher {
    /// Create a new mock fetcher with no pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub async fn set_page(&self, url: &str, body: impl Into<String>) {
        self.pages.write().await.insert(url.to_string(), body.into());
    }

    /// Stop serving `url`.
    pub async fn remove_page(&self, url: &str) {
        self.pages.write().await.remove(url);
    }

    /// Make the next fetch fail with `error`.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// URLs requested so far, in order.
    pub async fn requested_urls(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests.write().await.push(url.to_string());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        self.pages
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}
