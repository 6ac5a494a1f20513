//! Remote page fetching.
//!
//! Both the catalog scraper and the content resolver read HTML from the
//! third-party site. They go through the `PageFetcher` trait so tests can
//! serve canned pages.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::config::SourceConfig;

/// Errors that can occur while fetching a page.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Page not found: {0}")]
    NotFound(String),

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,
}

/// Trait for retrieving HTML pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the body of `url` as text.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed page fetcher.
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    /// Create a new fetcher with the given source configuration.
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                FetchError::ConnectionFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url = url, "Fetching page");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::ConnectionFailed(format!("Failed to read body: {}", e))
            }
        })
    }
}
