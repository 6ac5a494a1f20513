//! Catalog source.
//!
//! The catalog is scraped live from the third-party listing page on every
//! request. Entries are not stored: their identifiers carry everything needed
//! to resolve a stream later.

mod manifest;
mod scraper;
mod types;

pub use manifest::{build_manifest, CatalogDescriptor, ExtraProperty, Manifest, CATALOG_ID};
pub use scraper::ListingScraper;
pub use types::*;

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::fetcher::{FetchError, PageFetcher};

/// Errors that can occur while listing the catalog.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Invalid listing URL: {0}")]
    InvalidListingUrl(String),

    #[error("Listing page not found: {0}")]
    NotFound(String),

    #[error("Listing unavailable: {0}")]
    Unavailable(String),
}

impl From<FetchError> for CatalogError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(url) => CatalogError::NotFound(url),
            other => CatalogError::Unavailable(other.to_string()),
        }
    }
}

/// Trait for catalog backends.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Entries on listing page `page` (1-based).
    async fn list(&self, page: u32) -> Result<Vec<CatalogEntry>, CatalogError>;
}

/// Catalog scraped from the configured listing site.
pub struct SiteCatalog {
    fetcher: Arc<dyn PageFetcher>,
    listing_url: String,
    scraper: ListingScraper,
}

impl SiteCatalog {
    /// Create a catalog reading `listing_url` through `fetcher`.
    pub fn new(fetcher: Arc<dyn PageFetcher>, listing_url: &str) -> Result<Self, CatalogError> {
        Ok(Self {
            fetcher,
            listing_url: listing_url.to_string(),
            scraper: ListingScraper::new(listing_url)?,
        })
    }
}

#[async_trait]
impl CatalogSource for SiteCatalog {
    async fn list(&self, page: u32) -> Result<Vec<CatalogEntry>, CatalogError> {
        let url = page_url(&self.listing_url, page);
        debug!(url = %url, page = page, "Fetching listing page");

        let html = self.fetcher.fetch(&url).await?;
        let entries = self.scraper.scrape(&html);

        info!(url = %url, entries = entries.len(), "Scraped listing page");
        Ok(entries)
    }
}

static PAGE_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/page/\d+/?$").unwrap());

/// URL of listing page `page`.
///
/// A trailing `/page/N/` segment is rewritten; other URLs get one appended
/// for pages past the first.
pub fn page_url(listing_url: &str, page: u32) -> String {
    let page = page.max(1);
    if PAGE_SEGMENT.is_match(listing_url) {
        return PAGE_SEGMENT
            .replace(listing_url, format!("/page/{}/", page).as_str())
            .into_owned();
    }
    if page == 1 {
        return listing_url.to_string();
    }
    format!("{}/page/{}/", listing_url.trim_end_matches('/'), page)
}

/// Entries whose title contains `query`, ignoring case.
///
/// A blank query matches everything.
pub fn search(entries: Vec<CatalogEntry>, query: &str) -> Vec<CatalogEntry> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return entries;
    }
    entries
        .into_iter()
        .filter(|entry| entry.title.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockPageFetcher};

    const LISTING: &str = "https://www.hackstore.to/peliculas-latino/page/1/";

    #[test]
    fn test_page_url_rewrites_page_segment() {
        assert_eq!(page_url(LISTING, 1), LISTING);
        assert_eq!(
            page_url(LISTING, 3),
            "https://www.hackstore.to/peliculas-latino/page/3/"
        );
        assert_eq!(page_url(LISTING, 0), LISTING);
    }

    #[test]
    fn test_page_url_appends_segment() {
        let base = "https://site.example/peliculas/";
        assert_eq!(page_url(base, 1), base);
        assert_eq!(page_url(base, 2), "https://site.example/peliculas/page/2/");
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let entries = vec![
            CatalogEntry::new("Dune", None, "https://a.example/dune/".to_string()),
            CatalogEntry::new("Duna Roja", None, "https://a.example/duna/".to_string()),
            CatalogEntry::new("Matrix", None, "https://a.example/matrix/".to_string()),
        ];

        let found = search(entries.clone(), "DUN");
        assert_eq!(found.len(), 2);
        assert_eq!(search(entries.clone(), "rix")[0].title, "Matrix");
        assert!(search(entries.clone(), "alien").is_empty());
        assert_eq!(search(entries, "  ").len(), 3);
    }

    #[tokio::test]
    async fn test_site_catalog_lists_scraped_entries() {
        let fetcher = Arc::new(MockPageFetcher::new());
        fetcher
            .set_page(
                LISTING,
                fixtures::listing_page(&[
                    ("Dune", "https://www.hackstore.to/dune/"),
                    ("Matrix", "https://www.hackstore.to/matrix/"),
                ]),
            )
            .await;

        let catalog = SiteCatalog::new(fetcher.clone(), LISTING).unwrap();
        let entries = catalog.list(1).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].title, "Matrix");
        assert_eq!(fetcher.requested_urls().await, vec![LISTING.to_string()]);
    }

    #[tokio::test]
    async fn test_site_catalog_maps_fetch_errors() {
        let fetcher = Arc::new(MockPageFetcher::new());
        let catalog = SiteCatalog::new(fetcher.clone(), LISTING).unwrap();

        assert!(matches!(catalog.list(2).await, Err(CatalogError::NotFound(_))));

        fetcher.set_next_error(FetchError::Timeout).await;
        assert!(matches!(
            catalog.list(1).await,
            Err(CatalogError::Unavailable(_))
        ));
    }
}
