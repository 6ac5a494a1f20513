//! Listing page scraping.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::debug;
use url::Url;

use super::{CatalogEntry, CatalogError};
use crate::html::{decode_entities, text_content};

static OPENING_TAG_WITH_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<[a-z][a-z0-9]*\b[^>]*?\bclass\s*=\s*["']([^"']*)["'][^>]*>"#).unwrap()
});
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h2\b[^>]*>(.*?)</h2>").unwrap());
static IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).unwrap()
});
static ANCHOR_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#).unwrap()
});

/// Classes every listing item carries.
const ITEM_CLASSES: &[&str] = &["item_1", "items"];

/// Extracts catalog entries from a listing page.
#[derive(Debug, Clone)]
pub struct ListingScraper {
    base: Url,
}

impl ListingScraper {
    /// Create a scraper resolving relative links against `listing_url`.
    pub fn new(listing_url: &str) -> Result<Self, CatalogError> {
        let base = Url::parse(listing_url)
            .map_err(|e| CatalogError::InvalidListingUrl(format!("{}: {}", listing_url, e)))?;
        Ok(Self { base })
    }

    /// Entries in page order. Items without a title or detail link are
    /// skipped.
    pub fn scrape(&self, html: &str) -> Vec<CatalogEntry> {
        let starts: Vec<usize> = OPENING_TAG_WITH_CLASS
            .captures_iter(html)
            .filter(|caps| {
                caps.get(1)
                    .map(|classes| has_item_classes(classes.as_str()))
                    .unwrap_or(false)
            })
            .filter_map(|caps| caps.get(0).map(|m| m.start()))
            .collect();

        let mut entries = Vec::with_capacity(starts.len());
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(html.len());
            match self.scrape_item(&html[start..end]) {
                Some(entry) => entries.push(entry),
                None => debug!(offset = start, "Skipping incomplete listing item"),
            }
        }
        entries
    }

    fn scrape_item(&self, block: &str) -> Option<CatalogEntry> {
        let title = HEADING
            .captures(block)
            .and_then(|caps| caps.get(1))
            .map(|m| text_content(m.as_str()))
            .filter(|title| !title.is_empty())?;

        let href = ANCHOR_HREF.captures(block)?.get(1)?.as_str();
        let detail_locator = self.absolutize(href)?;

        let poster_url = IMG_SRC
            .captures(block)
            .and_then(|caps| caps.get(1))
            .and_then(|m| self.absolutize(m.as_str()));

        Some(CatalogEntry::new(title, poster_url, detail_locator))
    }

    fn absolutize(&self, link: &str) -> Option<String> {
        let link = decode_entities(link.trim());
        let url = self.base.join(&link).ok()?;
        match url.scheme() {
            "http" | "https" => Some(url.to_string()),
            _ => None,
        }
    }
}

fn has_item_classes(class_attr: &str) -> bool {
    let classes: Vec<&str> = class_attr.split_whitespace().collect();
    ITEM_CLASSES.iter().all(|required| classes.contains(required))
}
