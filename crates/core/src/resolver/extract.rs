//! Swarm reference extraction from detail pages.
//!
//! Site markup changes should only ever touch this file.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::html::decode_entities;

/// Strategy for pulling candidate swarm references out of a page.
pub trait ReferenceExtractor: Send + Sync {
    /// Candidate reference URIs in document order.
    fn extract(&self, html: &str) -> Vec<String>;
}

static MAGNET_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a\b[^>]*?\bhref\s*=\s*["'](magnet:\?xt=[^"']+)["']"#).unwrap()
});

/// Extracts `magnet:?xt=` links from anchor `href` attributes.
#[derive(Debug, Default, Clone, Copy)]
pub struct MagnetLinkExtractor;

impl MagnetLinkExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ReferenceExtractor for MagnetLinkExtractor {
    fn extract(&self, html: &str) -> Vec<String> {
        MAGNET_HREF
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .map(|m| decode_entities(m.as_str()))
            .collect()
    }
}
