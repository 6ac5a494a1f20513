//! Catalog types.

use serde::{Deserialize, Serialize};

use crate::codec;

/// Content type served by the catalog.
pub const CATALOG_TYPE: &str = "movie";

/// One item scraped from the listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable identifier derived from `detail_locator`.
    pub id: String,
    pub title: String,
    pub poster_url: Option<String>,
    /// Absolute URL of the item's detail page.
    pub detail_locator: String,
}

impl CatalogEntry {
    /// Build an entry, deriving its identifier from the detail locator.
    pub fn new(
        title: impl Into<String>,
        poster_url: Option<String>,
        detail_locator: String,
    ) -> Self {
        Self {
            id: codec::encode(&detail_locator),
            title: title.into(),
            poster_url,
            detail_locator,
        }
    }

    /// Addon-protocol preview of this entry.
    pub fn to_meta_preview(&self) -> MetaPreview {
        MetaPreview {
            id: self.id.clone(),
            kind: CATALOG_TYPE.to_string(),
            name: self.title.clone(),
            poster: self.poster_url.clone(),
        }
    }
}

/// Catalog item as addon clients expect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaPreview {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
}
