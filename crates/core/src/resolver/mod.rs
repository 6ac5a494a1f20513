//! Content resolution.
//!
//! Maps a catalog identifier to a swarm reference: decode the identifier,
//! fetch the detail page it points at, extract the first usable magnet link
//! and top up its tracker list with the baseline endpoints.

mod extract;
mod trackers;

pub use extract::{MagnetLinkExtractor, ReferenceExtractor};
pub use trackers::{augment_trackers, BASELINE_TRACKERS};

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec;
use crate::fetcher::{FetchError, PageFetcher};
use crate::metrics::RESOLUTIONS;
use crate::swarm::SwarmReference;

/// Errors that can occur while resolving an identifier.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote page not found: {0}")]
    RemoteNotFound(String),

    #[error("No streamable content on {0}")]
    NoStreamableContent(String),
}

impl ResolutionError {
    /// Label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::MalformedIdentifier(_) => "malformed_identifier",
            ResolutionError::RemoteUnavailable(_) => "remote_unavailable",
            ResolutionError::RemoteNotFound(_) => "remote_not_found",
            ResolutionError::NoStreamableContent(_) => "no_streamable_content",
        }
    }
}

impl From<FetchError> for ResolutionError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(url) => ResolutionError::RemoteNotFound(url),
            other => ResolutionError::RemoteUnavailable(other.to_string()),
        }
    }
}

/// Resolves catalog identifiers to swarm references.
pub struct ContentResolver {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Box<dyn ReferenceExtractor>,
    baseline_trackers: Vec<String>,
}

impl ContentResolver {
    /// Create a resolver using the default magnet link extractor.
    pub fn new(fetcher: Arc<dyn PageFetcher>, baseline_trackers: Vec<String>) -> Self {
        Self::with_extractor(fetcher, Box::new(MagnetLinkExtractor::new()), baseline_trackers)
    }

    /// Create a resolver with a custom extraction strategy.
    pub fn with_extractor(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Box<dyn ReferenceExtractor>,
        baseline_trackers: Vec<String>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            baseline_trackers,
        }
    }

    /// Resolve `identifier` to a swarm reference.
    ///
    /// When a page carries several magnet links the first one (in document
    /// order) that parses wins.
    pub async fn resolve(&self, identifier: &str) -> Result<SwarmReference, ResolutionError> {
        let result = self.resolve_inner(identifier).await;
        let label = match &result {
            Ok(_) => "resolved",
            Err(e) => e.kind(),
        };
        RESOLUTIONS.with_label_values(&[label]).inc();
        result
    }

    async fn resolve_inner(&self, identifier: &str) -> Result<SwarmReference, ResolutionError> {
        let locator = codec::decode(identifier)
            .map_err(|e| ResolutionError::MalformedIdentifier(e.to_string()))?;

        debug!(locator = %locator, "Fetching detail page");
        let page = self.fetcher.fetch(&locator).await?;

        let candidates = self.extractor.extract(&page);
        let mut reference = candidates
            .iter()
            .find_map(|candidate| match SwarmReference::parse_magnet(candidate) {
                Ok(reference) => Some(reference),
                Err(e) => {
                    warn!(locator = %locator, error = %e, "Skipping unusable magnet link");
                    None
                }
            })
            .ok_or_else(|| ResolutionError::NoStreamableContent(locator.clone()))?;

        let added = augment_trackers(&mut reference, &self.baseline_trackers);

        info!(
            locator = %locator,
            info_hash = %reference.info_hash(),
            candidates = candidates.len(),
            trackers = reference.trackers().len(),
            baseline_added = added,
            "Resolved swarm reference"
        );

        Ok(reference)
    }
}
