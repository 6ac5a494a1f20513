//! Stream pipeline: identifier in, relayed file out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::relay::{relay, ByteRange, RelayError, RelayStream};
use crate::resolver::{ContentResolver, ResolutionError};
use crate::selector::{FileSelector, SelectionError};
use crate::swarm::{SwarmClient, SwarmError};

/// Errors that can occur while opening a stream.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Swarm(#[from] SwarmError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl StreamError {
    /// Short reason shown to addon clients.
    pub fn client_message(&self) -> &'static str {
        match self {
            StreamError::Resolution(ResolutionError::MalformedIdentifier(_))
            | StreamError::Resolution(ResolutionError::RemoteNotFound(_)) => "Not found in catalog",
            StreamError::Resolution(ResolutionError::RemoteUnavailable(_)) => "Catalog unavailable",
            StreamError::Resolution(ResolutionError::NoStreamableContent(_)) => "Magnet not found",
            StreamError::Swarm(_) => "Swarm unavailable",
            StreamError::Selection(SelectionError::NoPlayableFile(_)) => "No playable file",
            StreamError::Relay(RelayError::RangeNotSatisfiable { .. }) => "Range not satisfiable",
            StreamError::Relay(RelayError::Open { .. }) => "Stream unavailable",
        }
    }
}

/// Tunables for [`StreamService`].
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub join_timeout: Duration,
    pub chunk_size: usize,
    pub extensions: Vec<String>,
}

impl StreamSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            join_timeout: Duration::from_secs(config.swarm.join_timeout_secs as u64),
            chunk_size: config.stream.chunk_size_kb.saturating_mul(1024),
            extensions: config.stream.extensions.clone(),
        }
    }
}

/// Runs resolve, join, select and relay for one request.
pub struct StreamService {
    resolver: ContentResolver,
    swarm: Arc<dyn SwarmClient>,
    selector: FileSelector,
    join_timeout: Duration,
    chunk_size: usize,
}

impl StreamService {
    pub fn new(
        resolver: ContentResolver,
        swarm: Arc<dyn SwarmClient>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            resolver,
            swarm,
            selector: FileSelector::new(settings.extensions),
            join_timeout: settings.join_timeout,
            chunk_size: settings.chunk_size,
        }
    }

    /// Swarm client backing this service.
    pub fn swarm(&self) -> &Arc<dyn SwarmClient> {
        &self.swarm
    }

    /// Open the primary video of `identifier` as a relay.
    ///
    /// The membership is owned by the returned relay; every earlier failure
    /// leaves it before returning. Dropping the returned future before it
    /// resolves leaves nothing joined either.
    pub async fn open(&self, identifier: &str) -> Result<RelayStream, StreamError> {
        self.open_range(identifier, None).await
    }

    /// Like [`open`](Self::open), relaying only the bytes named by an HTTP
    /// `Range` header when one is given.
    pub async fn open_range(
        &self,
        identifier: &str,
        range_header: Option<&str>,
    ) -> Result<RelayStream, StreamError> {
        let started = Instant::now();

        let reference = self.resolver.resolve(identifier).await?;

        let membership = self.swarm.join(&reference, self.join_timeout).await?;

        let file = match self.selector.select(membership.files()) {
            Ok(file) => file.clone(),
            Err(e) => {
                warn!(
                    info_hash = %reference.info_hash(),
                    files = membership.files().len(),
                    "No playable file in swarm"
                );
                membership.leave().await;
                return Err(e.into());
            }
        };

        let range = match range_header.map(|header| ByteRange::parse(header, file.size)) {
            Some(Err(e)) => {
                debug!(
                    info_hash = %reference.info_hash(),
                    size = file.size,
                    range = ?range_header,
                    "Unsatisfiable range"
                );
                membership.leave().await;
                return Err(e.into());
            }
            Some(Ok(range)) => range,
            None => None,
        };

        let stream = relay(membership, &file, range, self.chunk_size).await?;

        info!(
            session_id = %stream.session_id(),
            info_hash = %reference.info_hash(),
            file = %file.name,
            size = file.size,
            range = ?stream.content_range(),
            backend = self.swarm.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Stream opened"
        );

        Ok(stream)
    }
}
