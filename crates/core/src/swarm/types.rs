//! Types for swarm client operations.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncRead;

use super::{SwarmMembership, SwarmReference};

/// Errors that can occur during swarm operations.
#[derive(Debug, Clone, Error)]
pub enum SwarmError {
    #[error("Invalid swarm reference: {0}")]
    InvalidReference(String),

    #[error("Timed out after {0:?} waiting for swarm metadata")]
    JoinTimeout(Duration),

    #[error("Failed to join swarm: {0}")]
    JoinFailed(String),

    #[error("File index {0} not found in swarm")]
    FileNotFound(usize),

    #[error("Offset {offset} is past the end of a {size}-byte file")]
    OffsetOutOfRange { offset: u64, size: u64 },

    #[error("Swarm membership closed")]
    MembershipClosed,

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A file inside a joined swarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmFile {
    /// Position of the file in the swarm metadata.
    pub index: usize,
    /// Path relative to the torrent root, `/`-separated.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

impl SwarmFile {
    /// Last path component of the file name.
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Raw byte reader handed out by a backend for one file.
pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

/// Backend side of one membership.
///
/// Implementations only need to hand out readers and release their resources;
/// close-state tracking and idempotency live in [`SwarmMembership`].
#[async_trait]
pub trait SwarmHandle: Send + Sync {
    /// Open a progressive reader over the file at `index`, positioned at
    /// byte `offset`.
    ///
    /// The reader must suspend until data is available and yield bytes in
    /// offset order.
    async fn open_file(&self, index: usize, offset: u64) -> Result<FileReader, SwarmError>;

    /// Drop peer connections and partial data. Called at most once.
    async fn release(&self) -> Result<(), SwarmError>;
}

/// Trait for swarm client backends.
///
/// A single long-lived instance is shared by every request, so
/// implementations synchronize their own state.
#[async_trait]
pub trait SwarmClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Join the swarm described by `reference`, waiting at most `timeout` for
    /// its file metadata.
    ///
    /// Dropping the returned future before it resolves must not leave a
    /// membership behind.
    async fn join(
        &self,
        reference: &SwarmReference,
        timeout: Duration,
    ) -> Result<SwarmMembership, SwarmError>;

    /// Number of swarms currently held open.
    async fn active_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swarm_file_name_strips_directories() {
        let file = SwarmFile {
            index: 0,
            name: "Movie (2020)/Subs/movie.mkv".to_string(),
            size: 10,
        };
        assert_eq!(file.file_name(), "movie.mkv");

        let flat = SwarmFile {
            index: 1,
            name: "movie.mp4".to_string(),
            size: 10,
        };
        assert_eq!(flat.file_name(), "movie.mp4");
    }

    #[test]
    fn test_swarm_error_display() {
        assert_eq!(
            SwarmError::MembershipClosed.to_string(),
            "Swarm membership closed"
        );
        assert_eq!(
            SwarmError::JoinTimeout(Duration::from_secs(5)).to_string(),
            "Timed out after 5s waiting for swarm metadata"
        );
        assert_eq!(
            SwarmError::OffsetOutOfRange {
                offset: 11,
                size: 10
            }
            .to_string(),
            "Offset 11 is past the end of a 10-byte file"
        );
    }

    #[test]
    fn test_swarm_file_serialization() {
        let file = SwarmFile {
            index: 2,
            name: "movie.mkv".to_string(),
            size: 1024,
        };
        let json = serde_json::to_string(&file).unwrap();
        let parsed: SwarmFile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, file);
    }
}
