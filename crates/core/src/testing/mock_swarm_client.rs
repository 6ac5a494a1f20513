//! Mock swarm client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, DuplexStream};
use tokio::sync::RwLock;

use crate::swarm::{
    FileReader, SwarmClient, SwarmError, SwarmFile, SwarmHandle, SwarmMembership, SwarmReference,
};

/// A recorded join for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedJoin {
    /// The reference that was joined.
    pub reference: SwarmReference,
    /// Timeout the caller asked for.
    pub timeout: Duration,
    /// When the join was requested.
    pub timestamp: chrono::DateTime<Utc>,
}

/// A recorded file open for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedOpen {
    /// Info hash of the swarm the file belongs to.
    pub info_hash: String,
    /// Index of the opened file.
    pub index: usize,
    /// Byte offset the reader started at.
    pub offset: u64,
}

/// Canned swarm contents.
#[derive(Debug, Clone)]
struct MockSwarm {
    files: Vec<(String, Vec<u8>)>,
    /// Serve the file bytes, then never reach end of file.
    stall_after_data: bool,
}

/// Mock implementation of the SwarmClient trait.
///
/// Provides controllable behavior for testing:
/// - Register swarms by info hash with file names and contents
/// - Simulate slow metadata, unknown swarms and join failures
/// - Track joins and releases for assertions
///
/// Unknown info hashes behave like a swarm whose metadata never arrives: the
/// join waits out the caller's timeout and fails with `JoinTimeout`.
///
/// # Example
///
/// ```rust,ignore
/// let client = MockSwarmClient::new();
/// client.add_swarm(hash, vec![("movie.mkv", b"data".to_vec())]).await;
///
/// let membership = client.join(&reference, Duration::from_secs(1)).await?;
/// membership.leave().await;
/// assert_eq!(client.released().await, vec![hash.to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct MockSwarmClient {
    /// Registered swarms by info hash.
    swarms: Arc<RwLock<HashMap<String, MockSwarm>>>,
    /// Recorded join calls.
    joins: Arc<RwLock<Vec<RecordedJoin>>>,
    /// Info hashes released so far, in order.
    releases: Arc<RwLock<Vec<String>>>,
    /// Files opened so far, in order.
    opens: Arc<RwLock<Vec<RecordedOpen>>>,
    /// Memberships handed out and not yet released.
    active: Arc<AtomicUsize>,
    /// Simulated metadata delay.
    join_delay: Arc<RwLock<Option<Duration>>>,
    /// If set, the next join will fail with this error.
    next_error: Arc<RwLock<Option<SwarmError>>>,
}

impl MockSwarmClient {
    /// Create a new mock swarm client with no swarms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a swarm whose files are served in full.
    pub async fn add_swarm(&self, info_hash: &str, files: Vec<(&str, Vec<u8>)>) {
        self.insert(info_hash, files, false).await;
    }

    /// Register a swarm whose files serve their bytes and then stall, as if
    /// the remaining pieces never arrive.
    pub async fn add_stalled_swarm(&self, info_hash: &str, files: Vec<(&str, Vec<u8>)>) {
        self.insert(info_hash, files, true).await;
    }

    async fn insert(&self, info_hash: &str, files: Vec<(&str, Vec<u8>)>, stall_after_data: bool) {
        let files = files
            .into_iter()
            .map(|(name, data)| (name.to_string(), data))
            .collect();
        self.swarms.write().await.insert(
            info_hash.to_lowercase(),
            MockSwarm {
                files,
                stall_after_data,
            },
        );
    }

    /// Delay every join by `delay` before metadata is available.
    pub async fn set_join_delay(&self, delay: Duration) {
        *self.join_delay.write().await = Some(delay);
    }

    /// Make the next join fail with `error`.
    pub async fn set_next_error(&self, error: SwarmError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get all recorded join calls.
    pub async fn joins(&self) -> Vec<RecordedJoin> {
        self.joins.read().await.clone()
    }

    /// Info hashes released so far.
    pub async fn released(&self) -> Vec<String> {
        self.releases.read().await.clone()
    }

    /// Files opened so far, with the offsets they were opened at.
    pub async fn opened(&self) -> Vec<RecordedOpen> {
        self.opens.read().await.clone()
    }

    /// Wait until `count` releases have been recorded or `timeout` elapses.
    ///
    /// Releases triggered from `Drop` run on a background task, so tests
    /// poll for them.
    pub async fn wait_for_releases(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            while self.releases.read().await.len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .is_ok()
    }
}

#[async_trait]
impl SwarmClient for MockSwarmClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn join(
        &self,
        reference: &SwarmReference,
        timeout: Duration,
    ) -> Result<SwarmMembership, SwarmError> {
        self.joins.write().await.push(RecordedJoin {
            reference: reference.clone(),
            timeout,
            timestamp: Utc::now(),
        });

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let delay = *self.join_delay.read().await;
        let swarms = self.swarms.clone();
        let info_hash = reference.info_hash().to_string();

        let metadata = async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let found = swarms.read().await.get(&info_hash).cloned();
            match found {
                Some(swarm) => swarm,
                None => std::future::pending::<MockSwarm>().await,
            }
        };

        let swarm = tokio::time::timeout(timeout, metadata)
            .await
            .map_err(|_| SwarmError::JoinTimeout(timeout))?;

        let files = swarm
            .files
            .iter()
            .enumerate()
            .map(|(index, (name, data))| SwarmFile {
                index,
                name: name.clone(),
                size: data.len() as u64,
            })
            .collect();

        self.active.fetch_add(1, Ordering::SeqCst);
        let handle = MockHandle {
            info_hash: reference.info_hash().to_string(),
            contents: swarm.files.into_iter().map(|(_, data)| data).collect(),
            stall_after_data: swarm.stall_after_data,
            stalled_writers: Mutex::new(Vec::new()),
            opens: self.opens.clone(),
            releases: self.releases.clone(),
            active: self.active.clone(),
        };

        Ok(SwarmMembership::new(
            reference.clone(),
            files,
            Arc::new(handle),
        ))
    }

    async fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

struct MockHandle {
    info_hash: String,
    contents: Vec<Vec<u8>>,
    stall_after_data: bool,
    /// Write halves kept alive so stalled readers never see end of file.
    stalled_writers: Mutex<Vec<DuplexStream>>,
    opens: Arc<RwLock<Vec<RecordedOpen>>>,
    releases: Arc<RwLock<Vec<String>>>,
    active: Arc<AtomicUsize>,
}

#[async_trait]
impl SwarmHandle for MockHandle {
    async fn open_file(&self, index: usize, offset: u64) -> Result<FileReader, SwarmError> {
        let data = self
            .contents
            .get(index)
            .cloned()
            .ok_or(SwarmError::FileNotFound(index))?;

        self.opens.write().await.push(RecordedOpen {
            info_hash: self.info_hash.clone(),
            index,
            offset,
        });

        let mut data = std::io::Cursor::new(data);
        data.set_position(offset);

        if !self.stall_after_data {
            return Ok(Box::new(data));
        }

        let (reader, writer) = tokio::io::duplex(64);
        self.stalled_writers
            .lock()
            .map_err(|_| SwarmError::Internal("stalled writer lock poisoned".to_string()))?
            .push(writer);
        Ok(Box::new(data.chain(reader)))
    }

    async fn release(&self) -> Result<(), SwarmError> {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.releases.write().await.push(self.info_hash.clone());
        Ok(())
    }
}
