//! librqbit embedded swarm client implementation.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use librqbit::{
    AddTorrent as RqbitAddTorrent, AddTorrentOptions, AddTorrentResponse, ManagedTorrent, Session,
    SessionOptions,
};
use tokio::io::AsyncSeekExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    FileReader, SwarmClient, SwarmError, SwarmFile, SwarmHandle, SwarmMembership, SwarmReference,
};
use crate::config::SwarmConfig;
use crate::metrics::{SWARM_JOINS, SWARM_JOIN_DURATION};

/// Embedded librqbit swarm client.
///
/// One session serves every request. Memberships of the same info hash share
/// the underlying torrent; it is deleted, together with its partial data,
/// when the last of them leaves.
pub struct LibrqbitSwarmClient {
    shared: Arc<Shared>,
}

struct Shared {
    session: Arc<Session>,
    claims: Mutex<ClaimLedger>,
}

/// Joins in flight and open memberships per info hash.
///
/// A torrent may only be deleted while its hash holds neither.
#[derive(Debug, Default)]
struct ClaimLedger {
    claims: HashMap<String, Claims>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Claims {
    pending: usize,
    joined: usize,
}

impl ClaimLedger {
    /// Record a join that has not produced a membership yet.
    fn begin(&mut self, hash: &str) {
        self.claims.entry(hash.to_string()).or_default().pending += 1;
    }

    /// Turn a pending join into an open membership.
    fn commit(&mut self, hash: &str) {
        let claims = self.claims.entry(hash.to_string()).or_default();
        claims.pending = claims.pending.saturating_sub(1);
        claims.joined += 1;
    }

    /// Drop a pending join. Returns `true` if nothing holds the hash anymore.
    fn abandon(&mut self, hash: &str) -> bool {
        if let Some(claims) = self.claims.get_mut(hash) {
            claims.pending = claims.pending.saturating_sub(1);
        }
        self.prune(hash)
    }

    /// Close an open membership. Returns `true` if nothing holds the hash
    /// anymore.
    fn release(&mut self, hash: &str) -> bool {
        if let Some(claims) = self.claims.get_mut(hash) {
            claims.joined = claims.joined.saturating_sub(1);
        }
        self.prune(hash)
    }

    fn is_held(&self, hash: &str) -> bool {
        self.claims.contains_key(hash)
    }

    /// Number of hashes with at least one open membership.
    fn open_count(&self) -> usize {
        self.claims.values().filter(|c| c.joined > 0).count()
    }

    fn prune(&mut self, hash: &str) -> bool {
        match self.claims.get(hash) {
            Some(claims) if claims.pending > 0 || claims.joined > 0 => false,
            _ => {
                self.claims.remove(hash);
                true
            }
        }
    }
}

/// A join of one info hash that has not produced a membership yet.
///
/// Dropping it without `commit`, whether the join failed or its future was
/// cancelled, gives the claim back and discards the torrent unless another
/// join or membership still holds the hash.
struct JoinClaim {
    shared: Arc<Shared>,
    hash: String,
    committed: bool,
}

impl JoinClaim {
    async fn begin(shared: &Arc<Shared>, hash: &str) -> Self {
        shared.claims.lock().await.begin(hash);
        Self {
            shared: shared.clone(),
            hash: hash.to_string(),
            committed: false,
        }
    }

    async fn commit(mut self) {
        let mut claims = self.shared.claims.lock().await;
        claims.commit(&self.hash);
        self.committed = true;
    }
}

impl Drop for JoinClaim {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let shared = self.shared.clone();
        let hash = std::mem::take(&mut self.hash);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move { shared.abandon(&hash).await });
            }
            Err(_) => {
                warn!(hash = %hash, "No runtime available to abandon join");
            }
        }
    }
}

impl LibrqbitSwarmClient {
    /// Create a new librqbit client from configuration.
    pub async fn new(config: &SwarmConfig) -> Result<Self, SwarmError> {
        let download_path = PathBuf::from(&config.download_path);

        // Ensure scratch directory exists
        if !download_path.exists() {
            std::fs::create_dir_all(&download_path).map_err(|e| {
                SwarmError::Internal(format!("Failed to create download directory: {}", e))
            })?;
        }

        let mut opts = SessionOptions::default();

        // Configure DHT
        if !config.enable_dht {
            opts.disable_dht = true;
        }

        // Configure listen port (Range, not RangeInclusive)
        if let Some(port) = config.listen_port {
            opts.listen_port_range = Some(port..port.saturating_add(1));
        }

        info!(
            download_path = %download_path.display(),
            dht_enabled = !opts.disable_dht,
            "Initializing librqbit session"
        );

        let session = Session::new_with_opts(download_path, opts)
            .await
            .map_err(|e| {
                SwarmError::Internal(format!("Failed to initialize librqbit session: {}", e))
            })?;

        if let Some(port) = session.tcp_listen_port() {
            info!(port = port, "librqbit listening on TCP port");
        }

        Ok(Self {
            shared: Arc::new(Shared {
                session,
                claims: Mutex::new(ClaimLedger::default()),
            }),
        })
    }

    /// Format info hash as lowercase hex string.
    fn format_hash(hash: &librqbit_core::Id20) -> String {
        hash.as_string()
    }

    /// Read the file list out of a torrent whose metadata is resolved.
    fn file_list(torrent: &ManagedTorrent) -> Result<Vec<SwarmFile>, SwarmError> {
        let metadata = torrent.metadata.load();
        let metadata = metadata
            .as_ref()
            .ok_or_else(|| SwarmError::JoinFailed("torrent metadata not available".to_string()))?;

        let files = metadata
            .info
            .iter_file_details()
            .map_err(|e| SwarmError::JoinFailed(format!("Failed to list files: {}", e)))?
            .enumerate()
            .map(|(index, details)| SwarmFile {
                index,
                name: details
                    .filename
                    .to_string()
                    .unwrap_or_else(|_| format!("file-{}", index)),
                size: details.len,
            })
            .collect();

        Ok(files)
    }
}

impl Shared {
    /// Find a torrent by hash.
    fn find_torrent(&self, hash: &str) -> Option<Arc<ManagedTorrent>> {
        self.session.with_torrents(|iter| {
            for (_, torrent) in iter {
                if LibrqbitSwarmClient::format_hash(&torrent.info_hash()) == hash {
                    return Some(torrent.clone());
                }
            }
            None
        })
    }

    async fn delete_torrent(&self, torrent: &ManagedTorrent) -> Result<(), SwarmError> {
        self.session
            .delete(torrent.id().into(), true)
            .await
            .map_err(|e| SwarmError::Internal(format!("Failed to remove torrent: {}", e)))
    }

    /// Give back a pending join, discarding its torrent if nothing else
    /// holds the hash.
    async fn abandon(&self, hash: &str) {
        let mut claims = self.claims.lock().await;
        if !claims.abandon(hash) {
            debug!(hash = %hash, "Abandoned join; swarm still claimed");
            return;
        }
        if let Some(torrent) = self.find_torrent(hash) {
            debug!(hash = %hash, "Discarding torrent of an abandoned join");
            if let Err(e) = self.delete_torrent(&torrent).await {
                warn!(hash = %hash, error = %e, "Failed to discard torrent");
            }
        }
    }

    async fn release(&self, hash: &str) -> Result<(), SwarmError> {
        let mut claims = self.claims.lock().await;
        if !claims.release(hash) {
            debug!(hash = %hash, "Swarm still in use");
            return Ok(());
        }

        if let Some(torrent) = self.find_torrent(hash) {
            self.delete_torrent(&torrent).await?;
        }

        debug!(hash = %hash, "Torrent removed with partial data");
        Ok(())
    }
}

#[async_trait]
impl SwarmClient for LibrqbitSwarmClient {
    fn name(&self) -> &str {
        "librqbit"
    }

    async fn join(
        &self,
        reference: &SwarmReference,
        timeout: Duration,
    ) -> Result<SwarmMembership, SwarmError> {
        let hash = reference.info_hash().to_string();
        let magnet = reference.to_magnet_uri();
        let started = Instant::now();

        // Claimed before the torrent exists so no other request can delete
        // it between add and commit.
        let claim = JoinClaim::begin(&self.shared, &hash).await;

        let opts = Some(AddTorrentOptions {
            overwrite: true,
            ..Default::default()
        });

        // Bounded wait for metadata; DHT lookup can take forever for rare torrents
        let add_future = self
            .shared
            .session
            .add_torrent(RqbitAddTorrent::from_url(&magnet), opts);
        let response = match tokio::time::timeout(timeout, add_future).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                SWARM_JOINS.with_label_values(&["failed"]).inc();
                return Err(SwarmError::JoinFailed(format!("Failed to add torrent: {}", e)));
            }
            Err(_) => {
                SWARM_JOINS.with_label_values(&["timeout"]).inc();
                SWARM_JOIN_DURATION
                    .with_label_values(&["timeout"])
                    .observe(started.elapsed().as_secs_f64());
                return Err(SwarmError::JoinTimeout(timeout));
            }
        };

        let torrent = match response {
            AddTorrentResponse::Added(_, handle) => handle,
            AddTorrentResponse::AlreadyManaged(_, handle) => {
                debug!(hash = %hash, "Torrent already managed, sharing it");
                handle
            }
            AddTorrentResponse::ListOnly(_) => {
                // This shouldn't happen with our options, but handle it gracefully
                SWARM_JOINS.with_label_values(&["failed"]).inc();
                return Err(SwarmError::JoinFailed(
                    "Torrent was added in list-only mode".to_string(),
                ));
            }
        };

        let files = match Self::file_list(&torrent) {
            Ok(files) => files,
            Err(e) => {
                SWARM_JOINS.with_label_values(&["failed"]).inc();
                return Err(e);
            }
        };

        claim.commit().await;

        SWARM_JOINS.with_label_values(&["joined"]).inc();
        SWARM_JOIN_DURATION
            .with_label_values(&["joined"])
            .observe(started.elapsed().as_secs_f64());
        info!(
            hash = %hash,
            name = ?torrent.name(),
            files = files.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Joined swarm"
        );

        let handle = LibrqbitMembershipHandle {
            shared: self.shared.clone(),
            torrent,
            hash,
        };

        Ok(SwarmMembership::new(
            reference.clone(),
            files,
            Arc::new(handle),
        ))
    }

    async fn active_count(&self) -> usize {
        self.shared.claims.lock().await.open_count()
    }
}

/// Backend handle for one librqbit membership.
struct LibrqbitMembershipHandle {
    shared: Arc<Shared>,
    torrent: Arc<ManagedTorrent>,
    hash: String,
}

#[async_trait]
impl SwarmHandle for LibrqbitMembershipHandle {
    async fn open_file(&self, index: usize, offset: u64) -> Result<FileReader, SwarmError> {
        let mut stream = self
            .torrent
            .clone()
            .stream(index)
            .map_err(|e| SwarmError::ReadFailed(format!("Failed to open file stream: {}", e)))?;

        if offset > 0 {
            stream
                .seek(SeekFrom::Start(offset))
                .await
                .map_err(|e| {
                    SwarmError::ReadFailed(format!("Failed to seek to {}: {}", offset, e))
                })?;
        }

        Ok(Box::new(stream))
    }

    async fn release(&self) -> Result<(), SwarmError> {
        self.shared.release(&self.hash).await
    }
}
