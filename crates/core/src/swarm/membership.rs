//! Swarm membership lifecycle and progressive reads.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{FileReader, SwarmError, SwarmFile, SwarmHandle, SwarmReference};
use crate::metrics::ACTIVE_MEMBERSHIPS;

/// An open swarm together with its file metadata.
///
/// Cloning is cheap and every clone refers to the same membership. Closing
/// happens once: the first `leave` (or `close`) wins, later calls are no-ops.
/// Once closed, new and in-flight reads fail with
/// [`SwarmError::MembershipClosed`]. If every clone is dropped without an
/// explicit `leave`, the backend is still released.
#[derive(Clone)]
pub struct SwarmMembership {
    inner: Arc<MembershipInner>,
}

struct MembershipInner {
    reference: SwarmReference,
    files: Vec<SwarmFile>,
    joined_at: DateTime<Utc>,
    handle: Arc<dyn SwarmHandle>,
    closed: watch::Sender<bool>,
}

impl SwarmMembership {
    /// Wrap a backend handle. Called by `SwarmClient` implementations once
    /// metadata is known.
    pub fn new(
        reference: SwarmReference,
        files: Vec<SwarmFile>,
        handle: Arc<dyn SwarmHandle>,
    ) -> Self {
        let (closed, _) = watch::channel(false);
        ACTIVE_MEMBERSHIPS.inc();

        Self {
            inner: Arc::new(MembershipInner {
                reference,
                files,
                joined_at: Utc::now(),
                handle,
                closed,
            }),
        }
    }

    /// Reference this membership was joined with.
    pub fn reference(&self) -> &SwarmReference {
        &self.inner.reference
    }

    /// Info hash of the swarm.
    pub fn info_hash(&self) -> &str {
        self.inner.reference.info_hash()
    }

    /// Files in metadata order.
    pub fn files(&self) -> &[SwarmFile] {
        &self.inner.files
    }

    /// When the membership was created.
    pub fn joined_at(&self) -> DateTime<Utc> {
        self.inner.joined_at
    }

    /// Whether the membership has been closed.
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Open a progressive reader over `file`, starting at offset 0.
    pub async fn open_reader(&self, file: &SwarmFile) -> Result<ProgressiveReader, SwarmError> {
        self.open_reader_at(file, 0).await
    }

    /// Open a progressive reader over `file`, starting at byte `offset`.
    ///
    /// An offset equal to the file size yields a reader that is already at
    /// end of file.
    pub async fn open_reader_at(
        &self,
        file: &SwarmFile,
        offset: u64,
    ) -> Result<ProgressiveReader, SwarmError> {
        if self.is_closed() {
            return Err(SwarmError::MembershipClosed);
        }
        let size = self
            .inner
            .files
            .iter()
            .find(|f| f.index == file.index)
            .map(|f| f.size)
            .ok_or(SwarmError::FileNotFound(file.index))?;
        if offset > size {
            return Err(SwarmError::OffsetOutOfRange { offset, size });
        }

        let reader = self.inner.handle.open_file(file.index, offset).await?;

        Ok(ProgressiveReader {
            reader,
            closed: self.inner.closed.subscribe(),
            position: offset,
        })
    }

    /// Mark the membership closed without waiting for the backend.
    ///
    /// Returns `true` for the call that actually closed it. Pending reads
    /// wake up with `MembershipClosed` right away.
    pub fn close(&self) -> bool {
        self.inner.close()
    }

    /// Close the membership and release its backend resources.
    ///
    /// Idempotent and safe to call while reads are in flight.
    pub async fn leave(&self) {
        if self.close() {
            release(self.inner.handle.clone(), self.info_hash().to_string()).await;
        }
    }

    /// Close now and release on a background task.
    ///
    /// Used from `Drop` implementations where awaiting is not possible.
    pub fn leave_in_background(&self) {
        if self.close() {
            self.inner.spawn_release();
        }
    }
}

impl std::fmt::Debug for SwarmMembership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwarmMembership")
            .field("info_hash", &self.info_hash())
            .field("files", &self.inner.files.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl MembershipInner {
    fn close(&self) -> bool {
        let closed_now = self.closed.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        });
        if closed_now {
            ACTIVE_MEMBERSHIPS.dec();
            debug!(info_hash = %self.reference.info_hash(), "Swarm membership closed");
        }
        closed_now
    }

    fn spawn_release(&self) {
        let handle = self.handle.clone();
        let info_hash = self.reference.info_hash().to_string();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(release(handle, info_hash));
            }
            Err(_) => {
                warn!(info_hash = %info_hash, "No runtime available to release swarm");
            }
        }
    }
}

impl Drop for MembershipInner {
    fn drop(&mut self) {
        if self.close() {
            warn!(
                info_hash = %self.reference.info_hash(),
                "Swarm membership dropped without leave; releasing"
            );
            self.spawn_release();
        }
    }
}

async fn release(handle: Arc<dyn SwarmHandle>, info_hash: String) {
    match handle.release().await {
        Ok(()) => debug!(info_hash = %info_hash, "Swarm released"),
        Err(e) => warn!(info_hash = %info_hash, error = %e, "Failed to release swarm"),
    }
}

/// Sequential reader over one file of a membership.
pub struct ProgressiveReader {
    reader: FileReader,
    closed: watch::Receiver<bool>,
    position: u64,
}

impl ProgressiveReader {
    /// Read the next chunk of at most `max_len` bytes.
    ///
    /// Suspends until the swarm has the bytes. An empty chunk means end of
    /// file. Fails with `MembershipClosed` as soon as the membership closes,
    /// including while suspended.
    pub async fn read_chunk(&mut self, max_len: usize) -> Result<Bytes, SwarmError> {
        if *self.closed.borrow() {
            return Err(SwarmError::MembershipClosed);
        }

        let mut buf = BytesMut::zeroed(max_len.max(1));

        tokio::select! {
            biased;
            _ = self.closed.wait_for(|closed| *closed) => Err(SwarmError::MembershipClosed),
            read = self.reader.read(&mut buf) => {
                let n = read.map_err(|e| SwarmError::ReadFailed(e.to_string()))?;
                buf.truncate(n);
                self.position += n as u64;
                Ok(buf.freeze())
            }
        }
    }

    /// Offset of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.position
    }
}
