//! Progressive HTTP relay of a swarm file.
//!
//! A relay turns one file of a membership, or a byte range of it, into a byte
//! stream suitable for an HTTP response body. Chunks are only read from the
//! swarm when the transport polls for them. The relay owns the membership's
//! teardown: end of file, a read error, or dropping the stream all close it
//! exactly once.

use std::io;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::metrics::{BYTES_RELAYED, RELAYS_FINISHED};
use crate::swarm::{ProgressiveReader, SwarmError, SwarmFile, SwarmMembership};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors that can occur while starting a relay.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    #[error("Failed to open {file}: {source}")]
    Open { file: String, source: SwarmError },

    #[error("Requested range is outside a {size}-byte file")]
    RangeNotSatisfiable { size: u64 },
}

/// Inclusive byte range of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered.
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Parse an HTTP `Range` header against a file of `size` bytes.
    ///
    /// Handles a single `bytes=` range in its `a-b`, `a-` and `-n` forms.
    /// Anything else (other units, several ranges, malformed values) yields
    /// `Ok(None)` and the whole file is served. A well-formed range that
    /// starts past the end of the file is an error.
    pub fn parse(header: &str, size: u64) -> Result<Option<Self>, RelayError> {
        let Some(ranges) = header.trim().strip_prefix("bytes=") else {
            return Ok(None);
        };
        if ranges.contains(',') {
            return Ok(None);
        }
        let Some((start, end)) = ranges.trim().split_once('-') else {
            return Ok(None);
        };

        if start.is_empty() {
            // Suffix range: the last `n` bytes.
            let Ok(suffix) = end.parse::<u64>() else {
                return Ok(None);
            };
            if suffix == 0 || size == 0 {
                return Err(RelayError::RangeNotSatisfiable { size });
            }
            return Ok(Some(Self {
                start: size.saturating_sub(suffix),
                end: size - 1,
            }));
        }

        let Ok(start) = start.parse::<u64>() else {
            return Ok(None);
        };
        let end = if end.is_empty() {
            None
        } else {
            match end.parse::<u64>() {
                Ok(end) if end >= start => Some(end),
                _ => return Ok(None),
            }
        };

        if start >= size {
            return Err(RelayError::RangeNotSatisfiable { size });
        }
        Ok(Some(Self {
            start,
            end: end.map_or(size - 1, |end| end.min(size - 1)),
        }))
    }
}

/// A file being relayed: response metadata plus the body stream.
pub struct RelayStream {
    session_id: Uuid,
    file_name: String,
    content_type: String,
    total_size: u64,
    range: Option<ByteRange>,
    body: BoxStream<'static, io::Result<Bytes>>,
}

impl RelayStream {
    /// Identifier of this relay in logs.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Base name of the relayed file.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// MIME type guessed from the file extension.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Number of bytes the body carries.
    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.total_size, |range| range.content_length())
    }

    /// Size of the whole file in bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// The relayed range, if only part of the file is sent.
    pub fn range(&self) -> Option<ByteRange> {
        self.range
    }

    /// `Content-Range` header value for a partial relay.
    pub fn content_range(&self) -> Option<String> {
        self.range
            .map(|range| format!("bytes {}-{}/{}", range.start, range.end, self.total_size))
    }

    /// `Content-Disposition` header value naming the file.
    pub fn content_disposition(&self) -> String {
        content_disposition(&self.file_name)
    }

    /// Consume the relay, yielding its body.
    ///
    /// Read failures surface as an `Err` item so the transport aborts the
    /// response instead of ending it cleanly.
    pub fn into_body(self) -> BoxStream<'static, io::Result<Bytes>> {
        self.body
    }
}

impl std::fmt::Debug for RelayStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayStream")
            .field("session_id", &self.session_id)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("total_size", &self.total_size)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

/// Start relaying `file` out of `membership` in chunks of `chunk_size`.
///
/// With a `range`, only those bytes are sent, starting with a seek to
/// `range.start`. Takes over the membership: it is left when the returned
/// stream ends or is dropped, and also when opening the file fails.
pub async fn relay(
    membership: SwarmMembership,
    file: &SwarmFile,
    range: Option<ByteRange>,
    chunk_size: usize,
) -> Result<RelayStream, RelayError> {
    let session_id = Uuid::new_v4();
    let offset = range.map_or(0, |range| range.start);
    let span = info_span!(
        "relay",
        session_id = %session_id,
        info_hash = %membership.info_hash(),
        file = %file.name,
        offset = offset,
    );

    let mut guard = MembershipGuard::new(membership, span.clone());
    let reader = match guard.membership.open_reader_at(file, offset).await {
        Ok(reader) => reader,
        Err(source) => {
            guard.finish(Outcome::Failed);
            return Err(RelayError::Open {
                file: file.name.clone(),
                source,
            });
        }
    };

    let remaining = range.map_or(file.size, |range| range.content_length());
    span.in_scope(|| {
        info!(
            size = file.size,
            length = remaining,
            chunk_size = chunk_size,
            "Relay started"
        )
    });

    let state = RelayState {
        reader,
        guard,
        chunk_size: chunk_size.max(1),
        remaining,
        finished: false,
    };

    let body = stream::unfold(state, move |mut state| {
        let span = state.guard.span.clone();
        async move {
            if state.finished {
                return None;
            }
            if state.remaining == 0 {
                state.guard.finish(Outcome::Completed);
                return None;
            }
            let max_len = state.remaining.min(state.chunk_size as u64) as usize;
            match state.reader.read_chunk(max_len).await {
                Ok(chunk) if chunk.is_empty() => {
                    state.guard.finish(Outcome::Completed);
                    None
                }
                Ok(chunk) => {
                    BYTES_RELAYED.inc_by(chunk.len() as u64);
                    state.guard.bytes += chunk.len() as u64;
                    state.remaining = state.remaining.saturating_sub(chunk.len() as u64);
                    Some((Ok(chunk), state))
                }
                Err(e) => {
                    warn!(error = %e, position = state.reader.position(), "Relay read failed");
                    state.guard.finish(Outcome::Failed);
                    state.finished = true;
                    Some((Err(io::Error::other(e)), state))
                }
            }
        }
        .instrument(span)
    })
    .boxed();

    let file_name = file.file_name().to_string();
    Ok(RelayStream {
        session_id,
        content_type: guess_content_type(&file_name),
        file_name,
        total_size: file.size,
        range,
        body,
    })
}

/// `inline` disposition naming `file_name`.
///
/// Non-ASCII names get an RFC 5987 `filename*` next to an ASCII fallback.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '\'',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if file_name.is_ascii() {
        format!("inline; filename=\"{}\"", fallback)
    } else {
        format!(
            "inline; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(file_name)
        )
    }
}

fn guess_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

struct RelayState {
    reader: ProgressiveReader,
    guard: MembershipGuard,
    chunk_size: usize,
    /// Bytes still owed to the client.
    remaining: u64,
    finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Disconnected,
    Failed,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Disconnected => "disconnected",
            Outcome::Failed => "failed",
        }
    }
}

/// Leaves the membership once, whichever way the relay ends.
struct MembershipGuard {
    membership: SwarmMembership,
    span: Span,
    bytes: u64,
    outcome: Option<Outcome>,
}

impl MembershipGuard {
    fn new(membership: SwarmMembership, span: Span) -> Self {
        Self {
            membership,
            span,
            bytes: 0,
            outcome: None,
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        if self.outcome.is_some() {
            return;
        }
        self.outcome = Some(outcome);
        RELAYS_FINISHED.with_label_values(&[outcome.as_str()]).inc();
        self.span.in_scope(|| {
            info!(outcome = outcome.as_str(), bytes = self.bytes, "Relay finished");
        });
        self.membership.leave_in_background();
    }
}

impl Drop for MembershipGuard {
    fn drop(&mut self) {
        if self.outcome.is_none() {
            self.span
                .in_scope(|| debug!(bytes = self.bytes, "Relay dropped before end of file"));
            self.finish(Outcome::Disconnected);
        }
    }
}
