//! Swarm client abstraction.
//!
//! This module provides a `SwarmClient` trait for joining BitTorrent swarms
//! and reading their files progressively, with an embedded librqbit backend.

mod librqbit;
mod membership;
mod reference;
mod types;

pub use librqbit::LibrqbitSwarmClient;
pub use membership::{ProgressiveReader, SwarmMembership};
pub use reference::SwarmReference;
pub use types::*;
