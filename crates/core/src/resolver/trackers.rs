//! Baseline announce endpoints.

use crate::swarm::SwarmReference;

/// Default baseline tracker list.
///
/// Versioned configuration: `[trackers] baseline` in the config file replaces
/// it wholesale.
pub const BASELINE_TRACKERS: &[&str] = &[
    "udp://tracker.openbittorrent.com:80",
    "udp://tracker.opentrackr.org:1337",
    "udp://tracker.internetwarriors.net:1337",
    "udp://exodus.desync.com:6969",
    "udp://tracker.leechers-paradise.org:6969",
    "udp://tracker.coppersurfer.tk:6969",
    "udp://9.rarbg.to:2710",
    "udp://tracker.torrent.eu.org:451",
    "udp://opentracker.i2p.rocks:6969",
    "udp://tracker.moeking.me:6969",
    "wss://tracker.btorrent.xyz",
    "wss://tracker.openwebtorrent.com",
    "wss://tracker.fastcast.nz",
];

/// Append every baseline tracker the reference does not already carry.
///
/// Embedded trackers keep their position; missing baseline entries follow in
/// baseline order. Returns the number of trackers added.
pub fn augment_trackers(reference: &mut SwarmReference, baseline: &[String]) -> usize {
    baseline
        .iter()
        .filter(|tracker| reference.add_tracker(tracker))
        .count()
}
