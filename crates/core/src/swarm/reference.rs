//! Magnet-style swarm references.

use serde::{Deserialize, Serialize};

use super::SwarmError;

const MAGNET_PREFIX: &str = "magnet:?";
const BTIH_PREFIX: &str = "urn:btih:";

/// Content token plus announce endpoints for one swarm.
///
/// Built from a `magnet:?xt=urn:btih:` URI. The tracker list keeps insertion
/// order and never holds the same endpoint twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmReference {
    /// Info hash (lowercase hex).
    info_hash: String,
    /// Display name (`dn=`), if the magnet carried one.
    display_name: Option<String>,
    /// Announce endpoints, in order.
    trackers: Vec<String>,
}

impl SwarmReference {
    /// Parse a magnet URI.
    pub fn parse_magnet(uri: &str) -> Result<Self, SwarmError> {
        let query = uri
            .trim()
            .strip_prefix(MAGNET_PREFIX)
            .ok_or_else(|| SwarmError::InvalidReference(format!("not a magnet URI: {}", uri)))?;

        let mut info_hash = None;
        let mut display_name = None;
        let mut reference = Self {
            info_hash: String::new(),
            display_name: None,
            trackers: Vec::new(),
        };

        for pair in query.split('&') {
            let (key, value) = match pair.split_once('=') {
                Some(kv) => kv,
                None => continue,
            };
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());

            match key {
                "xt" if info_hash.is_none() => {
                    if let Some(hash) = value.strip_prefix(BTIH_PREFIX) {
                        info_hash = normalize_info_hash(hash);
                    }
                }
                "dn" => display_name = Some(value),
                "tr" => {
                    reference.add_tracker(&value);
                }
                _ => {}
            }
        }

        reference.info_hash = info_hash.ok_or_else(|| {
            SwarmError::InvalidReference(format!("no usable btih in magnet: {}", uri))
        })?;
        reference.display_name = display_name;

        Ok(reference)
    }

    /// Info hash (lowercase hex).
    pub fn info_hash(&self) -> &str {
        &self.info_hash
    }

    /// Display name advertised by the magnet.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Announce endpoints, in order.
    pub fn trackers(&self) -> &[String] {
        &self.trackers
    }

    /// Append a tracker unless it is already present.
    ///
    /// Returns `true` if the tracker was added.
    pub fn add_tracker(&mut self, tracker: &str) -> bool {
        let tracker = tracker.trim();
        if tracker.is_empty() || self.trackers.iter().any(|t| t == tracker) {
            return false;
        }
        self.trackers.push(tracker.to_string());
        true
    }

    /// Render back into a magnet URI carrying every tracker.
    pub fn to_magnet_uri(&self) -> String {
        let mut uri = format!("{}xt={}{}", MAGNET_PREFIX, BTIH_PREFIX, self.info_hash);
        if let Some(ref name) = self.display_name {
            uri.push_str("&dn=");
            uri.push_str(&urlencoding::encode(name));
        }
        for tracker in &self.trackers {
            uri.push_str("&tr=");
            uri.push_str(&urlencoding::encode(tracker));
        }
        uri
    }
}

/// Normalize a btih value to lowercase hex.
///
/// Accepts the 40-character hex form and the 32-character base32 form.
fn normalize_info_hash(hash: &str) -> Option<String> {
    match hash.len() {
        40 if hash.chars().all(|c| c.is_ascii_hexdigit()) => Some(hash.to_ascii_lowercase()),
        32 => base32_to_hex(hash),
        _ => None,
    }
}

fn base32_to_hex(input: &str) -> Option<String> {
    let mut bits: u64 = 0;
    let mut bit_count = 0;
    let mut out = String::with_capacity(40);

    for c in input.chars() {
        let value = match c.to_ascii_uppercase() {
            c @ 'A'..='Z' => c as u64 - 'A' as u64,
            c @ '2'..='7' => c as u64 - '2' as u64 + 26,
            _ => return None,
        };
        bits = (bits << 5) | value;
        bit_count += 5;
        if bit_count >= 8 {
            bit_count -= 8;
            out.push_str(&format!("{:02x}", (bits >> bit_count) & 0xff));
            bits &= (1u64 << bit_count) - 1;
        }
    }

    (out.len() == 40).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "c12fe1c06bba254a9dc9f519b335aa7c1367a88a";

    #[test]
    fn test_parse_magnet_basic() {
        let uri = format!(
            "magnet:?xt=urn:btih:{}&dn=Some%20Movie&tr=udp%3A%2F%2Ftracker.example.org%3A1337",
            HASH.to_uppercase()
        );
        let reference = SwarmReference::parse_magnet(&uri).unwrap();
        assert_eq!(reference.info_hash(), HASH);
        assert_eq!(reference.display_name(), Some("Some Movie"));
        assert_eq!(reference.trackers(), ["udp://tracker.example.org:1337"]);
    }

    #[test]
    fn test_parse_magnet_deduplicates_embedded_trackers() {
        let uri = format!(
            "magnet:?xt=urn:btih:{}&tr=udp%3A%2F%2Fa%3A1&tr=udp://a:1&tr=udp%3A%2F%2Fb%3A2",
            HASH
        );
        let reference = SwarmReference::parse_magnet(&uri).unwrap();
        assert_eq!(reference.trackers(), ["udp://a:1", "udp://b:2"]);
    }

    #[test]
    fn test_parse_magnet_base32_hash() {
        // base32 of 20 zero bytes
        let uri = "magnet:?xt=urn:btih:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
        let reference = SwarmReference::parse_magnet(uri).unwrap();
        assert_eq!(reference.info_hash(), "0".repeat(40));
    }

    #[test]
    fn test_parse_rejects_non_magnet() {
        assert!(SwarmReference::parse_magnet("https://example.com").is_err());
    }

    #[test]
    fn test_parse_rejects_missing_hash() {
        assert!(SwarmReference::parse_magnet("magnet:?dn=nothing").is_err());
        assert!(SwarmReference::parse_magnet("magnet:?xt=urn:btih:short").is_err());
    }

    #[test]
    fn test_to_magnet_uri_reparses() {
        let uri = format!("magnet:?xt=urn:btih:{}&dn=A%20B", HASH);
        let mut reference = SwarmReference::parse_magnet(&uri).unwrap();
        reference.add_tracker("wss://tracker.openwebtorrent.com");

        let rendered = reference.to_magnet_uri();
        assert!(rendered.contains("tr=wss%3A%2F%2Ftracker.openwebtorrent.com"));
        assert_eq!(SwarmReference::parse_magnet(&rendered).unwrap(), reference);
    }

    #[test]
    fn test_add_tracker_ignores_blank_and_duplicates() {
        let mut reference =
            SwarmReference::parse_magnet(&format!("magnet:?xt=urn:btih:{}", HASH)).unwrap();
        assert!(reference.add_tracker("udp://x:1"));
        assert!(!reference.add_tracker(" udp://x:1 "));
        assert!(!reference.add_tracker(""));
        assert_eq!(reference.trackers().len(), 1);
    }
}
