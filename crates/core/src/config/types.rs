use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub swarm: SwarmConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub trackers: TrackersConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally reachable base URL, used to build stream URLs handed to
    /// addon clients.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    7000
}

fn default_public_url() -> String {
    "http://127.0.0.1:7000".to_string()
}

/// Scraped website configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Listing page scraped for catalog entries.
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds (default: 20)
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_source_timeout(),
        }
    }
}

fn default_listing_url() -> String {
    "https://www.hackstore.to/peliculas-latino/page/1/".to_string()
}

fn default_user_agent() -> String {
    concat!("espada/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_source_timeout() -> u32 {
    20
}

/// Embedded swarm client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwarmConfig {
    /// Scratch directory holding partial data of active streams.
    #[serde(default = "default_download_path")]
    pub download_path: PathBuf,
    #[serde(default = "default_true")]
    pub enable_dht: bool,
    /// Fixed TCP listen port (random when unset).
    #[serde(default)]
    pub listen_port: Option<u16>,
    /// Upper bound on waiting for swarm metadata (default: 60)
    #[serde(default = "default_join_timeout")]
    pub join_timeout_secs: u32,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            download_path: default_download_path(),
            enable_dht: true,
            listen_port: None,
            join_timeout_secs: default_join_timeout(),
        }
    }
}

fn default_download_path() -> PathBuf {
    std::env::temp_dir().join("espada")
}

fn default_true() -> bool {
    true
}

fn default_join_timeout() -> u32 {
    60
}

/// Stream relay configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Size of each relayed chunk in KiB (default: 64)
    #[serde(default = "default_chunk_size_kb")]
    pub chunk_size_kb: usize,
    /// Recognized playable extensions, in priority order.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size_kb: default_chunk_size_kb(),
            extensions: default_extensions(),
        }
    }
}

fn default_chunk_size_kb() -> usize {
    64
}

fn default_extensions() -> Vec<String> {
    crate::selector::DEFAULT_EXTENSIONS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

/// Baseline announce endpoints injected into every resolved reference
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackersConfig {
    #[serde(default = "default_baseline")]
    pub baseline: Vec<String>,
}

impl Default for TrackersConfig {
    fn default() -> Self {
        Self {
            baseline: default_baseline(),
        }
    }
}

fn default_baseline() -> Vec<String> {
    crate::resolver::BASELINE_TRACKERS
        .iter()
        .map(|t| t.to_string())
        .collect()
}
