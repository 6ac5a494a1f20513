pub mod catalog;
pub mod codec;
pub mod config;
pub mod fetcher;
mod html;
pub mod metrics;
pub mod relay;
pub mod resolver;
pub mod selector;
pub mod streaming;
pub mod swarm;
pub mod testing;

pub use catalog::{
    build_manifest, search, CatalogEntry, CatalogError, CatalogSource, ListingScraper, Manifest,
    MetaPreview, SiteCatalog, CATALOG_ID, CATALOG_TYPE,
};
pub use codec::{CodecError, ID_PREFIX};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ServerConfig,
    SourceConfig, StreamConfig, SwarmConfig, TrackersConfig,
};
pub use fetcher::{FetchError, HttpPageFetcher, PageFetcher};
pub use relay::{relay, ByteRange, RelayError, RelayStream};
pub use resolver::{
    augment_trackers, ContentResolver, MagnetLinkExtractor, ReferenceExtractor, ResolutionError,
    BASELINE_TRACKERS,
};
pub use selector::{FileSelector, SelectionError, DEFAULT_EXTENSIONS};
pub use streaming::{StreamError, StreamService, StreamSettings};
pub use swarm::{
    LibrqbitSwarmClient, ProgressiveReader, SwarmClient, SwarmError, SwarmFile, SwarmHandle,
    SwarmMembership, SwarmReference,
};
