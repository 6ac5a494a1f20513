use std::sync::Arc;

use espada_core::{CatalogSource, Config, StreamService};

/// Shared application state
pub struct AppState {
    config: Config,
    catalog: Arc<dyn CatalogSource>,
    streams: StreamService,
}

impl AppState {
    pub fn new(config: Config, catalog: Arc<dyn CatalogSource>, streams: StreamService) -> Self {
        Self {
            config,
            catalog,
            streams,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &dyn CatalogSource {
        self.catalog.as_ref()
    }

    pub fn streams(&self) -> &StreamService {
        &self.streams
    }

    /// Absolute URL addon clients use to fetch the stream for `id`.
    pub fn stream_url(&self, id: &str) -> String {
        format!(
            "{}/stream/{}",
            self.config.server.public_url.trim_end_matches('/'),
            id
        )
    }
}
