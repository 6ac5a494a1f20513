//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, enabling E2E testing of the addon
//! endpoints without network access.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use espada_core::{
    testing::{MockPageFetcher, MockSwarmClient},
    CatalogSource, Config, ContentResolver, PageFetcher, SiteCatalog, StreamService,
    StreamSettings, SwarmClient, BASELINE_TRACKERS, DEFAULT_EXTENSIONS,
};

/// Re-export fixtures for test convenience
pub use espada_core::testing::fixtures;

pub const LISTING_URL: &str = "https://www.hackstore.to/peliculas-latino/page/1/";
pub const PUBLIC_URL: &str = "http://addon.test:7000";

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Remote site pages (MockPageFetcher)
/// - BitTorrent swarms (MockSwarmClient)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_manifest() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.get("/manifest.json").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock fetcher - serve listing and detail pages
    pub fetcher: Arc<MockPageFetcher>,
    /// Mock swarm client - configure swarm contents
    pub swarm: Arc<MockSwarmClient>,
}

/// Response from a JSON test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Response from a raw test request
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        let fetcher = Arc::new(MockPageFetcher::new());
        let swarm = Arc::new(MockSwarmClient::new());

        let mut config = Config::default();
        config.server.public_url = PUBLIC_URL.to_string();
        config.source.listing_url = LISTING_URL.to_string();

        let catalog = SiteCatalog::new(fetcher.clone() as Arc<dyn PageFetcher>, LISTING_URL)
            .expect("Failed to create catalog");
        let resolver = ContentResolver::new(
            fetcher.clone() as Arc<dyn PageFetcher>,
            BASELINE_TRACKERS.iter().map(|t| t.to_string()).collect(),
        );
        let streams = StreamService::new(
            resolver,
            swarm.clone() as Arc<dyn SwarmClient>,
            StreamSettings {
                join_timeout: Duration::from_millis(100),
                chunk_size: 16,
                extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            },
        );

        let state = Arc::new(espada_server::state::AppState::new(
            config,
            Arc::new(catalog) as Arc<dyn CatalogSource>,
            streams,
        ));

        let router = espada_server::api::create_router(state);

        Self {
            router,
            fetcher,
            swarm,
        }
    }

    /// Serve a listing page with the given `(title, detail_url)` items.
    pub async fn set_listing(&self, items: &[(&str, &str)]) {
        self.fetcher
            .set_page(LISTING_URL, fixtures::listing_page(items))
            .await;
    }

    /// Serve a detail page carrying one magnet per info hash.
    pub async fn set_detail_page(&self, url: &str, info_hashes: &[&str]) {
        let magnets: Vec<String> = info_hashes.iter().map(|h| fixtures::magnet(h)).collect();
        let magnets: Vec<&str> = magnets.iter().map(String::as_str).collect();
        self.fetcher
            .set_page(url, fixtures::detail_page(&magnets))
            .await;
    }

    /// Send a GET request and parse the body as JSON.
    pub async fn get(&self, path: &str) -> TestResponse {
        let raw = self.get_raw(path).await;
        let body: Value = if raw.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&raw.body).unwrap_or(Value::Null)
        };
        TestResponse {
            status: raw.status,
            body,
        }
    }

    /// Send a GET request and collect the whole body.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        self.get_raw_with(path, &[]).await
    }

    /// Send a GET request with extra headers and collect the whole body.
    pub async fn get_raw_with(&self, path: &str, headers: &[(&str, &str)]) -> RawResponse {
        let response = self.send_with(path, headers).await;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        RawResponse {
            status,
            headers,
            body,
        }
    }

    /// Send a GET request and hand back the response with its body unread.
    pub async fn send(&self, path: &str) -> Response {
        self.send_with(path, &[]).await
    }

    /// Send a GET request with extra headers, body unread.
    pub async fn send_with(&self, path: &str, headers: &[(&str, &str)]) -> Response {
        let mut builder = Request::builder().method("GET").uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).unwrap();

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
