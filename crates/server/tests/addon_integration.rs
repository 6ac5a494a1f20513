//! Addon protocol endpoint tests: manifest, catalog, stream listings.

mod common;

use axum::http::StatusCode;
use common::{TestFixture, PUBLIC_URL};
use espada_core::codec;
use espada_core::fetcher::FetchError;

const DUNE: &str = "https://www.hackstore.to/dune-2021-tt1160419/";
const DUNA: &str = "https://www.hackstore.to/duna-roja-tt0000001/";
const MATRIX: &str = "https://www.hackstore.to/matrix-tt0133093/";

#[tokio::test]
async fn test_manifest() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/manifest.json").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["id"], "org.espada.hackstore");
    assert_eq!(response.body["resources"], serde_json::json!(["catalog", "stream"]));
    assert_eq!(response.body["catalogs"][0]["id"], "hackstore");
    assert_eq!(response.body["catalogs"][0]["extra"][0]["name"], "search");
    assert_eq!(response.body["idPrefixes"][0], "espada:");
}

#[tokio::test]
async fn test_catalog_lists_scraped_entries() {
    let fixture = TestFixture::new().await;
    fixture
        .set_listing(&[("Dune", DUNE), ("Matrix", MATRIX)])
        .await;

    let response = fixture.get("/catalog/movie/hackstore.json").await;

    assert_status!(response, StatusCode::OK);
    let metas = response.body["metas"].as_array().unwrap();
    assert_eq!(metas.len(), 2);
    assert_eq!(metas[0]["name"], "Dune");
    assert_eq!(metas[0]["type"], "movie");
    assert_eq!(metas[0]["id"], codec::encode(DUNE).as_str());
    assert!(metas[0]["poster"].as_str().unwrap().starts_with("https://"));
}

#[tokio::test]
async fn test_catalog_search_extra_segment() {
    let fixture = TestFixture::new().await;
    fixture
        .set_listing(&[("Dune", DUNE), ("Duna Roja", DUNA), ("Matrix", MATRIX)])
        .await;

    let response = fixture
        .get("/catalog/movie/hackstore/search=dun.json")
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["metas"].as_array().unwrap().len(), 2);

    let response = fixture
        .get("/catalog/movie/hackstore/search=MATRIX.json")
        .await;
    let metas = response.body["metas"].as_array().unwrap();
    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0]["name"], "Matrix");
}

#[tokio::test]
async fn test_catalog_search_query_parameter() {
    let fixture = TestFixture::new().await;
    fixture
        .set_listing(&[("Dune", DUNE), ("Duna Roja", DUNA)])
        .await;

    let response = fixture
        .get("/catalog/movie/hackstore.json?search=duna%20roja")
        .await;
    assert_status!(response, StatusCode::OK);
    let metas = response.body["metas"].as_array().unwrap();
    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0]["name"], "Duna Roja");
}

#[tokio::test]
async fn test_unknown_catalog_is_empty() {
    let fixture = TestFixture::new().await;
    fixture.set_listing(&[("Dune", DUNE)]).await;

    let response = fixture.get("/catalog/movie/other.json").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["metas"], serde_json::json!([]));

    let response = fixture.get("/catalog/series/hackstore.json").await;
    assert_eq!(response.body["metas"], serde_json::json!([]));

    // The listing was never fetched for unknown catalogs.
    assert!(fixture.fetcher.requested_urls().await.is_empty());
}

#[tokio::test]
async fn test_catalog_unavailable() {
    let fixture = TestFixture::new().await;
    fixture.set_listing(&[("Dune", DUNE)]).await;
    fixture.fetcher.set_next_error(FetchError::Timeout).await;

    let response = fixture.get("/catalog/movie/hackstore.json").await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Catalog unavailable");
}

#[tokio::test]
async fn test_stream_listing_points_at_relay() {
    let fixture = TestFixture::new().await;
    let id = codec::encode(DUNE);

    let response = fixture.get(&format!("/stream/movie/{}.json", id)).await;

    assert_status!(response, StatusCode::OK);
    let streams = response.body["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 1);
    assert_eq!(
        streams[0]["url"],
        format!("{}/stream/{}", PUBLIC_URL, id).as_str()
    );
    assert!(streams[0]["title"].as_str().is_some());

    // Listing a stream does no remote work.
    assert!(fixture.fetcher.requested_urls().await.is_empty());
    assert!(fixture.swarm.joins().await.is_empty());
}

#[tokio::test]
async fn test_stream_listing_ignores_foreign_ids() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/stream/movie/tt0133093.json").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["streams"], serde_json::json!([]));
}

#[tokio::test]
async fn test_health_and_metrics() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["swarm_backend"], "mock");
    assert_eq!(response.body["active_swarms"], 0);

    let raw = fixture.get_raw("/metrics").await;
    assert_eq!(raw.status, StatusCode::OK);
    let text = String::from_utf8(raw.body.to_vec()).unwrap();
    assert!(text.contains("espada_http_requests_total"));
}

#[tokio::test]
async fn test_cors_headers() {
    let fixture = TestFixture::new().await;
    let raw = fixture.get_raw("/manifest.json").await;
    assert_eq!(
        raw.headers
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
