//! Stream relay endpoint tests.
//!
//! Cover the failure reasons reported to addon clients and the release of
//! swarm memberships once a client stops reading.

mod common;

use std::time::Duration;

use axum::http::{header, StatusCode};
use http_body_util::BodyExt;

use common::TestFixture;
use espada_core::{codec, SwarmClient};

const PAGE: &str = "https://www.hackstore.to/pelicula-gratis-latino-tt1234567/";
const HASH: &str = "c12fe1c06bba254a9dc9f519b335aa7c1367a88a";

fn stream_path() -> String {
    format!("/stream/{}", codec::encode(PAGE))
}

#[tokio::test]
async fn test_stream_success_relays_movie() {
    let fixture = TestFixture::new().await;
    fixture.set_detail_page(PAGE, &[HASH]).await;
    let movie: Vec<u8> = (0..200u8).collect();
    fixture
        .swarm
        .add_swarm(
            HASH,
            vec![
                ("Pelicula/LEEME.txt", b"gracias por descargar".to_vec()),
                ("Pelicula/movie.mkv", movie.clone()),
            ],
        )
        .await;

    let raw = fixture.get_raw(&stream_path()).await;

    assert_eq!(raw.status, StatusCode::OK);
    let disposition = raw.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("movie.mkv"));
    assert_eq!(disposition, "inline; filename=\"movie.mkv\"");
    assert_eq!(raw.headers[header::CONTENT_LENGTH], "200");
    assert!(raw.headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("video/"));
    assert_eq!(raw.headers[header::ACCEPT_RANGES], "bytes");
    assert!(raw.headers.get(header::CONTENT_RANGE).is_none());
    assert!(!raw.body.is_empty());
    assert_eq!(raw.body.to_vec(), movie);

    assert!(
        fixture
            .swarm
            .wait_for_releases(1, Duration::from_secs(1))
            .await
    );
}

#[tokio::test]
async fn test_client_disconnect_releases_membership() {
    let fixture = TestFixture::new().await;
    fixture.set_detail_page(PAGE, &[HASH]).await;
    fixture
        .swarm
        .add_stalled_swarm(HASH, vec![("movie.mkv", vec![9u8; 64])])
        .await;

    let response = fixture.send(&stream_path()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body();
    let frame = body
        .frame()
        .await
        .expect("body ended early")
        .expect("frame error");
    assert_eq!(frame.into_data().unwrap().len(), 16);
    assert_eq!(fixture.swarm.active_count().await, 1);

    // Client hangs up.
    drop(body);

    assert!(
        fixture
            .swarm
            .wait_for_releases(1, Duration::from_secs(1))
            .await,
        "membership was not released after disconnect"
    );
    assert_eq!(fixture.swarm.active_count().await, 0);
}

#[tokio::test]
async fn test_stream_magnet_not_found() {
    let fixture = TestFixture::new().await;
    fixture.set_detail_page(PAGE, &[]).await;

    let response = fixture.get(&stream_path()).await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Magnet not found");
    assert!(fixture.swarm.joins().await.is_empty());
}

#[tokio::test]
async fn test_stream_no_playable_file() {
    let fixture = TestFixture::new().await;
    fixture.set_detail_page(PAGE, &[HASH]).await;
    fixture
        .swarm
        .add_swarm(
            HASH,
            vec![
                ("movie.txt", b"text".to_vec()),
                ("movie.nfo", b"info".to_vec()),
            ],
        )
        .await;

    let response = fixture.get(&stream_path()).await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "No playable file");
    assert_eq!(fixture.swarm.released().await, vec![HASH.to_string()]);
}

#[tokio::test]
async fn test_stream_remote_page_missing() {
    let fixture = TestFixture::new().await;

    let response = fixture.get(&stream_path()).await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Not found in catalog");
}

#[tokio::test]
async fn test_stream_malformed_identifier() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/stream/tt1234567").await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Not found in catalog");
    assert!(fixture.fetcher.requested_urls().await.is_empty());
}

#[tokio::test]
async fn test_stream_swarm_timeout() {
    let fixture = TestFixture::new().await;
    fixture.set_detail_page(PAGE, &[HASH]).await;

    let response = fixture.get(&stream_path()).await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Swarm unavailable");
    assert_eq!(fixture.swarm.active_count().await, 0);
}

#[tokio::test]
async fn test_stream_uses_first_magnet_with_baseline_trackers() {
    let fixture = TestFixture::new().await;
    let other = "08ada5a7a6183aae1e09d831df6748d566095a10";
    fixture.set_detail_page(PAGE, &[HASH, other]).await;
    fixture
        .swarm
        .add_swarm(HASH, vec![("movie.mp4", vec![1u8; 8])])
        .await;

    let raw = fixture.get_raw(&stream_path()).await;
    assert_eq!(raw.status, StatusCode::OK);

    let joins = fixture.swarm.joins().await;
    assert_eq!(joins.len(), 1);
    assert_eq!(joins[0].reference.info_hash(), HASH);
    assert_eq!(
        joins[0].reference.trackers().len(),
        espada_core::BASELINE_TRACKERS.len()
    );
}

#[tokio::test]
async fn test_stream_range_returns_partial_content() {
    let fixture = TestFixture::new().await;
    fixture.set_detail_page(PAGE, &[HASH]).await;
    let movie: Vec<u8> = (0..200u8).collect();
    fixture
        .swarm
        .add_swarm(HASH, vec![("movie.mkv", movie.clone())])
        .await;

    let raw = fixture
        .get_raw_with(&stream_path(), &[("range", "bytes=100-")])
        .await;

    assert_eq!(raw.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(raw.headers[header::ACCEPT_RANGES], "bytes");
    assert_eq!(raw.headers[header::CONTENT_RANGE], "bytes 100-199/200");
    assert_eq!(raw.headers[header::CONTENT_LENGTH], "100");
    assert_eq!(raw.body.len(), 100);
    assert_eq!(raw.body[0], 100);
    assert_eq!(raw.body.to_vec(), movie[100..].to_vec());
    assert_eq!(fixture.swarm.opened().await[0].offset, 100);
}

#[tokio::test]
async fn test_stream_bounded_range() {
    let fixture = TestFixture::new().await;
    fixture.set_detail_page(PAGE, &[HASH]).await;
    let movie: Vec<u8> = (0..200u8).collect();
    fixture
        .swarm
        .add_swarm(HASH, vec![("movie.mkv", movie.clone())])
        .await;

    let raw = fixture
        .get_raw_with(&stream_path(), &[("range", "bytes=10-19")])
        .await;

    assert_eq!(raw.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(raw.headers[header::CONTENT_RANGE], "bytes 10-19/200");
    assert_eq!(raw.body.to_vec(), movie[10..20].to_vec());
    assert!(
        fixture
            .swarm
            .wait_for_releases(1, Duration::from_secs(1))
            .await
    );
}

#[tokio::test]
async fn test_stream_unsatisfiable_range() {
    let fixture = TestFixture::new().await;
    fixture.set_detail_page(PAGE, &[HASH]).await;
    fixture
        .swarm
        .add_swarm(HASH, vec![("movie.mkv", vec![0u8; 200])])
        .await;

    let raw = fixture
        .get_raw_with(&stream_path(), &[("range", "bytes=500-")])
        .await;

    assert_eq!(raw.status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(raw.headers[header::CONTENT_RANGE], "bytes */200");
    let body: serde_json::Value = serde_json::from_slice(&raw.body).unwrap();
    assert_eq!(body["error"], "Range not satisfiable");
    assert_eq!(fixture.swarm.released().await, vec![HASH.to_string()]);
    assert_eq!(fixture.swarm.active_count().await, 0);
}

#[tokio::test]
async fn test_stream_ignores_multi_range() {
    let fixture = TestFixture::new().await;
    fixture.set_detail_page(PAGE, &[HASH]).await;
    fixture
        .swarm
        .add_swarm(HASH, vec![("movie.mkv", vec![5u8; 40])])
        .await;

    let raw = fixture
        .get_raw_with(&stream_path(), &[("range", "bytes=0-1,5-9")])
        .await;

    assert_eq!(raw.status, StatusCode::OK);
    assert_eq!(raw.headers[header::CONTENT_LENGTH], "40");
    assert_eq!(raw.body.len(), 40);
}
