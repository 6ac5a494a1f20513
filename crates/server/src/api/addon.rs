//! Addon protocol handlers: manifest, catalog and stream listings.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use espada_core::{build_manifest, codec, search, Manifest, MetaPreview, CATALOG_ID, CATALOG_TYPE};

use super::ErrorResponse;
use crate::metrics::CATALOG_REQUESTS;
use crate::state::AppState;

const JSON_SUFFIX: &str = ".json";
const STREAM_TITLE: &str = "Hackstore Espada";

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub metas: Vec<MetaPreview>,
}

#[derive(Debug, Serialize)]
pub struct StreamListResponse {
    pub streams: Vec<StreamLink>,
}

#[derive(Debug, Serialize)]
pub struct StreamLink {
    pub title: String,
    pub url: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /manifest.json
pub async fn manifest() -> Json<Manifest> {
    Json(build_manifest())
}

/// GET /catalog/{type}/{id}.json
pub async fn catalog(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CatalogResponse>, (StatusCode, Json<ErrorResponse>)> {
    list_catalog(&state, &kind, strip_json(&id), query.search).await
}

/// GET /catalog/{type}/{id}/{extra}.json
///
/// `extra` is the addon protocol's `key=value&key=value` segment.
pub async fn catalog_with_extra(
    State(state): State<Arc<AppState>>,
    Path((kind, id, extra)): Path<(String, String, String)>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CatalogResponse>, (StatusCode, Json<ErrorResponse>)> {
    let mut extra = parse_extra(strip_json(&extra));
    let search = extra.remove("search").or(query.search);
    list_catalog(&state, &kind, strip_json(&id), search).await
}

async fn list_catalog(
    state: &AppState,
    kind: &str,
    id: &str,
    search_query: Option<String>,
) -> Result<Json<CatalogResponse>, (StatusCode, Json<ErrorResponse>)> {
    if kind != CATALOG_TYPE || id != CATALOG_ID {
        debug!(kind = kind, id = id, "Unknown catalog requested");
        CATALOG_REQUESTS.with_label_values(&["unknown_catalog"]).inc();
        return Ok(Json(CatalogResponse { metas: Vec::new() }));
    }

    let entries = match state.catalog().list(1).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Failed to list catalog");
            CATALOG_REQUESTS.with_label_values(&["failed"]).inc();
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Catalog unavailable".to_string(),
                }),
            ));
        }
    };

    let entries = match search_query.as_deref() {
        Some(q) => {
            CATALOG_REQUESTS.with_label_values(&["search"]).inc();
            search(entries, q)
        }
        None => {
            CATALOG_REQUESTS.with_label_values(&["ok"]).inc();
            entries
        }
    };

    Ok(Json(CatalogResponse {
        metas: entries.iter().map(|e| e.to_meta_preview()).collect(),
    }))
}

/// GET /stream/{type}/{id}.json
///
/// Lists one stream pointing at this server's relay endpoint. Identifiers
/// this addon did not publish get an empty list.
pub async fn stream_list(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
) -> Json<StreamListResponse> {
    let id = strip_json(&id);
    if kind != CATALOG_TYPE || codec::decode(id).is_err() {
        debug!(kind = %kind, id = %id, "Not one of our identifiers");
        return Json(StreamListResponse {
            streams: Vec::new(),
        });
    }

    Json(StreamListResponse {
        streams: vec![StreamLink {
            title: STREAM_TITLE.to_string(),
            url: state.stream_url(id),
        }],
    })
}

fn strip_json(segment: &str) -> &str {
    segment.strip_suffix(JSON_SUFFIX).unwrap_or(segment)
}

fn parse_extra(extra: &str) -> HashMap<String, String> {
    extra
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| {
            let value = urlencoding::decode(&value.replace('+', " "))
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            (key.to_string(), value)
        })
        .collect()
}
