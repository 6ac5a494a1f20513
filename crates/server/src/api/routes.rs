use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{addon, handlers, middleware::metrics_middleware, stream};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Addon protocol
        .route("/manifest.json", get(addon::manifest))
        .route("/catalog/{type}/{id}", get(addon::catalog))
        .route("/catalog/{type}/{id}/{extra}", get(addon::catalog_with_extra))
        .route("/stream/{type}/{id}", get(addon::stream_list))
        // Relay
        .route("/stream/{id}", get(stream::relay_stream))
        // Operations
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
