//! Stream relay handler.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use espada_core::{RelayError, StreamError};

use super::ErrorResponse;
use crate::state::AppState;

/// GET /stream/{id}
///
/// Resolves the identifier, joins the swarm and relays the selected file.
/// A single `Range` is answered with 206 and only those bytes. Failures
/// before the first byte are a 404 with a short reason (416 for a range past
/// the end of the file); a failure mid-transfer aborts the response.
pub async fn relay_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let range = headers.get(header::RANGE).and_then(|value| value.to_str().ok());

    let stream = match state.streams().open_range(&id, range).await {
        Ok(stream) => stream,
        Err(e) => return error_response(&id, e),
    };

    info!(
        session_id = %stream.session_id(),
        file = %stream.file_name(),
        size = stream.total_size(),
        range = ?stream.content_range(),
        "Relaying stream"
    );

    let status = if stream.range().is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    let content_type = HeaderValue::from_str(stream.content_type())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&stream.content_disposition())
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));
    let content_length = stream.content_length();
    let content_range = stream
        .content_range()
        .and_then(|value| HeaderValue::from_str(&value).ok());

    let mut response = (status, Body::from_stream(stream.into_body())).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Some(content_range) = content_range {
        headers.insert(header::CONTENT_RANGE, content_range);
    }

    response
}

fn error_response(id: &str, error: StreamError) -> Response {
    warn!(id = %id, error = %error, "Failed to open stream");

    let body = Json(ErrorResponse {
        error: error.client_message().to_string(),
    });
    match error {
        StreamError::Relay(RelayError::RangeNotSatisfiable { size }) => (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{}", size))],
            body,
        )
            .into_response(),
        _ => (StatusCode::NOT_FOUND, body).into_response(),
    }
}
