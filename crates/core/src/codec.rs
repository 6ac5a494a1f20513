//! Catalog identifier codec.
//!
//! Catalog entries are published with an opaque identifier that carries the
//! address of the item's detail page. The identifier is the only thing the
//! addon client sends back when it asks for a stream, so the mapping must be
//! lossless. Nothing outside this module should build or pick apart an
//! identifier.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use thiserror::Error;
use url::Url;

/// Prefix shared by every identifier this addon publishes.
///
/// It is also advertised in the manifest's `idPrefixes` so clients only route
/// our own identifiers to the stream endpoint.
pub const ID_PREFIX: &str = "espada:";

/// Errors that can occur while decoding an identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Encode a detail-page locator into a catalog identifier.
///
/// The payload is unpadded URL-safe base64, so the result contains only
/// `[A-Za-z0-9_-]` after the prefix and can be embedded in a URL path segment
/// or a JSON string without escaping.
pub fn encode(detail_locator: &str) -> String {
    format!("{}{}", ID_PREFIX, URL_SAFE_NO_PAD.encode(detail_locator.as_bytes()))
}

/// Decode a catalog identifier back into its detail-page locator.
pub fn decode(identifier: &str) -> Result<String, CodecError> {
    let payload = identifier
        .strip_prefix(ID_PREFIX)
        .ok_or_else(|| CodecError::InvalidIdentifier("missing prefix".to_string()))?;

    if payload.is_empty() {
        return Err(CodecError::InvalidIdentifier("empty payload".to_string()));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| CodecError::InvalidIdentifier(format!("bad encoding: {}", e)))?;

    let locator = String::from_utf8(bytes)
        .map_err(|_| CodecError::InvalidIdentifier("payload is not UTF-8".to_string()))?;

    if !is_fetchable_locator(&locator) {
        return Err(CodecError::InvalidIdentifier(format!(
            "not a fetchable locator: {}",
            locator
        )));
    }

    Ok(locator)
}

/// Whether a locator is an absolute http(s) URL with a host.
pub fn is_fetchable_locator(locator: &str) -> bool {
    match Url::parse(locator) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
