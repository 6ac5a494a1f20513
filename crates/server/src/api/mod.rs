pub mod addon;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod stream;

pub use routes::create_router;

use serde::Serialize;

/// Error body returned by every failing addon endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
