//! API route handlers
//!
//! - `health`: liveness and Prometheus metrics
//! - `matching`: reference image upload and group matching

pub mod health;
pub mod matching;

use crate::error::ServerError;

/// Root greeting (GET /).
pub async fn hello() -> &'static str {
    "Hello, it's facematch"
}

/// Smoke-test endpoint (GET /api/test).
pub async fn api_test() -> &'static str {
    "Hello, World!"
}

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
