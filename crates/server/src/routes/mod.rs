//! API route handlers
//!
//! - `health`: liveness, readiness, and metrics
//! - `search`: image upload matching
//! - `store`: embedding store administration

pub mod health;
pub mod search;
pub mod store;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Returns server information including version and available endpoints.
///
/// # Response
///
/// ```json
/// {
///   "status": "Visual Product Matcher API is running",
///   "version": "0.1.0",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "status": "Visual Product Matcher API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/search",
            "/api/v1/store/reload",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
