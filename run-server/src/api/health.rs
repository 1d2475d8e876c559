//! Health Check API Handlers
//!
//! Simple endpoints signalling that the server is listening.

use axum::{http::StatusCode, response::IntoResponse};

/// GET /
pub async fn get_root() -> StatusCode {
    StatusCode::OK
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
