//! Liveness endpoint. No authentication required.

use axum::{http::StatusCode, response::IntoResponse};

/// GET /health/ping - Simple pong response
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}
