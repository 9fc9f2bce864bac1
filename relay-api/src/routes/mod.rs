//! REST API Routes Module
//!
//! - `/health/ping`: liveness, unauthenticated
//! - `/status`: per-service status
//! - `/ptv-disruption-details`: on-demand details lookup
//! - anything else: static files from the data directory
//!
//! Everything except the liveness check sits behind the relay-key middleware.

pub mod details;
pub mod health;
pub mod status;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::middleware::require_relay_key;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let serve_data = ServeDir::new(&state.data_dir);

    Router::new()
        .route("/status", get(status::status))
        .route("/ptv-disruption-details", get(details::details))
        .fallback_service(serve_data)
        .layer(from_fn_with_state(state.clone(), require_relay_key))
        // Routes added after the auth layer are not wrapped by it.
        .route("/health/ping", get(health::ping))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
