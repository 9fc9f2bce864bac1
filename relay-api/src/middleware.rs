//! Relay-key authentication middleware.
//!
//! When a relay key is configured every request routed through this layer
//! must carry it in the `relay-key` header.
//!
//! # Usage
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/status", get(status))
//!     .layer(middleware::from_fn_with_state(state.clone(), require_relay_key));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::constants::RELAY_KEY_HEADER;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn require_relay_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.relay_key.as_deref() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(RELAY_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    match provided {
        Some(key) if key == expected => next.run(request).await,
        Some(_) => {
            tracing::debug!(path = %request.uri().path(), "Rejected request with wrong relay key");
            ApiError::unauthorized("Invalid relay key").into_response()
        }
        None => ApiError::unauthorized(format!("Missing {} header", RELAY_KEY_HEADER)).into_response(),
    }
}
