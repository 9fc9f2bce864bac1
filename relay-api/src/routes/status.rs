//! Status of every monitored service.

use axum::{extract::State, Json};
use serde_json::{Map, Value};

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /status
///
/// One entry per service, keyed by service name. Scheduled datasets report
/// their poll record and freshness; the details lookup reports its limiter
/// and error rate.
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<Map<String, Value>>> {
    Ok(Json(state.status_report()?))
}
