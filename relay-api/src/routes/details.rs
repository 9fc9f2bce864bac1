//! On-demand details lookup.

use axum::{
    extract::{Query, State},
    Json,
};
use relay_core::Outcome;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DetailsQuery {
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailsResponse {
    /// Details text; `null` when the lookup produced nothing to show.
    pub details: Option<String>,
    pub outcome: Outcome,
}

/// GET /ptv-disruption-details?url=<key>
///
/// Always answers 200 once a key is given; the `outcome` field says whether
/// the details came from cache, upstream, or not at all.
pub async fn details(
    State(state): State<AppState>,
    Query(query): Query<DetailsQuery>,
) -> ApiResult<Json<DetailsResponse>> {
    let key = query.url.ok_or_else(|| ApiError::missing_field("url"))?;
    let lookup = state.details.on_request(&key).await;
    Ok(Json(DetailsResponse {
        outcome: lookup.outcome,
        details: lookup.into_details(),
    }))
}
