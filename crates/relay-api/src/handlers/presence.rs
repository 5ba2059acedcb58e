//! Presence query handler.

use axum::Json;
use axum::extract::State;
use tracing::debug;

use crate::dto::response::{ApiResponse, PresenceResponse};
use crate::extractors::AuthIdentity;
use crate::state::AppState;

/// GET /api/presence
///
/// Identities currently online. Requires a valid bearer token.
pub async fn online(
    State(state): State<AppState>,
    AuthIdentity(caller): AuthIdentity,
) -> Json<ApiResponse<PresenceResponse>> {
    let online: Vec<_> = state
        .realtime
        .connections
        .online_identities()
        .into_iter()
        .collect();
    debug!(identity = %caller, count = online.len(), "Presence queried");

    Json(ApiResponse::ok(PresenceResponse {
        count: online.len(),
        online,
    }))
}
