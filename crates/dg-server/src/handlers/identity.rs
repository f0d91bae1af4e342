//! Service identity endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Response for `GET /`.
#[derive(Serialize)]
struct IdentityResponse {
    service: &'static str,
    version: String,
    websocket: &'static str,
}

/// Handle `GET /`.
pub async fn get_identity(State(state): State<Arc<AppState>>) -> Json<impl Serialize> {
    Json(IdentityResponse {
        service: "dg-diagram-service",
        version: state.version.clone(),
        websocket: "/ws?session_id=<id>&user_id=<id>",
    })
}
