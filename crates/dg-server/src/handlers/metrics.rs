//! Counters endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Handle `GET /metrics`.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<impl Serialize> {
    Json(state.metrics.snapshot())
}
