//! Liveness endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Response for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
    active_sessions: usize,
    template_count: usize,
    cache_entries: usize,
    cache_bytes: usize,
    mermaid_renderer: bool,
    chart_executor: bool,
    llm_enabled: bool,
    uploads_enabled: bool,
}

/// Handle `GET /health`.
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<impl Serialize> {
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.started_at.elapsed().as_secs(),
        active_sessions: state.sessions.active(),
        template_count: state.templates.len(),
        cache_entries: state.cache.len(),
        cache_bytes: state.cache.bytes(),
        mermaid_renderer: state.renderer.mermaid_enabled(),
        chart_executor: state.charts.executor_enabled(),
        llm_enabled: state.mermaid.llm_enabled(),
        uploads_enabled: state.store.is_some(),
    })
}
