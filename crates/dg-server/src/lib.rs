//! WebSocket server for the diagram generation service.
//!
//! This crate wires the whole request lifecycle together:
//! - WebSocket transport (`/ws`) with ordered event delivery and
//!   backpressure
//! - Session registry with connection and per-session request caps
//! - The playbook (deterministic strategy selection with fallbacks)
//! - Per-request orchestrator tasks with cooperative cancellation and a
//!   wall-clock bound
//! - HTTP endpoints: identity (`/`), liveness (`/health`), counters
//!   (`/metrics`)
//!
//! # Architecture
//!
//! ```text
//! Client ──WS──► connection task (read + write pump)
//!                     │  diagram_request
//!                     ▼
//!               orchestrator task ──► playbook ──► generator
//!                     │                               │
//!                     │          cache single-flight ◄┘
//!                     │                │
//!                     │        renderer → object store
//!                     ▼
//!               outbound queue ──► write pump ──► Client
//! ```

mod app;
mod error;
mod events;
mod handlers;
mod metrics;
mod orchestrator;
mod playbook;
mod session;
mod state;
mod ws;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

pub use error::ServerError;
pub use metrics::{Metrics, MetricsSnapshot};
pub use orchestrator::PipelineFailure;
pub use playbook::{PlannedStrategy, StrategyChain, route};
pub use session::{AdmitError, Session, SessionRegistry};
pub use state::AppState;

use dg_config::Config;

/// Run the server until shutdown.
///
/// # Arguments
///
/// * `config` - Service configuration
/// * `version` - Application version string
///
/// # Errors
///
/// Returns an error if templates fail to load or the listener cannot bind.
pub async fn run_server(config: &Config, version: String) -> Result<(), ServerError> {
    let state = Arc::new(AppState::from_config(config, version)?);
    tracing::info!(
        templates = state.templates.len(),
        mermaid_renderer = state.renderer.mermaid_enabled(),
        chart_executor = state.charts.executor_enabled(),
        llm = state.mermaid.llm_enabled(),
        uploads = state.store.is_some(),
        "state initialized"
    );

    let app = app::create_router(state);

    let addr = SocketAddr::from_str(&format!(
        "{}:{}",
        config.server.host, config.server.port
    ))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
