//! Application state.
//!
//! Shared state for all connections and request orchestrators. Everything
//! here is either read-only after startup (templates, generators, config
//! snapshot) or internally synchronized (cache, sessions, metrics).

use std::time::{Duration, Instant};

use dg_cache::{CachedEntry, DiagramCache, SingleFlight};
use dg_charts::{ChartExecutor, ChartGenerator};
use dg_config::Config;
use dg_mermaid::{LlmConfig, MermaidGenerator};
use dg_render::Renderer;
use dg_store::{ObjectStoreClient, StoreConfig};
use dg_templates::{TemplateError, TemplateLibrary};

use crate::metrics::Metrics;
use crate::orchestrator::PipelineFailure;
use crate::session::SessionRegistry;

/// Application state shared across all handlers.
pub struct AppState {
    /// Service version (for the identity endpoint).
    pub version: String,
    /// Process start time (for health uptime).
    pub started_at: Instant,
    /// Per-request wall clock.
    pub request_timeout: Duration,
    /// SVG template index, read-only after startup.
    pub templates: TemplateLibrary,
    /// Artifact cache.
    pub cache: DiagramCache,
    /// Single-flight table keyed by cache key.
    pub flights: SingleFlight<Result<CachedEntry, PipelineFailure>>,
    /// Object store client; `None` means inline-only delivery.
    pub store: Option<ObjectStoreClient>,
    /// Mermaid generator.
    pub mermaid: MermaidGenerator,
    /// Chart generator.
    pub charts: ChartGenerator,
    /// Artifact renderer.
    pub renderer: Renderer,
    /// Live session table.
    pub sessions: SessionRegistry,
    /// Service counters.
    pub metrics: Metrics,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the template library fails to load (malformed
    /// templates are fatal at startup).
    pub fn from_config(config: &Config, version: String) -> Result<Self, TemplateError> {
        let templates = TemplateLibrary::load(config.templates.dir.as_deref())?;

        let store = config
            .object_store
            .as_ref()
            .filter(|store| store.public)
            .map(|store| {
                ObjectStoreClient::new(StoreConfig::new(store.url.clone(), store.bucket.clone()))
            });

        let mermaid = match &config.llm {
            Some(llm) => MermaidGenerator::with_llm(LlmConfig {
                endpoint: llm.endpoint.clone(),
                api_key: llm.api_key.clone(),
                model: llm.model.clone(),
                temperature: llm.temperature,
            }),
            None => MermaidGenerator::new(),
        };

        let charts = if config.charts.executor_enabled {
            ChartGenerator::with_executor(ChartExecutor::new(config.charts.python_path.clone()))
        } else {
            ChartGenerator::new()
        };

        let renderer = match &config.mermaid.cli_path {
            Some(path) => Renderer::with_mermaid_cli(path.clone()),
            None => Renderer::new(),
        };

        Ok(Self {
            version,
            started_at: Instant::now(),
            request_timeout: config.limits.request_timeout(),
            templates,
            cache: DiagramCache::new(config.cache.bytes, config.cache.ttl()),
            flights: SingleFlight::new(),
            store,
            mermaid,
            charts,
            renderer,
            sessions: SessionRegistry::new(
                config.limits.max_connections,
                config.limits.max_requests_per_session,
            ),
            metrics: Metrics::default(),
        })
    }
}
