//! Request orchestration.
//!
//! One orchestrator task per request, exclusively owning the request's
//! lifecycle: validate → cache lookup → route → generate → render →
//! upload → cache → respond. Retriable failures advance the playbook's
//! fallback chain; cancellation is observed at every await; the per-request
//! wall clock bounds the whole run.
//!
//! Generation work runs inside the cache's single-flight, so identical
//! concurrent requests share one computation. The flight leader forwards
//! stage changes over a progress channel so its connection still sees
//! `rendering`/`saving` updates; waiters see `generating` and then the
//! shared result.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use dg_cache::{CacheKey, CachedEntry, canonical_string};
use dg_core::{
    DiagramKind, DiagramRequestData, DiagramResponseData, ErrorCode, ErrorData, GenerateError,
    GeneratedArtifact, OutputType, RequestStatus, ResponseMetadata, ResponseStatus,
};
use dg_theme::ResolvedTheme;

use crate::events::{Outbound, RequestEvents};
use crate::playbook::{self, PlannedStrategy};
use crate::session::Session;
use crate::state::AppState;

/// Why the generation pipeline failed. Cloneable so single-flight can hand
/// the same failure to every waiter.
#[derive(Debug, Clone)]
pub enum PipelineFailure {
    /// Every strategy in the chain failed retriably.
    Exhausted(String),
    /// The generator rejected the input outright.
    Invalid(String),
    /// The flight was cancelled after every subscriber lost interest.
    Cancelled,
}

/// Stage updates sent from the flight leader to its orchestrator.
type Progress = (RequestStatus, String, u8);

/// Run one request to its terminal event.
pub async fn run(
    state: Arc<AppState>,
    session: Arc<Session>,
    request_id: String,
    data: DiagramRequestData,
    outbound: Outbound,
    cancel: CancellationToken,
) {
    let events = RequestEvents::new(request_id.clone(), outbound);
    let started = Instant::now();
    let deadline = tokio::time::Instant::now() + state.request_timeout;
    state.metrics.record_request();

    let outcome = tokio::select! {
        () = cancel.cancelled() => Outcome::Cancelled,
        result = tokio::time::timeout_at(deadline, drive(&state, &session, &data, &events)) => {
            match result {
                Ok(outcome) => outcome,
                Err(_) => Outcome::Timeout,
            }
        }
    };

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    finish(&state, &events, &request_id, &data, outcome, elapsed_ms).await;
    session.finish_request(&request_id);
}

/// Terminal disposition of a request.
enum Outcome {
    Complete {
        entry: CachedEntry,
        cache_hit: bool,
        kind: DiagramKind,
        theme: Box<ResolvedTheme>,
    },
    Failed(ErrorData),
    Cancelled,
    Timeout,
}

/// The cancellable, timeboxed part of the request.
async fn drive(
    state: &Arc<AppState>,
    session: &Arc<Session>,
    data: &DiagramRequestData,
    events: &RequestEvents,
) -> Outcome {
    let kind = match data.validate() {
        Ok(kind) => kind,
        Err(error) => return Outcome::Failed(error),
    };

    let theme = match dg_theme::resolve(&data.theme) {
        Ok(theme) => theme,
        Err(err) => {
            return Outcome::Failed(ErrorData {
                code: ErrorCode::ValidationError,
                message: err.to_string(),
                details: None,
            });
        }
    };

    let Some(chain) = playbook::route(kind, &state.templates) else {
        return Outcome::Failed(ErrorData {
            code: ErrorCode::UnsupportedDiagramKind,
            message: format!("no strategy for diagram type '{}'", kind.as_str()),
            details: None,
        });
    };

    let key = cache_key(kind, data, &theme);

    if let Some(entry) = state.cache.get(&key) {
        state.metrics.record_cache_hit();
        tracing::debug!(key = %key, "cache hit");
        return Outcome::Complete {
            entry,
            cache_hit: true,
            kind,
            theme: Box::new(theme),
        };
    }
    state.metrics.record_cache_miss();

    events
        .status(RequestStatus::Generating, "Generating diagram", Some(30))
        .await;

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<Progress>();
    let work_state = Arc::clone(state);
    let work_session_id = session.session_id.clone();
    let work_data = data.clone();
    let work_theme = theme.clone();
    let work_key = key.clone();
    let flight = state.flights.run(&key, move |flight_token| {
        pipeline(
            work_state,
            kind,
            work_data,
            work_theme,
            chain,
            work_key,
            work_session_id,
            flight_token,
            progress_tx,
        )
    });
    tokio::pin!(flight);

    let result = loop {
        tokio::select! {
            Some((status, message, progress)) = progress_rx.recv() => {
                events.status(status, &message, Some(progress)).await;
            }
            result = &mut flight => {
                // Deliver stage updates that raced with completion
                while let Ok((status, message, progress)) = progress_rx.try_recv() {
                    events.status(status, &message, Some(progress)).await;
                }
                break result;
            }
        }
    };

    match result {
        Ok(Ok(entry)) => Outcome::Complete {
            entry,
            cache_hit: false,
            kind,
            theme: Box::new(theme),
        },
        Ok(Err(PipelineFailure::Exhausted(detail))) => Outcome::Failed(ErrorData {
            code: ErrorCode::AllStrategiesExhausted,
            message: "every generation strategy failed".to_owned(),
            details: Some(detail),
        }),
        Ok(Err(PipelineFailure::Invalid(message))) => Outcome::Failed(ErrorData {
            code: ErrorCode::ValidationError,
            message,
            details: None,
        }),
        Ok(Err(PipelineFailure::Cancelled)) | Err(_) => Outcome::Failed(ErrorData {
            code: ErrorCode::InternalError,
            message: "generation did not complete".to_owned(),
            details: None,
        }),
    }
}

/// Emit the terminal event and update counters.
async fn finish(
    state: &AppState,
    events: &RequestEvents,
    request_id: &str,
    data: &DiagramRequestData,
    outcome: Outcome,
    elapsed_ms: u64,
) {
    match outcome {
        Outcome::Complete {
            entry,
            cache_hit,
            kind,
            theme,
        } => {
            tracing::info!(request_id, cache_hit, elapsed_ms, "request complete");
            state.metrics.record_completed(elapsed_ms);
            events
                .respond(success_response(kind, &entry, cache_hit, &theme, elapsed_ms))
                .await;
        }
        Outcome::Failed(error) => {
            tracing::info!(request_id, code = ?error.code, elapsed_ms, "request failed");
            state.metrics.record_failed();
            events.error(error).await;
        }
        Outcome::Cancelled => {
            tracing::info!(request_id, elapsed_ms, "request cancelled");
            state.metrics.record_cancelled();
            events
                .respond(cancelled_response(&data.diagram_type, elapsed_ms))
                .await;
        }
        Outcome::Timeout => {
            tracing::warn!(request_id, elapsed_ms, "request timed out");
            state.metrics.record_failed();
            events
                .error(ErrorData {
                    code: ErrorCode::Timeout,
                    message: format!("request exceeded {elapsed_ms} ms wall clock"),
                    details: None,
                })
                .await;
        }
    }
}

/// Compute the request's content-addressed cache key.
fn cache_key(kind: DiagramKind, data: &DiagramRequestData, theme: &ResolvedTheme) -> String {
    let payload = canonical_string(&serde_json::json!({
        "content": normalize_content(&data.content),
        "data_points": data.data_points,
    }))
    .unwrap_or_default();
    let theme_json = canonical_string(theme).unwrap_or_default();
    CacheKey {
        kind: kind.as_str(),
        payload: &payload,
        theme: &theme_json,
    }
    .compute_hash()
}

/// Collapse insignificant whitespace so reformatted content hits the same
/// cache entry.
fn normalize_content(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The flight-leader pipeline: strategy loop → render → upload → cache.
#[allow(clippy::too_many_arguments)]
async fn pipeline(
    state: Arc<AppState>,
    kind: DiagramKind,
    data: DiagramRequestData,
    theme: ResolvedTheme,
    chain: Vec<(PlannedStrategy, f32)>,
    key: String,
    session_id: String,
    flight_token: CancellationToken,
    progress: mpsc::UnboundedSender<Progress>,
) -> Result<Result<CachedEntry, PipelineFailure>, String> {
    let mut last_error = String::new();

    for (index, (planned, confidence)) in chain.iter().enumerate() {
        if flight_token.is_cancelled() {
            return Ok(Err(PipelineFailure::Cancelled));
        }
        if index > 0 {
            let _ = progress.send((
                RequestStatus::Generating,
                format!("Falling back to {}", planned.strategy().as_str()),
                40,
            ));
        }
        tracing::debug!(
            kind = kind.as_str(),
            strategy = planned.strategy().as_str(),
            confidence,
            "running strategy"
        );

        let generated = match generate(&state, kind, &data, &theme, planned, &flight_token).await
        {
            Ok(artifact) => artifact,
            Err(GenerateError::Cancelled) => return Ok(Err(PipelineFailure::Cancelled)),
            Err(GenerateError::Invalid(message)) => {
                return Ok(Err(PipelineFailure::Invalid(message)));
            }
            Err(err) => {
                tracing::debug!(strategy = planned.strategy().as_str(), error = %err, "strategy failed");
                last_error = err.to_string();
                continue;
            }
        };

        let _ = progress.send((RequestStatus::Rendering, "Rendering artifact".to_owned(), 60));
        let rendered = match state.renderer.render(generated, &flight_token).await {
            Ok(rendered) => rendered,
            Err(GenerateError::Cancelled) => return Ok(Err(PipelineFailure::Cancelled)),
            Err(err) => {
                last_error = err.to_string();
                continue;
            }
        };

        let _ = progress.send((RequestStatus::Saving, "Saving artifact".to_owned(), 85));
        let public_url = match &state.store {
            Some(store) => match store.upload(&rendered, &session_id).await {
                Ok(url) => Some(url),
                Err(err) => {
                    // Degrade to inline delivery; never a request error
                    tracing::warn!(error = %err, "upload failed, delivering inline");
                    None
                }
            },
            None => None,
        };

        let entry = CachedEntry {
            artifact: rendered,
            public_url,
            generation_method: planned.strategy().as_str().to_owned(),
        };
        state.cache.put(&key, entry.clone());
        return Ok(Ok(entry));
    }

    Ok(Err(PipelineFailure::Exhausted(last_error)))
}

/// Run one strategy's generator.
async fn generate(
    state: &AppState,
    kind: DiagramKind,
    data: &DiagramRequestData,
    theme: &ResolvedTheme,
    planned: &PlannedStrategy,
    flight_token: &CancellationToken,
) -> Result<GeneratedArtifact, GenerateError> {
    match planned {
        PlannedStrategy::SvgTemplate { template_id } => {
            let labels: Vec<String> = data
                .data_points
                .iter()
                .map(|point| point.label.clone())
                .collect();
            let body = state
                .templates
                .fill(template_id, &labels, theme)
                .map_err(|err| GenerateError::Template(err.to_string()))?;
            Ok(GeneratedArtifact::Svg { body })
        }
        PlannedStrategy::Mermaid => {
            let dsl = state
                .mermaid
                .generate(kind, &data.content, &data.data_points)
                .await?;
            Ok(GeneratedArtifact::Mermaid {
                dsl,
                rendered_svg: None,
            })
        }
        PlannedStrategy::Chart => {
            let colors = theme.fill_colors(data.data_points.len().max(1));
            state
                .charts
                .generate(kind, &data.content, &data.data_points, &colors, flight_token)
                .await
        }
    }
}

/// Build the success response for a finished entry.
fn success_response(
    kind: DiagramKind,
    entry: &CachedEntry,
    cache_hit: bool,
    theme: &ResolvedTheme,
    elapsed_ms: u64,
) -> DiagramResponseData {
    let (content, url) = match &entry.public_url {
        Some(url) => (None, Some(url.clone())),
        None => (Some(entry.artifact.body.to_inline_string()), None),
    };
    DiagramResponseData {
        status: ResponseStatus::Success,
        diagram_type: kind.as_str().to_owned(),
        output_type: entry.artifact.output_type,
        content,
        content_type: Some(entry.artifact.content_type.clone()),
        url,
        metadata: ResponseMetadata {
            generation_method: entry.generation_method.clone(),
            cache_hit,
            theme_applied: serde_json::to_value(theme).ok(),
            generation_time_ms: elapsed_ms,
        },
    }
}

/// Build the terminal response for a cancelled request.
fn cancelled_response(diagram_type: &str, elapsed_ms: u64) -> DiagramResponseData {
    let output_type = DiagramKind::parse(diagram_type).map_or(OutputType::Svg, |kind| {
        if kind.is_chart() {
            OutputType::Chart
        } else if kind.is_mermaid_native() {
            OutputType::Mermaid
        } else {
            OutputType::Svg
        }
    });
    DiagramResponseData {
        status: ResponseStatus::Cancelled,
        diagram_type: diagram_type.to_owned(),
        output_type,
        content: None,
        content_type: None,
        url: None,
        metadata: ResponseMetadata {
            generation_method: "none".to_owned(),
            cache_hit: false,
            theme_applied: None,
            generation_time_ms: elapsed_ms,
        },
    }
}
