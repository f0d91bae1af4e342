//! Error taxonomy.
//!
//! [`ErrorCode`] is the wire-level code carried by `error` events.
//! [`GenerateError`] is the working error type of the generation pipeline;
//! its retriability drives the orchestrator's fallback behavior.

use serde::Serialize;

/// Machine-readable error codes surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    /// Malformed request body, invalid color, slot-count mismatch.
    ValidationError,
    /// No strategy exists for the requested kind.
    UnsupportedDiagramKind,
    /// Every strategy in the fallback chain failed.
    AllStrategiesExhausted,
    /// Rendering failed with no fallback remaining.
    RenderError,
    /// Per-request wall clock exceeded.
    Timeout,
    /// The request was cancelled.
    Cancelled,
    /// Unexpected internal failure.
    InternalError,
}

/// Errors produced while generating or rendering an artifact.
///
/// Retriable errors advance the router's fallback chain; non-retriable
/// errors terminate the request.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The generator does not support this kind (non-retriable: the router
    /// consults the next strategy only for retriable failures, so this
    /// surfaces directly).
    #[error("unsupported kind for this generator: {0}")]
    UnsupportedKind(String),

    /// The LLM path failed (timeout, non-200, invalid output). Retriable.
    #[error("llm generation failed: {0}")]
    Llm(String),

    /// Template lookup or fill failed. Retriable (the Mermaid fallback may
    /// still succeed).
    #[error("template error: {0}")]
    Template(String),

    /// External renderer failed. Retriable.
    #[error("render failed: {0}")]
    Render(String),

    /// Chart execution failed. Retriable (degrades to code mode first).
    #[error("chart execution failed: {0}")]
    ChartExec(String),

    /// The request body cannot be turned into generator input.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// The operation was cancelled.
    #[error("cancelled")]
    Cancelled,
}

impl GenerateError {
    /// Whether the orchestrator should try the next strategy.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Llm(_) | Self::Template(_) | Self::Render(_) | Self::ChartExec(_)
        )
    }
}
