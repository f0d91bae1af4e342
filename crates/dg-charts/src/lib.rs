//! Chart generation.
//!
//! Every chart kind has a fixed, parameterized source template
//! ([`render_source`]). Two termination modes:
//!
//! - **Code mode** (default): the source itself is the artifact
//!   (`text/x-python`); the contract is "here is reproducible source".
//! - **Executed mode**: a sandboxed [`ChartExecutor`] runs the source and
//!   the artifact is the produced PNG. Executor absence or failure is not
//!   an error; the generator degrades to code mode.

mod executor;
mod source;

pub use executor::{ChartExecutor, DEFAULT_TIMEOUT, ExecutedChart};
pub use source::{ChartInput, render_source};

use dg_core::{
    ArtifactBody, ChartOutputKind, DataPoint, DiagramKind, GeneratedArtifact, GenerateError,
};
use tokio_util::sync::CancellationToken;

/// Produces chart artifacts for diagram requests.
pub struct ChartGenerator {
    executor: Option<ChartExecutor>,
}

impl ChartGenerator {
    /// Code-mode-only generator.
    #[must_use]
    pub fn new() -> Self {
        Self { executor: None }
    }

    /// Generator that executes charts through `executor`.
    #[must_use]
    pub fn with_executor(executor: ChartExecutor) -> Self {
        Self {
            executor: Some(executor),
        }
    }

    /// Whether executed mode is configured.
    #[must_use]
    pub fn executor_enabled(&self) -> bool {
        self.executor.is_some()
    }

    /// Generate a chart artifact.
    ///
    /// # Errors
    ///
    /// [`GenerateError::UnsupportedKind`] / [`GenerateError::Invalid`] from
    /// source generation, [`GenerateError::Cancelled`] if execution was
    /// cancelled. Execution failures degrade to code mode instead of
    /// erroring.
    pub async fn generate(
        &self,
        kind: DiagramKind,
        title: &str,
        data_points: &[DataPoint],
        colors: &[String],
        cancel: &CancellationToken,
    ) -> Result<GeneratedArtifact, GenerateError> {
        let input = ChartInput {
            title,
            data_points,
            colors,
        };
        let source = render_source(kind, &input)?;

        if let Some(executor) = &self.executor {
            match executor.execute(&source, cancel).await {
                Ok(executed) => {
                    tracing::debug!(
                        kind = kind.as_str(),
                        bytes = executed.png.len(),
                        insights = %executed.insights,
                        "chart executed"
                    );
                    return Ok(GeneratedArtifact::Chart {
                        kind: ChartOutputKind::Png,
                        body: ArtifactBody::Binary(executed.png),
                    });
                }
                Err(GenerateError::Cancelled) => return Err(GenerateError::Cancelled),
                Err(err) => {
                    tracing::warn!(kind = kind.as_str(), error = %err, "chart execution failed, returning source");
                }
            }
        }

        Ok(GeneratedArtifact::Chart {
            kind: ChartOutputKind::PythonSource,
            body: ArtifactBody::Text(source),
        })
    }
}

impl Default for ChartGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> Vec<DataPoint> {
        vec![
            DataPoint {
                value: Some(3.0),
                ..DataPoint::labeled("a")
            },
            DataPoint {
                value: Some(5.0),
                ..DataPoint::labeled("b")
            },
        ]
    }

    #[tokio::test]
    async fn test_code_mode_returns_python_source() {
        let generator = ChartGenerator::new();
        let artifact = generator
            .generate(
                DiagramKind::Bar,
                "Revenue",
                &points(),
                &["#2563EB".to_owned()],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let GeneratedArtifact::Chart { kind, body } = artifact else {
            panic!("expected chart artifact");
        };
        assert_eq!(kind, ChartOutputKind::PythonSource);
        let ArtifactBody::Text(source) = body else {
            panic!("expected text body");
        };
        assert!(source.contains("ax.bar"));
    }

    #[tokio::test]
    async fn test_failed_execution_degrades_to_code_mode() {
        let generator =
            ChartGenerator::with_executor(ChartExecutor::new("no-such-interpreter"));
        let artifact = generator
            .generate(
                DiagramKind::Pie,
                "",
                &points(),
                &["#2563EB".to_owned()],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let GeneratedArtifact::Chart { kind, .. } = artifact else {
            panic!("expected chart artifact");
        };
        assert_eq!(kind, ChartOutputKind::PythonSource);
    }

    #[tokio::test]
    async fn test_non_chart_kind_rejected() {
        let generator = ChartGenerator::new();
        let err = generator
            .generate(
                DiagramKind::Swot,
                "",
                &points(),
                &[],
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::UnsupportedKind(_)));
    }
}
