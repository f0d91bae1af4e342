//! The Mermaid generator: LLM path first, deterministic builder fallback.

use dg_core::{DataPoint, DiagramKind, GenerateError};

use crate::builder;
use crate::extract::extract;
use crate::kind::MermaidKind;
use crate::llm::{LlmClient, LlmConfig};

/// Produces Mermaid DSL for diagram requests.
pub struct MermaidGenerator {
    llm: Option<LlmClient>,
}

impl MermaidGenerator {
    /// Generator with the deterministic builders only.
    #[must_use]
    pub fn new() -> Self {
        Self { llm: None }
    }

    /// Generator with the LLM path enabled.
    #[must_use]
    pub fn with_llm(config: LlmConfig) -> Self {
        Self {
            llm: Some(LlmClient::new(config)),
        }
    }

    /// Whether the LLM path is configured.
    #[must_use]
    pub fn llm_enabled(&self) -> bool {
        self.llm.is_some()
    }

    /// Generate DSL for a diagram kind.
    ///
    /// The LLM path is tried first when configured; any of its failure
    /// modes falls through to the rule-based builder, which always
    /// succeeds for kinds that have a Mermaid form.
    ///
    /// # Errors
    ///
    /// [`GenerateError::UnsupportedKind`] when the kind has no Mermaid
    /// representation (charts).
    pub async fn generate(
        &self,
        kind: DiagramKind,
        content: &str,
        data_points: &[DataPoint],
    ) -> Result<String, GenerateError> {
        let mermaid_kind = MermaidKind::for_diagram(kind)
            .ok_or_else(|| GenerateError::UnsupportedKind(kind.as_str().to_owned()))?;

        if let Some(llm) = &self.llm {
            let extraction = extract(content);
            match llm.generate(mermaid_kind, content, &extraction).await {
                Ok(dsl) => return Ok(dsl),
                Err(err) => {
                    tracing::warn!(kind = kind.as_str(), error = %err, "llm path failed, using builder");
                }
            }
        }

        Ok(builder::build(mermaid_kind, content, data_points))
    }
}

impl Default for MermaidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::validate_dsl;

    #[tokio::test]
    async fn test_builder_path_for_flowchart() {
        let generator = MermaidGenerator::new();
        let dsl = generator
            .generate(DiagramKind::Flowchart, "Start → Validate → End", &[])
            .await
            .unwrap();
        assert!(dsl.starts_with("flowchart"));
        assert!(validate_dsl(MermaidKind::Flowchart, &dsl));
    }

    #[tokio::test]
    async fn test_template_kind_degrades_to_flowchart() {
        let generator = MermaidGenerator::new();
        let points = vec![
            DataPoint::labeled("Plan"),
            DataPoint::labeled("Do"),
            DataPoint::labeled("Check"),
        ];
        let dsl = generator
            .generate(DiagramKind::Cycle3, "", &points)
            .await
            .unwrap();
        assert!(dsl.starts_with("flowchart"));
        assert!(dsl.contains("Plan"));
    }

    #[tokio::test]
    async fn test_chart_kind_is_unsupported() {
        let generator = MermaidGenerator::new();
        let err = generator
            .generate(DiagramKind::Pie, "", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::UnsupportedKind(_)));
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn test_unreachable_llm_falls_through_to_builder() {
        // Nothing listens on this port; the LLM path must fail fast and
        // the builder must still answer.
        let generator = MermaidGenerator::with_llm(LlmConfig {
            endpoint: "http://127.0.0.1:1/v1/chat/completions".to_owned(),
            api_key: None,
            model: "test".to_owned(),
            temperature: 0.2,
        });
        let dsl = generator
            .generate(DiagramKind::Flowchart, "a -> b", &[])
            .await
            .unwrap();
        assert!(validate_dsl(MermaidKind::Flowchart, &dsl));
    }
}
