//! Artifact rendering.
//!
//! Collapses every generator output to a [`RenderedArtifact`]:
//!
//! - SVG artifacts pass through unchanged.
//! - Mermaid DSL is rendered to SVG via an external CLI process (stdin in,
//!   stdout out) with a hard timeout and one retry; if rendering is
//!   unavailable or fails twice, the DSL itself is returned
//!   (`text/vnd.mermaid`) for client-side rendering. That is the
//!   documented contract, not an error.
//! - Chart artifacts pass through with their own content type.

mod mermaid_cli;

pub use mermaid_cli::{MERMAID_RENDER_TIMEOUT, MermaidCli};

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use dg_core::{ArtifactBody, GeneratedArtifact, GenerateError, OutputType, RenderedArtifact};

/// Renders generated artifacts to their deliverable form.
pub struct Renderer {
    mermaid: Option<MermaidCli>,
}

impl Renderer {
    /// Renderer without a Mermaid CLI: DSL is delivered unrendered.
    #[must_use]
    pub fn new() -> Self {
        Self { mermaid: None }
    }

    /// Renderer using the Mermaid CLI at `path`.
    #[must_use]
    pub fn with_mermaid_cli(path: PathBuf) -> Self {
        Self {
            mermaid: Some(MermaidCli::new(path)),
        }
    }

    /// Whether server-side Mermaid rendering is available.
    #[must_use]
    pub fn mermaid_enabled(&self) -> bool {
        self.mermaid.is_some()
    }

    /// Render an artifact.
    ///
    /// # Errors
    ///
    /// [`GenerateError::Cancelled`] when cancellation fires during an
    /// external render. Mermaid CLI failures do not error: the DSL is
    /// returned unrendered instead.
    pub async fn render(
        &self,
        artifact: GeneratedArtifact,
        cancel: &CancellationToken,
    ) -> Result<RenderedArtifact, GenerateError> {
        match artifact {
            GeneratedArtifact::Svg { body } => Ok(RenderedArtifact::svg(body, OutputType::Svg)),
            GeneratedArtifact::Chart { kind, body } => Ok(RenderedArtifact {
                content_type: kind.content_type().to_owned(),
                body,
                output_type: OutputType::Chart,
            }),
            GeneratedArtifact::Mermaid { dsl, rendered_svg } => {
                if let Some(svg) = rendered_svg {
                    return Ok(RenderedArtifact::svg(svg, OutputType::Mermaid));
                }
                let Some(cli) = &self.mermaid else {
                    return Ok(RenderedArtifact::mermaid_dsl(dsl));
                };
                match cli.render(&dsl, cancel).await {
                    Ok(svg) => Ok(RenderedArtifact {
                        content_type: "image/svg+xml".to_owned(),
                        body: ArtifactBody::Text(svg),
                        output_type: OutputType::Mermaid,
                    }),
                    Err(GenerateError::Cancelled) => Err(GenerateError::Cancelled),
                    Err(err) => {
                        tracing::warn!(error = %err, "mermaid render failed, returning dsl");
                        Ok(RenderedArtifact::mermaid_dsl(dsl))
                    }
                }
            }
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
