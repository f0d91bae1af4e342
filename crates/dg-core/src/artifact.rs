//! Generator and renderer output types.

use serde::{Deserialize, Serialize};

/// Output family reported in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    Svg,
    Mermaid,
    Chart,
}

/// What a chart generator produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartOutputKind {
    /// Executed chart, PNG bytes.
    Png,
    /// Executed chart, SVG text.
    Svg,
    /// Reproducible source code for client-side execution.
    PythonSource,
}

impl ChartOutputKind {
    /// MIME type for this chart output.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Svg => "image/svg+xml",
            Self::PythonSource => "text/x-python",
        }
    }
}

/// The concrete output of a generator, before rendering.
#[derive(Debug, Clone)]
pub enum GeneratedArtifact {
    /// A filled SVG template.
    Svg {
        /// Complete SVG document.
        body: String,
    },
    /// Mermaid DSL, optionally already rendered to SVG.
    Mermaid {
        /// The DSL text.
        dsl: String,
        /// Rendered SVG, if the renderer succeeded.
        rendered_svg: Option<String>,
    },
    /// A chart artifact.
    Chart {
        /// Output kind (image or source).
        kind: ChartOutputKind,
        /// Artifact body.
        body: ArtifactBody,
    },
}

impl GeneratedArtifact {
    /// Output family of this artifact.
    #[must_use]
    pub fn output_type(&self) -> OutputType {
        match self {
            Self::Svg { .. } => OutputType::Svg,
            Self::Mermaid { .. } => OutputType::Mermaid,
            Self::Chart { .. } => OutputType::Chart,
        }
    }
}

/// Text or binary artifact body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactBody {
    /// UTF-8 text (SVG, Mermaid DSL, Python source).
    Text(String),
    /// Raw bytes (PNG).
    Binary(Vec<u8>),
}

impl ArtifactBody {
    /// Body size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Binary(b) => b.len(),
        }
    }

    /// Whether the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inline representation for a response body.
    ///
    /// Text passes through; binary is base64-encoded.
    #[must_use]
    pub fn to_inline_string(&self) -> String {
        use base64::Engine as _;

        match self {
            Self::Text(s) => s.clone(),
            Self::Binary(b) => base64::engine::general_purpose::STANDARD.encode(b),
        }
    }

    /// Raw bytes of the body.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Binary(b) => b,
        }
    }
}

/// A rendered artifact, ready for caching, upload and delivery.
///
/// Every renderer outcome collapses to this shape: a MIME type plus a
/// text-or-binary body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedArtifact {
    /// MIME type of the body.
    pub content_type: String,
    /// The body.
    pub body: ArtifactBody,
    /// Output family the body belongs to.
    pub output_type: OutputType,
}

impl RenderedArtifact {
    /// Rendered SVG document.
    #[must_use]
    pub fn svg(body: String, output_type: OutputType) -> Self {
        Self {
            content_type: "image/svg+xml".to_owned(),
            body: ArtifactBody::Text(body),
            output_type,
        }
    }

    /// Unrendered Mermaid DSL, delivered for client-side rendering.
    #[must_use]
    pub fn mermaid_dsl(dsl: String) -> Self {
        Self {
            content_type: "text/vnd.mermaid".to_owned(),
            body: ArtifactBody::Text(dsl),
            output_type: OutputType::Mermaid,
        }
    }

    /// File extension for object-store paths.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/svg+xml" => "svg",
            "image/png" => "png",
            "text/vnd.mermaid" => "mmd",
            "text/x-python" => "py",
            _ => "bin",
        }
    }

    /// Body size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_output_content_types() {
        assert_eq!(ChartOutputKind::Png.content_type(), "image/png");
        assert_eq!(ChartOutputKind::Svg.content_type(), "image/svg+xml");
        assert_eq!(
            ChartOutputKind::PythonSource.content_type(),
            "text/x-python"
        );
    }

    #[test]
    fn test_inline_string_base64_for_binary() {
        let body = ArtifactBody::Binary(vec![0x89, 0x50, 0x4E, 0x47]);
        assert_eq!(body.to_inline_string(), "iVBORw==");

        let text = ArtifactBody::Text("<svg/>".to_owned());
        assert_eq!(text.to_inline_string(), "<svg/>");
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(
            RenderedArtifact::svg("<svg/>".to_owned(), OutputType::Svg).extension(),
            "svg"
        );
        assert_eq!(
            RenderedArtifact::mermaid_dsl("flowchart TD".to_owned()).extension(),
            "mmd"
        );
    }

    #[test]
    fn test_output_type() {
        let artifact = GeneratedArtifact::Mermaid {
            dsl: "flowchart TD".to_owned(),
            rendered_svg: None,
        };
        assert_eq!(artifact.output_type(), OutputType::Mermaid);
    }
}
