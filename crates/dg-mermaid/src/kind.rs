//! Mermaid diagram kinds and DSL validation.

use dg_core::DiagramKind;

/// Diagram kinds expressible in Mermaid DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MermaidKind {
    Flowchart,
    Sequence,
    Gantt,
    State,
    Journey,
    MindMap,
}

impl MermaidKind {
    /// Map a diagram kind onto its Mermaid representation.
    ///
    /// Native kinds map one-to-one. SVG-template kinds degrade to a
    /// flowchart so the router's template→mermaid fallback always has a
    /// target. Chart kinds have no Mermaid form and return `None`.
    #[must_use]
    pub fn for_diagram(kind: DiagramKind) -> Option<Self> {
        match kind {
            DiagramKind::Flowchart => Some(Self::Flowchart),
            DiagramKind::Sequence => Some(Self::Sequence),
            DiagramKind::Gantt => Some(Self::Gantt),
            DiagramKind::State => Some(Self::State),
            DiagramKind::Journey => Some(Self::Journey),
            DiagramKind::MindMap => Some(Self::MindMap),
            kind if kind.is_svg_template() => Some(Self::Flowchart),
            _ => None,
        }
    }

    /// The declaration token the DSL's first non-blank line must open with.
    #[must_use]
    pub fn declaration(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::Sequence => "sequenceDiagram",
            Self::Gantt => "gantt",
            Self::State => "stateDiagram-v2",
            Self::Journey => "journey",
            Self::MindMap => "mindmap",
        }
    }

    /// Structural tokens, at least one of which a valid DSL must contain
    /// beyond the declaration.
    #[must_use]
    pub fn structural_tokens(self) -> &'static [&'static str] {
        match self {
            Self::Flowchart | Self::State => &["-->"],
            Self::Sequence => &["->>", "-->>", "participant"],
            Self::Gantt => &["section", "dateFormat"],
            Self::Journey => &["section", ":"],
            Self::MindMap => &["root", "(("],
        }
    }
}

/// Validate a candidate DSL string for a kind.
///
/// The first non-blank line must open with the kind's declaration and the
/// text must contain at least one structural token. Used to vet LLM output
/// before it reaches the renderer.
#[must_use]
pub fn validate_dsl(kind: MermaidKind, dsl: &str) -> bool {
    let Some(first_line) = dsl.lines().find(|line| !line.trim().is_empty()) else {
        return false;
    };
    if !first_line.trim_start().starts_with(kind.declaration()) {
        return false;
    }
    kind.structural_tokens()
        .iter()
        .any(|token| dsl.contains(token))
}
