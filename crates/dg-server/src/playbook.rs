//! The unified playbook: deterministic strategy selection.
//!
//! A pure function from the request's kind (plus the startup-frozen
//! template index) to an ordered list of planned strategies with
//! confidences. The first entry is the primary; later entries are
//! fallbacks attempted only after a retriable failure. No I/O happens
//! here, and the same inputs always produce the same chain.

use dg_core::{DiagramKind, Strategy};
use dg_templates::TemplateLibrary;

/// A strategy the orchestrator can execute, with enough detail to run it.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedStrategy {
    /// Fill the named SVG template.
    SvgTemplate {
        /// Template to fill.
        template_id: String,
    },
    /// Generate Mermaid DSL.
    Mermaid,
    /// Generate a chart.
    Chart,
}

impl PlannedStrategy {
    /// The wire-level strategy tag.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::SvgTemplate { .. } => Strategy::SvgTemplate,
            Self::Mermaid => Strategy::Mermaid,
            Self::Chart => Strategy::Chart,
        }
    }
}

/// An ordered strategy chain for one request.
pub type StrategyChain = Vec<(PlannedStrategy, f32)>;

/// Select the strategy chain for a kind.
///
/// Rules, evaluated in order:
/// 1. A template whose id matches the kind exactly: `svg_template`
///    primary, `mermaid` fallback.
/// 2. Mermaid-native kinds: `mermaid` primary; `svg_template` fallback
///    only when a compatible template exists.
/// 3. Chart kinds: `chart`, no fallback.
///
/// Returns `None` when no rule applies (surfaced as
/// `UnsupportedDiagramKind`).
#[must_use]
pub fn route(kind: DiagramKind, templates: &TemplateLibrary) -> Option<StrategyChain> {
    if templates.contains(kind.as_str()) {
        return Some(vec![
            (
                PlannedStrategy::SvgTemplate {
                    template_id: kind.as_str().to_owned(),
                },
                0.9,
            ),
            (PlannedStrategy::Mermaid, 0.5),
        ]);
    }
    if kind.is_mermaid_native() {
        let mut chain = vec![(PlannedStrategy::Mermaid, 0.9)];
        if let Some(template_id) = compatible_template(kind, templates) {
            chain.push((
                PlannedStrategy::SvgTemplate {
                    template_id: template_id.to_owned(),
                },
                0.4,
            ));
        }
        return Some(chain);
    }
    if kind.is_chart() {
        return Some(vec![(PlannedStrategy::Chart, 0.95)]);
    }
    None
}

/// A structurally compatible template for a Mermaid-native kind, if one is
/// loaded. Sequence, gantt and state have no meaningful SVG analogue.
fn compatible_template(kind: DiagramKind, templates: &TemplateLibrary) -> Option<&'static str> {
    let candidate = match kind {
        DiagramKind::Flowchart => "process_flow_5",
        DiagramKind::Journey => "timeline",
        DiagramKind::MindMap => "hub_spoke_6",
        _ => return None,
    };
    templates.contains(candidate).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn library() -> TemplateLibrary {
        TemplateLibrary::load(None).unwrap()
    }

    #[test]
    fn test_template_kind_prefers_template_with_mermaid_fallback() {
        let chain = route(DiagramKind::Matrix2x2, &library()).unwrap();
        assert_eq!(
            chain[0].0,
            PlannedStrategy::SvgTemplate {
                template_id: "matrix_2x2".to_owned()
            }
        );
        assert_eq!(chain[1].0, PlannedStrategy::Mermaid);
        assert!(chain[0].1 > chain[1].1);
    }

    #[test]
    fn test_flowchart_falls_back_to_compatible_template() {
        let chain = route(DiagramKind::Flowchart, &library()).unwrap();
        assert_eq!(chain[0].0, PlannedStrategy::Mermaid);
        assert_eq!(
            chain[1].0,
            PlannedStrategy::SvgTemplate {
                template_id: "process_flow_5".to_owned()
            }
        );
    }

    #[test]
    fn test_sequence_has_no_template_fallback() {
        let chain = route(DiagramKind::Sequence, &library()).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].0, PlannedStrategy::Mermaid);
    }

    #[test]
    fn test_chart_kind_has_no_fallback() {
        let chain = route(DiagramKind::Histogram, &library()).unwrap();
        assert_eq!(chain, vec![(PlannedStrategy::Chart, 0.95)]);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let library = library();
        for _ in 0..3 {
            assert_eq!(
                route(DiagramKind::Pyramid3, &library),
                route(DiagramKind::Pyramid3, &library)
            );
        }
    }
}
