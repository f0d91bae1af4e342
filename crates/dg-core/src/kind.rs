//! Diagram kinds and generation strategies.
//!
//! [`DiagramKind`] is the closed set of diagram types the service accepts.
//! Classification helpers (`is_mermaid_native`, `is_chart`) drive strategy
//! selection; `expected_points` encodes the cardinality a kind implies.

/// Supported diagram kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramKind {
    // Mermaid-native kinds
    Flowchart,
    Sequence,
    Gantt,
    State,
    Journey,
    MindMap,
    // SVG template kinds
    Matrix2x2,
    Matrix3x3,
    Swot,
    Pyramid3,
    Pyramid4,
    Pyramid5,
    HubSpoke4,
    HubSpoke6,
    ProcessFlow3,
    ProcessFlow5,
    Cycle3,
    Cycle4,
    Cycle5,
    Funnel3,
    Funnel4,
    Funnel5,
    Venn2,
    Venn3,
    Honeycomb3,
    Honeycomb5,
    Honeycomb7,
    Gears3,
    Fishbone,
    Timeline,
    RoadmapQuarterly4,
    // Chart kinds
    Pie,
    Bar,
    Line,
    Scatter,
    Histogram,
    Heatmap,
    Area,
    Waterfall,
    Treemap,
}

impl DiagramKind {
    /// Parse a kind from its wire tag.
    ///
    /// Accepts the canonical tag (`pyramid_3`) plus the legacy `_level` /
    /// `_step` suffixed spellings (`pyramid_3_level`, `process_flow_3_step`)
    /// and `mindmap` without the underscore.
    ///
    /// Returns `None` for unknown tags.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        // Strip legacy suffixes: pyramid_3_level -> pyramid_3
        let tag = s
            .strip_suffix("_level")
            .or_else(|| s.strip_suffix("_step"))
            .unwrap_or(s);

        match tag {
            "flowchart" => Some(Self::Flowchart),
            "sequence" => Some(Self::Sequence),
            "gantt" => Some(Self::Gantt),
            "state" => Some(Self::State),
            "journey" => Some(Self::Journey),
            "mind_map" | "mindmap" => Some(Self::MindMap),
            "matrix_2x2" => Some(Self::Matrix2x2),
            "matrix_3x3" => Some(Self::Matrix3x3),
            "swot" => Some(Self::Swot),
            "pyramid_3" => Some(Self::Pyramid3),
            "pyramid_4" => Some(Self::Pyramid4),
            "pyramid_5" => Some(Self::Pyramid5),
            "hub_spoke_4" => Some(Self::HubSpoke4),
            "hub_spoke_6" => Some(Self::HubSpoke6),
            "process_flow_3" => Some(Self::ProcessFlow3),
            "process_flow_5" => Some(Self::ProcessFlow5),
            "cycle_3" => Some(Self::Cycle3),
            "cycle_4" => Some(Self::Cycle4),
            "cycle_5" => Some(Self::Cycle5),
            "funnel_3" => Some(Self::Funnel3),
            "funnel_4" => Some(Self::Funnel4),
            "funnel_5" => Some(Self::Funnel5),
            "venn_2" => Some(Self::Venn2),
            "venn_3" => Some(Self::Venn3),
            "honeycomb_3" => Some(Self::Honeycomb3),
            "honeycomb_5" => Some(Self::Honeycomb5),
            "honeycomb_7" => Some(Self::Honeycomb7),
            "gears_3" => Some(Self::Gears3),
            "fishbone" => Some(Self::Fishbone),
            "timeline" => Some(Self::Timeline),
            "roadmap_quarterly_4" => Some(Self::RoadmapQuarterly4),
            "pie" => Some(Self::Pie),
            "bar" => Some(Self::Bar),
            "line" => Some(Self::Line),
            "scatter" => Some(Self::Scatter),
            "histogram" => Some(Self::Histogram),
            "heatmap" => Some(Self::Heatmap),
            "area" => Some(Self::Area),
            "waterfall" => Some(Self::Waterfall),
            "treemap" => Some(Self::Treemap),
            _ => None,
        }
    }

    /// Canonical wire tag for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::Sequence => "sequence",
            Self::Gantt => "gantt",
            Self::State => "state",
            Self::Journey => "journey",
            Self::MindMap => "mind_map",
            Self::Matrix2x2 => "matrix_2x2",
            Self::Matrix3x3 => "matrix_3x3",
            Self::Swot => "swot",
            Self::Pyramid3 => "pyramid_3",
            Self::Pyramid4 => "pyramid_4",
            Self::Pyramid5 => "pyramid_5",
            Self::HubSpoke4 => "hub_spoke_4",
            Self::HubSpoke6 => "hub_spoke_6",
            Self::ProcessFlow3 => "process_flow_3",
            Self::ProcessFlow5 => "process_flow_5",
            Self::Cycle3 => "cycle_3",
            Self::Cycle4 => "cycle_4",
            Self::Cycle5 => "cycle_5",
            Self::Funnel3 => "funnel_3",
            Self::Funnel4 => "funnel_4",
            Self::Funnel5 => "funnel_5",
            Self::Venn2 => "venn_2",
            Self::Venn3 => "venn_3",
            Self::Honeycomb3 => "honeycomb_3",
            Self::Honeycomb5 => "honeycomb_5",
            Self::Honeycomb7 => "honeycomb_7",
            Self::Gears3 => "gears_3",
            Self::Fishbone => "fishbone",
            Self::Timeline => "timeline",
            Self::RoadmapQuarterly4 => "roadmap_quarterly_4",
            Self::Pie => "pie",
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::Histogram => "histogram",
            Self::Heatmap => "heatmap",
            Self::Area => "area",
            Self::Waterfall => "waterfall",
            Self::Treemap => "treemap",
        }
    }

    /// Whether this kind is expressed natively in Mermaid DSL.
    #[must_use]
    pub fn is_mermaid_native(self) -> bool {
        matches!(
            self,
            Self::Flowchart
                | Self::Sequence
                | Self::Gantt
                | Self::State
                | Self::Journey
                | Self::MindMap
        )
    }

    /// Whether this kind is a data chart.
    #[must_use]
    pub fn is_chart(self) -> bool {
        matches!(
            self,
            Self::Pie
                | Self::Bar
                | Self::Line
                | Self::Scatter
                | Self::Histogram
                | Self::Heatmap
                | Self::Area
                | Self::Waterfall
                | Self::Treemap
        )
    }

    /// Whether this kind is served by a pre-rendered SVG template.
    #[must_use]
    pub fn is_svg_template(self) -> bool {
        !self.is_mermaid_native() && !self.is_chart()
    }

    /// The number of data points this kind requires, if fixed.
    ///
    /// Kinds with a trailing count in their tag require exactly that many
    /// points (`hub_spoke_4` takes four spokes; the hub label comes from
    /// `content`). Matrices require one point per cell, SWOT one per
    /// quadrant. Mermaid-native kinds, charts, fishbone and timeline accept
    /// any count and return `None`.
    #[must_use]
    pub fn expected_points(self) -> Option<usize> {
        match self {
            Self::Matrix2x2 | Self::Swot | Self::RoadmapQuarterly4 => Some(4),
            Self::Matrix3x3 => Some(9),
            Self::Pyramid3
            | Self::ProcessFlow3
            | Self::Cycle3
            | Self::Funnel3
            | Self::Honeycomb3
            | Self::Gears3 => Some(3),
            Self::Pyramid4 | Self::HubSpoke4 | Self::Cycle4 | Self::Funnel4 => Some(4),
            Self::Pyramid5 | Self::ProcessFlow5 | Self::Cycle5 | Self::Funnel5
            | Self::Honeycomb5 => Some(5),
            Self::HubSpoke6 => Some(6),
            Self::Honeycomb7 => Some(7),
            Self::Venn2 => Some(2),
            Self::Venn3 => Some(3),
            _ => None,
        }
    }

    /// Template id this kind maps to, when it is an SVG-template kind.
    #[must_use]
    pub fn template_id(self) -> Option<&'static str> {
        self.is_svg_template().then(|| self.as_str())
    }
}

/// A generation strategy the router can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Fill a pre-rendered SVG template.
    SvgTemplate,
    /// Generate Mermaid DSL and render it.
    Mermaid,
    /// Generate a chart (executed image or source code).
    Chart,
}

impl Strategy {
    /// Wire name, used in response metadata (`generation_method`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SvgTemplate => "svg_template",
            Self::Mermaid => "mermaid",
            Self::Chart => "chart",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_tags() {
        assert_eq!(DiagramKind::parse("flowchart"), Some(DiagramKind::Flowchart));
        assert_eq!(DiagramKind::parse("matrix_2x2"), Some(DiagramKind::Matrix2x2));
        assert_eq!(DiagramKind::parse("pyramid_3"), Some(DiagramKind::Pyramid3));
        assert_eq!(DiagramKind::parse("waterfall"), Some(DiagramKind::Waterfall));
    }

    #[test]
    fn test_parse_legacy_suffixes() {
        assert_eq!(
            DiagramKind::parse("pyramid_3_level"),
            Some(DiagramKind::Pyramid3)
        );
        assert_eq!(
            DiagramKind::parse("process_flow_5_step"),
            Some(DiagramKind::ProcessFlow5)
        );
        assert_eq!(DiagramKind::parse("mindmap"), Some(DiagramKind::MindMap));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(DiagramKind::parse("mandala"), None);
        assert_eq!(DiagramKind::parse(""), None);
    }

    #[test]
    fn test_round_trip_all_kinds() {
        let tags = [
            "flowchart", "sequence", "gantt", "state", "journey", "mind_map",
            "matrix_2x2", "matrix_3x3", "swot", "pyramid_3", "pyramid_4",
            "pyramid_5", "hub_spoke_4", "hub_spoke_6", "process_flow_3",
            "process_flow_5", "cycle_3", "cycle_4", "cycle_5", "funnel_3",
            "funnel_4", "funnel_5", "venn_2", "venn_3", "honeycomb_3",
            "honeycomb_5", "honeycomb_7", "gears_3", "fishbone", "timeline",
            "roadmap_quarterly_4", "pie", "bar", "line", "scatter",
            "histogram", "heatmap", "area", "waterfall", "treemap",
        ];
        for tag in tags {
            let kind = DiagramKind::parse(tag).unwrap_or_else(|| panic!("parse {tag}"));
            assert_eq!(kind.as_str(), tag);
        }
    }

    #[test]
    fn test_classification_is_partition() {
        let all = [
            DiagramKind::Flowchart,
            DiagramKind::Matrix2x2,
            DiagramKind::Pyramid5,
            DiagramKind::Fishbone,
            DiagramKind::Pie,
            DiagramKind::Treemap,
        ];
        for kind in all {
            let classes = [
                kind.is_mermaid_native(),
                kind.is_chart(),
                kind.is_svg_template(),
            ];
            assert_eq!(
                classes.iter().filter(|c| **c).count(),
                1,
                "{kind:?} must belong to exactly one class"
            );
        }
    }

    #[test]
    fn test_expected_points() {
        assert_eq!(DiagramKind::Matrix2x2.expected_points(), Some(4));
        assert_eq!(DiagramKind::Matrix3x3.expected_points(), Some(9));
        assert_eq!(DiagramKind::Pyramid3.expected_points(), Some(3));
        assert_eq!(DiagramKind::HubSpoke6.expected_points(), Some(6));
        assert_eq!(DiagramKind::Honeycomb7.expected_points(), Some(7));
        assert_eq!(DiagramKind::Flowchart.expected_points(), None);
        assert_eq!(DiagramKind::Pie.expected_points(), None);
        assert_eq!(DiagramKind::Timeline.expected_points(), None);
    }

    #[test]
    fn test_template_id_only_for_template_kinds() {
        assert_eq!(DiagramKind::Matrix2x2.template_id(), Some("matrix_2x2"));
        assert_eq!(DiagramKind::Flowchart.template_id(), None);
        assert_eq!(DiagramKind::Bar.template_id(), None);
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(Strategy::SvgTemplate.as_str(), "svg_template");
        assert_eq!(Strategy::Mermaid.as_str(), "mermaid");
        assert_eq!(Strategy::Chart.as_str(), "chart");
    }
}
