//! Deterministic Mermaid builders.
//!
//! One rule-based builder per kind, consuming `data_points` positionally
//! and falling back to entities extracted from `content`. These are the
//! always-available path behind the optional LLM generator.

use dg_core::DataPoint;

use crate::extract::extract;
use crate::kind::MermaidKind;

/// Build Mermaid DSL for a kind from data points and content.
///
/// Data points win when present; otherwise entities are extracted from the
/// content. An input with no usable labels at all still produces a minimal
/// valid diagram.
#[must_use]
pub fn build(kind: MermaidKind, content: &str, data_points: &[DataPoint]) -> String {
    let labels = effective_labels(content, data_points);
    match kind {
        MermaidKind::Flowchart => flowchart(&labels),
        MermaidKind::Sequence => sequence(&labels),
        MermaidKind::Gantt => gantt(content, &labels),
        MermaidKind::State => state(&labels),
        MermaidKind::Journey => journey(content, data_points, &labels),
        MermaidKind::MindMap => mind_map(content, &labels),
    }
}

/// Labels from data points, else extracted entities, else a placeholder.
fn effective_labels(content: &str, data_points: &[DataPoint]) -> Vec<String> {
    if !data_points.is_empty() {
        return data_points.iter().map(|p| p.label.clone()).collect();
    }
    let entities = extract(content).entities;
    if entities.is_empty() {
        vec!["Item".to_owned()]
    } else {
        entities
    }
}

/// Quote a label for use inside a Mermaid node or message.
fn quote(label: &str) -> String {
    label.replace('"', "'")
}

fn flowchart(labels: &[String]) -> String {
    let mut dsl = String::from("flowchart TD\n");
    if labels.len() == 1 {
        dsl.push_str(&format!("    N1[\"{}\"]\n", quote(&labels[0])));
        // A lone node still needs a structural edge to itself-free form;
        // keep the declaration renderable by adding a start marker.
        dsl.push_str("    Start([Start]) --> N1\n");
        return dsl;
    }
    for (i, pair) in labels.windows(2).enumerate() {
        dsl.push_str(&format!(
            "    N{}[\"{}\"] --> N{}[\"{}\"]\n",
            i + 1,
            quote(&pair[0]),
            i + 2,
            quote(&pair[1]),
        ));
    }
    dsl
}

fn sequence(labels: &[String]) -> String {
    let mut dsl = String::from("sequenceDiagram\n");
    let participants: Vec<String> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            dsl.push_str(&format!("    participant P{} as {}\n", i + 1, quote(label)));
            format!("P{}", i + 1)
        })
        .collect();
    for (i, pair) in participants.windows(2).enumerate() {
        dsl.push_str(&format!(
            "    {}->>{}: step {}\n",
            pair[0],
            pair[1],
            i + 1
        ));
    }
    if participants.len() == 1 {
        dsl.push_str(&format!("    {p}->>{p}: note\n", p = participants[0]));
    }
    dsl
}

fn gantt(content: &str, labels: &[String]) -> String {
    let title = if content.trim().is_empty() {
        "Schedule"
    } else {
        content.trim()
    };
    let mut dsl = format!(
        "gantt\n    title {}\n    dateFormat YYYY-MM-DD\n    section Plan\n",
        quote(title)
    );
    for (i, label) in labels.iter().enumerate() {
        if i == 0 {
            dsl.push_str(&format!(
                "    {} :t1, 2024-01-01, 7d\n",
                quote(label)
            ));
        } else {
            dsl.push_str(&format!(
                "    {} :t{}, after t{}, 7d\n",
                quote(label),
                i + 1,
                i
            ));
        }
    }
    dsl
}

fn state(labels: &[String]) -> String {
    let mut dsl = String::from("stateDiagram-v2\n");
    let ids: Vec<String> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            dsl.push_str(&format!("    S{} : {}\n", i + 1, quote(label)));
            format!("S{}", i + 1)
        })
        .collect();
    dsl.push_str(&format!("    [*] --> {}\n", ids[0]));
    for pair in ids.windows(2) {
        dsl.push_str(&format!("    {} --> {}\n", pair[0], pair[1]));
    }
    dsl.push_str(&format!("    {} --> [*]\n", ids[ids.len() - 1]));
    dsl
}

fn journey(content: &str, data_points: &[DataPoint], labels: &[String]) -> String {
    let title = if content.trim().is_empty() {
        "User journey"
    } else {
        content.trim()
    };
    let mut dsl = format!("journey\n    title {}\n    section Journey\n", quote(title));
    for (i, label) in labels.iter().enumerate() {
        // Journey scores run 1..=5
        #[allow(clippy::cast_possible_truncation)]
        let score = data_points
            .get(i)
            .and_then(|p| p.value)
            .map_or(3_i64, |v| (v.round() as i64).clamp(1, 5));
        dsl.push_str(&format!("      {}: {score}: User\n", quote(label)));
    }
    dsl
}

fn mind_map(content: &str, labels: &[String]) -> String {
    let root = if content.trim().is_empty() {
        "Overview"
    } else {
        // First clause of the content names the central topic
        content
            .trim()
            .split(['.', ',', ':'])
            .next()
            .unwrap_or("Overview")
            .trim()
    };
    let mut dsl = format!("mindmap\n  root(({}))\n", quote(root));
    for label in labels {
        dsl.push_str(&format!("    {}\n", quote(label)));
    }
    dsl
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::kind::validate_dsl;

    fn points(labels: &[&str]) -> Vec<DataPoint> {
        labels.iter().map(|l| DataPoint::labeled(*l)).collect()
    }

    #[test]
    fn test_flowchart_from_content_arrows() {
        let dsl = build(MermaidKind::Flowchart, "Start → Validate → End", &[]);
        assert!(dsl.starts_with("flowchart TD"));
        assert!(dsl.contains("N1[\"Start\"] --> N2[\"Validate\"]"));
        assert!(dsl.contains("N2[\"Validate\"] --> N3[\"End\"]"));
        assert!(validate_dsl(MermaidKind::Flowchart, &dsl));
    }

    #[test]
    fn test_flowchart_prefers_data_points() {
        let dsl = build(
            MermaidKind::Flowchart,
            "ignored -> content",
            &points(&["A", "B", "C"]),
        );
        assert!(dsl.contains("N1[\"A\"]"));
        assert!(!dsl.contains("ignored"));
    }

    #[test]
    fn test_flowchart_single_label_still_valid() {
        let dsl = build(MermaidKind::Flowchart, "Only step", &[]);
        assert!(validate_dsl(MermaidKind::Flowchart, &dsl));
    }

    #[test]
    fn test_sequence_builder() {
        let dsl = build(MermaidKind::Sequence, "", &points(&["Client", "Server"]));
        assert!(dsl.starts_with("sequenceDiagram"));
        assert!(dsl.contains("participant P1 as Client"));
        assert!(dsl.contains("P1->>P2: step 1"));
        assert!(validate_dsl(MermaidKind::Sequence, &dsl));
    }

    #[test]
    fn test_gantt_builder_chains_tasks() {
        let dsl = build(
            MermaidKind::Gantt,
            "Release plan",
            &points(&["Design", "Build", "Ship"]),
        );
        assert!(dsl.contains("title Release plan"));
        assert!(dsl.contains(":t1, 2024-01-01, 7d"));
        assert!(dsl.contains(":t2, after t1, 7d"));
        assert!(dsl.contains(":t3, after t2, 7d"));
        assert!(validate_dsl(MermaidKind::Gantt, &dsl));
    }

    #[test]
    fn test_state_builder_has_initial_and_final() {
        let dsl = build(MermaidKind::State, "", &points(&["Idle", "Running", "Done"]));
        assert!(dsl.contains("[*] --> S1"));
        assert!(dsl.contains("S1 --> S2"));
        assert!(dsl.contains("S3 --> [*]"));
        assert!(validate_dsl(MermaidKind::State, &dsl));
    }

    #[test]
    fn test_journey_scores_from_values() {
        let mut steps = points(&["Discover", "Buy"]);
        steps[0].value = Some(4.0);
        steps[1].value = Some(9.0); // clamped to 5
        let dsl = build(MermaidKind::Journey, "Purchase", &steps);
        assert!(dsl.contains("Discover: 4: User"));
        assert!(dsl.contains("Buy: 5: User"));
        assert!(validate_dsl(MermaidKind::Journey, &dsl));
    }

    #[test]
    fn test_mind_map_root_from_content() {
        let dsl = build(
            MermaidKind::MindMap,
            "Growth levers: marketing, sales",
            &points(&["Marketing", "Sales"]),
        );
        assert!(dsl.contains("root((Growth levers))"));
        assert!(dsl.contains("    Marketing"));
        assert!(validate_dsl(MermaidKind::MindMap, &dsl));
    }

    #[test]
    fn test_quotes_are_stripped_from_labels() {
        let dsl = build(MermaidKind::Flowchart, "", &points(&["say \"hi\"", "done"]));
        assert!(dsl.contains("say 'hi'"));
    }

    #[test]
    fn test_every_builder_validates_with_empty_input() {
        for kind in [
            MermaidKind::Flowchart,
            MermaidKind::Sequence,
            MermaidKind::Gantt,
            MermaidKind::State,
            MermaidKind::Journey,
            MermaidKind::MindMap,
        ] {
            let dsl = build(kind, "", &[]);
            assert!(validate_dsl(kind, &dsl), "{kind:?} failed on empty input:\n{dsl}");
        }
    }
}
