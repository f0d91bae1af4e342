//! Template loading and indexing.
//!
//! A built-in set ships embedded in the crate; a configured template
//! directory adds to or overrides it at startup. The library is read-only
//! after construction, so lookups need no locking.

use std::collections::HashMap;
use std::path::Path;

use dg_theme::ResolvedTheme;

use crate::TemplateError;
use crate::template::Template;

/// Embedded built-in templates: `(id, svg source)`.
const BUILTIN: &[(&str, &str)] = &[
    ("cycle_3", include_str!("../assets/cycle_3.svg")),
    ("cycle_4", include_str!("../assets/cycle_4.svg")),
    ("cycle_5", include_str!("../assets/cycle_5.svg")),
    ("fishbone", include_str!("../assets/fishbone.svg")),
    ("funnel_3", include_str!("../assets/funnel_3.svg")),
    ("funnel_4", include_str!("../assets/funnel_4.svg")),
    ("funnel_5", include_str!("../assets/funnel_5.svg")),
    ("gears_3", include_str!("../assets/gears_3.svg")),
    ("honeycomb_3", include_str!("../assets/honeycomb_3.svg")),
    ("honeycomb_5", include_str!("../assets/honeycomb_5.svg")),
    ("honeycomb_7", include_str!("../assets/honeycomb_7.svg")),
    ("hub_spoke_4", include_str!("../assets/hub_spoke_4.svg")),
    ("hub_spoke_6", include_str!("../assets/hub_spoke_6.svg")),
    ("matrix_2x2", include_str!("../assets/matrix_2x2.svg")),
    ("matrix_3x3", include_str!("../assets/matrix_3x3.svg")),
    ("process_flow_3", include_str!("../assets/process_flow_3.svg")),
    ("process_flow_5", include_str!("../assets/process_flow_5.svg")),
    ("pyramid_3", include_str!("../assets/pyramid_3.svg")),
    ("pyramid_4", include_str!("../assets/pyramid_4.svg")),
    ("pyramid_5", include_str!("../assets/pyramid_5.svg")),
    (
        "roadmap_quarterly_4",
        include_str!("../assets/roadmap_quarterly_4.svg"),
    ),
    ("swot", include_str!("../assets/swot.svg")),
    ("timeline", include_str!("../assets/timeline.svg")),
    ("venn_2", include_str!("../assets/venn_2.svg")),
    ("venn_3", include_str!("../assets/venn_3.svg")),
];

/// Indexed collection of SVG templates.
pub struct TemplateLibrary {
    templates: HashMap<String, Template>,
}

impl TemplateLibrary {
    /// Load the built-in set plus, optionally, every `*.svg` under
    /// `template_dir`. Directory templates override built-ins with the same
    /// id (the file stem).
    ///
    /// # Errors
    ///
    /// A malformed template anywhere is fatal, per the startup contract.
    pub fn load(template_dir: Option<&Path>) -> Result<Self, TemplateError> {
        let mut templates = HashMap::with_capacity(BUILTIN.len());
        for (id, source) in BUILTIN {
            let template = Template::parse(*id, *source)?;
            templates.insert((*id).to_owned(), template);
        }

        if let Some(dir) = template_dir {
            let pattern = dir.join("*.svg");
            let entries = glob::glob(&pattern.to_string_lossy()).map_err(|e| {
                TemplateError::Malformed {
                    id: dir.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
            for entry in entries {
                let path = entry.map_err(|e| TemplateError::Io(e.into_error()))?;
                let Some(id) = path.file_stem().map(|s| s.to_string_lossy().into_owned())
                else {
                    continue;
                };
                let source = std::fs::read_to_string(&path)?;
                let template = Template::parse(id.clone(), source)?;
                tracing::debug!(id = %id, path = %path.display(), "loaded template");
                templates.insert(id, template);
            }
        }

        Ok(Self { templates })
    }

    /// Look up a template by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    /// Whether a template with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    /// Number of loaded templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the library is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Fill a template with labels and theme colors.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] for an unknown id.
    pub fn fill(
        &self,
        id: &str,
        labels: &[String],
        theme: &ResolvedTheme,
    ) -> Result<String, TemplateError> {
        let template = self
            .get(id)
            .ok_or_else(|| TemplateError::NotFound(id.to_owned()))?;
        Ok(template.fill(labels, theme))
    }
}

#[cfg(test)]
mod tests {
    use dg_core::{DiagramKind, ThemeScheme, ThemeSpec};
    use pretty_assertions::assert_eq;

    use super::*;

    fn theme() -> ResolvedTheme {
        dg_theme::resolve(&ThemeSpec {
            primary_color: "#7C3AED".to_owned(),
            scheme: ThemeScheme::Monochromatic,
            ..ThemeSpec::default()
        })
        .unwrap()
    }

    #[test]
    fn test_builtin_set_loads() {
        let library = TemplateLibrary::load(None).unwrap();
        assert_eq!(library.len(), 25);
    }

    #[test]
    fn test_every_svg_template_kind_has_a_builtin() {
        let library = TemplateLibrary::load(None).unwrap();
        let tags = [
            "matrix_2x2", "matrix_3x3", "swot", "pyramid_3", "pyramid_4",
            "pyramid_5", "hub_spoke_4", "hub_spoke_6", "process_flow_3",
            "process_flow_5", "cycle_3", "cycle_4", "cycle_5", "funnel_3",
            "funnel_4", "funnel_5", "venn_2", "venn_3", "honeycomb_3",
            "honeycomb_5", "honeycomb_7", "gears_3", "fishbone", "timeline",
            "roadmap_quarterly_4",
        ];
        for tag in tags {
            let kind = DiagramKind::parse(tag).unwrap();
            assert!(kind.is_svg_template(), "{tag} should be a template kind");
            assert!(library.contains(tag), "missing builtin template {tag}");
        }
    }

    #[test]
    fn test_builtin_slot_arity_matches_kind_cardinality() {
        let library = TemplateLibrary::load(None).unwrap();
        for (id, _) in BUILTIN {
            let Some(expected) = DiagramKind::parse(id).and_then(DiagramKind::expected_points)
            else {
                continue;
            };
            let template = library.get(id).unwrap();
            assert_eq!(
                template.text_slots, expected,
                "{id} text slots vs required points"
            );
        }
    }

    #[test]
    fn test_fill_unknown_template() {
        let library = TemplateLibrary::load(None).unwrap();
        let err = library.fill("mandala", &[], &theme()).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(_)));
    }

    #[test]
    fn test_fill_pyramid_labels_in_order() {
        let library = TemplateLibrary::load(None).unwrap();
        let labels = vec![
            "Executive".to_owned(),
            "Management".to_owned(),
            "Operations".to_owned(),
        ];
        let filled = library.fill("pyramid_3", &labels, &theme()).unwrap();
        let exec = filled.find("Executive").unwrap();
        let mgmt = filled.find("Management").unwrap();
        let ops = filled.find("Operations").unwrap();
        assert!(exec < mgmt && mgmt < ops, "labels must appear top to bottom");
        assert!(!filled.contains("<title>"));
    }

    #[test]
    fn test_template_dir_overrides_builtin(){
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("swot.svg"),
            r#"<svg><rect data-slot="fill-0"/><text data-slot="text-0">S</text></svg>"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("custom_grid.svg"),
            r#"<svg><rect data-slot="fill-0"/><text data-slot="text-0">X</text></svg>"#,
        )
        .unwrap();

        let library = TemplateLibrary::load(Some(dir.path())).unwrap();
        assert_eq!(library.len(), 26);
        assert_eq!(library.get("swot").unwrap().fill_slots, 1);
        assert!(library.contains("custom_grid"));
    }

    #[test]
    fn test_malformed_dir_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.svg"), "<svg></svg>").unwrap();
        assert!(TemplateLibrary::load(Some(dir.path())).is_err());
    }
}
