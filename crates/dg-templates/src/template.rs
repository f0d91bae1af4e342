//! A single SVG template and its fill operation.
//!
//! Slots are declared with `data-slot="text-N"` / `data-slot="fill-N"`
//! attributes; a legacy path recognizes `id="label-N"` / `id="shape-N"`.
//! The slot index embedded in the attribute addresses the slot: fills are
//! assigned by that index, never by document order, so sibling quadrants
//! can never swap or share colors when the document is reformatted.

use std::sync::LazyLock;

use regex::Regex;

use dg_theme::ResolvedTheme;

use crate::TemplateError;

static TEXT_SLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-slot\s*=\s*"text-(\d+)"|id\s*=\s*"label-(\d+)""#).expect("static regex")
});
static FILL_SLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-slot\s*=\s*"fill-(\d+)"|id\s*=\s*"shape-(\d+)""#).expect("static regex")
});
static TITLE_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title[^>]*>.*?</title>").expect("static regex"));

/// A parsed, read-only SVG template.
#[derive(Debug, Clone)]
pub struct Template {
    /// Template id (the diagram kind tag it serves).
    pub id: String,
    /// Raw SVG document.
    body: String,
    /// Number of text slots.
    pub text_slots: usize,
    /// Number of fill slots.
    pub fill_slots: usize,
}

impl Template {
    /// Parse an SVG document into a template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Malformed`] if the document is not SVG or
    /// declares no slots, and [`TemplateError::InvalidSlotCount`] if slot
    /// indices are duplicated or leave gaps.
    pub fn parse(id: impl Into<String>, body: impl Into<String>) -> Result<Self, TemplateError> {
        let id = id.into();
        let body = body.into();

        if !body.contains("<svg") {
            return Err(TemplateError::Malformed {
                id,
                reason: "not an SVG document".to_owned(),
            });
        }

        let text_slots = slot_count(&id, &TEXT_SLOT, &body)?;
        let fill_slots = slot_count(&id, &FILL_SLOT, &body)?;
        if text_slots == 0 && fill_slots == 0 {
            return Err(TemplateError::Malformed {
                id,
                reason: "no slots declared".to_owned(),
            });
        }

        Ok(Self {
            id,
            body,
            text_slots,
            fill_slots,
        })
    }

    /// Fill the template with labels and theme colors.
    ///
    /// - Text slot `i` takes `labels[i]`; missing labels keep the
    ///   template's default text, extras are ignored.
    /// - Fill slot `i` takes the theme's slot color `i`; with
    ///   `smart_theming` the stroke is set equal to the fill.
    /// - Each text slot's color is chosen by the luminance of the matching
    ///   fill.
    /// - `<title>` elements are removed.
    #[must_use]
    pub fn fill(&self, labels: &[String], theme: &ResolvedTheme) -> String {
        let fills = theme.fill_colors(self.fill_slots);
        let mut svg = self.body.clone();

        for (i, color) in fills.iter().enumerate() {
            svg = rewrite_slot_tag(&svg, &fill_slot_pattern(i), |tag| {
                let tag = set_attr(tag, "fill", color);
                if theme.smart_theming {
                    set_attr(&tag, "stroke", color)
                } else {
                    tag
                }
            });
        }

        for i in 0..self.text_slots {
            let text_color = if fills.is_empty() {
                theme.text_color.clone()
            } else {
                theme.text_on(&fills[i % fills.len()]).to_owned()
            };
            svg = rewrite_text_slot(&svg, i, labels.get(i).map(String::as_str), &text_color);
        }

        svg = TITLE_ELEMENT.replace_all(&svg, "").into_owned();

        svg
    }
}

/// Count slots matched by `pattern`, validating contiguous indices from 0.
fn slot_count(id: &str, pattern: &Regex, body: &str) -> Result<usize, TemplateError> {
    let mut indices: Vec<usize> = pattern
        .captures_iter(body)
        .filter_map(|c| {
            c.get(1)
                .or_else(|| c.get(2))
                .and_then(|m| m.as_str().parse().ok())
        })
        .collect();
    indices.sort_unstable();

    for (expected, actual) in indices.iter().enumerate() {
        if *actual != expected {
            return Err(TemplateError::InvalidSlotCount {
                id: id.to_owned(),
                reason: format!("slot indices must be contiguous from 0, found {actual}"),
            });
        }
    }
    Ok(indices.len())
}

/// Regex matching a tag carrying fill slot `i` (either addressing style).
fn fill_slot_pattern(i: usize) -> Regex {
    Regex::new(&format!(
        r#"<[^>]*(?:data-slot\s*=\s*"fill-{i}"|id\s*=\s*"shape-{i}")[^>]*/?>"#
    ))
    .expect("slot pattern")
}

/// Rewrite every tag matching `pattern` through `edit`.
fn rewrite_slot_tag(svg: &str, pattern: &Regex, edit: impl Fn(&str) -> String) -> String {
    pattern
        .replace_all(svg, |caps: &regex::Captures<'_>| edit(&caps[0]))
        .into_owned()
}

/// Set or replace an attribute inside a single tag string.
fn set_attr(tag: &str, name: &str, value: &str) -> String {
    let existing =
        Regex::new(&format!(r#"{name}\s*=\s*"[^"]*""#)).expect("attr pattern");
    if existing.is_match(tag) {
        existing
            .replace(tag, format!(r#"{name}="{value}""#).as_str())
            .into_owned()
    } else if let Some(rest) = tag.strip_suffix("/>") {
        format!(r#"{rest} {name}="{value}"/>"#)
    } else if let Some(rest) = tag.strip_suffix('>') {
        format!(r#"{rest} {name}="{value}">"#)
    } else {
        tag.to_owned()
    }
}

/// Replace a text slot's content and set its color.
fn rewrite_text_slot(svg: &str, i: usize, label: Option<&str>, color: &str) -> String {
    let pattern = Regex::new(&format!(
        r#"(?s)(<text[^>]*(?:data-slot\s*=\s*"text-{i}"|id\s*=\s*"label-{i}")[^>]*)>(.*?)(</text>)"#
    ))
    .expect("text slot pattern");

    pattern
        .replace(svg, |caps: &regex::Captures<'_>| {
            let open = set_attr(&format!("{}>", &caps[1]), "fill", color);
            let content = label.map_or_else(|| caps[2].to_owned(), escape_xml);
            format!("{open}{content}{}", &caps[3])
        })
        .into_owned()
}

/// Minimal XML text escaping.
fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
