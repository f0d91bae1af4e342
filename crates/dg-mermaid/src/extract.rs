//! Entity and relationship extraction from free-form content.
//!
//! A deliberately simple keyword/regex pass: arrows and sequence words
//! split the content into ordered entities. The result seeds both the LLM
//! prompt and the deterministic builders when no data points were given.

use std::sync::LazyLock;

use regex::Regex;

static ARROWS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:→|->|=>|⇒)\s*").expect("static regex"));
static THEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*[,;]?\s+then\s+").expect("static regex"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+[.)]\s*").expect("static regex"));

/// Ordered entities extracted from content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Entity labels in narrative order.
    pub entities: Vec<String>,
}

impl Extraction {
    /// Consecutive entity pairs, in order.
    #[must_use]
    pub fn relationships(&self) -> Vec<(&str, &str)> {
        self.entities
            .windows(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
            .collect()
    }
}

/// Extract ordered entities from free-form content.
///
/// Tried in order: arrow chains (`A -> B -> C`), numbered lists,
/// "then"-joined phrases. Whatever first yields at least two entities
/// wins; otherwise the trimmed content is the sole entity.
#[must_use]
pub fn extract(content: &str) -> Extraction {
    let content = content.trim();
    if content.is_empty() {
        return Extraction { entities: Vec::new() };
    }

    for splitter in [&*ARROWS, &*NUMBERED, &*THEN] {
        let entities: Vec<String> = splitter
            .split(content)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_owned)
            .collect();
        if entities.len() >= 2 {
            return Extraction { entities };
        }
    }

    Extraction {
        entities: vec![content.to_owned()],
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_arrow_chain() {
        let extraction = extract("Start → Validate → End");
        assert_eq!(extraction.entities, vec!["Start", "Validate", "End"]);
        assert_eq!(
            extraction.relationships(),
            vec![("Start", "Validate"), ("Validate", "End")]
        );
    }

    #[test]
    fn test_ascii_arrows() {
        let extraction = extract("fetch -> parse => store");
        assert_eq!(extraction.entities, vec!["fetch", "parse", "store"]);
    }

    #[test]
    fn test_then_chain() {
        let extraction = extract("Collect input, then clean it then publish");
        assert_eq!(
            extraction.entities,
            vec!["Collect input", "clean it", "publish"]
        );
    }

    #[test]
    fn test_numbered_list() {
        let extraction = extract("1. Draft\n2. Review\n3. Ship");
        assert_eq!(extraction.entities, vec!["Draft", "Review", "Ship"]);
    }

    #[test]
    fn test_plain_content_single_entity() {
        let extraction = extract("Quarterly revenue overview");
        assert_eq!(extraction.entities, vec!["Quarterly revenue overview"]);
        assert!(extraction.relationships().is_empty());
    }

    #[test]
    fn test_empty_content() {
        assert!(extract("   ").entities.is_empty());
    }
}
