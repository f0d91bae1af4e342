//! Cache key computation.
//!
//! Provides [`CacheKey`] for computing content-based hashes used as cache
//! keys. The hash covers the normalized diagram kind, the canonical-JSON
//! request payload, and the canonical-JSON resolved theme, each segment
//! length-prefixed so field boundaries can never alias.

use sha2::{Digest, Sha256};

/// Request parameters that determine the rendered artifact.
#[derive(Debug)]
pub struct CacheKey<'a> {
    /// Diagram kind tag, lowercased.
    pub kind: &'a str,
    /// Canonical JSON of `content` + `data_points`.
    pub payload: &'a str,
    /// Canonical JSON of the resolved theme.
    pub theme: &'a str,
}

impl CacheKey<'_> {
    /// Compute the content hash for this key.
    ///
    /// # Hash Format
    ///
    /// SHA-256 over `{len}:{bytes}` for each of kind, payload, theme, in
    /// that order. Length prefixes make `("ab", "c")` and `("a", "bc")`
    /// hash differently.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for segment in [self.kind, self.payload, self.theme] {
            hasher.update(segment.len().to_string().as_bytes());
            hasher.update(b":");
            hasher.update(segment.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_inputs_same_hash() {
        let a = CacheKey { kind: "pyramid_3", payload: "{}", theme: "{}" };
        let b = CacheKey { kind: "pyramid_3", payload: "{}", theme: "{}" };
        assert_eq!(a.compute_hash(), b.compute_hash());
        assert_eq!(a.compute_hash().len(), 64);
    }

    #[test]
    fn test_each_field_matters() {
        let base = CacheKey { kind: "pie", payload: "p", theme: "t" };
        let kind = CacheKey { kind: "bar", ..base };
        assert_ne!(base.compute_hash(), kind.compute_hash());

        let base = CacheKey { kind: "pie", payload: "p", theme: "t" };
        let payload = CacheKey { payload: "q", ..base };
        assert_ne!(
            CacheKey { kind: "pie", payload: "p", theme: "t" }.compute_hash(),
            payload.compute_hash()
        );
    }

    #[test]
    fn test_length_prefix_prevents_aliasing() {
        let a = CacheKey { kind: "ab", payload: "c", theme: "" };
        let b = CacheKey { kind: "a", payload: "bc", theme: "" };
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_hash_is_hex() {
        let hash = CacheKey { kind: "swot", payload: "{}", theme: "{}" }.compute_hash();
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
