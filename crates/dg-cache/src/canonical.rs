//! Canonical JSON.
//!
//! Cache keys depend on bit-for-bit deterministic serialization across runs
//! and hosts: object keys sorted, no insignificant whitespace, numbers in
//! shortest round-trip form. `serde_json`'s default `Value` map is a
//! `BTreeMap`, so parsing and re-serializing yields exactly that.

use serde::Serialize;

/// Canonicalization error.
#[derive(Debug, thiserror::Error)]
pub enum CanonicalError {
    /// The input is not valid JSON, or the value cannot be serialized.
    #[error("canonical json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Canonicalize a JSON text.
///
/// # Errors
///
/// Returns an error if `input` is not valid JSON.
pub fn canonicalize_str(input: &str) -> Result<String, CanonicalError> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    Ok(value.to_string())
}

/// Serialize any value to canonical JSON.
///
/// Goes through `serde_json::Value` so that struct field order never leaks
/// into the output.
///
/// # Errors
///
/// Returns an error if `value` cannot be represented as JSON.
pub fn canonical_string<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    let value = serde_json::to_value(value)?;
    Ok(value.to_string())
}
