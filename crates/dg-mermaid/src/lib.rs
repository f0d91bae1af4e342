//! Mermaid DSL generation.
//!
//! Two paths, tried in order by [`MermaidGenerator`]:
//!
//! 1. An optional LLM path ([`LlmConfig`]): prompt built from the diagram
//!    kind, the user content verbatim, extracted entities, syntax rules and
//!    worked examples; the candidate DSL is validated before acceptance.
//! 2. Deterministic rule-based builders per kind, consuming data points
//!    positionally. Always available; never fail for Mermaid-expressible
//!    kinds.

mod builder;
mod extract;
mod generator;
mod kind;
mod llm;

pub use builder::build;
pub use extract::{Extraction, extract};
pub use generator::MermaidGenerator;
pub use kind::{MermaidKind, validate_dsl};
pub use llm::{LlmClient, LlmConfig};
