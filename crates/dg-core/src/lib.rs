//! Shared data model for the diagram generation service.
//!
//! This crate defines the vocabulary every other crate speaks:
//!
//! - [`DiagramKind`]: the closed set of supported diagram types
//! - [`ClientEnvelope`] / [`ServerEvent`]: WebSocket message framing
//! - [`GeneratedArtifact`] / [`RenderedArtifact`]: generator and renderer output
//! - [`ErrorCode`] / [`GenerateError`]: the error taxonomy
//!
//! No I/O happens here; everything is plain data plus validation.

mod artifact;
mod envelope;
mod error;
mod kind;

pub use artifact::{
    ArtifactBody, ChartOutputKind, GeneratedArtifact, OutputType, RenderedArtifact,
};
pub use envelope::{
    ClientEnvelope, Constraints, DataPoint, DiagramRequestData, DiagramResponseData,
    EnvelopeError, ErrorData, RequestStatus, ResponseMetadata, ResponseStatus, ServerEvent,
    StatusUpdateData, ThemeScheme, ThemeSpec,
};
pub use error::{ErrorCode, GenerateError};
pub use kind::{DiagramKind, Strategy};
