//! WebSocket message envelopes.
//!
//! Client frames deserialize into [`ClientEnvelope`]; everything the server
//! emits is a [`ServerEvent`]. Both are internally tagged on `type` and use
//! snake_case field names, matching the wire contract.
//!
//! ## Serialization
//!
//! ```json
//! { "type": "status_update", "request_id": "r1", "seq": 2,
//!   "data": { "status": "generating", "message": "...", "progress": 40 } }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::kind::DiagramKind;

/// A message received from the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEnvelope {
    /// Request to generate a diagram.
    DiagramRequest {
        /// Client-chosen id, unique per connection.
        request_id: String,
        /// Echoes the connection's `session_id` query parameter.
        #[serde(default)]
        session_id: Option<String>,
        /// Echoes the connection's `user_id` query parameter.
        #[serde(default)]
        user_id: Option<String>,
        /// The diagram request body.
        data: DiagramRequestData,
    },
    /// Cancel an in-flight request.
    Cancel {
        /// The request to cancel.
        request_id: String,
    },
    /// Keepalive; answered with `pong`.
    Ping,
}

/// Why a client frame could not be turned into a [`ClientEnvelope`].
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The frame is not valid JSON, or a known type is missing fields.
    /// The connection is closed with code 1008.
    #[error("invalid frame: {0}")]
    Invalid(String),
    /// The `type` field names no known message type. The connection stays
    /// open; the client receives an error event.
    #[error("unknown message type '{type_name}'")]
    UnknownType {
        /// The unrecognized type tag.
        type_name: String,
        /// The frame's `request_id`, if it carried one.
        request_id: Option<String>,
    },
}

impl ClientEnvelope {
    /// Parse a text frame.
    ///
    /// Distinguishes malformed frames (invalid JSON, missing fields on a
    /// known type) from frames with an unknown `type`, because the two have
    /// different connection-level consequences.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Invalid`] or [`EnvelopeError::UnknownType`].
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| EnvelopeError::Invalid(e.to_string()))?;

        let type_name = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| EnvelopeError::Invalid("missing 'type' field".to_owned()))?;

        if !matches!(type_name, "diagram_request" | "cancel" | "ping") {
            let request_id = value
                .get("request_id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned);
            return Err(EnvelopeError::UnknownType {
                type_name: type_name.to_owned(),
                request_id,
            });
        }

        serde_json::from_value(value).map_err(|e| EnvelopeError::Invalid(e.to_string()))
    }
}

/// Body of a `diagram_request` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramRequestData {
    /// Requested diagram kind (wire tag, validated via [`DiagramKind::parse`]).
    pub diagram_type: String,
    /// Free-form description of the diagram.
    #[serde(default)]
    pub content: String,
    /// Ordered data points; interpretation depends on `diagram_type`.
    #[serde(default)]
    pub data_points: Vec<DataPoint>,
    /// Theme specification.
    #[serde(default)]
    pub theme: ThemeSpec,
    /// Optional size hints.
    #[serde(default)]
    pub constraints: Option<Constraints>,
}

impl DiagramRequestData {
    /// Validate the request body and resolve its kind.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorData`] ready to be sent to the client:
    /// [`ErrorCode::UnsupportedDiagramKind`] for an unknown kind,
    /// [`ErrorCode::ValidationError`] for bad colors or a point-count
    /// mismatch.
    pub fn validate(&self) -> Result<DiagramKind, ErrorData> {
        let kind = DiagramKind::parse(&self.diagram_type).ok_or_else(|| ErrorData {
            code: ErrorCode::UnsupportedDiagramKind,
            message: format!("unknown diagram type '{}'", self.diagram_type),
            details: None,
        })?;

        for (field, color) in [
            ("primary_color", Some(&self.theme.primary_color)),
            ("secondary_color", self.theme.secondary_color.as_ref()),
            ("accent_color", self.theme.accent_color.as_ref()),
            ("background", self.theme.background.as_ref()),
            ("text_color", self.theme.text_color.as_ref()),
        ] {
            if let Some(color) = color
                && !is_hex_color(color)
            {
                return Err(ErrorData {
                    code: ErrorCode::ValidationError,
                    message: format!("theme.{field} is not a 6-digit hex color"),
                    details: Some(color.clone()),
                });
            }
        }

        if let Some(expected) = kind.expected_points()
            && self.data_points.len() != expected
        {
            return Err(ErrorData {
                code: ErrorCode::ValidationError,
                message: format!(
                    "{} requires exactly {expected} data points, got {}",
                    kind.as_str(),
                    self.data_points.len()
                ),
                details: None,
            });
        }

        Ok(kind)
    }
}

/// Whether `s` is a `#RRGGBB` hex color.
fn is_hex_color(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// One labeled data point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPoint {
    /// Display label.
    pub label: String,
    /// Numeric value (series kinds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Longer description (template kinds may render it as secondary text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form extra data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl DataPoint {
    /// Point with only a label.
    #[must_use]
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
            description: None,
            metadata: None,
        }
    }
}

/// Palette derivation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeScheme {
    /// Seven lightness steps of the primary color.
    #[default]
    Monochromatic,
    /// Primary plus hue-rotated complement and triadic accent.
    Complementary,
}

/// Theme specification as sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeSpec {
    /// Primary color, 6-digit hex.
    pub primary_color: String,
    /// Secondary color; derived when unset and the scheme is complementary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    /// Accent color; derived when unset and the scheme is complementary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    /// Palette derivation scheme.
    pub scheme: ThemeScheme,
    /// Background color (default `#FFFFFF`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Text color; derived from background luminance when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    /// Font family hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Style hint (free-form).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Flat look: borders equal fills, no gradients, no `<title>` elements.
    pub smart_theming: bool,
}

impl Default for ThemeSpec {
    fn default() -> Self {
        Self {
            primary_color: "#2563EB".to_owned(),
            secondary_color: None,
            accent_color: None,
            scheme: ThemeScheme::default(),
            background: None,
            text_color: None,
            font_family: None,
            style: None,
            smart_theming: true,
        }
    }
}

/// Optional size hints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Constraints {
    /// Maximum width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    /// Maximum height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
}

/// A message sent to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Progress update during request processing.
    StatusUpdate {
        /// Originating request.
        request_id: String,
        /// Per-request sequence number, strictly increasing from 1.
        seq: u64,
        /// Update payload.
        data: StatusUpdateData,
    },
    /// Terminal response for a request.
    DiagramResponse {
        /// Originating request.
        request_id: String,
        /// Per-request sequence number.
        seq: u64,
        /// Response payload.
        data: DiagramResponseData,
    },
    /// Terminal error for a request (or a frame-level error).
    Error {
        /// Originating request, if known.
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        /// Error payload.
        data: ErrorData,
    },
    /// Answer to a `ping`.
    Pong,
}

impl ServerEvent {
    /// The `request_id` this event belongs to, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::StatusUpdate { request_id, .. } | Self::DiagramResponse { request_id, .. } => {
                Some(request_id)
            }
            Self::Error { request_id, .. } => request_id.as_deref(),
            Self::Pong => None,
        }
    }
}

/// Request lifecycle status reported in `status_update` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Thinking,
    Generating,
    Rendering,
    Saving,
    Complete,
    Error,
    Cancelled,
}

/// Payload of a `status_update` event.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdateData {
    /// Lifecycle status.
    pub status: RequestStatus,
    /// Human-readable message.
    pub message: String,
    /// Progress percentage, 0..=100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

/// Terminal status of a `diagram_response`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
    Cancelled,
}

/// Payload of a `diagram_response` event.
#[derive(Debug, Clone, Serialize)]
pub struct DiagramResponseData {
    /// Terminal status.
    pub status: ResponseStatus,
    /// Diagram kind (wire tag).
    pub diagram_type: String,
    /// Output family.
    pub output_type: crate::artifact::OutputType,
    /// Inline body; omitted when delivered by URL only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// MIME type of the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Public URL; omitted when delivered inline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Generation metadata.
    pub metadata: ResponseMetadata,
}

/// Metadata attached to a `diagram_response`.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    /// Which strategy produced the artifact.
    pub generation_method: String,
    /// Whether the artifact came from the cache.
    pub cache_hit: bool,
    /// The resolved theme that was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_applied: Option<serde_json::Value>,
    /// End-to-end generation time in milliseconds.
    pub generation_time_ms: u64,
}

/// Payload of an `error` event.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorData {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Extra detail, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
