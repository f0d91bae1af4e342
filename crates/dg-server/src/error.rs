//! Server error types.

use std::net::AddrParseError;

use dg_templates::TemplateError;

/// Errors from server startup and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid bind address: {0}")]
    BindAddress(#[from] AddrParseError),

    #[error("{0}")]
    Template(#[from] TemplateError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}
