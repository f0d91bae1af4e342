//! SVG template library.
//!
//! Templates are read-only SVG documents with slot markers
//! (`data-slot="text-N"`, `data-slot="fill-N"`); filling one produces a new
//! document with labels substituted, theme fills applied by slot index, and
//! `<title>` elements stripped for the flat look.
//!
//! # Example
//!
//! ```
//! use dg_core::ThemeSpec;
//! use dg_templates::TemplateLibrary;
//!
//! let library = TemplateLibrary::load(None).unwrap();
//! let theme = dg_theme::resolve(&ThemeSpec::default()).unwrap();
//! let labels = vec!["Top".to_owned(), "Middle".to_owned(), "Base".to_owned()];
//! let svg = library.fill("pyramid_3", &labels, &theme).unwrap();
//! assert!(svg.contains("Top"));
//! ```

mod library;
mod template;

pub use library::TemplateLibrary;
pub use template::Template;

/// Template errors.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// No template with the requested id.
    #[error("template not found: {0}")]
    NotFound(String),

    /// The document is not usable as a template. Fatal at startup.
    #[error("malformed template '{id}': {reason}")]
    Malformed {
        /// Template id.
        id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Slot indices are duplicated or non-contiguous.
    #[error("invalid slot count in template '{id}': {reason}")]
    InvalidSlotCount {
        /// Template id.
        id: String,
        /// What is wrong with the slots.
        reason: String,
    },

    /// Reading a template file failed.
    #[error("template io: {0}")]
    Io(#[from] std::io::Error),
}
