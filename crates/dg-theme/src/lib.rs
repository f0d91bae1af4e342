//! Theme resolution for diagram generation.
//!
//! Derives a palette from a primary color (monochromatic lightness steps or
//! complementary hue rotation), chooses contrast-safe text colors, and maps
//! fills onto template slots.
//!
//! # Example
//!
//! ```
//! use dg_core::{ThemeScheme, ThemeSpec};
//! use dg_theme::resolve;
//!
//! let spec = ThemeSpec {
//!     primary_color: "#7C3AED".to_owned(),
//!     scheme: ThemeScheme::Monochromatic,
//!     ..ThemeSpec::default()
//! };
//! let theme = resolve(&spec).unwrap();
//! assert_eq!(theme.palette.len(), 7);
//! assert_eq!(theme.fill_colors(3).len(), 3);
//! ```

mod color;
mod resolver;

pub use color::{Color, Hsl, contrast_text};
pub use resolver::{ResolvedTheme, resolve};

/// Theme resolution error.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    /// Not a 6-digit `#RRGGBB` hex color.
    #[error("invalid color '{0}': expected #RRGGBB")]
    InvalidColor(String),
}
