//! Theme resolution.
//!
//! Turns a client [`ThemeSpec`] into a [`ResolvedTheme`]: defaults filled,
//! palette derived per scheme, text colors chosen by luminance.
//!
//! Monochromatic palettes step lightness from 0.15 to 0.85 in seven shades
//! at the primary's hue and saturation. Complementary palettes pair the
//! primary with its 180° complement and 120° triadic accent.
//!
//! Template fills do not consume the seven-step palette positionally; they
//! use [`ResolvedTheme::fill_colors`], which ramps lightness 0.30→0.80
//! across the actual slot count (monochromatic) or cycles the three-color
//! palette with per-cycle lightening (complementary) so that no two slots
//! of a matrix ever share a color.

use serde::Serialize;

use dg_core::{ThemeScheme, ThemeSpec};

use crate::ThemeError;
use crate::color::{Color, contrast_text};

/// Number of shades in a monochromatic palette.
const MONO_SHADES: usize = 7;
/// Lightness bounds of the monochromatic palette.
const MONO_RANGE: (f64, f64) = (0.15, 0.85);
/// Lightness bounds of the per-slot fill ramp.
const FILL_RANGE: (f64, f64) = (0.30, 0.80);
/// Lightness added per repeat cycle when fills outnumber the palette.
const CYCLE_LIGHTEN: f64 = 0.15;

/// A fully resolved theme.
///
/// Serializes deterministically (all colors uppercase hex); the serialized
/// form participates in cache keys and is echoed in response metadata as
/// `theme_applied`.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTheme {
    /// Derivation scheme.
    pub scheme: ThemeScheme,
    /// Primary color.
    pub primary: String,
    /// Secondary color (complement, or a light shade for monochromatic).
    pub secondary: String,
    /// Accent color (triadic, or a dark shade for monochromatic).
    pub accent: String,
    /// Full palette: seven shades (monochromatic) or three colors
    /// (complementary).
    pub palette: Vec<String>,
    /// Background color.
    pub background: String,
    /// Default text color, contrast-checked against the background.
    pub text_color: String,
    /// Font family.
    pub font_family: String,
    /// Flat look: strokes equal fills, no `<title>` elements.
    pub smart_theming: bool,
}

/// Resolve a theme specification.
///
/// # Errors
///
/// Returns [`ThemeError::InvalidColor`] if any provided color fails to
/// parse.
pub fn resolve(spec: &ThemeSpec) -> Result<ResolvedTheme, ThemeError> {
    let primary = Color::parse(&spec.primary_color)?;
    let background = spec
        .background
        .as_deref()
        .map_or(Ok(Color { r: 255, g: 255, b: 255 }), Color::parse)?;
    let text_color = match &spec.text_color {
        Some(given) => Color::parse(given)?.to_hex(),
        None => contrast_text(background).to_owned(),
    };

    let hsl = primary.to_hsl();
    let (secondary, accent, palette) = match spec.scheme {
        ThemeScheme::Monochromatic => {
            let palette: Vec<String> = (0..MONO_SHADES)
                .map(|i| {
                    #[allow(clippy::cast_precision_loss)]
                    let t = i as f64 / (MONO_SHADES - 1) as f64;
                    let l = MONO_RANGE.0 + t * (MONO_RANGE.1 - MONO_RANGE.0);
                    hsl.with_lightness(l).to_color().to_hex()
                })
                .collect();
            // Light and dark companions for callers that want two accents
            let secondary = spec
                .secondary_color
                .as_deref()
                .map_or_else(|| palette[5].clone(), str::to_owned);
            let accent = spec
                .accent_color
                .as_deref()
                .map_or_else(|| palette[1].clone(), str::to_owned);
            (secondary, accent, palette)
        }
        ThemeScheme::Complementary => {
            let secondary = match spec.secondary_color.as_deref() {
                Some(given) => Color::parse(given)?,
                None => hsl.rotate_hue(180.0).to_color(),
            };
            let accent = match spec.accent_color.as_deref() {
                Some(given) => Color::parse(given)?,
                None => hsl.rotate_hue(120.0).to_color(),
            };
            // Desaturated primaries collapse under hue rotation; keep the
            // palette pairwise distinct by shifting lightness instead.
            let secondary = distinct_from(secondary, &[primary]);
            let accent = distinct_from(accent, &[primary, secondary]);
            let palette = vec![primary.to_hex(), secondary.to_hex(), accent.to_hex()];
            (secondary.to_hex(), accent.to_hex(), palette)
        }
    };

    Ok(ResolvedTheme {
        scheme: spec.scheme,
        primary: primary.to_hex(),
        secondary,
        accent,
        palette,
        background: background.to_hex(),
        text_color,
        font_family: spec
            .font_family
            .clone()
            .unwrap_or_else(|| "Inter, sans-serif".to_owned()),
        smart_theming: spec.smart_theming,
    })
}

/// Shift `candidate`'s lightness until it differs from every color in
/// `taken`.
fn distinct_from(candidate: Color, taken: &[Color]) -> Color {
    let mut current = candidate;
    let mut step = 1;
    while taken.contains(&current) {
        let hsl = candidate.to_hsl();
        let delta = CYCLE_LIGHTEN * f64::from(step);
        let l = if hsl.l + delta <= 0.95 { hsl.l + delta } else { hsl.l - delta };
        current = hsl.with_lightness(l).to_color();
        step += 1;
    }
    current
}

impl ResolvedTheme {
    /// Fill colors for `n` template slots.
    ///
    /// Monochromatic: an `n`-step lightness ramp from 0.30 to 0.80 (0.55
    /// for a single slot), strictly increasing in lightness.
    /// Complementary: cycles `[primary, secondary, accent]`, lightening
    /// each subsequent cycle so repeats never collide.
    #[must_use]
    pub fn fill_colors(&self, n: usize) -> Vec<String> {
        match self.scheme {
            ThemeScheme::Monochromatic => {
                let Ok(primary) = Color::parse(&self.primary) else {
                    return vec![self.primary.clone(); n];
                };
                let hsl = primary.to_hsl();
                (0..n)
                    .map(|i| {
                        let l = if n == 1 {
                            f64::midpoint(FILL_RANGE.0, FILL_RANGE.1)
                        } else {
                            #[allow(clippy::cast_precision_loss)]
                            let t = i as f64 / (n - 1) as f64;
                            FILL_RANGE.0 + t * (FILL_RANGE.1 - FILL_RANGE.0)
                        };
                        hsl.with_lightness(l).to_color().to_hex()
                    })
                    .collect()
            }
            ThemeScheme::Complementary => (0..n)
                .map(|i| {
                    let base = &self.palette[i % self.palette.len()];
                    let cycle = i / self.palette.len();
                    if cycle == 0 {
                        return base.clone();
                    }
                    let Ok(color) = Color::parse(base) else {
                        return base.clone();
                    };
                    let hsl = color.to_hsl();
                    #[allow(clippy::cast_precision_loss)]
                    let l = (hsl.l + CYCLE_LIGHTEN * cycle as f64).min(0.95);
                    hsl.with_lightness(l).to_color().to_hex()
                })
                .collect(),
        }
    }

    /// Text color contrasting with the given fill.
    #[must_use]
    pub fn text_on(&self, fill: &str) -> &'static str {
        Color::parse(fill).map_or("#000000", |c| contrast_text(c))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn mono_spec(primary: &str) -> ThemeSpec {
        ThemeSpec {
            primary_color: primary.to_owned(),
            scheme: ThemeScheme::Monochromatic,
            ..ThemeSpec::default()
        }
    }

    fn comp_spec(primary: &str) -> ThemeSpec {
        ThemeSpec {
            primary_color: primary.to_owned(),
            scheme: ThemeScheme::Complementary,
            ..ThemeSpec::default()
        }
    }

    #[test]
    fn test_monochromatic_palette_has_seven_distinct_shades() {
        let theme = resolve(&mono_spec("#7C3AED")).unwrap();
        assert_eq!(theme.palette.len(), 7);
        for pair in theme.palette.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        // All entries are valid hex and share the primary's hue
        let hue = Color::parse("#7C3AED").unwrap().to_hsl().h;
        for entry in &theme.palette {
            let hsl = Color::parse(entry).unwrap().to_hsl();
            assert!((hsl.h - hue).abs() < 3.0, "hue drifted: {entry}");
        }
    }

    #[test]
    fn test_monochromatic_palette_lightness_bounds() {
        let theme = resolve(&mono_spec("#2563EB")).unwrap();
        let first = Color::parse(&theme.palette[0]).unwrap().to_hsl().l;
        let last = Color::parse(&theme.palette[6]).unwrap().to_hsl().l;
        assert!((first - 0.15).abs() < 0.02);
        assert!((last - 0.85).abs() < 0.02);
    }

    #[test]
    fn test_fill_ramp_three_slots() {
        // Three slots land on lightness 0.30 / 0.55 / 0.80
        let theme = resolve(&mono_spec("#7C3AED")).unwrap();
        let fills = theme.fill_colors(3);
        let expected = [0.30, 0.55, 0.80];
        for (fill, want) in fills.iter().zip(expected) {
            let hsl = Color::parse(fill).unwrap().to_hsl();
            assert!((hsl.l - want).abs() < 0.02, "lightness {} vs {want}", hsl.l);
            assert!((hsl.h - 262.0).abs() < 3.0, "hue {}", hsl.h);
        }
    }

    #[test]
    fn test_fill_ramp_monotone_and_distinct() {
        let theme = resolve(&mono_spec("#2563EB")).unwrap();
        let fills = theme.fill_colors(4);
        let lightness: Vec<f64> = fills
            .iter()
            .map(|f| Color::parse(f).unwrap().to_hsl().l)
            .collect();
        for pair in lightness.windows(2) {
            assert!(pair[0] < pair[1], "ramp must strictly increase");
        }
        for (i, a) in fills.iter().enumerate() {
            for b in &fills[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_single_slot_uses_midpoint() {
        let theme = resolve(&mono_spec("#7C3AED")).unwrap();
        let fills = theme.fill_colors(1);
        let hsl = Color::parse(&fills[0]).unwrap().to_hsl();
        assert!((hsl.l - 0.55).abs() < 0.02);
    }

    #[test]
    fn test_complementary_derivation() {
        let theme = resolve(&comp_spec("#2563EB")).unwrap();
        let primary_hue = Color::parse("#2563EB").unwrap().to_hsl().h;
        let secondary_hue = Color::parse(&theme.secondary).unwrap().to_hsl().h;
        let accent_hue = Color::parse(&theme.accent).unwrap().to_hsl().h;
        assert!(((secondary_hue - primary_hue).rem_euclid(360.0) - 180.0).abs() < 3.0);
        assert!(((accent_hue - primary_hue).rem_euclid(360.0) - 120.0).abs() < 3.0);
    }

    #[test]
    fn test_complementary_palette_pairwise_distinct() {
        let theme = resolve(&comp_spec("#2563EB")).unwrap();
        assert_eq!(theme.palette.len(), 3);
        assert_ne!(theme.palette[0], theme.palette[1]);
        assert_ne!(theme.palette[0], theme.palette[2]);
        assert_ne!(theme.palette[1], theme.palette[2]);
    }

    #[test]
    fn test_complementary_gray_does_not_collapse() {
        // Hue rotation is a no-op on gray; lightness shifting must keep
        // the palette distinct anyway.
        let theme = resolve(&comp_spec("#808080")).unwrap();
        assert_ne!(theme.palette[0], theme.palette[1]);
        assert_ne!(theme.palette[0], theme.palette[2]);
        assert_ne!(theme.palette[1], theme.palette[2]);
    }

    #[test]
    fn test_complementary_four_fills_distinct() {
        // Regression: the fourth quadrant must not repeat the first
        let theme = resolve(&comp_spec("#2563EB")).unwrap();
        let fills = theme.fill_colors(4);
        assert_eq!(fills.len(), 4);
        assert_ne!(fills[0], fills[3]);
        for (i, a) in fills.iter().enumerate() {
            for b in &fills[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_explicit_colors_respected() {
        let spec = ThemeSpec {
            primary_color: "#2563EB".to_owned(),
            secondary_color: Some("#FF0000".to_owned()),
            scheme: ThemeScheme::Complementary,
            background: Some("#111111".to_owned()),
            ..ThemeSpec::default()
        };
        let theme = resolve(&spec).unwrap();
        assert_eq!(theme.secondary, "#FF0000");
        assert_eq!(theme.background, "#111111");
        // Dark background gets light text
        assert_eq!(theme.text_color, "#FFFFFF");
    }

    #[test]
    fn test_invalid_primary_rejected() {
        let spec = mono_spec("blue");
        assert!(resolve(&spec).is_err());
    }

    #[test]
    fn test_background_defaults_white_with_dark_text() {
        let theme = resolve(&mono_spec("#7C3AED")).unwrap();
        assert_eq!(theme.background, "#FFFFFF");
        assert_eq!(theme.text_color, "#000000");
    }

    #[test]
    fn test_text_on_fill() {
        let theme = resolve(&mono_spec("#7C3AED")).unwrap();
        assert_eq!(theme.text_on("#FFFFFF"), "#000000");
        assert_eq!(theme.text_on("#1E1B4B"), "#FFFFFF");
    }
}
