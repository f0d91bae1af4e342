//! RGB/HSL color math.
//!
//! Hex parsing accepts `#RRGGBB` only. HSL round-trips use round-half-up
//! when converting back to 8-bit channels. Relative luminance follows the
//! WCAG formula on linearized sRGB channels.

use crate::ThemeError;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Parse a `#RRGGBB` hex color.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError::InvalidColor`] for anything that is not a
    /// 6-digit hex color with a leading `#`.
    pub fn parse(s: &str) -> Result<Self, ThemeError> {
        let hex = s
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| ThemeError::InvalidColor(s.to_owned()))?;

        // Valid per the filter above
        let parse_pair = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| ThemeError::InvalidColor(s.to_owned()))
        };
        Ok(Self {
            r: parse_pair(0..2)?,
            g: parse_pair(2..4)?,
            b: parse_pair(4..6)?,
        })
    }

    /// Format as an uppercase `#RRGGBB` string.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Convert to HSL.
    #[must_use]
    pub fn to_hsl(self) -> Hsl {
        let r = f64::from(self.r) / 255.0;
        let g = f64::from(self.g) / 255.0;
        let b = f64::from(self.b) / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let l = f64::midpoint(max, min);

        if delta.abs() < f64::EPSILON {
            return Hsl { h: 0.0, s: 0.0, l };
        }

        let s = if l > 0.5 {
            delta / (2.0 - max - min)
        } else {
            delta / (max + min)
        };

        let h = if (max - r).abs() < f64::EPSILON {
            60.0 * (((g - b) / delta).rem_euclid(6.0))
        } else if (max - g).abs() < f64::EPSILON {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };

        Hsl { h, s, l }
    }

    /// Relative luminance on linearized sRGB channels.
    ///
    /// `0.2126 R + 0.7152 G + 0.0722 B`, each channel linearized per the
    /// sRGB transfer function.
    #[must_use]
    pub fn luminance(self) -> f64 {
        fn linearize(channel: u8) -> f64 {
            let c = f64::from(channel) / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * linearize(self.r) + 0.7152 * linearize(self.g) + 0.0722 * linearize(self.b)
    }
}

/// HSL representation: hue in degrees `[0, 360)`, saturation and lightness
/// in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    /// Convert back to 8-bit sRGB, rounding half-up.
    #[must_use]
    pub fn to_color(self) -> Color {
        let h = self.h.rem_euclid(360.0);
        let s = self.s.clamp(0.0, 1.0);
        let l = self.l.clamp(0.0, 1.0);

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
        let m = l - c / 2.0;

        let (r1, g1, b1) = match h {
            h if h < 60.0 => (c, x, 0.0),
            h if h < 120.0 => (x, c, 0.0),
            h if h < 180.0 => (0.0, c, x),
            h if h < 240.0 => (0.0, x, c),
            h if h < 300.0 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let to_channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Color {
            r: to_channel(r1),
            g: to_channel(g1),
            b: to_channel(b1),
        }
    }

    /// Same hue and saturation at a different lightness.
    #[must_use]
    pub fn with_lightness(self, l: f64) -> Self {
        Self {
            l: l.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Hue rotated by `degrees`.
    #[must_use]
    pub fn rotate_hue(self, degrees: f64) -> Self {
        Self {
            h: (self.h + degrees).rem_euclid(360.0),
            ..self
        }
    }
}

/// Black or white, whichever contrasts with `background`.
///
/// Backgrounds at or above 0.5 relative luminance get dark text.
#[must_use]
pub fn contrast_text(background: Color) -> &'static str {
    if background.luminance() >= 0.5 {
        "#000000"
    } else {
        "#FFFFFF"
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_and_format() {
        let c = Color::parse("#7C3AED").unwrap();
        assert_eq!((c.r, c.g, c.b), (0x7C, 0x3A, 0xED));
        assert_eq!(c.to_hex(), "#7C3AED");

        // Lowercase input normalizes to uppercase output
        assert_eq!(Color::parse("#ff00aa").unwrap().to_hex(), "#FF00AA");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in ["7C3AED", "#7C3AE", "#7C3AED0", "#GGGGGG", "", "#"] {
            assert!(Color::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_hsl_round_trip() {
        for hex in ["#7C3AED", "#2563EB", "#000000", "#FFFFFF", "#808080"] {
            let color = Color::parse(hex).unwrap();
            let back = color.to_hsl().to_color();
            // Round-trip may be off by one per channel due to rounding
            assert!(i16::from(color.r).abs_diff(i16::from(back.r)) <= 1);
            assert!(i16::from(color.g).abs_diff(i16::from(back.g)) <= 1);
            assert!(i16::from(color.b).abs_diff(i16::from(back.b)) <= 1);
        }
    }

    #[test]
    fn test_hue_of_violet() {
        // #7C3AED is violet, hue around 262 degrees
        let hsl = Color::parse("#7C3AED").unwrap().to_hsl();
        assert!((hsl.h - 262.0).abs() < 1.5, "hue was {}", hsl.h);
        assert!(hsl.s > 0.8);
    }

    #[test]
    fn test_luminance_extremes() {
        assert!(Color { r: 255, g: 255, b: 255 }.luminance() > 0.99);
        assert!(Color { r: 0, g: 0, b: 0 }.luminance() < 0.01);
    }

    #[test]
    fn test_contrast_text() {
        assert_eq!(contrast_text(Color::parse("#FFFFFF").unwrap()), "#000000");
        assert_eq!(contrast_text(Color::parse("#000000").unwrap()), "#FFFFFF");
        assert_eq!(contrast_text(Color::parse("#1E293B").unwrap()), "#FFFFFF");
    }

    #[test]
    fn test_rotate_hue_wraps() {
        let hsl = Hsl { h: 300.0, s: 0.5, l: 0.5 };
        assert!((hsl.rotate_hue(120.0).h - 60.0).abs() < f64::EPSILON);
        assert!((hsl.rotate_hue(-360.0).h - 300.0).abs() < f64::EPSILON);
    }
}
