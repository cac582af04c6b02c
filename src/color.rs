//! Color resolution for both document families.
//!
//! Legacy `.xls` documents store every color as an index into a
//! workbook-scoped custom palette. Modern `.xlsx` documents mix indexed colors,
//! theme-relative colors and literal RGB. [`resolver_for`] picks the matching
//! [`ColorResolver`] once per document so call sites never branch on the
//! family themselves.
//!
//! A reference that cannot be resolved yields `None`; callers omit the CSS
//! property rather than defaulting to black.

use tracing::warn;

use crate::model::{ColorRef, DocumentFamily, Palette, Rgb, Theme};

/// Resolves a style's color reference to a CSS color string.
pub trait ColorResolver {
    fn resolve(&self, color: ColorRef) -> Option<String>;
}

/// Select the resolver for a document family.
pub fn resolver_for(family: DocumentFamily<'_>) -> Box<dyn ColorResolver + '_> {
    match family {
        DocumentFamily::Legacy { palette } => Box::new(PaletteResolver { palette }),
        DocumentFamily::Modern { theme } => Box::new(ThemeResolver { theme }),
    }
}

/// Legacy resolver: indices go through the custom palette only.
pub struct PaletteResolver<'a> {
    palette: &'a Palette,
}

impl<'a> PaletteResolver<'a> {
    pub const fn new(palette: &'a Palette) -> Self {
        Self { palette }
    }
}

impl ColorResolver for PaletteResolver<'_> {
    fn resolve(&self, color: ColorRef) -> Option<String> {
        match color {
            ColorRef::Automatic => None,
            ColorRef::Indexed(idx) => self.palette.get(idx).map(css_color),
            ColorRef::Rgb(rgb) => Some(css_color(rgb)),
            ColorRef::Theme { index, .. } => {
                warn!(index, "theme color in a legacy document, omitting");
                None
            }
        }
    }
}

/// Modern resolver: the fixed indexed table first, then the theme.
pub struct ThemeResolver<'a> {
    theme: Option<&'a Theme>,
}

impl<'a> ThemeResolver<'a> {
    pub const fn new(theme: Option<&'a Theme>) -> Self {
        Self { theme }
    }

    fn theme_color(&self, index: u32, tint: f64) -> Option<String> {
        let Some(theme) = self.theme else {
            warn!(index, "theme color requested but the workbook has no theme");
            return None;
        };
        theme.color(index).map(|rgb| css_color(apply_tint(rgb, tint)))
    }
}

impl ColorResolver for ThemeResolver<'_> {
    fn resolve(&self, color: ColorRef) -> Option<String> {
        match color {
            ColorRef::Automatic => None,
            // An index outside the built-in table is read as a theme slot.
            ColorRef::Indexed(idx) => indexed_rgb(idx)
                .map(css_color)
                .or_else(|| self.theme.and_then(|t| t.color(u32::from(idx))).map(css_color)),
            ColorRef::Theme { index, tint } => self.theme_color(index, tint),
            ColorRef::Rgb(rgb) => Some(css_color(rgb)),
        }
    }
}

// ── Tables ─────────────────────────────────────────────────────────

/// Built-in indexed colors 0..=63. Index 64 is "automatic" and is absent.
const INDEXED_COLORS: [(u8, u8, u8); 64] = [
    (0, 0, 0),
    (255, 255, 255),
    (255, 0, 0),
    (0, 255, 0),
    (0, 0, 255),
    (255, 255, 0),
    (255, 0, 255),
    (0, 255, 255),
    // 8..=63: standard BIFF8 palette
    (0, 0, 0),
    (255, 255, 255),
    (255, 0, 0),
    (0, 255, 0),
    (0, 0, 255),
    (255, 255, 0),
    (255, 0, 255),
    (0, 255, 255),
    (128, 0, 0),
    (0, 128, 0),
    (0, 0, 128),
    (128, 128, 0),
    (128, 0, 128),
    (0, 128, 128),
    (192, 192, 192),
    (128, 128, 128),
    (153, 153, 255),
    (153, 51, 102),
    (255, 255, 204),
    (204, 255, 255),
    (102, 0, 102),
    (255, 128, 128),
    (0, 102, 204),
    (204, 204, 255),
    (0, 0, 128),
    (255, 0, 255),
    (255, 255, 0),
    (0, 255, 255),
    (128, 0, 128),
    (128, 0, 0),
    (0, 128, 128),
    (0, 0, 255),
    (0, 204, 255),
    (204, 255, 255),
    (204, 255, 204),
    (255, 255, 153),
    (153, 204, 255),
    (255, 153, 204),
    (204, 153, 255),
    (255, 204, 153),
    (51, 102, 255),
    (51, 204, 204),
    (153, 204, 0),
    (255, 204, 0),
    (255, 153, 0),
    (255, 102, 0),
    (102, 102, 153),
    (150, 150, 150),
    (0, 51, 102),
    (51, 153, 102),
    (0, 51, 0),
    (51, 51, 0),
    (153, 51, 0),
    (153, 51, 102),
    (51, 51, 153),
    (51, 51, 51),
];

/// Look up a built-in indexed color.
pub fn indexed_rgb(index: u16) -> Option<Rgb> {
    INDEXED_COLORS
        .get(usize::from(index))
        .map(|&(r, g, b)| Rgb::new(r, g, b))
}

/// Render a color for CSS, using names for the four common greys.
pub fn css_color(rgb: Rgb) -> String {
    let hex = format!("#{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b);
    match hex.as_str() {
        "#ffffff" => "white".into(),
        "#c0c0c0" => "silver".into(),
        "#808080" => "gray".into(),
        "#000000" => "black".into(),
        _ => hex,
    }
}

// ── Tint ───────────────────────────────────────────────────────────

/// Lighten (`tint > 0`) or darken (`tint < 0`) a color in HSL luminance.
pub fn apply_tint(rgb: Rgb, tint: f64) -> Rgb {
    if tint == 0.0 || !tint.is_finite() {
        return rgb;
    }
    let tint = tint.clamp(-1.0, 1.0);
    let (h, s, l) = rgb_to_hsl(rgb);
    let l = if tint < 0.0 {
        l * (1.0 + tint)
    } else {
        l * (1.0 - tint) + tint
    };
    hsl_to_rgb(h, s, l.clamp(0.0, 1.0))
}

fn rgb_to_hsl(rgb: Rgb) -> (f64, f64, f64) {
    let r = f64::from(rgb.r) / 255.0;
    let g = f64::from(rgb.g) / 255.0;
    let b = f64::from(rgb.b) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let delta = max - min;
    if delta == 0.0 {
        return (0.0, 0.0, l);
    }
    let s = if l > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };
    let h = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    (h * 60.0, s, l)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = l - c / 2.0;
    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to 0..=255
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(channel(r), channel(g), channel(b))
}
