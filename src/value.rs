//! Cell value → display text.
//!
//! String cells keep their formatting runs so the caller can split them;
//! every other kind collapses to plain text. Formula cells render their cached
//! result: numeric results go through the style's format string, while plain
//! numeric cells use the simpler display conversion in [`format_plain_number`].

use tracing::warn;

use crate::model::{CachedValue, Cell, CellStyle, CellValue, RichText};
use crate::numfmt;

/// What a cell displays.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent<'a> {
    /// A non-blank string cell; split into runs before rendering.
    Rich(&'a RichText),
    /// Already formatted text (possibly empty).
    Text(String),
}

impl CellContent<'_> {
    pub fn is_rich(&self) -> bool {
        matches!(self, Self::Rich(_))
    }

    /// The display text without formatting.
    pub fn text(&self) -> &str {
        match self {
            Self::Rich(rich) => &rich.text,
            Self::Text(text) => text,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text().is_empty()
    }
}

/// Convert a cell's value to its display content.
///
/// `disable_formulas` renders every formula cell as empty text.
pub fn format_cell<'a>(cell: &'a Cell, style: Option<&CellStyle>, disable_formulas: bool) -> CellContent<'a> {
    match &cell.value {
        CellValue::String(rich) => {
            if rich.text.trim().is_empty() {
                CellContent::Text(String::new())
            } else {
                CellContent::Rich(rich)
            }
        }
        CellValue::Formula { .. } if disable_formulas => CellContent::Text(String::new()),
        CellValue::Formula { formula, cached } => CellContent::Text(format_cached(formula, cached, style)),
        CellValue::Blank => CellContent::Text(String::new()),
        CellValue::Numeric(v) => CellContent::Text(format_plain_number(*v)),
        CellValue::Boolean(b) => CellContent::Text(format_bool(*b)),
        CellValue::Error(code) => CellContent::Text(code.text()),
    }
}

fn format_cached(formula: &str, cached: &CachedValue, style: Option<&CellStyle>) -> String {
    match cached {
        CachedValue::String(rich) => {
            if rich.text.trim().is_empty() {
                String::new()
            } else {
                rich.text.clone()
            }
        }
        CachedValue::Numeric(v) => match style {
            Some(style) => numfmt::format_raw_cell_contents(
                *v,
                style.data_format,
                style.data_format_string.as_deref(),
            ),
            None => format_plain_number(*v),
        },
        CachedValue::Boolean(b) => format_bool(*b),
        CachedValue::Error(code) => code.text(),
        CachedValue::Missing => {
            warn!(formula, "formula has no usable cached result, rendering empty");
            String::new()
        }
    }
}

fn format_bool(value: bool) -> String {
    let text = if value { "TRUE" } else { "FALSE" };
    text.to_string()
}

/// Largest magnitude below which every integer is exact in an `f64`.
const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Display text for a plain numeric cell.
///
/// Whole numbers print without a decimal point. Anything else prints as the
/// shortest text that reads back to the same value, switching to exponent
/// form for very small or very large magnitudes, so a non-zero value never
/// shows as `0`.
pub fn format_plain_number(val: f64) -> String {
    if !val.is_finite() {
        return val.to_string();
    }
    #[allow(clippy::cast_possible_truncation)]
    if val.fract() == 0.0 && val.abs() < EXACT_INT_LIMIT {
        return (val as i64).to_string();
    }
    let magnitude = val.abs();
    if magnitude < 1e-9 || magnitude >= 1e21 {
        format!("{val:e}")
    } else {
        format!("{val}")
    }
}
