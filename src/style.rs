//! Cell styles → deduplicated CSS classes.
//!
//! [`StyleTranslator`] turns a [`CellStyle`] and its [`Font`] into a canonical
//! declaration string, resolving every color through the document's
//! [`ColorResolver`]. [`StyleClassRegistry`] keys classes by that string, so
//! any two styles that render the same share one class regardless of which
//! cell, sheet or style record produced them.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::trace;

use crate::color::{resolver_for, ColorResolver};
use crate::model::{
    Border, BorderStyle, CellStyle, DocumentFamily, FillPattern, Font, HorizontalAlignment,
    VerticalAlignment,
};

pub const BODY_PREFIX: &str = "b";
pub const TABLE_PREFIX: &str = "t";
pub const ROW_PREFIX: &str = "r";
pub const CELL_PREFIX: &str = "c";
pub const DIV_PREFIX: &str = "d";
pub const ROTATION_PREFIX: &str = "rot";

// ── Class registry ────────────────────────────────────────────────

/// Prefix-scoped class names keyed by declaration string.
///
/// The n-th distinct declaration under a prefix is named `<prefix><n>`.
/// Prefixes and classes keep first-use order.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    groups: Vec<ClassGroup>,
}

#[derive(Debug)]
struct ClassGroup {
    prefix: String,
    by_style: HashMap<String, usize>,
    /// `(class, declarations)` in creation order.
    classes: Vec<(String, String)>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The class for `style` under `prefix`, creating it on first use.
    pub fn get_or_create(&mut self, prefix: &str, style: &str) -> String {
        let pos = match self.groups.iter().position(|g| g.prefix == prefix) {
            Some(pos) => pos,
            None => {
                self.groups.push(ClassGroup {
                    prefix: prefix.to_string(),
                    by_style: HashMap::new(),
                    classes: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[pos];
        if let Some(&idx) = group.by_style.get(style) {
            return group.classes[idx].0.clone();
        }
        let class = format!("{}{}", group.prefix, group.classes.len() + 1);
        group.by_style.insert(style.to_string(), group.classes.len());
        group.classes.push((class.clone(), style.to_string()));
        trace!(class = class.as_str(), style, "new class");
        class
    }

    /// Every `(class, declarations)` pair, grouped by prefix.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &str)> {
        self.groups
            .iter()
            .flat_map(|g| g.classes.iter().map(|(c, s)| (c.as_str(), s.as_str())))
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.classes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One `.class{declarations}` rule per line.
    pub fn stylesheet(&self) -> String {
        let mut out = String::new();
        for (class, style) in self.rules() {
            let _ = writeln!(out, ".{class}{{{style}}}");
        }
        out
    }
}

/// Cell and rotation classes for one conversion, shared by every sheet.
#[derive(Debug, Default)]
pub struct StyleClassRegistry {
    classes: ClassRegistry,
    rotations: HashMap<i16, String>,
}

impl StyleClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Class for a cell style. The default style (index 0) gets none.
    pub fn class_for(
        &mut self,
        translator: &StyleTranslator<'_>,
        style: &CellStyle,
        font: Option<&Font>,
    ) -> Option<String> {
        if style.index == 0 {
            return None;
        }
        let css = translator.canonical(style, font);
        Some(self.classes.get_or_create(CELL_PREFIX, &css))
    }

    /// Class rotating text by `angle` degrees. The first request for an angle
    /// fixes the block height from that row.
    pub fn rotation_class_for(&mut self, angle: i16, row_height_points: f32) -> String {
        if let Some(class) = self.rotations.get(&angle) {
            return class.clone();
        }
        let css = rotation_css(angle, row_height_points);
        let class = self.classes.get_or_create(ROTATION_PREFIX, &css);
        self.rotations.insert(angle, class.clone());
        class
    }

    /// Class for arbitrary declarations (row heights, containers).
    pub fn add_class(&mut self, prefix: &str, css: &str) -> String {
        self.classes.get_or_create(prefix, css)
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn stylesheet(&self) -> String {
        self.classes.stylesheet()
    }
}

fn rotation_css(angle: i16, row_height_points: f32) -> String {
    let height = f64::from(row_height_points) * 96.0 / 72.0;
    format!(
        "writing-mode: vertical-rl;transform: rotate({}deg);white-space: wrap;word-break: break-all;height:{height}px;",
        i32::from(angle) + 90
    )
}

// ── Style translation ─────────────────────────────────────────────

/// Builds canonical declaration strings for one document family.
pub struct StyleTranslator<'a> {
    colors: Box<dyn ColorResolver + 'a>,
}

impl<'a> StyleTranslator<'a> {
    pub fn new(family: DocumentFamily<'a>) -> Self {
        Self {
            colors: resolver_for(family),
        }
    }

    /// The full declaration string of a cell style: alignment, fill, the
    /// four borders (top, right, bottom, left), then the font.
    pub fn canonical(&self, style: &CellStyle, font: Option<&Font>) -> String {
        let mut css = String::from("white-space: pre-wrap; ");
        append_align(&mut css, style.horizontal, style.vertical);

        let fill = match style.fill_pattern {
            FillPattern::NoFill => None,
            FillPattern::SolidForeground => self.colors.resolve(style.fill_foreground),
            _ => self.colors.resolve(style.fill_background),
        };
        if let Some(color) = fill {
            let _ = write!(css, "background-color:{color}; ");
        }

        let borders = &style.borders;
        for (side, border) in [
            ("top", &borders.top),
            ("right", &borders.right),
            ("bottom", &borders.bottom),
            ("left", &borders.left),
        ] {
            self.append_border(&mut css, side, border);
        }

        if let Some(font) = font {
            css.push_str(&self.font_css(font));
        }
        css
    }

    fn append_border(&self, css: &mut String, side: &str, border: &Border) {
        if border.style == BorderStyle::None {
            return;
        }
        let _ = write!(
            css,
            "border-{side}: {} {}",
            border_width(border.style),
            border_line(border.style)
        );
        if let Some(color) = self.colors.resolve(border.color) {
            css.push(' ');
            css.push_str(&color);
        }
        css.push_str("; ");
    }

    /// Font declarations; also used inline for rich-text runs.
    pub fn font_css(&self, font: &Font) -> String {
        let mut css = String::new();
        if font.bold {
            css.push_str("font-weight: bold; ");
        }
        if let Some(color) = self.colors.resolve(font.color) {
            let _ = write!(css, "color:{color}; ");
        }
        if font.height_points != 0.0 {
            let _ = write!(css, "font-size: {}pt; ", font.height_points);
        }
        if font.italic {
            css.push_str("font-style: italic; ");
        }
        let _ = write!(css, "font-family: '{}', sans-serif", font_family_name(&font.name));
        css
    }
}

/// A font name safe inside a single-quoted CSS string in a shared rule.
fn font_family_name(name: &str) -> Cow<'_, str> {
    const UNSAFE: &[char] = &['\'', '"', '\\', '{', '}', ';', '<', '>'];
    if name.contains(|c: char| UNSAFE.contains(&c) || c.is_control()) {
        Cow::Owned(name.chars().filter(|c| !UNSAFE.contains(c) && !c.is_control()).collect())
    } else {
        Cow::Borrowed(name)
    }
}

/// Append `text-align`/`vertical-align` declarations.
pub fn append_align(css: &mut String, horizontal: HorizontalAlignment, vertical: VerticalAlignment) {
    match horizontal {
        HorizontalAlignment::Left => css.push_str("text-align:left;"),
        HorizontalAlignment::Center | HorizontalAlignment::CenterSelection => {
            css.push_str("text-align:center;");
        }
        HorizontalAlignment::Right => css.push_str("text-align:right;"),
        HorizontalAlignment::Justify => css.push_str("text-align:justify;"),
        HorizontalAlignment::General | HorizontalAlignment::Fill | HorizontalAlignment::Distributed => {}
    }
    match vertical {
        VerticalAlignment::Top => css.push_str("vertical-align:top;"),
        VerticalAlignment::Center => css.push_str("vertical-align:middle;"),
        VerticalAlignment::Bottom => css.push_str("vertical-align:bottom;"),
        VerticalAlignment::Justify | VerticalAlignment::Distributed => {}
    }
}

pub fn border_width(style: BorderStyle) -> &'static str {
    match style {
        BorderStyle::MediumDashDot | BorderStyle::MediumDashDotDot | BorderStyle::MediumDashed => "2pt",
        BorderStyle::Thick => "thick",
        _ => "thin",
    }
}

pub fn border_line(style: BorderStyle) -> &'static str {
    match style {
        BorderStyle::None => "none",
        BorderStyle::DashDot
        | BorderStyle::DashDotDot
        | BorderStyle::Dotted
        | BorderStyle::Hair
        | BorderStyle::MediumDashDot
        | BorderStyle::MediumDashDotDot
        | BorderStyle::SlantedDashDot => "dotted",
        BorderStyle::Dashed | BorderStyle::MediumDashed => "dashed",
        BorderStyle::Double => "double",
        _ => "solid",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Borders, ColorRef, Palette, Rgb, Theme};

    fn modern() -> StyleTranslator<'static> {
        StyleTranslator::new(DocumentFamily::Modern { theme: None })
    }

    fn bold_font() -> Font {
        Font {
            name: "Arial".into(),
            height_points: 10.0,
            bold: true,
            ..Font::default()
        }
    }

    fn bordered_style(index: u16) -> CellStyle {
        CellStyle {
            index,
            horizontal: HorizontalAlignment::Center,
            fill_pattern: FillPattern::SolidForeground,
            fill_foreground: ColorRef::Indexed(10),
            borders: Borders {
                top: Border {
                    style: BorderStyle::Thin,
                    color: ColorRef::Indexed(8),
                },
                bottom: Border {
                    style: BorderStyle::MediumDashed,
                    color: ColorRef::Automatic,
                },
                ..Borders::default()
            },
            ..CellStyle::default()
        }
    }

    // ── ClassRegistry ────────────────────────────────────────────

    #[test]
    fn registry_numbers_per_prefix() {
        let mut reg = ClassRegistry::new();
        assert_eq!(reg.get_or_create("c", "color:red;"), "c1");
        assert_eq!(reg.get_or_create("r", "height:20px;"), "r1");
        assert_eq!(reg.get_or_create("c", "color:blue;"), "c2");
        assert_eq!(reg.get_or_create("c", "color:red;"), "c1");
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn stylesheet_groups_by_prefix() {
        let mut reg = ClassRegistry::new();
        reg.get_or_create("c", "a");
        reg.get_or_create("r", "b");
        reg.get_or_create("c", "c");
        assert_eq!(reg.stylesheet(), ".c1{a}\n.c2{c}\n.r1{b}\n");
    }

    // ── canonical strings ────────────────────────────────────────

    #[test]
    fn canonical_full_style() {
        let css = modern().canonical(&bordered_style(1), Some(&bold_font()));
        assert_eq!(
            css,
            "white-space: pre-wrap; text-align:center;vertical-align:bottom;\
             background-color:#ff0000; \
             border-top: thin solid black; border-bottom: 2pt dashed; \
             font-weight: bold; font-size: 10pt; font-family: 'Arial', sans-serif"
        );
    }

    #[test]
    fn pattern_fill_uses_background() {
        let style = CellStyle {
            index: 1,
            fill_pattern: FillPattern::FineDots,
            fill_foreground: ColorRef::Indexed(10),
            fill_background: ColorRef::Rgb(Rgb::new(0x12, 0x34, 0x56)),
            ..CellStyle::default()
        };
        let css = modern().canonical(&style, None);
        assert!(css.contains("background-color:#123456; "));
    }

    #[test]
    fn legacy_palette_miss_omits_color() {
        let palette = Palette::empty();
        let translator = StyleTranslator::new(DocumentFamily::Legacy { palette: &palette });
        let css = translator.canonical(&bordered_style(1), None);
        assert!(!css.contains("background-color"));
        assert!(css.contains("border-top: thin solid; "));
    }

    #[test]
    fn theme_font_color() {
        let theme = Theme {
            colors: vec![Rgb::new(0, 0, 0), Rgb::new(255, 255, 255), Rgb::new(0x1f, 0x49, 0x7d)],
        };
        let translator = StyleTranslator::new(DocumentFamily::Modern { theme: Some(&theme) });
        let font = Font {
            color: ColorRef::Theme { index: 2, tint: 0.0 },
            italic: true,
            ..Font::default()
        };
        assert_eq!(
            translator.font_css(&font),
            "color:#1f497d; font-size: 11pt; font-style: italic; font-family: 'Calibri', sans-serif"
        );
    }

    #[test]
    fn font_name_cannot_break_the_rule() {
        let font = Font {
            name: "Bad'}; body{color:red".into(),
            ..bold_font()
        };
        let css = modern().font_css(&font);
        assert!(css.ends_with("font-family: 'Bad bodycolor:red', sans-serif"));
        assert!(!css.contains('}'));
        assert_eq!(font_family_name("Times New Roman"), "Times New Roman");
    }

    // ── StyleClassRegistry ───────────────────────────────────────

    #[test]
    fn equal_styles_share_a_class() {
        let translator = modern();
        let mut reg = StyleClassRegistry::new();
        let font = bold_font();
        let a = reg.class_for(&translator, &bordered_style(3), Some(&font));
        let b = reg.class_for(&translator, &bordered_style(7), Some(&font));
        assert_eq!(a, Some("c1".to_string()));
        assert_eq!(a, b);
        assert_eq!(reg.stylesheet().matches(".c1{").count(), 1);
        assert_eq!(reg.classes().len(), 1);
    }

    #[test]
    fn default_style_has_no_class() {
        let mut reg = StyleClassRegistry::new();
        assert_eq!(reg.class_for(&modern(), &CellStyle::default(), None), None);
        assert!(reg.classes().is_empty());
    }

    #[test]
    fn rotation_classes_keyed_by_angle() {
        let mut reg = StyleClassRegistry::new();
        let first = reg.rotation_class_for(45, 15.0);
        assert_eq!(first, "rot1");
        assert_eq!(reg.rotation_class_for(45, 30.0), first);
        assert_eq!(reg.rotation_class_for(-30, 15.0), "rot2");
        assert!(reg.stylesheet().contains(
            ".rot1{writing-mode: vertical-rl;transform: rotate(135deg);white-space: wrap;word-break: break-all;height:20px;}"
        ));
    }

    // ── lookup tables ────────────────────────────────────────────

    #[test]
    fn border_tables() {
        assert_eq!(border_line(BorderStyle::Hair), "dotted");
        assert_eq!(border_line(BorderStyle::MediumDashed), "dashed");
        assert_eq!(border_line(BorderStyle::Double), "double");
        assert_eq!(border_line(BorderStyle::Medium), "solid");
        assert_eq!(border_width(BorderStyle::MediumDashDot), "2pt");
        assert_eq!(border_width(BorderStyle::Thick), "thick");
        assert_eq!(border_width(BorderStyle::Dotted), "thin");
    }

    #[test]
    fn alignment_mapping() {
        let mut css = String::new();
        append_align(&mut css, HorizontalAlignment::Fill, VerticalAlignment::Center);
        assert_eq!(css, "vertical-align:middle;");
        css.clear();
        append_align(&mut css, HorizontalAlignment::CenterSelection, VerticalAlignment::Justify);
        assert_eq!(css, "text-align:center;");
    }
}
