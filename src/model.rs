//! Read-only spreadsheet model consumed by the converter.
//!
//! The converter never parses files. It walks whatever implements
//! [`WorkbookSource`] and [`SheetSource`], reading rows, cells, styles, fonts,
//! merged ranges and shapes through these traits. The value types in this
//! module are plain data shared by every implementation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ── Colors ─────────────────────────────────────────────────────────

/// A literal 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// How a style refers to a color. Resolution depends on the document family.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ColorRef {
    /// System/automatic color; never resolves to a CSS value.
    #[default]
    Automatic,
    /// Index into the indexed table (modern) or the custom palette (legacy).
    Indexed(u16),
    /// Index into the workbook theme, lightened or darkened by `tint` (-1..=1).
    Theme { index: u32, tint: f64 },
    /// Literal value.
    Rgb(Rgb),
}

/// Workbook-scoped custom palette of a legacy (BIFF) document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Palette {
    entries: HashMap<u16, Rgb>,
}

impl Palette {
    /// An empty palette: every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The default BIFF8 palette (indices 8..=63).
    pub fn standard() -> Self {
        let entries = (8..=63)
            .filter_map(|idx| crate::color::indexed_rgb(idx).map(|rgb| (idx, rgb)))
            .collect();
        Self { entries }
    }

    /// Override or add one entry.
    pub fn set(&mut self, index: u16, rgb: Rgb) {
        self.entries.insert(index, rgb);
    }

    pub fn get(&self, index: u16) -> Option<Rgb> {
        self.entries.get(&index).copied()
    }
}

/// Theme color scheme of a modern (OOXML) document, in theme index order
/// (dk1, lt1, dk2, lt2, accent1..accent6, hlink, folHlink).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Theme {
    pub colors: Vec<Rgb>,
}

impl Theme {
    pub fn color(&self, index: u32) -> Option<Rgb> {
        self.colors.get(index as usize).copied()
    }
}

/// Which container-format family produced the workbook, with the color
/// tables that family resolves against.
#[derive(Debug, Clone, Copy)]
pub enum DocumentFamily<'a> {
    /// Binary `.xls`: colors are indices into the custom palette.
    Legacy { palette: &'a Palette },
    /// OOXML `.xlsx`: indexed table first, then the theme.
    Modern { theme: Option<&'a Theme> },
}

// ── Styles and fonts ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HorizontalAlignment {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterSelection,
    Distributed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerticalAlignment {
    Top,
    Center,
    #[default]
    Bottom,
    Justify,
    Distributed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillPattern {
    #[default]
    NoFill,
    SolidForeground,
    FineDots,
    AltBars,
    SparseDots,
    ThickHorizontalBands,
    ThickVerticalBands,
    ThickBackwardDiagonals,
    ThickForwardDiagonals,
    BigSpots,
    Bricks,
    ThinHorizontalBands,
    ThinVerticalBands,
    ThinBackwardDiagonals,
    ThinForwardDiagonals,
    Squares,
    Diamonds,
    LessDots,
    LeastDots,
}

/// Line style of one border side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Dashed,
    Dotted,
    Thick,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantedDashDot,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Border {
    pub style: BorderStyle,
    pub color: ColorRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Borders {
    pub top: Border,
    pub right: Border,
    pub bottom: Border,
    pub left: Border,
}

/// Baseline offset of a font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeOffset {
    #[default]
    Normal,
    Superscript,
    Subscript,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub name: String,
    pub height_points: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: ColorRef,
    pub type_offset: TypeOffset,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: "Calibri".into(),
            height_points: 11.0,
            bold: false,
            italic: false,
            color: ColorRef::Automatic,
            type_offset: TypeOffset::Normal,
        }
    }
}

/// A cell style (XF record / `cellXfs` entry). Index 0 is the workbook
/// default and never gets a class of its own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellStyle {
    pub index: u16,
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub fill_pattern: FillPattern,
    pub fill_foreground: ColorRef,
    pub fill_background: ColorRef,
    pub borders: Borders,
    /// Text rotation in degrees. Values outside -180..=180 are vertical-stack
    /// markers and are not rotated.
    pub rotation: i16,
    pub wrap_text: bool,
    /// Font index, resolved through [`WorkbookSource::font`].
    pub font: u16,
    /// Number format id (built-in ids are below 164).
    pub data_format: u16,
    /// Number format string, when the model has it at hand.
    pub data_format_string: Option<String>,
}

// ── Cell values ────────────────────────────────────────────────────

/// One formatting run: from character `start` up to the next run, text uses
/// `font`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRun {
    pub start: usize,
    pub font: u16,
}

/// A string with optional formatting runs, ordered by `start`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RichText {
    pub text: String,
    pub runs: Vec<FormatRun>,
}

impl RichText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            runs: Vec::new(),
        }
    }
}

impl From<&str> for RichText {
    fn from(text: &str) -> Self {
        Self::plain(text)
    }
}

/// Excel error codes as stored in BIFF/OOXML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Null,
    Div0,
    Value,
    Ref,
    Name,
    Num,
    NotAvailable,
    GettingData,
    Other(u8),
}

impl ErrorCode {
    /// Map a raw BIFF error byte.
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::Null,
            0x07 => Self::Div0,
            0x0F => Self::Value,
            0x17 => Self::Ref,
            0x1D => Self::Name,
            0x24 => Self::Num,
            0x2A => Self::NotAvailable,
            0x2B => Self::GettingData,
            other => Self::Other(other),
        }
    }

    /// The text Excel displays for the error.
    pub fn text(self) -> String {
        match self {
            Self::Null => "#NULL!".into(),
            Self::Div0 => "#DIV/0!".into(),
            Self::Value => "#VALUE!".into(),
            Self::Ref => "#REF!".into(),
            Self::Name => "#NAME?".into(),
            Self::Num => "#NUM!".into(),
            Self::NotAvailable => "#N/A".into(),
            Self::GettingData => "#GETTING_DATA".into(),
            Self::Other(code) => format!("~non~std~err({code})~"),
        }
    }
}

/// Last evaluated result stored with a formula.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    String(RichText),
    Numeric(f64),
    Boolean(bool),
    Error(ErrorCode),
    /// The formula was never evaluated, or the result type was not one the
    /// model understood.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Blank,
    String(RichText),
    Numeric(f64),
    Boolean(bool),
    Error(ErrorCode),
    Formula { formula: String, cached: CachedValue },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    /// Style index, resolved through [`WorkbookSource::cell_style`].
    pub style: u16,
}

impl Cell {
    pub fn new(value: CellValue, style: u16) -> Self {
        Self { value, style }
    }
}

/// A physically present row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    /// Custom height; `None` falls back to the sheet default.
    pub height_points: Option<f32>,
    pub zero_height: bool,
    pub cells: BTreeMap<u32, Cell>,
}

impl Row {
    pub fn cell(&self, col: u32) -> Option<&Cell> {
        self.cells.get(&col)
    }

    /// Number of cells actually stored in the row.
    pub fn physical_cells(&self) -> usize {
        self.cells.len()
    }

    /// One past the highest stored column, or 0 for an empty row.
    pub fn last_cell_num(&self) -> u32 {
        self.cells.keys().next_back().map_or(0, |&c| c + 1)
    }
}

// ── Sheet geometry ─────────────────────────────────────────────────

/// An inclusive rectangle of cells rendered as one. The anchor is the
/// top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergedRange {
    pub first_row: u32,
    pub last_row: u32,
    pub first_col: u32,
    pub last_col: u32,
}

impl MergedRange {
    pub const fn new(first_row: u32, last_row: u32, first_col: u32, last_col: u32) -> Self {
        Self {
            first_row,
            last_row,
            first_col,
            last_col,
        }
    }

    pub const fn is_anchor(&self, row: u32, col: u32) -> bool {
        self.first_row == row && self.first_col == col
    }

    pub const fn col_span(&self) -> u32 {
        self.last_col - self.first_col + 1
    }

    pub const fn row_span(&self) -> u32 {
        self.last_row - self.first_row + 1
    }
}

impl fmt::Display for MergedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            column_letters(self.first_col),
            self.first_row + 1,
            column_letters(self.last_col),
            self.last_row + 1
        )
    }
}

/// Convert a 0-based column index to its letter name (`0` → `A`, `26` → `AA`).
pub fn column_letters(col: u32) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        #[allow(clippy::cast_possible_truncation)] // rem < 26
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Two-cell anchor of a drawing object. Offsets are in the family's anchor
/// units: 1/1024 of the column width and 1/256 of the row height for legacy
/// documents, EMUs for modern ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientAnchor {
    pub col1: u32,
    pub row1: u32,
    pub dx1: i64,
    pub dy1: i64,
    pub col2: u32,
    pub row2: u32,
    pub dx2: i64,
    pub dy2: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub data: Vec<u8>,
    /// Suggested file extension of the image data, without the dot.
    pub extension: String,
    pub anchor: ClientAnchor,
}

/// A drawing object on a sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Picture(Picture),
    /// An auto-shape; `anchor` is `None` when it is not anchored to cells.
    Simple {
        shape_type: u32,
        anchor: Option<ClientAnchor>,
    },
    /// Groups, connectors, charts and anything else without an image form.
    Other,
}

/// Document summary properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
}

// ── Capability traits ──────────────────────────────────────────────

/// Read access to a workbook.
pub trait WorkbookSource {
    /// The container family and its color tables.
    fn family(&self) -> DocumentFamily<'_>;

    fn metadata(&self) -> Option<&DocumentMetadata> {
        None
    }

    fn sheet_count(&self) -> usize;

    fn sheet(&self, index: usize) -> Option<&dyn SheetSource>;

    fn cell_style(&self, index: u16) -> Option<&CellStyle>;

    fn font(&self, index: u16) -> Option<&Font>;
}

/// Read access to one worksheet.
pub trait SheetSource {
    fn name(&self) -> &str;

    /// Highest row index that has a row record, if any.
    fn last_row_num(&self) -> Option<u32>;

    fn row(&self, index: u32) -> Option<&Row>;

    /// Column width in 1/256 of a character width.
    fn column_width(&self, col: u32) -> u32;

    fn is_column_hidden(&self, col: u32) -> bool;

    fn default_row_height_points(&self) -> f32;

    fn merged_ranges(&self) -> &[MergedRange];

    fn shapes(&self) -> &[Shape];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_basic() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(51), "AZ");
        assert_eq!(column_letters(52), "BA");
    }

    #[test]
    fn merged_range_display() {
        assert_eq!(MergedRange::new(2, 4, 1, 3).to_string(), "B3:D5");
    }

    #[test]
    fn merged_range_spans() {
        let range = MergedRange::new(2, 4, 1, 3);
        assert_eq!(range.col_span(), 3);
        assert_eq!(range.row_span(), 3);
        assert!(range.is_anchor(2, 1));
        assert!(!range.is_anchor(2, 2));
    }

    #[test]
    fn row_last_cell_num() {
        let mut row = Row::default();
        assert_eq!(row.last_cell_num(), 0);
        row.cells.insert(4, Cell::default());
        row.cells.insert(1, Cell::default());
        assert_eq!(row.last_cell_num(), 5);
        assert_eq!(row.physical_cells(), 2);
    }

    #[test]
    fn error_code_text() {
        assert_eq!(ErrorCode::from_code(0x07).text(), "#DIV/0!");
        assert_eq!(ErrorCode::from_code(0x2A).text(), "#N/A");
        assert_eq!(ErrorCode::from_code(0x99).text(), "~non~std~err(153)~");
    }

    #[test]
    fn standard_palette_has_black_and_white() {
        let palette = Palette::standard();
        assert_eq!(palette.get(8), Some(Rgb::new(0, 0, 0)));
        assert_eq!(palette.get(9), Some(Rgb::new(255, 255, 255)));
        assert_eq!(palette.get(64), None);
        assert_eq!(Palette::empty().get(8), None);
    }
}
