//! In-memory workbook.
//!
//! A plain owned implementation of [`WorkbookSource`] and [`SheetSource`] for
//! callers that assemble a model by hand (or translate one from a parser)
//! and for the test suite.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{
    Cell, CellStyle, CellValue, DocumentFamily, DocumentMetadata, Font, MergedRange, Palette, Row,
    Shape, SheetSource, Theme, WorkbookSource,
};

/// Default column width: 8.43 characters in 1/256 units.
pub const DEFAULT_COLUMN_WIDTH: u32 = 2304;
pub const DEFAULT_ROW_HEIGHT_POINTS: f32 = 15.0;

/// Which container family the workbook models, with its color tables.
#[derive(Debug, Clone, PartialEq)]
pub enum Family {
    Legacy(Palette),
    Modern(Option<Theme>),
}

#[derive(Debug, Clone)]
pub struct Workbook {
    family: Family,
    metadata: Option<DocumentMetadata>,
    sheets: Vec<Worksheet>,
    styles: Vec<CellStyle>,
    fonts: Vec<Font>,
}

impl Workbook {
    /// A workbook with one default style (index 0) and one default font.
    pub fn new(family: Family) -> Self {
        Self {
            family,
            metadata: None,
            sheets: Vec::new(),
            styles: vec![CellStyle::default()],
            fonts: vec![Font::default()],
        }
    }

    /// Modern workbook without a theme.
    pub fn modern() -> Self {
        Self::new(Family::Modern(None))
    }

    /// Legacy workbook with the standard palette.
    pub fn legacy() -> Self {
        Self::new(Family::Legacy(Palette::standard()))
    }

    pub fn set_metadata(&mut self, metadata: DocumentMetadata) {
        self.metadata = Some(metadata);
    }

    /// Register a style; its `index` is overwritten with the assigned one.
    pub fn add_style(&mut self, mut style: CellStyle) -> u16 {
        let index = u16::try_from(self.styles.len()).unwrap_or(u16::MAX);
        style.index = index;
        self.styles.push(style);
        index
    }

    pub fn add_font(&mut self, font: Font) -> u16 {
        let index = u16::try_from(self.fonts.len()).unwrap_or(u16::MAX);
        self.fonts.push(font);
        index
    }

    /// Replace the default font (index 0).
    pub fn set_default_font(&mut self, font: Font) {
        self.fonts[0] = font;
    }

    pub fn add_sheet(&mut self, sheet: Worksheet) -> usize {
        self.sheets.push(sheet);
        self.sheets.len() - 1
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.sheets.get_mut(index)
    }
}

impl WorkbookSource for Workbook {
    fn family(&self) -> DocumentFamily<'_> {
        match &self.family {
            Family::Legacy(palette) => DocumentFamily::Legacy { palette },
            Family::Modern(theme) => DocumentFamily::Modern {
                theme: theme.as_ref(),
            },
        }
    }

    fn metadata(&self) -> Option<&DocumentMetadata> {
        self.metadata.as_ref()
    }

    fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    fn sheet(&self, index: usize) -> Option<&dyn SheetSource> {
        self.sheets.get(index).map(|s| s as &dyn SheetSource)
    }

    fn cell_style(&self, index: u16) -> Option<&CellStyle> {
        self.styles.get(usize::from(index))
    }

    fn font(&self, index: u16) -> Option<&Font> {
        self.fonts.get(usize::from(index))
    }
}

#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    rows: BTreeMap<u32, Row>,
    column_widths: HashMap<u32, u32>,
    hidden_columns: HashSet<u32>,
    default_column_width: u32,
    default_row_height: f32,
    merged: Vec<MergedRange>,
    shapes: Vec<Shape>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
            column_widths: HashMap::new(),
            hidden_columns: HashSet::new(),
            default_column_width: DEFAULT_COLUMN_WIDTH,
            default_row_height: DEFAULT_ROW_HEIGHT_POINTS,
            merged: Vec::new(),
            shapes: Vec::new(),
        }
    }

    /// The row at `index`, created empty if absent.
    pub fn row_mut(&mut self, index: u32) -> &mut Row {
        self.rows.entry(index).or_default()
    }

    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) {
        self.row_mut(row).cells.insert(col, cell);
    }

    /// Set a value with the default style.
    pub fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        self.set_cell(row, col, Cell::new(value, 0));
    }

    pub fn set_column_width(&mut self, col: u32, units: u32) {
        self.column_widths.insert(col, units);
    }

    pub fn set_default_column_width(&mut self, units: u32) {
        self.default_column_width = units;
    }

    pub fn set_default_row_height(&mut self, points: f32) {
        self.default_row_height = points;
    }

    pub fn hide_column(&mut self, col: u32) {
        self.hidden_columns.insert(col);
    }

    pub fn hide_row(&mut self, row: u32) {
        self.row_mut(row).zero_height = true;
    }

    pub fn add_merged_range(&mut self, range: MergedRange) {
        self.merged.push(range);
    }

    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }
}

impl SheetSource for Worksheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn last_row_num(&self) -> Option<u32> {
        self.rows.keys().next_back().copied()
    }

    fn row(&self, index: u32) -> Option<&Row> {
        self.rows.get(&index)
    }

    fn column_width(&self, col: u32) -> u32 {
        self.column_widths
            .get(&col)
            .copied()
            .unwrap_or(self.default_column_width)
    }

    fn is_column_hidden(&self, col: u32) -> bool {
        self.hidden_columns.contains(&col)
    }

    fn default_row_height_points(&self) -> f32 {
        self.default_row_height
    }

    fn merged_ranges(&self) -> &[MergedRange] {
        &self.merged
    }

    fn shapes(&self) -> &[Shape] {
        &self.shapes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styles_are_numbered_from_one() {
        let mut wb = Workbook::modern();
        let idx = wb.add_style(CellStyle {
            index: 99,
            wrap_text: true,
            ..CellStyle::default()
        });
        assert_eq!(idx, 1);
        assert_eq!(wb.cell_style(1).map(|s| s.index), Some(1));
        assert_eq!(wb.cell_style(0), Some(&CellStyle::default()));
        assert!(wb.font(0).is_some());
    }

    #[test]
    fn sheet_access() {
        let mut wb = Workbook::legacy();
        let mut sheet = Worksheet::new("Data");
        sheet.set_value(3, 1, CellValue::Boolean(true));
        sheet.hide_column(2);
        wb.add_sheet(sheet);

        assert_eq!(wb.sheet_count(), 1);
        let sheet = wb.sheet(0).unwrap();
        assert_eq!(sheet.name(), "Data");
        assert_eq!(sheet.last_row_num(), Some(3));
        assert!(sheet.row(2).is_none());
        assert_eq!(sheet.row(3).unwrap().last_cell_num(), 2);
        assert!(sheet.is_column_hidden(2));
        assert_eq!(sheet.column_width(0), DEFAULT_COLUMN_WIDTH);
        assert!(wb.sheet(1).is_none());
        assert!(matches!(wb.family(), DocumentFamily::Legacy { .. }));
    }
}
