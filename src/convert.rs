//! Top-level workbook conversion.
//!
//! [`convert`] walks every sheet of a [`WorkbookSource`] in order and returns
//! an [`HtmlDocument`]: one heading and table per sheet plus a single
//! stylesheet. All class caches live in a [`Conversion`] owned by the call,
//! so identical styles on different sheets share a class and nothing leaks
//! between conversions.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::html::HtmlDocument;
use crate::image::{AnchorUnits, ShapeImage};
use crate::model::{DocumentMetadata, WorkbookSource};
use crate::sheet;
use crate::style::{StyleClassRegistry, StyleTranslator, BODY_PREFIX, CELL_PREFIX, DIV_PREFIX, TABLE_PREFIX};

/// Rendering switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Emit a header row of 1-based column numbers.
    pub output_column_headers: bool,
    pub output_hidden_columns: bool,
    /// Emit zero-height rows.
    pub output_hidden_rows: bool,
    /// Turn leading spaces into non-breaking spaces.
    pub output_leading_spaces_as_non_breaking: bool,
    /// Emit a 1-based row number cell at the start of every row.
    pub output_row_numbers: bool,
    /// Let non-wrapping text overflow into empty neighbouring cells by
    /// placing it in positioned blocks.
    pub use_divs_to_span: bool,
    /// Render rotated text inside a rotated block.
    pub apply_text_rotation: bool,
    /// Render formula cells as empty.
    pub disable_formulas: bool,
    /// Images drawn in place of auto-shapes, keyed by shape type.
    pub shape_images: HashMap<u32, ShapeImage>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_column_headers: true,
            output_hidden_columns: false,
            output_hidden_rows: false,
            output_leading_spaces_as_non_breaking: true,
            output_row_numbers: true,
            use_divs_to_span: false,
            apply_text_rotation: false,
            disable_formulas: false,
            shape_images: HashMap::new(),
        }
    }
}

/// State of one document conversion.
pub(crate) struct Conversion<'a> {
    pub(crate) workbook: &'a dyn WorkbookSource,
    pub(crate) options: &'a ConvertOptions,
    pub(crate) translator: StyleTranslator<'a>,
    pub(crate) classes: StyleClassRegistry,
    pub(crate) anchor_units: AnchorUnits,
    pub(crate) body_class: String,
    pub(crate) table_class: String,
    /// Extra cell class for span blocks (only with `use_divs_to_span`).
    pub(crate) container_cell_class: Option<String>,
    pub(crate) container_div_class: Option<String>,
}

impl<'a> Conversion<'a> {
    pub(crate) fn new(workbook: &'a dyn WorkbookSource, options: &'a ConvertOptions) -> Self {
        let family = workbook.family();
        let mut classes = StyleClassRegistry::new();
        let body_class = classes.add_class(BODY_PREFIX, "white-space-collapsing:preserve;");
        let table_class = classes.add_class(
            TABLE_PREFIX,
            "border-collapse:collapse;border-spacing:0;table-layout:fixed;",
        );
        let (container_cell_class, container_div_class) = if options.use_divs_to_span {
            (
                Some(classes.add_class(CELL_PREFIX, "padding:0;margin:0;align:left;vertical-align:top;")),
                Some(classes.add_class(DIV_PREFIX, "position:relative;")),
            )
        } else {
            (None, None)
        };
        Self {
            workbook,
            options,
            translator: StyleTranslator::new(family),
            classes,
            anchor_units: AnchorUnits::for_family(family),
            body_class,
            table_class,
            container_cell_class,
            container_div_class,
        }
    }
}

/// Reusable converter holding a set of options.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub fn convert(&self, workbook: &dyn WorkbookSource) -> Result<HtmlDocument> {
        convert(workbook, &self.options)
    }
}

/// Convert a whole workbook.
pub fn convert(workbook: &dyn WorkbookSource, options: &ConvertOptions) -> Result<HtmlDocument> {
    let mut ctx = Conversion::new(workbook, options);
    let mut doc = HtmlDocument::default();
    if let Some(metadata) = workbook.metadata() {
        apply_metadata(&mut doc, metadata);
    }

    let count = workbook.sheet_count();
    debug!(sheets = count, "converting workbook");
    for index in 0..count {
        let sheet = workbook.sheet(index).ok_or(ConvertError::SheetMissing(index))?;
        doc.body.extend(sheet::render_sheet(&mut ctx, sheet)?);
    }

    doc.body_class = Some(ctx.body_class.clone());
    doc.stylesheet = ctx.classes.stylesheet();
    Ok(doc)
}

/// Convert and serialize in one step.
pub fn convert_to_string(workbook: &dyn WorkbookSource, options: &ConvertOptions) -> Result<String> {
    convert(workbook, options)?.to_html()
}

fn apply_metadata(doc: &mut HtmlDocument, metadata: &DocumentMetadata) {
    let present = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);
    doc.title = present(&metadata.title);
    for (name, value) in [
        ("author", &metadata.author),
        ("keywords", &metadata.keywords),
        ("description", &metadata.description),
    ] {
        if let Some(value) = present(value) {
            doc.add_meta(name, &value);
        }
    }
}
