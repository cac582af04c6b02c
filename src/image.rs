//! Picture anchors → pixel geometry.
//!
//! A two-cell anchor names the top-left and bottom-right cells plus an
//! offset inside each. Legacy documents express offsets as fractions of the
//! cell (1/1024 of the column width, 1/256 of the row height); modern ones
//! use EMUs. Either way the result is a pixel size and a pixel offset
//! relative to the top-left corner of the anchor cell, so the image can be
//! overlaid on that cell with absolute positioning.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::layout::{points_to_px_exact, row_height_points, sheet_column_width_px};
use crate::model::{ClientAnchor, DocumentFamily, Shape, SheetSource};

const LEGACY_DX_UNITS: f64 = 1024.0;
const LEGACY_DY_UNITS: f64 = 256.0;
/// EMUs per pixel at 96 dpi (914400 / 96).
pub const EMUS_PER_PIXEL: f64 = 9525.0;

/// Replacement image for an auto-shape type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeImage {
    pub data: Vec<u8>,
    /// File extension without the dot, used in the data URI.
    pub extension: String,
}

/// A picture resolved to pixels, keyed by its anchor cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub row: u32,
    pub col: u32,
    pub width: i64,
    pub height: i64,
    pub offset_x: i64,
    pub offset_y: i64,
    pub data: Vec<u8>,
    pub extension: String,
}

/// How anchor offsets are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorUnits {
    /// Fractions of the cell: x in 1/1024, y in 1/256.
    CellFraction,
    /// English Metric Units.
    Emu,
}

impl AnchorUnits {
    pub fn for_family(family: DocumentFamily<'_>) -> Self {
        match family {
            DocumentFamily::Legacy { .. } => Self::CellFraction,
            DocumentFamily::Modern { .. } => Self::Emu,
        }
    }
}

/// Size and offset of an anchored object, in unrounded pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

fn col_px(sheet: &dyn SheetSource, col: u32) -> f64 {
    f64::from(sheet_column_width_px(sheet, col))
}

fn row_px(sheet: &dyn SheetSource, row: u32) -> f64 {
    points_to_px_exact(row_height_points(sheet, sheet.row(row)))
}

#[allow(clippy::cast_precision_loss)] // anchor offsets are small
fn x_offset(units: AnchorUnits, sheet: &dyn SheetSource, col: u32, dx: i64) -> f64 {
    match units {
        AnchorUnits::CellFraction => dx as f64 / LEGACY_DX_UNITS * col_px(sheet, col),
        AnchorUnits::Emu => dx as f64 / EMUS_PER_PIXEL,
    }
}

#[allow(clippy::cast_precision_loss)]
fn y_offset(units: AnchorUnits, sheet: &dyn SheetSource, row: u32, dy: i64) -> f64 {
    match units {
        AnchorUnits::CellFraction => dy as f64 / LEGACY_DY_UNITS * row_px(sheet, row),
        AnchorUnits::Emu => dy as f64 / EMUS_PER_PIXEL,
    }
}

/// Resolve an anchor against the sheet's column widths and row heights.
pub fn place(anchor: &ClientAnchor, sheet: &dyn SheetSource, units: AnchorUnits) -> Placement {
    let x1 = x_offset(units, sheet, anchor.col1, anchor.dx1);
    let y1 = y_offset(units, sheet, anchor.row1, anchor.dy1);
    let x2 = x_offset(units, sheet, anchor.col2, anchor.dx2);
    let y2 = y_offset(units, sheet, anchor.row2, anchor.dy2);

    let spanned_width: f64 = (anchor.col1..anchor.col2).map(|c| col_px(sheet, c)).sum();
    let spanned_height: f64 = (anchor.row1..anchor.row2).map(|r| row_px(sheet, r)).sum();

    Placement {
        width: (spanned_width - x1 + x2).max(0.0),
        height: (spanned_height - y1 + y2).max(0.0),
        offset_x: x1,
        offset_y: y1,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round_px(v: f64) -> i64 {
    v.round() as i64
}

fn render(anchor: &ClientAnchor, sheet: &dyn SheetSource, units: AnchorUnits, data: &[u8], extension: &str) -> RenderedImage {
    let placed = place(anchor, sheet, units);
    RenderedImage {
        row: anchor.row1,
        col: anchor.col1,
        width: round_px(placed.width),
        height: round_px(placed.height),
        offset_x: round_px(placed.offset_x),
        offset_y: round_px(placed.offset_y),
        data: data.to_vec(),
        extension: extension.trim_start_matches('.').to_string(),
    }
}

/// Every picture on the sheet, plus auto-shapes that have a replacement in
/// `shape_images`.
pub fn collect_images(
    sheet: &dyn SheetSource,
    units: AnchorUnits,
    shape_images: &HashMap<u32, ShapeImage>,
) -> Vec<RenderedImage> {
    let mut images = Vec::new();
    for shape in sheet.shapes() {
        match shape {
            Shape::Picture(picture) => {
                images.push(render(&picture.anchor, sheet, units, &picture.data, &picture.extension));
            }
            Shape::Simple {
                shape_type,
                anchor: Some(anchor),
            } => match shape_images.get(shape_type) {
                Some(img) => images.push(render(anchor, sheet, units, &img.data, &img.extension)),
                None => debug!(sheet = sheet.name(), shape_type, "no image for shape type"),
            },
            Shape::Simple {
                shape_type,
                anchor: None,
            } => {
                warn!(sheet = sheet.name(), shape_type, "shape has no client anchor, skipping");
            }
            Shape::Other => {}
        }
    }
    images
}

/// Images grouped by anchor row, then column.
pub fn group_by_cell(images: Vec<RenderedImage>) -> HashMap<u32, HashMap<u32, Vec<RenderedImage>>> {
    let mut grouped: HashMap<u32, HashMap<u32, Vec<RenderedImage>>> = HashMap::new();
    for img in images {
        grouped
            .entry(img.row)
            .or_default()
            .entry(img.col)
            .or_default()
            .push(img);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Worksheet;
    use crate::model::Picture;

    /// Width units giving a 100 px column.
    const HUNDRED_PX: u32 = 14 * 256 + 73;

    fn sheet() -> Worksheet {
        let mut sheet = Worksheet::new("S");
        for col in 0..4 {
            sheet.set_column_width(col, HUNDRED_PX);
        }
        sheet
    }

    fn anchor(col1: u32, row1: u32, dx1: i64, dy1: i64, col2: u32, row2: u32, dx2: i64, dy2: i64) -> ClientAnchor {
        ClientAnchor {
            col1,
            row1,
            dx1,
            dy1,
            col2,
            row2,
            dx2,
            dy2,
        }
    }

    #[test]
    fn hundred_px_column() {
        assert_eq!(sheet_column_width_px(&sheet(), 0), 100);
    }

    // ── place ────────────────────────────────────────────────────

    #[test]
    fn legacy_fractional_offset() {
        let s = sheet();
        let placed = place(&anchor(1, 2, 256, 128, 1, 2, 768, 256), &s, AnchorUnits::CellFraction);
        assert!((placed.offset_x - 25.0).abs() < 1e-9);
        assert!((placed.offset_y - 10.0).abs() < 1e-9);
        assert!((placed.width - 50.0).abs() < 1e-9);
        assert!((placed.height - 10.0).abs() < 1e-9);
    }

    #[test]
    fn legacy_spans_columns_and_rows() {
        let s = sheet();
        // from the middle of B2 to a quarter into D4
        let placed = place(&anchor(1, 1, 512, 0, 3, 3, 256, 64), &s, AnchorUnits::CellFraction);
        assert!((placed.width - (200.0 - 50.0 + 25.0)).abs() < 1e-9);
        assert!((placed.height - (40.0 + 5.0)).abs() < 1e-9);
    }

    #[test]
    fn modern_offsets_are_emus() {
        let s = sheet();
        let emu = |px: i64| px * 9525;
        let placed = place(&anchor(0, 0, emu(25), emu(10), 2, 1, emu(5), emu(0)), &s, AnchorUnits::Emu);
        assert!((placed.offset_x - 25.0).abs() < 1e-9);
        assert!((placed.offset_y - 10.0).abs() < 1e-9);
        assert!((placed.width - 180.0).abs() < 1e-9);
        assert!((placed.height - 10.0).abs() < 1e-9);
    }

    #[test]
    fn inverted_anchor_clamps_to_zero() {
        let placed = place(&anchor(2, 0, 0, 0, 1, 0, 0, 0), &sheet(), AnchorUnits::Emu);
        assert_eq!(placed.width, 0.0);
    }

    // ── collect_images ───────────────────────────────────────────

    #[test]
    fn pictures_and_shapes() {
        let mut s = sheet();
        s.add_shape(Shape::Picture(Picture {
            data: vec![1, 2, 3],
            extension: ".png".into(),
            anchor: anchor(1, 2, 256, 128, 1, 2, 768, 256),
        }));
        s.add_shape(Shape::Simple {
            shape_type: 1,
            anchor: Some(anchor(0, 0, 0, 0, 1, 1, 0, 0)),
        });
        s.add_shape(Shape::Simple {
            shape_type: 2,
            anchor: Some(anchor(0, 0, 0, 0, 1, 1, 0, 0)),
        });
        s.add_shape(Shape::Simple {
            shape_type: 1,
            anchor: None,
        });
        s.add_shape(Shape::Other);

        let mut shape_images = HashMap::new();
        shape_images.insert(
            1,
            ShapeImage {
                data: vec![9],
                extension: "gif".into(),
            },
        );
        let images = collect_images(&s, AnchorUnits::CellFraction, &shape_images);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].extension, "png");
        assert_eq!((images[0].row, images[0].col), (2, 1));
        assert_eq!((images[0].offset_x, images[0].offset_y), (25, 10));
        assert_eq!(images[1].extension, "gif");
        assert_eq!((images[1].width, images[1].height), (100, 20));

        let grouped = group_by_cell(images);
        assert_eq!(grouped[&2][&1].len(), 1);
        assert_eq!(grouped[&0][&0].len(), 1);
    }
}
