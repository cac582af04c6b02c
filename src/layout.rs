//! Sheet extent, visibility and unit conversions.

use crate::image::RenderedImage;
use crate::model::{Row, SheetSource};

/// Pixels per character width of the default font.
const CHAR_WIDTH_PX: u32 = 7;
/// Column widths are stored in 1/256 of a character.
const WIDTH_UNITS_PER_CHAR: u32 = 256;

/// Screen resolution the output assumes.
pub const PIXEL_DPI: f64 = 96.0;
pub const POINT_DPI: f64 = 72.0;

/// Column width units (1/256 character) to whole pixels.
pub fn column_width_px(units: u32) -> u32 {
    let whole = units / WIDTH_UNITS_PER_CHAR * CHAR_WIDTH_PX;
    let rem = f64::from(units % WIDTH_UNITS_PER_CHAR);
    let step = f64::from(WIDTH_UNITS_PER_CHAR) / f64::from(CHAR_WIDTH_PX);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // 0..=7
    let part = (rem / step).round() as u32;
    whole + part
}

/// Pixel width of one sheet column.
pub fn sheet_column_width_px(sheet: &dyn SheetSource, col: u32) -> u32 {
    column_width_px(sheet.column_width(col))
}

/// Pixel width of the inclusive column span `first..=last`.
pub fn span_width_px(sheet: &dyn SheetSource, first: u32, last: u32) -> u32 {
    (first..=last).map(|c| sheet_column_width_px(sheet, c)).sum()
}

/// Points to pixels without rounding.
pub fn points_to_px_exact(points: f32) -> f64 {
    f64::from(points) * PIXEL_DPI / POINT_DPI
}

/// Points to whole pixels.
pub fn points_to_px(points: f32) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let px = points_to_px_exact(points).round().max(0.0) as u32;
    px
}

/// Height of a row in points; absent rows and rows without a custom
/// height use the sheet default.
pub fn row_height_points(sheet: &dyn SheetSource, row: Option<&Row>) -> f32 {
    row.and_then(|r| r.height_points)
        .unwrap_or_else(|| sheet.default_row_height_points())
}

/// Rendered bounds of a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetExtent {
    /// Highest row with at least one physical cell.
    pub last_row: u32,
    /// Number of columns every rendered row is padded to.
    pub column_count: u32,
}

/// Compute the rendered extent, or `None` for an empty sheet: one where no
/// row past the first holds a cell.
///
/// The column count covers the widest row up to `last_row` and the right
/// edge of any image anchored on those rows.
pub fn extent(sheet: &dyn SheetSource, images: &[RenderedImage]) -> Option<SheetExtent> {
    let last_row_num = sheet.last_row_num()?;
    let last_row = (0..=last_row_num)
        .rev()
        .find(|&r| sheet.row(r).is_some_and(|row| row.physical_cells() > 0))?;
    if last_row == 0 {
        return None;
    }

    let widest_row = (0..=last_row)
        .filter_map(|r| sheet.row(r))
        .map(Row::last_cell_num)
        .max()
        .unwrap_or(0);
    let widest_image = images
        .iter()
        .filter(|img| img.row <= last_row)
        .map(|img| img.col + 1)
        .max()
        .unwrap_or(0);

    Some(SheetExtent {
        last_row,
        column_count: widest_row.max(widest_image),
    })
}

pub fn is_column_rendered(sheet: &dyn SheetSource, col: u32, output_hidden: bool) -> bool {
    output_hidden || !sheet.is_column_hidden(col)
}

pub fn is_row_rendered(row: &Row, output_hidden: bool) -> bool {
    output_hidden || !row.zero_height
}
