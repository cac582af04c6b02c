//! Merged-range lookup and merge border propagation.

use std::borrow::Cow;

use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::model::{CellStyle, MergedRange};

/// Dense `(row, col) → range` table covering the rendered extent.
#[derive(Debug, Default)]
pub struct MergedRangeIndex {
    ranges: Vec<MergedRange>,
    /// Per row, per column: position in `ranges`.
    cells: Vec<Vec<Option<usize>>>,
}

impl MergedRangeIndex {
    /// Index `ranges` for rows `0..=last_row` and columns `0..column_count`.
    ///
    /// Parts of a range outside those bounds are not indexed. Fails on an
    /// inverted range, or when two ranges claim the same indexed cell.
    pub fn build(sheet: &str, ranges: &[MergedRange], last_row: u32, column_count: u32) -> Result<Self> {
        let mut index = Self {
            ranges: Vec::with_capacity(ranges.len()),
            cells: Vec::new(),
        };

        for range in ranges {
            if range.first_row > range.last_row || range.first_col > range.last_col {
                return Err(ConvertError::InvalidMergedRange {
                    sheet: sheet.to_string(),
                    range: format!(
                        "rows {}..={}, columns {}..={}",
                        range.first_row, range.last_row, range.first_col, range.last_col
                    ),
                });
            }
            if range.first_row > last_row || range.first_col >= column_count {
                continue;
            }

            let pos = index.ranges.len();
            index.ranges.push(*range);

            let row_end = range.last_row.min(last_row);
            let col_end = range.last_col.min(column_count.saturating_sub(1));
            for row in range.first_row..=row_end {
                let row_idx = row as usize;
                if index.cells.len() <= row_idx {
                    index.cells.resize_with(row_idx + 1, Vec::new);
                }
                let cols = &mut index.cells[row_idx];
                let needed = col_end as usize + 1;
                if cols.len() < needed {
                    cols.resize(needed, None);
                }
                for col in range.first_col..=col_end {
                    let slot = &mut cols[col as usize];
                    if let Some(existing) = *slot {
                        return Err(ConvertError::OverlappingMergedRanges {
                            sheet: sheet.to_string(),
                            first: index.ranges[existing].to_string(),
                            second: range.to_string(),
                            row,
                            col,
                        });
                    }
                    *slot = Some(pos);
                }
            }
        }

        debug!(sheet, merged = index.ranges.len(), "indexed merged ranges");
        Ok(index)
    }

    /// The range covering `(row, col)`, if any.
    pub fn range_at(&self, row: u32, col: u32) -> Option<&MergedRange> {
        let pos = (*self.cells.get(row as usize)?.get(col as usize)?)?;
        self.ranges.get(pos)
    }

    /// Number of indexed ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// The style to render a merged block's anchor cell with: its right and
/// bottom borders come from the block's bottom-right corner cell when they
/// differ. The stored style is never modified.
pub fn effective_style<'s>(anchor: &'s CellStyle, corner: Option<&CellStyle>) -> Cow<'s, CellStyle> {
    let Some(corner) = corner else {
        return Cow::Borrowed(anchor);
    };
    let (ab, cb) = (&anchor.borders, &corner.borders);
    if ab.bottom == cb.bottom && ab.right == cb.right {
        return Cow::Borrowed(anchor);
    }
    let mut merged = anchor.clone();
    merged.borders.bottom = cb.bottom;
    merged.borders.right = cb.right;
    Cow::Owned(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Border, BorderStyle, Borders, ColorRef};

    // ── index ────────────────────────────────────────────────────

    #[test]
    fn anchor_and_interior_lookup() {
        let ranges = [MergedRange::new(2, 4, 1, 3)];
        let index = MergedRangeIndex::build("S", &ranges, 10, 10).unwrap();
        for row in 2..=4 {
            for col in 1..=3 {
                assert_eq!(index.range_at(row, col), Some(&ranges[0]));
            }
        }
        assert!(index.range_at(2, 1).unwrap().is_anchor(2, 1));
        assert_eq!(index.range_at(1, 1), None);
        assert_eq!(index.range_at(2, 4), None);
        assert_eq!(index.range_at(50, 50), None);
    }

    #[test]
    fn ranges_clipped_to_extent() {
        let ranges = [MergedRange::new(0, 1_048_575, 0, 0), MergedRange::new(20, 21, 0, 1)];
        let index = MergedRangeIndex::build("S", &ranges, 5, 3).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.range_at(5, 0).is_some());
        assert!(index.range_at(6, 0).is_none());
    }

    #[test]
    fn overlap_is_an_error() {
        let ranges = [MergedRange::new(0, 2, 0, 2), MergedRange::new(2, 3, 2, 3)];
        let err = MergedRangeIndex::build("Data", &ranges, 10, 10).unwrap_err();
        match err {
            ConvertError::OverlappingMergedRanges { first, second, row, col, .. } => {
                assert_eq!(first, "A1:C3");
                assert_eq!(second, "C3:D4");
                assert_eq!((row, col), (2, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn inverted_range_is_an_error() {
        let ranges = [MergedRange::new(3, 1, 0, 0)];
        assert!(matches!(
            MergedRangeIndex::build("S", &ranges, 10, 10),
            Err(ConvertError::InvalidMergedRange { .. })
        ));
    }

    // ── effective_style ──────────────────────────────────────────

    fn with_borders(right: BorderStyle, bottom: BorderStyle) -> CellStyle {
        CellStyle {
            index: 4,
            borders: Borders {
                top: Border {
                    style: BorderStyle::Thin,
                    color: ColorRef::Automatic,
                },
                right: Border {
                    style: right,
                    color: ColorRef::Indexed(10),
                },
                bottom: Border {
                    style: bottom,
                    color: ColorRef::Indexed(10),
                },
                ..Borders::default()
            },
            ..CellStyle::default()
        }
    }

    #[test]
    fn corner_borders_copied() {
        let anchor = with_borders(BorderStyle::None, BorderStyle::None);
        let corner = with_borders(BorderStyle::Thick, BorderStyle::Double);
        let effective = effective_style(&anchor, Some(&corner));
        assert!(matches!(effective, Cow::Owned(_)));
        assert_eq!(effective.borders.right.style, BorderStyle::Thick);
        assert_eq!(effective.borders.bottom.style, BorderStyle::Double);
        assert_eq!(effective.borders.top.style, BorderStyle::Thin);
        // the stored style is untouched
        assert_eq!(anchor.borders.right.style, BorderStyle::None);
    }

    #[test]
    fn corner_border_color_copied() {
        let anchor = with_borders(BorderStyle::Thin, BorderStyle::Thin);
        let mut corner = with_borders(BorderStyle::Thin, BorderStyle::Thin);
        corner.borders.right.color = ColorRef::Indexed(12);
        let effective = effective_style(&anchor, Some(&corner));
        assert!(matches!(effective, Cow::Owned(_)));
        assert_eq!(effective.borders.right.color, ColorRef::Indexed(12));
        assert_eq!(effective.borders.bottom.color, ColorRef::Indexed(10));
        assert_eq!(anchor.borders.right.color, ColorRef::Indexed(10));
    }

    #[test]
    fn same_borders_borrow() {
        let anchor = with_borders(BorderStyle::Thin, BorderStyle::Thin);
        let corner = with_borders(BorderStyle::Thin, BorderStyle::Thin);
        assert!(matches!(effective_style(&anchor, Some(&corner)), Cow::Borrowed(_)));
        assert!(matches!(effective_style(&anchor, None), Cow::Borrowed(_)));
    }
}
