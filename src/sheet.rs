//! Per-sheet table assembly.
//!
//! Emits the sheet heading, then (for a non-empty sheet) one table: a column
//! group with pixel widths, an optional header row of column numbers, and a
//! body row per sheet row up to the last row holding a cell. Merged blocks are
//! emitted once at their anchor with `colspan`/`rowspan`; interior cells emit
//! nothing. Short rows get a trailing filler cell so every row spans the same
//! number of columns.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::ops::Range;

use base64::Engine;
use tracing::{debug, warn};

use crate::convert::Conversion;
use crate::error::Result;
use crate::html::{Element, Node};
use crate::image::{self, RenderedImage};
use crate::layout::{self, SheetExtent};
use crate::markup::{leading_spaces_to_nbsp, run_node, split_runs};
use crate::merge::{self, MergedRangeIndex};
use crate::model::{Cell, CellStyle, MergedRange, RichText, Row, SheetSource, TypeOffset};
use crate::style::{append_align, DIV_PREFIX, ROW_PREFIX};
use crate::value::{format_cell, CellContent};

const NBSP: &str = "\u{a0}";
/// Rows at most this tall (points) leave empty cells empty.
const SHORT_ROW_POINTS: f32 = 10.0;

type RowImages = HashMap<u32, Vec<RenderedImage>>;

/// Render one sheet: its heading, then its table when it has any cells.
pub(crate) fn render_sheet(ctx: &mut Conversion<'_>, sheet: &dyn SheetSource) -> Result<Vec<Node>> {
    let mut nodes = vec![Element::new("h2").with_text(sheet.name()).into()];

    let images = image::collect_images(sheet, ctx.anchor_units, &ctx.options.shape_images);
    let Some(extent) = layout::extent(sheet, &images) else {
        debug!(sheet = sheet.name(), "no row holds a cell, heading only");
        return Ok(nodes);
    };
    debug!(
        sheet = sheet.name(),
        last_row = extent.last_row,
        columns = extent.column_count,
        images = images.len(),
        "rendering sheet"
    );
    for img in images.iter().filter(|img| img.row > extent.last_row) {
        warn!(
            sheet = sheet.name(),
            row = img.row,
            col = img.col,
            "picture anchored below the last rendered row, dropping"
        );
    }

    let merged = MergedRangeIndex::build(
        sheet.name(),
        sheet.merged_ranges(),
        extent.last_row,
        extent.column_count,
    )?;

    let mut renderer = SheetRenderer {
        ctx,
        sheet,
        merged,
        images: image::group_by_cell(images),
        extent,
    };
    nodes.push(renderer.table().into());
    Ok(nodes)
}

struct SheetRenderer<'r, 'a> {
    ctx: &'r mut Conversion<'a>,
    sheet: &'r dyn SheetSource,
    merged: MergedRangeIndex,
    images: HashMap<u32, RowImages>,
    extent: SheetExtent,
}

impl SheetRenderer<'_, '_> {
    fn table(&mut self) -> Element {
        let mut tbody = Element::new("tbody");
        for r in 0..=self.extent.last_row {
            if let Some(tr) = self.row(r) {
                tbody.push(tr);
            }
        }

        let (colgroup, width) = self.column_group();
        let mut table = Element::new("table")
            .with_attr("class", self.ctx.table_class.as_str())
            .with_attr("width", width.to_string())
            .with_attr("style", format!("min-width:{width}px;"));
        table.push(colgroup);
        if self.ctx.options.output_column_headers {
            table.push(self.column_headers());
        }
        table.push(tbody);
        table
    }

    /// One `<col>` per rendered column, preceded by one for the row numbers.
    fn column_group(&self) -> (Element, u32) {
        let mut colgroup = Element::new("colgroup");
        if self.ctx.options.output_row_numbers {
            colgroup.push(Element::new("col"));
        }
        let mut total = 0;
        for col in self.rendered_columns() {
            let width = layout::sheet_column_width_px(self.sheet, col);
            colgroup.push(Element::new("col").with_attr("width", width.to_string()));
            total += width;
        }
        (colgroup, total)
    }

    fn column_headers(&self) -> Element {
        let mut tr = Element::new("tr");
        if self.ctx.options.output_row_numbers {
            tr.push(Element::new("th"));
        }
        for col in self.rendered_columns() {
            tr.push(Element::new("th").with_text((col + 1).to_string()));
        }
        Element::new("thead").with_child(tr)
    }

    fn rendered_columns<'s>(&'s self) -> impl Iterator<Item = u32> + 's {
        self.rendered_between(0, self.extent.column_count)
    }

    /// Rendered columns in `first..end`.
    fn rendered_between<'s>(&'s self, first: u32, end: u32) -> impl Iterator<Item = u32> + 's {
        rendered_in(self.sheet, first..end, self.ctx.options.output_hidden_columns)
    }

    fn row(&mut self, r: u32) -> Option<Element> {
        let sheet = self.sheet;
        let stored = sheet.row(r);
        let placeholder;
        let row = match stored {
            Some(row) => row,
            None => {
                placeholder = blank_row();
                &placeholder
            }
        };
        if !layout::is_row_rendered(row, self.ctx.options.output_hidden_rows) {
            return None;
        }

        let height_pt = layout::row_height_points(sheet, stored);
        let height_px = layout::points_to_px(height_pt);
        let mut tr = Element::new("tr").with_attr("height", height_px.to_string());
        let row_class = self.ctx.classes.add_class(ROW_PREFIX, &format!("height:{height_px}px;"));
        tr.add_class(&row_class);

        if self.ctx.options.output_row_numbers {
            tr.push(
                Element::new("th")
                    .with_attr("class", "rownumber")
                    .with_text((r + 1).to_string()),
            );
        }

        let row_images = self.images.remove(&r).unwrap_or_default();
        let image_cols = row_images.keys().max().map_or(0, |&c| c + 1);
        let row_cols = row.last_cell_num().max(image_cols);

        let mut col = 0;
        while col < row_cols {
            if !layout::is_column_rendered(sheet, col, self.ctx.options.output_hidden_columns) {
                col += 1;
                continue;
            }
            let range = self.merged.range_at(r, col).copied();
            if let Some(range) = range.filter(|m| !m.is_anchor(r, col)) {
                col = range.last_col + 1;
                continue;
            }
            let td = self.cell(row, r, col, range, row_images.get(&col), height_pt, row_cols);
            tr.push(td);
            col += 1;
        }

        let gap = self.rendered_between(row_cols, self.extent.column_count).count();
        if gap > 0 {
            let mut filler = Element::new("td").with_attr("colspan", gap.to_string());
            if height_pt > SHORT_ROW_POINTS {
                filler.push_text(NBSP);
            }
            tr.push(filler);
        }
        Some(tr)
    }

    #[allow(clippy::too_many_arguments)]
    fn cell(
        &mut self,
        row: &Row,
        r: u32,
        col: u32,
        range: Option<MergedRange>,
        images: Option<&Vec<RenderedImage>>,
        height_pt: f32,
        row_cols: u32,
    ) -> Element {
        let mut td = Element::new("td").with_attr("style", "padding: 0px;");
        let width = match range {
            Some(m) => layout::span_width_px(self.sheet, m.first_col, m.last_col),
            None => layout::sheet_column_width_px(self.sheet, col),
        };
        td.set_attr("width", width.to_string());

        if let Some(images) = images.filter(|v| !v.is_empty()) {
            for img in images {
                td.push(image_block(img));
            }
            td.append_style("position:relative;");
        }

        if let Some(m) = range {
            if m.col_span() > 1 {
                td.set_attr("colspan", m.col_span().to_string());
            }
            if m.row_span() > 1 {
                td.set_attr("rowspan", m.row_span().to_string());
            }
        }

        if let Some(cell) = row.cell(col) {
            let wb = self.ctx.workbook;
            let default_style;
            let stored = match wb.cell_style(cell.style) {
                Some(style) => style,
                None => {
                    warn!(sheet = self.sheet.name(), row = r, col, style = cell.style, "unknown cell style, using default");
                    default_style = CellStyle::default();
                    &default_style
                }
            };
            let corner = range.and_then(|m| self.corner_style(&m));
            let style = merge::effective_style(stored, corner);
            self.content(&mut td, cell, &style, row, col, height_pt, row_cols);
        }
        td
    }

    /// Style of a merged block's bottom-right cell, when that cell exists.
    fn corner_style(&self, range: &MergedRange) -> Option<&CellStyle> {
        let corner = self.sheet.row(range.last_row)?.cell(range.last_col)?;
        self.ctx.workbook.cell_style(corner.style)
    }

    #[allow(clippy::too_many_arguments)]
    fn content(&mut self, td: &mut Element, cell: &Cell, style: &CellStyle, row: &Row, col: u32, height_pt: f32, row_cols: u32) {
        let options = self.ctx.options;
        let wb = self.ctx.workbook;
        let content = format_cell(cell, Some(style), options.disable_formulas);
        let wrap_in_divs = !content.is_empty() && options.use_divs_to_span && !style.wrap_text;

        let font = wb.font(style.font);
        if let Some(class) = self.ctx.classes.class_for(&self.ctx.translator, style, font) {
            td.add_class(&class);
            if wrap_in_divs {
                if let Some(container) = &self.ctx.container_cell_class {
                    td.add_class(container);
                }
            }
        }

        if style.rotation != 0 && (-180..=180).contains(&style.rotation) {
            td.append_style(&format!("mso-rotate:{};", style.rotation));
        }

        let nodes = match &content {
            CellContent::Rich(rich) => self.rich_nodes(rich, style.font),
            CellContent::Text(text) => {
                let mut text = if options.output_leading_spaces_as_non_breaking {
                    leading_spaces_to_nbsp(text).into_owned()
                } else {
                    text.clone()
                };
                if text.is_empty() && height_pt > SHORT_ROW_POINTS {
                    text = NBSP.to_string();
                }
                vec![Node::Text(text)]
            }
        };

        if style.rotation != 0 && options.apply_text_rotation {
            let class = self.ctx.classes.rotation_class_for(style.rotation, height_pt);
            let mut div = Element::new("div").with_attr("class", class);
            div.children = nodes;
            td.push(div);
        } else if wrap_in_divs {
            let min_width = layout::sheet_column_width_px(self.sheet, col);
            let mut css = format!("position:absolute;min-width:{min_width}px;");
            if let Some(max_width) = self.span_width(row, col, row_cols) {
                let _ = write!(css, "max-width:{max_width}px;");
            }
            let _ = write!(css, "overflow:hidden;max-height:{height_pt}pt;white-space:nowrap;");
            append_align(&mut css, style.horizontal, style.vertical);

            let mut inner = Element::new("div").with_attr("class", self.ctx.classes.add_class(DIV_PREFIX, &css));
            inner.children = nodes;
            let mut outer = Element::new("div");
            if let Some(container) = &self.ctx.container_div_class {
                outer.add_class(container);
            }
            outer.push(inner);
            td.push(outer);
        } else {
            td.children.extend(nodes);
        }
    }

    /// Width text may overflow into: the cell's column plus every following
    /// empty one. `None` when the empty run reaches the end of the row.
    fn span_width(&self, row: &Row, col: u32, row_cols: u32) -> Option<u32> {
        let options = self.ctx.options;
        let wb = self.ctx.workbook;
        let mut width = layout::sheet_column_width_px(self.sheet, col);
        for next in col + 1..row_cols {
            if !layout::is_column_rendered(self.sheet, next, options.output_hidden_columns) {
                continue;
            }
            if let Some(cell) = row.cell(next) {
                let style = wb.cell_style(cell.style);
                if !format_cell(cell, style, options.disable_formulas).is_empty() {
                    return Some(width);
                }
            }
            width += layout::sheet_column_width_px(self.sheet, next);
        }
        None
    }

    fn rich_nodes(&self, rich: &RichText, cell_font: u16) -> Vec<Node> {
        let wb = self.ctx.workbook;
        let translator = &self.ctx.translator;
        let cell_css = wb.font(cell_font).map(|f| translator.font_css(f));
        let nbsp = self.ctx.options.output_leading_spaces_as_non_breaking;

        split_runs(rich, cell_font)
            .iter()
            .enumerate()
            .map(|(i, run)| {
                let text = if i == 0 && nbsp {
                    leading_spaces_to_nbsp(run.text)
                } else {
                    Cow::Borrowed(run.text)
                };
                let font = wb.font(run.font);
                let offset = font.map_or(TypeOffset::Normal, |f| f.type_offset);
                let inline_css = font
                    .filter(|_| run.font != cell_font)
                    .map(|f| translator.font_css(f))
                    .filter(|css| cell_css.as_ref() != Some(css));
                run_node(text.into_owned(), offset, inline_css.as_deref())
            })
            .collect()
    }
}

fn rendered_in(sheet: &dyn SheetSource, cols: Range<u32>, output_hidden: bool) -> impl Iterator<Item = u32> + '_ {
    cols.filter(move |&c| layout::is_column_rendered(sheet, c, output_hidden))
}

/// A stand-in for a row the sheet does not store: one blank cell.
fn blank_row() -> Row {
    let mut row = Row::default();
    row.cells.insert(0, Cell::default());
    row
}

/// Absolutely positioned block holding one image.
fn image_block(img: &RenderedImage) -> Element {
    let src = format!(
        "data:image/{};base64,{}",
        img.extension,
        base64::engine::general_purpose::STANDARD.encode(&img.data)
    );
    let style = format!(
        "position: absolute;width:{}px;height:{}px;margin-top:{}px;margin-left:{}px;top:0px;left:0px;",
        img.width, img.height, img.offset_y, img.offset_x
    );
    Element::new("div").with_attr("style", style).with_child(
        Element::new("img")
            .with_attr("src", src)
            .with_attr("width", img.width.to_string())
            .with_attr("height", img.height.to_string()),
    )
}
