//! `xlhtml`: render spreadsheet documents as HTML.
//!
//! The crate does not parse files. It reads a workbook through the
//! [`WorkbookSource`] and [`SheetSource`] traits and produces an
//! [`HtmlDocument`]: one heading and table per sheet, with column widths, row
//! heights, merged cells, fills, borders, fonts, rotated text, rich-text runs
//! and absolutely positioned images, plus a single stylesheet in which every
//! distinct cell style appears once.
//!
//! ```no_run
//! use xlhtml::memory::{Workbook, Worksheet};
//! use xlhtml::{convert, CellValue, ConvertOptions};
//!
//! let mut sheet = Worksheet::new("Sheet1");
//! sheet.set_value(0, 0, CellValue::String("Item".into()));
//! sheet.set_value(1, 0, CellValue::Numeric(42.0));
//! let mut workbook = Workbook::modern();
//! workbook.add_sheet(sheet);
//!
//! let html = convert(&workbook, &ConvertOptions::default())?.to_html()?;
//! # Ok::<(), xlhtml::ConvertError>(())
//! ```
//!
//! Formatting anomalies (unresolvable colors, missing cached formula results,
//! unanchored shapes) are logged through `tracing` and rendered best-effort;
//! only structural contradictions such as overlapping merged ranges fail the
//! conversion.

#![allow(clippy::redundant_pub_crate)]

pub mod color;
pub mod convert;
pub mod error;
pub mod html;
pub mod image;
pub mod layout;
pub mod markup;
pub mod memory;
pub mod merge;
pub mod model;
pub mod numfmt;
mod sheet;
pub mod style;
pub mod value;

pub use convert::{convert, convert_to_string, ConvertOptions, Converter};
pub use error::{ConvertError, Result};
pub use html::{Element, HtmlDocument, Node};
pub use image::ShapeImage;
pub use model::{
    CachedValue, Cell, CellStyle, CellValue, ClientAnchor, ColorRef, DocumentFamily,
    DocumentMetadata, Font, MergedRange, Picture, RichText, Row, Shape, SheetSource, WorkbookSource,
};
