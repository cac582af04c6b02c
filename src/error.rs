//! Error types for xlhtml.
//!
//! Provides a single [`ConvertError`] enum for the failures that abort a
//! conversion. Formatting and geometry anomalies never end up here; they are
//! logged and rendered best-effort.

/// All errors that can abort a workbook conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// I/O error while writing serialized markup.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Markup serialization error (from `quick-xml`).
    #[error("markup: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A merged range whose first row/column lies after its last.
    #[error("sheet {sheet:?}: merged range {range} is inverted")]
    InvalidMergedRange { sheet: String, range: String },

    /// Two merged ranges claim the same cell.
    #[error("sheet {sheet:?}: merged ranges {first} and {second} overlap at row {row}, column {col}")]
    OverlappingMergedRanges {
        sheet: String,
        first: String,
        second: String,
        row: u32,
        col: u32,
    },

    /// The source reported a sheet it could not produce.
    #[error("sheet {0} is missing from the workbook")]
    SheetMissing(usize),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConvertError>;
