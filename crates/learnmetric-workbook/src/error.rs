//! Workbook reader error types.

use thiserror::Error;

/// Errors that can occur when locating or reading a workbook.
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// The path does not exist.
    #[error("workbook not found: {0}")]
    NotFound(String),

    /// The file extension is not a supported spreadsheet format.
    #[error("unsupported workbook format: {0} (expected .xlsx, .xlsm, .xls, .xlsb, .ods or a directory of .csv files)")]
    UnsupportedFormat(String),

    /// The spreadsheet could not be parsed.
    #[error("failed to read spreadsheet {path}: {message}")]
    Spreadsheet { path: String, message: String },

    /// A CSV sheet could not be parsed.
    #[error("failed to read CSV sheet {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// A CSV directory holds no `.csv` files.
    #[error("no .csv sheets found in {0}")]
    EmptyDirectory(String),
}
