//! Spreadsheet reader backed by `calamine` (xlsx, xlsm, xls, xlsb, ods).

use std::io::Cursor;
use std::path::PathBuf;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};

use learnmetric_core::model::{CellValue, ContentId, Sheet, Workbook};
use learnmetric_core::traits::SheetReader;

use crate::error::WorkbookError;

/// File extensions this reader accepts, lower-case.
pub const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Reads every worksheet of a spreadsheet file.
///
/// The first row of each worksheet is its header row.
pub struct SpreadsheetReader {
    path: PathBuf,
    name: String,
}

impl SpreadsheetReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).with_context(|| format!("failed to read {}", self.name))
    }
}

impl SheetReader for SpreadsheetReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn content_id(&self) -> Result<ContentId> {
        Ok(ContentId::of_bytes(&self.read_bytes()?))
    }

    fn read_workbook(&self) -> Result<Workbook> {
        let bytes = self.read_bytes()?;
        let content_id = ContentId::of_bytes(&bytes);
        let spreadsheet_error = |e: calamine::Error| WorkbookError::Spreadsheet {
            path: self.name.clone(),
            message: e.to_string(),
        };

        let mut sheets =
            open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(spreadsheet_error)?;

        let mut workbook = Workbook::new(content_id);
        for sheet_name in sheets.sheet_names() {
            let range = sheets
                .worksheet_range(&sheet_name)
                .map_err(spreadsheet_error)?;

            let mut rows = range.rows();
            let headers: Vec<String> = rows
                .next()
                .map(|header| {
                    header
                        .iter()
                        .map(|cell| to_cell(cell).to_trimmed_string())
                        .collect()
                })
                .unwrap_or_default();

            let mut sheet = Sheet::new(sheet_name.as_str(), headers);
            for row in rows {
                sheet.push_row(row.iter().map(to_cell).collect());
            }
            tracing::debug!(sheet = sheet_name.as_str(), rows = sheet.len(), "read worksheet");
            workbook.add_sheet(sheet);
        }

        Ok(workbook)
    }
}

/// Convert a calamine cell into a workbook cell.
///
/// Dates become their serial number; error cells (`#N/A`, `#DIV/0!`) are blank.
pub fn to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => {
            tracing::trace!("error cell {e} read as blank");
            CellValue::Empty
        }
    }
}
