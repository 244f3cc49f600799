//! Directory-of-CSV workbook reader.
//!
//! Each `<sheet name>.csv` file in the directory is one sheet. The first
//! record is the header row; every field is read as text and empty fields
//! become blank cells.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use learnmetric_core::model::{CellValue, ContentId, Sheet, Workbook};
use learnmetric_core::traits::SheetReader;

use crate::error::WorkbookError;

/// Reads a workbook laid out as one CSV file per sheet.
pub struct CsvDirectoryReader {
    dir: PathBuf,
    name: String,
}

impl CsvDirectoryReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let name = dir.display().to_string();
        Self { dir, name }
    }

    /// `(sheet name, path)` for every `.csv` file, sorted by sheet name.
    fn sheet_files(&self) -> Result<Vec<(String, PathBuf)>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to list {}", self.dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
            if !is_csv || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                files.push((stem.to_string(), path.clone()));
            }
        }

        if files.is_empty() {
            return Err(WorkbookError::EmptyDirectory(self.name.clone()).into());
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }

    fn read_files(&self) -> Result<Vec<(String, PathBuf, Vec<u8>)>> {
        self.sheet_files()?
            .into_iter()
            .map(|(sheet, path)| {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Ok((sheet, path, bytes))
            })
            .collect()
    }
}

impl SheetReader for CsvDirectoryReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn content_id(&self) -> Result<ContentId> {
        let files = self.read_files()?;
        Ok(ContentId::of_parts(
            files.iter().map(|(sheet, _, bytes)| (sheet.as_str(), bytes.as_slice())),
        ))
    }

    fn read_workbook(&self) -> Result<Workbook> {
        let files = self.read_files()?;
        let content_id = ContentId::of_parts(
            files.iter().map(|(sheet, _, bytes)| (sheet.as_str(), bytes.as_slice())),
        );

        let mut workbook = Workbook::new(content_id);
        for (sheet_name, path, bytes) in &files {
            let sheet = parse_sheet(sheet_name, bytes, path)?;
            tracing::debug!(sheet = sheet_name.as_str(), rows = sheet.len(), "read CSV sheet");
            workbook.add_sheet(sheet);
        }
        Ok(workbook)
    }
}

/// Parse one CSV file into a sheet.
pub fn parse_sheet(name: &str, bytes: &[u8], path: &Path) -> Result<Sheet, WorkbookError> {
    let csv_error = |source| WorkbookError::Csv {
        path: path.display().to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut sheet = Sheet::new(name, headers);
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        sheet.push_row(record.iter().map(to_cell).collect());
    }
    Ok(sheet)
}

fn to_cell(field: &str) -> CellValue {
    if field.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(field.to_string())
    }
}
