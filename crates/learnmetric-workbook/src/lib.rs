//! learnmetric-workbook: Workbook readers and configuration.
//!
//! Implements the `SheetReader` trait for spreadsheet files (via calamine),
//! directories of CSV files, and in-memory workbooks, and loads
//! `learnmetric.toml`.

pub mod config;
pub mod csv_dir;
pub mod error;
pub mod memory;
pub mod spreadsheet;

pub use config::{load_config, load_config_from, open_reader, LearnmetricConfig};
pub use csv_dir::CsvDirectoryReader;
pub use error::WorkbookError;
pub use memory::MemoryReader;
pub use spreadsheet::SpreadsheetReader;
