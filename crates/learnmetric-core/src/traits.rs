//! Workbook source trait.
//!
//! Implemented by the `learnmetric-workbook` crate for spreadsheet files,
//! CSV directories and in-memory fixtures.

use crate::model::{ContentId, Workbook};

/// A source of workbook data.
pub trait SheetReader: Send + Sync {
    /// Human-readable source name (e.g. the file path).
    fn name(&self) -> &str;

    /// Hash of the raw source content.
    ///
    /// Must be cheaper than [`read_workbook`](Self::read_workbook) and must
    /// change whenever the content does.
    fn content_id(&self) -> anyhow::Result<ContentId>;

    /// Read every sheet of the source.
    fn read_workbook(&self) -> anyhow::Result<Workbook>;
}
