//! In-memory reader for tests and embedding.

use std::sync::atomic::{AtomicU32, Ordering};

use learnmetric_core::model::{ContentId, Workbook};
use learnmetric_core::traits::SheetReader;

/// Serves a workbook that is already in memory.
pub struct MemoryReader {
    name: String,
    workbook: Workbook,
    read_count: AtomicU32,
}

impl MemoryReader {
    pub fn new(name: &str, workbook: Workbook) -> Self {
        Self {
            name: name.to_string(),
            workbook,
            read_count: AtomicU32::new(0),
        }
    }

    /// Number of times the workbook has been read.
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::Relaxed)
    }
}

impl SheetReader for MemoryReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn content_id(&self) -> anyhow::Result<ContentId> {
        Ok(self.workbook.content_id().clone())
    }

    fn read_workbook(&self) -> anyhow::Result<Workbook> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.workbook.clone())
    }
}
