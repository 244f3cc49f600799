//! Content-addressed memoization of processed workbooks.
//!
//! Re-processing identical workbook bytes with the same sheet names returns
//! the same `Arc` instead of scoring again. Entries are only ever removed
//! explicitly, via [`PipelineCache::invalidate`] or [`PipelineCache::clear`].

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cohort::{process_workbook, ProcessedWorkbook};
use crate::model::{ContentId, SheetNames};
use crate::traits::SheetReader;

#[derive(Debug, Default)]
pub struct PipelineCache {
    entries: HashMap<(ContentId, SheetNames), Arc<ProcessedWorkbook>>,
    hits: u64,
    misses: u64,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the processed dataset for `reader`, computing it on a miss.
    ///
    /// Structural failures are returned to the caller and leave the cache
    /// untouched.
    pub fn get_or_process(
        &mut self,
        reader: &dyn SheetReader,
        sheets: &SheetNames,
    ) -> Result<Arc<ProcessedWorkbook>> {
        let content_id = reader
            .content_id()
            .with_context(|| format!("failed to hash workbook '{}'", reader.name()))?;
        let cache_key = (content_id, sheets.clone());

        if let Some(hit) = self.entries.get(&cache_key) {
            self.hits += 1;
            tracing::info!(
                source = reader.name(),
                content = cache_key.0.short(),
                "reusing processed workbook"
            );
            return Ok(Arc::clone(hit));
        }

        self.misses += 1;
        let workbook = reader
            .read_workbook()
            .with_context(|| format!("failed to read workbook '{}'", reader.name()))?;
        let processed = Arc::new(process_workbook(&workbook, sheets)?);
        self.entries.insert(cache_key, Arc::clone(&processed));
        Ok(processed)
    }

    /// Drop every entry for `content_id`. Returns how many were removed.
    pub fn invalidate(&mut self, content_id: &ContentId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(id, _), _| id != content_id);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
