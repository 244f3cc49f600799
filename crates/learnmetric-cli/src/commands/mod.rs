//! Subcommand implementations and the helpers they share.

pub mod analyze;
pub mod init;
pub mod questions;
pub mod students;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use learnmetric_core::cache::PipelineCache;
use learnmetric_core::cohort::ProcessedWorkbook;
use learnmetric_core::model::Grade;
use learnmetric_core::statistics::CohortFilter;
use learnmetric_workbook::{load_config_from, open_reader, LearnmetricConfig};

/// A workbook loaded and scored for one command.
pub struct Loaded {
    pub config: LearnmetricConfig,
    pub source: String,
    pub processed: Arc<ProcessedWorkbook>,
}

/// Load config, open the workbook and run the pipeline.
pub fn load_workbook(workbook: &Path, config: Option<&Path>) -> Result<Loaded> {
    let config = load_config_from(config)?;
    let reader = open_reader(workbook)?;

    let mut cache = PipelineCache::new();
    let processed = cache
        .get_or_process(reader.as_ref(), &config.sheets)
        .with_context(|| format!("failed to process {}", workbook.display()))?;

    Ok(Loaded {
        config,
        source: reader.name().to_string(),
        processed,
    })
}

/// Build a filter from comma-separated `--state` and `--grade` values.
pub fn parse_filter(state: Option<&str>, grade: Option<&str>) -> Result<CohortFilter> {
    let mut filter = CohortFilter::default();
    if let Some(states) = state {
        filter = filter.with_states(split_list(states));
    }
    if let Some(grades) = grade {
        let grades = split_list(grades)
            .into_iter()
            .map(|g| g.parse::<Grade>().map_err(anyhow::Error::msg))
            .collect::<Result<Vec<_>>>()?;
        filter = filter.with_grades(grades);
    }
    Ok(filter)
}

fn split_list(s: &str) -> Vec<&str> {
    s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}
