//! The `learnmetric validate` command.

use std::path::PathBuf;

use anyhow::Result;

use learnmetric_core::cohort::process_workbook;
use learnmetric_core::model::{question_column, MAX_QUESTIONS};
use learnmetric_workbook::{load_config_from, open_reader};

pub fn execute(workbook_path: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config.as_deref())?;
    let reader = open_reader(&workbook_path)?;
    let workbook = reader.read_workbook()?;

    println!(
        "Workbook: {} ({} sheets, content {})",
        reader.name(),
        workbook.sheet_names().len(),
        workbook.content_id().short()
    );

    for name in [
        &config.sheets.baseline,
        &config.sheets.endline,
        &config.sheets.answer_key,
    ] {
        match workbook.sheet(name) {
            Some(sheet) => {
                let questions = (1..=MAX_QUESTIONS)
                    .filter(|q| sheet.has_column(&question_column(*q)))
                    .count();
                println!("  {name}: {} rows, {questions} question columns", sheet.len());
            }
            None => println!("  {name}: MISSING"),
        }
    }

    // Structural failures propagate as the command's error.
    let processed = process_workbook(&workbook, &config.sheets)?;

    let mut warnings = Vec::new();
    let key = &processed.answer_key;
    if key.skipped_rows() > 0 {
        warnings.push(format!("{} answer key rows could not be read", key.skipped_rows()));
    }
    if key.duplicate_rows() > 0 {
        warnings.push(format!("{} duplicate answer key rows", key.duplicate_rows()));
    }
    let d = &processed.diagnostics;
    if d.baseline_only > 0 || d.endline_only > 0 {
        warnings.push(format!(
            "{} baseline-only and {} endline-only students will be excluded from growth",
            d.baseline_only, d.endline_only
        ));
    }
    if d.duplicate_baseline_ids + d.duplicate_endline_ids > 0 {
        warnings.push(format!(
            "{} duplicate Student IDs (first row kept)",
            d.duplicate_baseline_ids + d.duplicate_endline_ids
        ));
    }
    if d.missing_ids > 0 {
        warnings.push(format!("{} rows without a Student ID", d.missing_ids));
    }
    let ungraded = processed
        .baseline
        .iter()
        .chain(&processed.endline)
        .filter(|r| r.record.grade.is_none())
        .count();
    if ungraded > 0 {
        warnings.push(format!("{ungraded} rows with an unreadable Grade"));
    }

    for w in &warnings {
        println!("  WARNING: {w}");
    }

    println!(
        "\n{} answer key entries, {} matched students.",
        key.len(),
        processed.growth.len()
    );
    if warnings.is_empty() {
        println!("Workbook valid.");
    } else {
        println!("{} warning(s) found.", warnings.len());
    }

    Ok(())
}
