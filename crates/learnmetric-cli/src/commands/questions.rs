//! The `learnmetric questions` command.

use std::path::PathBuf;

use anyhow::{bail, Result};
use comfy_table::{Cell, Table};

use learnmetric_core::model::Phase;
use learnmetric_core::questions::QuestionDifficulty;

use super::{load_workbook, parse_filter};

pub fn execute(
    workbook: PathBuf,
    phase: String,
    grade: Option<String>,
    state: Option<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    let phase = match phase.trim().to_ascii_lowercase().as_str() {
        "baseline" => Phase::Baseline,
        "endline" => Phase::Endline,
        other => bail!("unknown phase '{other}' (expected baseline or endline)"),
    };
    let filter = parse_filter(state.as_deref(), grade.as_deref())?;
    let loaded = load_workbook(&workbook, config.as_deref())?;

    let records = loaded.processed.question_accuracy(phase, &filter);
    if records.is_empty() {
        println!("No answer key coverage for the selected {phase} rows.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Grade", "Question", "Accuracy", "Correct"]);
    for r in &records {
        table.add_row(vec![
            Cell::new(r.grade.code()),
            Cell::new(r.label()),
            Cell::new(format!("{:.1}%", r.accuracy)),
            Cell::new(format!("{}/{}", r.correct, r.students)),
        ]);
    }
    println!("{phase} question accuracy\n{table}");

    if let Some(d) = QuestionDifficulty::from_records(&records) {
        println!(
            "\nHardest: {} ({:.1}% mean accuracy)\nEasiest: {} ({:.1}% mean accuracy)",
            d.hardest.label(),
            d.hardest.mean_accuracy,
            d.easiest.label(),
            d.easiest.mean_accuracy
        );
    }

    Ok(())
}
