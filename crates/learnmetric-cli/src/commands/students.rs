//! The `learnmetric students` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use learnmetric_core::report::{format_growth, format_percentage};
use learnmetric_core::statistics::search_students;

use super::{load_workbook, parse_filter};

pub fn execute(
    workbook: PathBuf,
    search: Option<String>,
    limit: usize,
    state: Option<String>,
    grade: Option<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    let filter = parse_filter(state.as_deref(), grade.as_deref())?;
    let loaded = load_workbook(&workbook, config.as_deref())?;

    let cohort = filter.apply(&loaded.processed.growth);
    let matches = search_students(&cohort, search.as_deref().unwrap_or(""));

    let mut table = Table::new();
    table.set_header(vec![
        "Student ID",
        "State",
        "Centre",
        "Grade",
        "Baseline",
        "Endline",
        "Growth",
    ]);
    for r in matches.iter().take(limit) {
        table.add_row(vec![
            Cell::new(&r.student_id),
            Cell::new(&r.state),
            Cell::new(&r.center),
            Cell::new(r.grade.map(|g| g.to_string()).unwrap_or_default()),
            Cell::new(format_percentage(r.percentage_baseline)),
            Cell::new(format_percentage(r.percentage_endline)),
            Cell::new(format_growth(r.growth)),
        ]);
    }

    println!("{table}");
    println!(
        "Showing {} of {} matching students ({} in cohort).",
        matches.len().min(limit),
        matches.len(),
        cohort.len()
    );

    Ok(())
}
