//! The `learnmetric analyze` command.

use std::path::PathBuf;

use anyhow::Result;

use learnmetric_core::report::{format_growth, format_percentage, ImpactReport};
use learnmetric_report::{write_growth_csv, write_html_report, write_question_csv};

use super::{load_workbook, parse_filter};

pub fn execute(
    workbook: PathBuf,
    state: Option<String>,
    grade: Option<String>,
    output: Option<PathBuf>,
    format: Option<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    let loaded = load_workbook(&workbook, config.as_deref())?;
    let filter = parse_filter(state.as_deref(), grade.as_deref())?;

    let report = ImpactReport::build(&loaded.processed, &loaded.source, &filter);
    print_summary(&report);

    let output = output.unwrap_or_else(|| loaded.config.output_dir.clone());
    std::fs::create_dir_all(&output)?;
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");

    let format = format.unwrap_or_else(|| loaded.config.formats.join(","));
    let formats: Vec<&str> = if format == "all" {
        vec!["json", "html", "csv", "markdown"]
    } else {
        format.split(',').map(str::trim).collect()
    };

    for fmt in &formats {
        match *fmt {
            "json" => {
                let path = output.join(format!("report-{timestamp}.json"));
                report.save_json(&path)?;
                eprintln!("Results saved to: {}", path.display());
            }
            "html" => {
                let path = output.join(format!("report-{timestamp}.html"));
                write_html_report(&report, &path)?;
                eprintln!("HTML dashboard: {}", path.display());
            }
            "csv" => {
                let growth = output.join(format!("growth-{timestamp}.csv"));
                write_growth_csv(&report.students, &growth)?;
                let questions = output.join(format!("questions-{timestamp}.csv"));
                write_question_csv(&report.questions, &questions)?;
                eprintln!("CSV exports: {}, {}", growth.display(), questions.display());
            }
            "markdown" | "md" => {
                let path = output.join(format!("report-{timestamp}.md"));
                std::fs::write(&path, report.to_markdown())?;
                eprintln!("Markdown summary: {}", path.display());
            }
            _ => {
                eprintln!("Unknown format: {fmt}");
            }
        }
    }

    Ok(())
}

fn print_summary(report: &ImpactReport) {
    use comfy_table::{Cell, Table};

    let s = &report.summary;
    println!("{}\n", s.insight());

    let mut table = Table::new();
    table.set_header(vec!["Students", "Baseline", "Endline", "Growth", "Dropped"]);
    table.add_row(vec![
        Cell::new(s.students),
        Cell::new(format_percentage(s.avg_baseline)),
        Cell::new(format_percentage(s.avg_endline)),
        Cell::new(format_growth(s.avg_growth)),
        Cell::new(report.diagnostics.join.dropped()),
    ]);
    println!("{table}");

    if !report.grades.is_empty() {
        let mut grades = Table::new();
        grades.set_header(vec!["Grade", "Students", "Baseline", "Endline"]);
        for g in &report.grades {
            grades.add_row(vec![
                Cell::new(g.grade.code()),
                Cell::new(g.students),
                Cell::new(format_percentage(g.avg_baseline)),
                Cell::new(format_percentage(g.avg_endline)),
            ]);
        }
        println!("\n{grades}");
    }

    if let Some(d) = &report.difficulty {
        println!(
            "\nHardest question: {} ({:.1}% correct). Easiest: {} ({:.1}% correct).",
            d.hardest.label(),
            d.hardest.mean_accuracy,
            d.easiest.label(),
            d.easiest.mean_accuracy
        );
    }
}
