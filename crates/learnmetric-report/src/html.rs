//! HTML dashboard generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use learnmetric_core::model::{Grade, MAX_QUESTIONS};
use learnmetric_core::report::{format_growth, format_percentage, ImpactReport};
use learnmetric_core::statistics::{CenterMatrix, GradeStats, Quadrant};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate the impact dashboard for a report.
pub fn generate_html(report: &ImpactReport) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>learnmetric impact report: {}</title>\n",
        html_escape(&report.source.name)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>Learning impact report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Workbook: <strong>{}</strong> | {} | {} baseline rows | {} endline rows | {}</p>\n",
        html_escape(&report.source.name),
        report.source.content_id.short(),
        report.source.baseline_rows,
        report.source.endline_rows,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Filter: {}</p>\n",
        html_escape(&describe_filter(report))
    ));
    html.push_str("</header>\n");

    // Executive summary
    let s = &report.summary;
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Executive summary</h2>\n");
    html.push_str("<div class=\"kpis\">\n");
    for (label, value) in [
        ("Students", s.students.to_string()),
        ("Baseline average", format_percentage(s.avg_baseline)),
        ("Endline average", format_percentage(s.avg_endline)),
        ("Average growth", format_growth(s.avg_growth)),
    ] {
        html.push_str(&format!(
            "<div class=\"kpi\"><span class=\"label\">{label}</span><span class=\"value\">{value}</span></div>\n"
        ));
    }
    html.push_str("</div>\n");
    html.push_str(&format!("<p class=\"insight\">{}</p>\n", html_escape(&s.insight())));
    html.push_str("</section>\n");

    // Grades
    if !report.grades.is_empty() {
        html.push_str("<section class=\"grades\">\n");
        html.push_str("<h2>Baseline vs endline by grade</h2>\n");
        html.push_str(&generate_grade_chart(&report.grades));
        html.push_str("</section>\n");
    }

    // Centres
    if !report.centers.centers.is_empty() {
        html.push_str("<section class=\"centers\">\n");
        html.push_str("<h2>Centre performance matrix</h2>\n");
        html.push_str(&generate_center_matrix(&report.centers));
        html.push_str("<table class=\"summary\">\n");
        html.push_str("<thead><tr><th>Centre</th><th>Students</th><th>Average growth</th><th>Endline average</th><th>Quadrant</th></tr></thead>\n");
        html.push_str("<tbody>\n");
        for c in &report.centers.centers {
            let (class, label) = quadrant_style(c.quadrant);
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"{class}\">{label}</td></tr>\n",
                html_escape(&c.center),
                c.students,
                format_growth(c.avg_growth),
                format_percentage(c.avg_endline),
            ));
        }
        html.push_str("</tbody></table>\n");
        html.push_str("</section>\n");
    }

    // Questions
    if !report.questions.is_empty() {
        html.push_str("<section class=\"questions\">\n");
        html.push_str("<h2>Question accuracy (endline)</h2>\n");
        if let Some(d) = &report.difficulty {
            html.push_str(&format!(
                "<p>Hardest: <strong>{}</strong> ({:.1}% correct) | Easiest: <strong>{}</strong> ({:.1}% correct)</p>\n",
                d.hardest.label(),
                d.hardest.mean_accuracy,
                d.easiest.label(),
                d.easiest.mean_accuracy
            ));
        }
        html.push_str(&generate_heatmap(report));
        html.push_str("</section>\n");
    }

    // Students
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Students</h2>\n");
    html.push_str("<input type=\"search\" id=\"student-search\" placeholder=\"Search by Student ID or Centre\" oninput=\"filterStudents(this.value)\">\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">Student ID</th><th onclick=\"sortTable(1)\">State</th><th onclick=\"sortTable(2)\">Centre</th><th onclick=\"sortTable(3)\">Grade</th><th onclick=\"sortTable(4)\">Baseline</th><th onclick=\"sortTable(5)\">Endline</th><th onclick=\"sortTable(6)\">Growth</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for r in &report.students {
        let class = if r.growth.is_nan() {
            ""
        } else if r.growth >= 0.0 {
            "pass"
        } else {
            "fail"
        };
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"{class}\">{}</td></tr>\n",
            html_escape(&r.student_id),
            html_escape(&r.state),
            html_escape(&r.center),
            r.grade.map(|g| g.to_string()).unwrap_or_default(),
            format_percentage(r.percentage_baseline),
            format_percentage(r.percentage_endline),
            format_growth(r.growth),
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Data quality
    let d = &report.diagnostics;
    html.push_str("<section class=\"diagnostics\">\n");
    html.push_str("<h2>Data quality</h2>\n<ul>\n");
    html.push_str(&format!(
        "<li>{} baseline-only and {} endline-only students excluded from growth</li>\n",
        d.join.baseline_only, d.join.endline_only
    ));
    html.push_str(&format!(
        "<li>{} duplicate baseline IDs, {} duplicate endline IDs, {} rows without an ID</li>\n",
        d.join.duplicate_baseline_ids, d.join.duplicate_endline_ids, d.join.missing_ids
    ));
    html.push_str(&format!(
        "<li>{} answer key entries, {} unreadable key rows skipped, {} duplicate key rows</li>\n",
        report.source.key_entries, d.key_skipped_rows, d.key_duplicate_rows
    ));
    html.push_str("</ul>\n</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(
        &serde_json::to_string_pretty(report)
            .unwrap_or_default()
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    );
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write the dashboard to a file.
pub fn write_html_report(report: &ImpactReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn describe_filter(report: &ImpactReport) -> String {
    let states = match &report.filter.states {
        Some(s) => s.iter().cloned().collect::<Vec<_>>().join(", "),
        None => "all states".to_string(),
    };
    let grades = match &report.filter.grades {
        Some(g) => g.iter().map(Grade::code).collect::<Vec<_>>().join(", "),
        None => "all grades".to_string(),
    };
    format!("{states}; {grades}")
}

fn quadrant_style(quadrant: Option<Quadrant>) -> (&'static str, &'static str) {
    match quadrant {
        Some(Quadrant::Leading) => ("pass", "Leading"),
        Some(Quadrant::Improving) => ("improving", "Improving"),
        Some(Quadrant::Plateaued) => ("plateaued", "Plateaued"),
        Some(Quadrant::NeedsAttention) => ("fail", "Needs attention"),
        None => ("", "-"),
    }
}

fn generate_grade_chart(grades: &[GradeStats]) -> String {
    let bar_height = 14;
    let group_gap = 16;
    let max_width = 400;
    let label_width = 80;
    let group_height = bar_height * 2 + group_gap;

    let total_height = grades.len() * group_height + group_gap;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 70,
        total_height
    );

    for (i, g) in grades.iter().enumerate() {
        let y = i * group_height + group_gap;
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">Grade {}</text>\n",
            label_width - 10,
            y + bar_height,
            g.grade
        ));
        for (j, (value, color)) in [(g.avg_baseline, "#94a3b8"), (g.avg_endline, "#3b82f6")]
            .into_iter()
            .enumerate()
        {
            let bar_y = y + j * bar_height;
            let width = if value.is_nan() {
                0
            } else {
                (value / 100.0 * max_width as f64) as usize
            };
            svg.push_str(&format!(
                "  <rect x=\"{label_width}\" y=\"{bar_y}\" width=\"{width}\" height=\"{}\" fill=\"{color}\" rx=\"3\"/>\n",
                bar_height - 2
            ));
            svg.push_str(&format!(
                "  <text x=\"{}\" y=\"{}\" font-size=\"11\" fill=\"currentColor\" dominant-baseline=\"middle\">{}</text>\n",
                label_width + width + 6,
                bar_y + bar_height / 2,
                format_percentage(value)
            ));
        }
    }

    svg.push_str("</svg>\n");
    svg.push_str("<p class=\"legend\"><span class=\"swatch baseline\"></span>Baseline <span class=\"swatch endline\"></span>Endline</p>\n");
    svg
}

/// Scatter of centres: x = average growth, y = endline average, with the
/// cross-centre means drawn as reference lines.
fn generate_center_matrix(matrix: &CenterMatrix) -> String {
    let width = 480.0;
    let height = 320.0;
    let pad = 40.0;

    let points: Vec<(&str, f64, f64)> = matrix
        .centers
        .iter()
        .filter(|c| !c.avg_growth.is_nan() && !c.avg_endline.is_nan())
        .map(|c| (c.center.as_str(), c.avg_growth, c.avg_endline))
        .collect();
    if points.is_empty() {
        return String::new();
    }

    let (min_g, max_g) = points.iter().fold((0.0f64, 0.0f64), |(lo, hi), p| {
        (lo.min(p.1), hi.max(p.1))
    });
    let span_g = if max_g > min_g { max_g - min_g } else { 1.0 };
    let x = |g: f64| pad + (g - min_g) / span_g * (width - 2.0 * pad);
    let y = |e: f64| height - pad - e / 100.0 * (height - 2.0 * pad);

    let mut svg = format!(
        "<svg width=\"{width}\" height=\"{height}\" xmlns=\"http://www.w3.org/2000/svg\">\n"
    );
    if !matrix.mean_growth.is_nan() && !matrix.mean_endline.is_nan() {
        let mx = x(matrix.mean_growth);
        let my = y(matrix.mean_endline);
        svg.push_str(&format!(
            "  <line x1=\"{mx:.1}\" y1=\"{pad}\" x2=\"{mx:.1}\" y2=\"{:.1}\" stroke=\"#9ca3af\" stroke-dasharray=\"4\"/>\n",
            height - pad
        ));
        svg.push_str(&format!(
            "  <line x1=\"{pad}\" y1=\"{my:.1}\" x2=\"{:.1}\" y2=\"{my:.1}\" stroke=\"#9ca3af\" stroke-dasharray=\"4\"/>\n",
            width - pad
        ));
    }
    for (name, growth, endline) in &points {
        svg.push_str(&format!(
            "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"5\" fill=\"#3b82f6\"><title>{}: {} growth, {} endline</title></circle>\n",
            x(*growth),
            y(*endline),
            html_escape(name),
            format_growth(*growth),
            format_percentage(*endline)
        ));
    }
    svg.push_str(&format!(
        "  <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\" fill=\"currentColor\" text-anchor=\"middle\">Average growth</text>\n",
        width / 2.0,
        height - 8.0
    ));
    svg.push_str("</svg>\n");
    svg
}

fn generate_heatmap(report: &ImpactReport) -> String {
    let mut grades: Vec<Grade> = Vec::new();
    for q in &report.questions {
        if !grades.contains(&q.grade) {
            grades.push(q.grade);
        }
    }

    let mut html = String::from("<table class=\"heatmap\">\n<thead><tr><th>Grade</th>");
    for question in 1..=MAX_QUESTIONS {
        html.push_str(&format!("<th>Q{question}</th>"));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for grade in grades {
        html.push_str(&format!("<tr><td>{}</td>", grade.code()));
        for question in 1..=MAX_QUESTIONS {
            match report
                .questions
                .iter()
                .find(|q| q.grade == grade && q.question == question)
            {
                Some(q) => html.push_str(&format!(
                    "<td style=\"background: {}\" title=\"{}/{} correct\">{:.0}%</td>",
                    heat_color(q.accuracy),
                    q.correct,
                    q.students,
                    q.accuracy
                )),
                None => html.push_str("<td class=\"na\">-</td>"),
            }
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody></table>\n");
    html
}

/// Red (0%) through yellow to green (100%).
fn heat_color(accuracy: f64) -> String {
    let hue = (accuracy.clamp(0.0, 100.0) * 1.2).round();
    format!("hsl({hue}, 70%, 75%)")
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; --improving: #dbeafe; --plateaued: #fef9c3; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; --improving: #1e3a8a; --plateaued: #713f12; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.kpis { display: flex; gap: 1rem; flex-wrap: wrap; }
.kpi { border: 1px solid var(--border); border-radius: 8px; padding: 1rem 1.5rem; min-width: 10rem; }
.kpi .label { display: block; color: #6b7280; font-size: 0.85rem; }
.kpi .value { display: block; font-size: 1.6rem; font-weight: bold; }
.insight { font-size: 1.05rem; max-width: 60rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.heatmap td { text-align: center; color: #1a1a1a; }
.heatmap td.na { color: #9ca3af; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.improving { background: var(--improving); }
.plateaued { background: var(--plateaued); }
.legend .swatch { display: inline-block; width: 0.8rem; height: 0.8rem; margin: 0 0.3rem 0 1rem; }
.legend .baseline { background: #94a3b8; }
.legend .endline { background: #3b82f6; }
input[type=search] { padding: 0.4rem 0.8rem; width: 20rem; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    const na = parseFloat(va), nb = parseFloat(vb);
    const cmp = !isNaN(na) && !isNaN(nb) ? na - nb : va.localeCompare(vb);
    return asc ? cmp : -cmp;
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
function filterStudents(term) {
  const lowered = term.trim().toLowerCase();
  document.querySelectorAll('#results tbody tr').forEach(r => {
    const id = r.cells[0].textContent;
    const center = r.cells[2].textContent.toLowerCase();
    r.style.display = !lowered || id.includes(term.trim()) || center.includes(lowered) ? '' : 'none';
  });
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use learnmetric_core::cohort::JoinDiagnostics;
    use learnmetric_core::model::{ContentId, GrowthRecord, QuestionAccuracy, SheetNames};
    use learnmetric_core::questions::QuestionDifficulty;
    use learnmetric_core::report::{ReportDiagnostics, SourceSummary};
    use learnmetric_core::statistics::{grade_stats, CohortFilter, ExecutiveSummary};

    fn student(id: &str, center: &str, bl: f64, el: f64) -> GrowthRecord {
        GrowthRecord {
            student_id: id.into(),
            state: "KA".into(),
            center: center.into(),
            grade: Some(Grade(3)),
            score_baseline: 0,
            score_endline: 0,
            percentage_baseline: bl,
            percentage_endline: el,
            growth: el - bl,
        }
    }

    fn make_test_report() -> ImpactReport {
        let students = vec![
            student("1001", "Hubli <North>", 40.0, 80.0),
            student("1002", "Dharwad", 60.0, 50.0),
        ];
        let refs: Vec<&GrowthRecord> = students.iter().collect();
        let questions = vec![
            QuestionAccuracy {
                grade: Grade(3),
                question: 1,
                accuracy: 100.0,
                correct: 2,
                students: 2,
            },
            QuestionAccuracy {
                grade: Grade(3),
                question: 2,
                accuracy: 50.0,
                correct: 1,
                students: 2,
            },
        ];
        ImpactReport {
            id: uuid::Uuid::nil(),
            created_at: chrono::Utc::now(),
            source: SourceSummary {
                name: "assessment.xlsx".into(),
                content_id: ContentId::of_bytes(b"html"),
                sheets: SheetNames::default(),
                baseline_rows: 2,
                endline_rows: 2,
                key_entries: 4,
            },
            filter: CohortFilter::default().with_states(["KA"]),
            summary: ExecutiveSummary::compute(&refs),
            grades: grade_stats(&refs),
            centers: CenterMatrix::compute(&refs),
            difficulty: QuestionDifficulty::from_records(&questions),
            questions,
            students,
            diagnostics: ReportDiagnostics {
                join: JoinDiagnostics::default(),
                key_skipped_rows: 0,
                key_duplicate_rows: 0,
            },
        }
    }

    #[test]
    fn html_report_contains_required_elements() {
        let report = make_test_report();
        let html = generate_html(&report);

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("assessment.xlsx"));
        assert!(html.contains("1001"));
        assert!(html.contains("Across 2 students"));
        assert!(html.contains("Grade 3"));
        assert!(html.contains("Hardest: <strong>Q2</strong>"));
        assert!(html.contains("KA; all grades"));
    }

    #[test]
    fn centre_names_are_escaped() {
        let html = generate_html(&make_test_report());
        assert!(html.contains("Hubli &lt;North&gt;"));
        assert!(!html.contains("Hubli <North>"));
    }

    #[test]
    fn heatmap_marks_uncovered_questions() {
        let html = generate_heatmap(&make_test_report());
        assert!(html.contains("<td>G3</td>"));
        assert!(html.contains("100%"));
        assert_eq!(html.matches("class=\"na\"").count(), MAX_QUESTIONS as usize - 2);
    }

    #[test]
    fn empty_report_renders() {
        let mut report = make_test_report();
        report.students.clear();
        report.questions.clear();
        report.difficulty = None;
        report.grades.clear();
        report.centers = CenterMatrix::compute(&[]);
        report.summary = ExecutiveSummary::compute(&[]);

        let html = generate_html(&report);
        assert!(html.contains("n/a"));
        assert!(!html.contains("Question accuracy"));
    }

    #[test]
    fn heat_color_spans_red_to_green() {
        assert_eq!(heat_color(0.0), "hsl(0, 70%, 75%)");
        assert_eq!(heat_color(100.0), "hsl(120, 70%, 75%)");
        assert_eq!(heat_color(150.0), "hsl(120, 70%, 75%)");
    }

    #[test]
    fn html_report_write_to_file() {
        let report = make_test_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.html");

        write_html_report(&report, &path).unwrap();
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }
}
