//! Impact report types with JSON persistence and markdown rendering.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cohort::{JoinDiagnostics, ProcessedWorkbook};
use crate::model::{ContentId, GrowthRecord, Phase, QuestionAccuracy, SheetNames};
use crate::questions::QuestionDifficulty;
use crate::statistics::{grade_stats, CenterMatrix, CohortFilter, ExecutiveSummary, GradeStats};

/// A complete impact report for one workbook and filter selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Where the data came from.
    pub source: SourceSummary,
    /// Filter applied before aggregation.
    pub filter: CohortFilter,
    pub summary: ExecutiveSummary,
    pub grades: Vec<GradeStats>,
    pub centers: CenterMatrix,
    /// Matched students that pass the filter, in baseline order.
    pub students: Vec<GrowthRecord>,
    /// Endline per-question accuracy for the filtered rows.
    pub questions: Vec<QuestionAccuracy>,
    pub difficulty: Option<QuestionDifficulty>,
    pub diagnostics: ReportDiagnostics,
}

/// Summary of the source workbook (without the rows themselves).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSummary {
    pub name: String,
    pub content_id: ContentId,
    pub sheets: SheetNames,
    pub baseline_rows: usize,
    pub endline_rows: usize,
    pub key_entries: usize,
}

/// Rows that were read but did not contribute to growth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDiagnostics {
    pub join: JoinDiagnostics,
    pub key_skipped_rows: usize,
    pub key_duplicate_rows: usize,
}

impl ImpactReport {
    /// Aggregate a processed workbook under `filter`.
    pub fn build(processed: &ProcessedWorkbook, source_name: &str, filter: &CohortFilter) -> Self {
        let selected = filter.apply(&processed.growth);
        let questions = processed.question_accuracy(Phase::Endline, filter);
        let difficulty = QuestionDifficulty::from_records(&questions);

        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            source: SourceSummary {
                name: source_name.to_string(),
                content_id: processed.content_id.clone(),
                sheets: processed.sheets.clone(),
                baseline_rows: processed.baseline.len(),
                endline_rows: processed.endline.len(),
                key_entries: processed.answer_key.len(),
            },
            filter: filter.clone(),
            summary: ExecutiveSummary::compute(&selected),
            grades: grade_stats(&selected),
            centers: CenterMatrix::compute(&selected),
            students: selected.into_iter().cloned().collect(),
            questions,
            difficulty,
            diagnostics: ReportDiagnostics {
                join: processed.diagnostics,
                key_skipped_rows: processed.answer_key.skipped_rows(),
                key_duplicate_rows: processed.answer_key.duplicate_rows(),
            },
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ImpactReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("# Learning Impact Report\n\n");
        md.push_str(&format!(
            "Source: `{}` ({})\n\n",
            self.source.name,
            self.source.content_id.short()
        ));
        md.push_str(&format!("{}\n\n", self.summary.insight()));

        md.push_str("| Students | Baseline | Endline | Growth |\n");
        md.push_str("|----------|----------|---------|--------|\n");
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n\n",
            self.summary.students,
            format_percentage(self.summary.avg_baseline),
            format_percentage(self.summary.avg_endline),
            format_growth(self.summary.avg_growth),
        ));

        if !self.grades.is_empty() {
            md.push_str("## Grades\n\n");
            md.push_str("| Grade | Students | Baseline | Endline |\n");
            md.push_str("|-------|----------|----------|---------|\n");
            for g in &self.grades {
                md.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    g.grade,
                    g.students,
                    format_percentage(g.avg_baseline),
                    format_percentage(g.avg_endline),
                ));
            }
            md.push('\n');
        }

        if !self.centers.centers.is_empty() {
            md.push_str("## Centres\n\n");
            md.push_str("| Centre | Students | Growth | Endline | Quadrant |\n");
            md.push_str("|--------|----------|--------|---------|----------|\n");
            for c in &self.centers.centers {
                let quadrant = c
                    .quadrant
                    .map(|q| format!("{q:?}"))
                    .unwrap_or_else(|| "-".to_string());
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    c.center,
                    c.students,
                    format_growth(c.avg_growth),
                    format_percentage(c.avg_endline),
                    quadrant,
                ));
            }
            md.push('\n');
        }

        if let Some(d) = &self.difficulty {
            md.push_str("## Questions (endline)\n\n");
            md.push_str(&format!(
                "- Hardest: **{}** ({:.1}% correct)\n",
                d.hardest.label(),
                d.hardest.mean_accuracy
            ));
            md.push_str(&format!(
                "- Easiest: **{}** ({:.1}% correct)\n\n",
                d.easiest.label(),
                d.easiest.mean_accuracy
            ));
        }

        let dropped = self.diagnostics.join.dropped();
        if dropped > 0 || self.diagnostics.key_skipped_rows > 0 {
            md.push_str("## Data quality\n\n");
            md.push_str(&format!(
                "- {} baseline-only and {} endline-only students excluded from growth\n",
                self.diagnostics.join.baseline_only, self.diagnostics.join.endline_only
            ));
            md.push_str(&format!(
                "- {} rows without a Student ID, {} duplicate IDs\n",
                self.diagnostics.join.missing_ids,
                self.diagnostics.join.duplicate_baseline_ids
                    + self.diagnostics.join.duplicate_endline_ids
            ));
            md.push_str(&format!(
                "- {} unreadable answer key rows skipped\n",
                self.diagnostics.key_skipped_rows
            ));
        }

        md
    }
}

/// `42.5%`, or `n/a` for NaN.
pub fn format_percentage(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{value:.1}%")
    }
}

/// `+12.5%` / `-3.0%`, or `n/a` for NaN.
pub fn format_growth(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{value:+.1}%")
    }
}
