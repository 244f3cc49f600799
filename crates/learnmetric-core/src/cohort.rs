//! Cohort processing: score both phases and join them into growth records.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::answer_key::AnswerKey;
use crate::error::PipelineError;
use crate::model::{
    columns, ContentId, GrowthRecord, Phase, QuestionAccuracy, ScoredRecord, Sheet, SheetNames,
    StudentRecord, Workbook,
};
use crate::questions;
use crate::scorer::score_records;
use crate::statistics::CohortFilter;

/// What the baseline/endline join had to leave out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JoinDiagnostics {
    /// Students with a baseline row but no endline row.
    pub baseline_only: usize,
    /// Students with an endline row but no baseline row.
    pub endline_only: usize,
    /// Baseline rows repeating an earlier Student ID.
    pub duplicate_baseline_ids: usize,
    /// Endline rows repeating an earlier Student ID.
    pub duplicate_endline_ids: usize,
    /// Rows (either phase) with a blank Student ID.
    pub missing_ids: usize,
}

impl JoinDiagnostics {
    /// Total students that could not be matched across phases.
    pub fn dropped(&self) -> usize {
        self.baseline_only + self.endline_only
    }
}

/// Scored phases and their joined growth table.
#[derive(Debug, Clone)]
pub struct CohortResult {
    pub baseline: Vec<ScoredRecord>,
    pub endline: Vec<ScoredRecord>,
    pub growth: Vec<GrowthRecord>,
    pub diagnostics: JoinDiagnostics,
}

/// Score baseline and endline rows and join them on Student ID.
pub fn process(
    baseline_rows: Vec<StudentRecord>,
    endline_rows: Vec<StudentRecord>,
    key: &AnswerKey,
) -> CohortResult {
    let baseline = score_records(baseline_rows, key, Phase::Baseline);
    let endline = score_records(endline_rows, key, Phase::Endline);
    let (growth, diagnostics) = join(&baseline, &endline);

    CohortResult {
        baseline,
        endline,
        growth,
        diagnostics,
    }
}

/// Inner-join scored phases on Student ID, in baseline order.
///
/// The first row seen for an ID wins within each phase. Students present in
/// only one phase are dropped and counted.
pub fn join(baseline: &[ScoredRecord], endline: &[ScoredRecord]) -> (Vec<GrowthRecord>, JoinDiagnostics) {
    let mut diagnostics = JoinDiagnostics::default();

    let mut endline_by_id: HashMap<&str, &ScoredRecord> = HashMap::new();
    for row in endline {
        let id = row.record.student_id.as_str();
        if id.is_empty() {
            diagnostics.missing_ids += 1;
            continue;
        }
        if endline_by_id.contains_key(id) {
            diagnostics.duplicate_endline_ids += 1;
            tracing::warn!(student_id = id, "duplicate Student ID in endline sheet ignored");
        } else {
            endline_by_id.insert(id, row);
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut growth = Vec::new();
    for row in baseline {
        let id = row.record.student_id.as_str();
        if id.is_empty() {
            diagnostics.missing_ids += 1;
            continue;
        }
        if !seen.insert(id) {
            diagnostics.duplicate_baseline_ids += 1;
            tracing::warn!(student_id = id, "duplicate Student ID in baseline sheet ignored");
            continue;
        }
        match endline_by_id.get(id) {
            Some(end) => growth.push(GrowthRecord {
                student_id: row.record.student_id.clone(),
                state: row.record.state.clone(),
                center: row.record.center.clone(),
                grade: row.record.grade,
                score_baseline: row.score,
                score_endline: end.score,
                percentage_baseline: row.percentage,
                percentage_endline: end.percentage,
                growth: end.percentage - row.percentage,
            }),
            None => diagnostics.baseline_only += 1,
        }
    }

    diagnostics.endline_only = endline_by_id.keys().filter(|id| !seen.contains(*id)).count();

    if diagnostics.dropped() > 0 {
        tracing::info!(
            baseline_only = diagnostics.baseline_only,
            endline_only = diagnostics.endline_only,
            "students present in only one phase were dropped from growth"
        );
    }

    (growth, diagnostics)
}

/// Everything derived from one uploaded workbook.
#[derive(Debug, Clone)]
pub struct ProcessedWorkbook {
    pub content_id: ContentId,
    pub sheets: SheetNames,
    pub answer_key: AnswerKey,
    pub baseline: Vec<ScoredRecord>,
    pub endline: Vec<ScoredRecord>,
    pub growth: Vec<GrowthRecord>,
    pub diagnostics: JoinDiagnostics,
}

impl ProcessedWorkbook {
    /// Scored rows of one phase.
    pub fn phase(&self, phase: Phase) -> &[ScoredRecord] {
        match phase {
            Phase::Baseline => &self.baseline,
            Phase::Endline => &self.endline,
        }
    }

    /// Per-question accuracy for a phase over the rows that pass `filter`.
    pub fn question_accuracy(&self, phase: Phase, filter: &CohortFilter) -> Vec<QuestionAccuracy> {
        let rows = self
            .phase(phase)
            .iter()
            .filter(|r| filter.matches(&r.record.state, r.record.grade))
            .map(|r| &r.record);
        questions::analyze(rows, &self.answer_key, phase)
    }
}

/// Validate a workbook's structure, then score and join it.
///
/// Any structural problem aborts the whole call before per-row work.
pub fn process_workbook(
    workbook: &Workbook,
    sheets: &SheetNames,
) -> Result<ProcessedWorkbook, PipelineError> {
    let (baseline_sheet, endline_sheet, key_sheet) = required_sheets(workbook, sheets)?;

    for sheet in [baseline_sheet, endline_sheet] {
        let missing = sheet.missing_columns(&columns::RESPONSE);
        if !missing.is_empty() {
            return Err(PipelineError::MissingColumns {
                sheet: sheet.name().to_string(),
                columns: missing,
            });
        }
    }
    let answer_key = AnswerKey::from_sheet(key_sheet)?;

    let records = |sheet: &Sheet| -> Vec<StudentRecord> {
        sheet.rows().map(|row| StudentRecord::from_row(&row)).collect()
    };
    let result = process(records(baseline_sheet), records(endline_sheet), &answer_key);

    tracing::info!(
        content = workbook.content_id().short(),
        baseline = result.baseline.len(),
        endline = result.endline.len(),
        matched = result.growth.len(),
        key_entries = answer_key.len(),
        "workbook processed"
    );

    Ok(ProcessedWorkbook {
        content_id: workbook.content_id().clone(),
        sheets: sheets.clone(),
        answer_key,
        baseline: result.baseline,
        endline: result.endline,
        growth: result.growth,
        diagnostics: result.diagnostics,
    })
}

fn required_sheets<'w>(
    workbook: &'w Workbook,
    names: &SheetNames,
) -> Result<(&'w Sheet, &'w Sheet, &'w Sheet), PipelineError> {
    let baseline = workbook.sheet(&names.baseline);
    let endline = workbook.sheet(&names.endline);
    let key = workbook.sheet(&names.answer_key);

    match (baseline, endline, key) {
        (Some(b), Some(e), Some(k)) => Ok((b, e, k)),
        _ => {
            let sheets = [
                (baseline.is_none(), &names.baseline),
                (endline.is_none(), &names.endline),
                (key.is_none(), &names.answer_key),
            ]
            .into_iter()
            .filter(|(missing, _)| *missing)
            .map(|(_, name)| name.clone())
            .collect();
            Err(PipelineError::MissingSheets { sheets })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, Grade};

    const RESPONSE_HEADERS: [&str; 6] = ["Student ID", "State", "Center", "Grade", "Q1", "Q2"];

    fn answer(v: i64) -> String {
        format!(r#""{{""value"":{v}}}""#)
    }

    fn response_sheet(name: &str, rows: &[(&str, &str, f64, Option<i64>, Option<i64>)]) -> Sheet {
        Sheet::from_rows(
            name,
            RESPONSE_HEADERS,
            rows.iter().map(|(id, center, grade, q1, q2)| {
                vec![
                    CellValue::from(*id),
                    CellValue::from("KA"),
                    CellValue::from(*center),
                    CellValue::Number(*grade),
                    q1.map(|v| CellValue::from(answer(v))).unwrap_or_default(),
                    q2.map(|v| CellValue::from(answer(v))).unwrap_or_default(),
                ]
            }),
        )
    }

    fn key_sheet(name: &str) -> Sheet {
        Sheet::from_rows(
            name,
            ["Grade", "Assessment", "Question #", "Correct Value"],
            vec![
                vec![CellValue::from("G3"), "Baseline".into(), 1.0.into(), 2.0.into()],
                vec![CellValue::from("G3"), "Baseline".into(), 2.0.into(), 1.0.into()],
                vec![CellValue::from("G3"), "Endline".into(), 1.0.into(), 2.0.into()],
                vec![CellValue::from("G3"), "Endline".into(), 2.0.into(), 1.0.into()],
            ],
        )
    }

    fn workbook() -> Workbook {
        Workbook::new(ContentId::of_bytes(b"test"))
            .with_sheet(response_sheet(
                "WB-Baseline-English",
                &[
                    ("1001", "Hubli", 3.0, Some(2), None),
                    ("1002", "Hubli", 3.0, Some(3), Some(1)),
                    ("1003", "Dharwad", 3.0, None, None),
                ],
            ))
            .with_sheet(response_sheet(
                "WB-Endline-English",
                &[
                    ("1001", "Hubli", 3.0, Some(2), Some(1)),
                    ("1002", "Hubli", 3.0, Some(2), Some(1)),
                    ("1004", "Dharwad", 3.0, Some(2), Some(1)),
                ],
            ))
            .with_sheet(key_sheet("AnswerKey"))
    }

    #[test]
    fn processes_and_joins_workbook() {
        let processed = process_workbook(&workbook(), &SheetNames::default()).unwrap();

        assert_eq!(processed.baseline.len(), 3);
        assert_eq!(processed.endline.len(), 3);
        assert_eq!(processed.growth.len(), 2);

        let first = &processed.growth[0];
        assert_eq!(first.student_id, "1001");
        assert_eq!(first.percentage_baseline, 50.0);
        assert_eq!(first.percentage_endline, 100.0);
        assert_eq!(first.growth, 50.0);

        let second = &processed.growth[1];
        assert_eq!(second.student_id, "1002");
        assert_eq!(second.growth, 100.0 - 50.0);

        assert_eq!(processed.diagnostics.baseline_only, 1);
        assert_eq!(processed.diagnostics.endline_only, 1);
        assert_eq!(processed.diagnostics.dropped(), 2);
    }

    #[test]
    fn growth_is_exact_difference_and_bounded_by_smaller_phase() {
        let processed = process_workbook(&workbook(), &SheetNames::default()).unwrap();
        assert!(processed.growth.len() <= processed.baseline.len().min(processed.endline.len()));
        for g in &processed.growth {
            assert_eq!(g.growth, g.percentage_endline - g.percentage_baseline);
        }
    }

    #[test]
    fn missing_sheets_are_reported_together() {
        let wb = Workbook::new(ContentId::of_bytes(b"x")).with_sheet(key_sheet("AnswerKey"));
        let err = process_workbook(&wb, &SheetNames::default()).unwrap_err();
        match err {
            PipelineError::MissingSheets { sheets } => {
                assert_eq!(sheets, vec!["WB-Baseline-English", "WB-Endline-English"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_response_column_is_fatal() {
        let mut wb = workbook();
        wb.add_sheet(Sheet::from_rows(
            "WB-Endline-English",
            ["Student ID", "State", "Grade", "Q1"],
            vec![vec!["1001", "KA", "3", "x"]],
        ));
        let err = process_workbook(&wb, &SheetNames::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingColumns { ref sheet, ref columns }
                if sheet == "WB-Endline-English" && columns == &vec!["Center".to_string()]
        ));
    }

    #[test]
    fn custom_sheet_names_are_honoured() {
        let names = SheetNames {
            baseline: "BL".into(),
            endline: "EL".into(),
            answer_key: "Key".into(),
        };
        let wb = Workbook::new(ContentId::of_bytes(b"x"))
            .with_sheet(response_sheet("BL", &[("1", "C", 3.0, Some(2), None)]))
            .with_sheet(response_sheet("EL", &[("1", "C", 3.0, Some(2), None)]))
            .with_sheet(key_sheet("Key"));
        let processed = process_workbook(&wb, &names).unwrap();
        assert_eq!(processed.growth.len(), 1);
    }

    #[test]
    fn uncovered_students_carry_nan_through_growth() {
        let mut wb = workbook();
        wb.add_sheet(response_sheet(
            "WB-Baseline-English",
            &[("1001", "Hubli", 7.0, Some(2), Some(1))],
        ));
        let processed = process_workbook(&wb, &SheetNames::default()).unwrap();
        assert_eq!(processed.growth.len(), 1);
        assert!(processed.growth[0].percentage_baseline.is_nan());
        assert!(processed.growth[0].growth.is_nan());
    }

    #[test]
    fn duplicate_and_blank_ids_are_counted() {
        let baseline = vec![
            StudentRecord {
                student_id: "1".into(),
                state: "KA".into(),
                center: "C".into(),
                grade: Some(Grade(3)),
                answers: Default::default(),
            },
            StudentRecord {
                student_id: "1".into(),
                state: "KA".into(),
                center: "C2".into(),
                grade: Some(Grade(3)),
                answers: Default::default(),
            },
            StudentRecord {
                student_id: String::new(),
                state: "KA".into(),
                center: "C".into(),
                grade: Some(Grade(3)),
                answers: Default::default(),
            },
        ];
        let endline = vec![baseline[0].clone(), baseline[0].clone()];
        let result = process(baseline, endline, &AnswerKey::default());

        assert_eq!(result.growth.len(), 1);
        assert_eq!(result.growth[0].center, "C");
        assert_eq!(result.diagnostics.duplicate_baseline_ids, 1);
        assert_eq!(result.diagnostics.duplicate_endline_ids, 1);
        assert_eq!(result.diagnostics.missing_ids, 1);
        assert_eq!(result.diagnostics.dropped(), 0);
    }

    #[test]
    fn question_accuracy_respects_filter() {
        let processed = process_workbook(&workbook(), &SheetNames::default()).unwrap();
        let all = processed.question_accuracy(Phase::Endline, &CohortFilter::default());
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|q| q.accuracy == 100.0));

        let none = processed.question_accuracy(
            Phase::Endline,
            &CohortFilter::default().with_grades([Grade(5)]),
        );
        assert!(none.is_empty());
    }
}
