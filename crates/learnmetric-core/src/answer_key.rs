//! The correct-answer key.
//!
//! Built once per workbook from the `AnswerKey` sheet into a hash map keyed
//! by (grade, phase, question), so scoring never rescans the sheet.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::model::{columns, CellValue, Grade, Phase, Row, Sheet, EMPTY_CELL, MAX_QUESTIONS};

/// Correct answer for one (grade, phase, question) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnswerKeyEntry {
    pub grade: Grade,
    pub phase: Phase,
    pub question: u32,
    pub correct: i64,
}

/// Indexed answer key.
#[derive(Debug, Clone, Default)]
pub struct AnswerKey {
    index: HashMap<(Grade, Phase, u32), i64>,
    entries: Vec<AnswerKeyEntry>,
    skipped_rows: usize,
    duplicate_rows: usize,
}

impl AnswerKey {
    /// Build a key from entries.
    ///
    /// Repeated triples with the same correct value collapse into one entry;
    /// repeated triples that disagree are rejected.
    pub fn from_entries(
        entries: impl IntoIterator<Item = AnswerKeyEntry>,
    ) -> Result<Self, PipelineError> {
        let mut key = AnswerKey::default();
        for entry in entries {
            key.insert(entry)?;
        }
        Ok(key)
    }

    /// Build a key from the answer key sheet.
    ///
    /// Rows that cannot be read (unknown grade code, unknown assessment,
    /// question outside `1..=MAX_QUESTIONS`, non-integer correct value) are
    /// skipped and counted.
    pub fn from_sheet(sheet: &Sheet) -> Result<Self, PipelineError> {
        let missing = sheet.missing_columns(&columns::ANSWER_KEY);
        if !missing.is_empty() {
            return Err(PipelineError::MissingColumns {
                sheet: sheet.name().to_string(),
                columns: missing,
            });
        }

        let mut key = AnswerKey::default();
        for (i, row) in sheet.rows().enumerate() {
            match parse_entry(&row) {
                Ok(entry) => key.insert(entry)?,
                Err(reason) => {
                    // +2: one for the header row, one for 1-based numbering.
                    tracing::warn!(
                        sheet = sheet.name(),
                        row = i + 2,
                        "skipping answer key row: {reason}"
                    );
                    key.skipped_rows += 1;
                }
            }
        }

        tracing::debug!(
            entries = key.entries.len(),
            skipped = key.skipped_rows,
            duplicates = key.duplicate_rows,
            "answer key loaded"
        );
        Ok(key)
    }

    fn insert(&mut self, entry: AnswerKeyEntry) -> Result<(), PipelineError> {
        let triple = (entry.grade, entry.phase, entry.question);
        match self.index.get(&triple) {
            Some(&existing) if existing == entry.correct => {
                tracing::debug!(
                    grade = %entry.grade.code(),
                    phase = %entry.phase,
                    question = entry.question,
                    "duplicate answer key entry collapsed"
                );
                self.duplicate_rows += 1;
                Ok(())
            }
            Some(&existing) => Err(PipelineError::ConflictingKeyEntry {
                grade: entry.grade,
                phase: entry.phase,
                question: entry.question,
                first: existing,
                second: entry.correct,
            }),
            None => {
                self.index.insert(triple, entry.correct);
                self.entries.push(entry);
                Ok(())
            }
        }
    }

    /// Correct answer code, or `None` when the question is not covered.
    pub fn lookup(&self, grade: Grade, phase: Phase, question: u32) -> Option<i64> {
        self.index.get(&(grade, phase, question)).copied()
    }

    /// Entries in sheet order, without duplicates.
    pub fn entries(&self) -> &[AnswerKeyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows skipped because they could not be read.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Rows that repeated an existing entry with the same correct value.
    pub fn duplicate_rows(&self) -> usize {
        self.duplicate_rows
    }
}

fn parse_entry(row: &Row<'_>) -> Result<AnswerKeyEntry, String> {
    let cell = |column: &str| row.get(column).unwrap_or(&EMPTY_CELL);

    let grade_text = cell(columns::GRADE).to_trimmed_string();
    let grade = Grade::from_code(&grade_text)
        .ok_or_else(|| format!("grade '{grade_text}' is not of the form G<n>"))?;

    let phase: Phase = cell(columns::ASSESSMENT).to_trimmed_string().parse()?;

    let question = cell(columns::QUESTION_NUMBER)
        .as_integer()
        .ok_or_else(|| "question number is not an integer".to_string())?;
    if !(1..=MAX_QUESTIONS as i64).contains(&question) {
        return Err(format!(
            "question number {question} is outside 1..={MAX_QUESTIONS}"
        ));
    }

    let correct = cell(columns::CORRECT_VALUE)
        .as_integer()
        .ok_or_else(|| "correct value is not an integer".to_string())?;

    Ok(AnswerKeyEntry {
        grade,
        phase,
        question: question as u32,
        correct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_sheet(rows: Vec<Vec<CellValue>>) -> Sheet {
        Sheet::from_rows(
            "AnswerKey",
            ["Grade", "Assessment", "Question #", "Correct Value"],
            rows,
        )
    }

    fn row(grade: &str, phase: &str, q: f64, correct: f64) -> Vec<CellValue> {
        vec![grade.into(), phase.into(), q.into(), correct.into()]
    }

    #[test]
    fn lookup_uses_prefixed_grade_code() {
        let key = AnswerKey::from_sheet(&key_sheet(vec![
            row("G3", "Baseline", 1.0, 2.0),
            row("G3", "Endline", 1.0, 4.0),
            row("G5", "Baseline", 2.0, 1.0),
        ]))
        .unwrap();

        assert_eq!(key.len(), 3);
        assert_eq!(key.lookup(Grade(3), Phase::Baseline, 1), Some(2));
        assert_eq!(key.lookup(Grade(3), Phase::Endline, 1), Some(4));
        assert_eq!(key.lookup(Grade(5), Phase::Baseline, 2), Some(1));
        assert_eq!(key.lookup(Grade(5), Phase::Baseline, 1), None);
        assert_eq!(key.lookup(Grade(4), Phase::Baseline, 1), None);
    }

    #[test]
    fn text_numbers_in_key_are_accepted() {
        let key = AnswerKey::from_sheet(&key_sheet(vec![vec![
            "G4".into(),
            "Endline".into(),
            "7".into(),
            " 3 ".into(),
        ]]))
        .unwrap();
        assert_eq!(key.lookup(Grade(4), Phase::Endline, 7), Some(3));
    }

    #[test]
    fn malformed_rows_are_skipped_and_counted() {
        let key = AnswerKey::from_sheet(&key_sheet(vec![
            row("3", "Baseline", 1.0, 2.0),
            row("G3", "baseline", 1.0, 2.0),
            row("G3", "Baseline", 11.0, 2.0),
            row("G3", "Baseline", 0.0, 2.0),
            row("G3", "Baseline", 1.5, 2.0),
            vec!["G3".into(), "Baseline".into(), CellValue::Number(1.0), "B".into()],
            row("G3", "Baseline", 2.0, 1.0),
        ]))
        .unwrap();
        assert_eq!(key.len(), 1);
        assert_eq!(key.skipped_rows(), 6);
        assert_eq!(key.lookup(Grade(3), Phase::Baseline, 2), Some(1));
    }

    #[test]
    fn identical_duplicates_collapse() {
        let key = AnswerKey::from_sheet(&key_sheet(vec![
            row("G3", "Baseline", 1.0, 2.0),
            row("G3", "Baseline", 1.0, 2.0),
        ]))
        .unwrap();
        assert_eq!(key.len(), 1);
        assert_eq!(key.duplicate_rows(), 1);
    }

    #[test]
    fn conflicting_duplicates_are_rejected() {
        let err = AnswerKey::from_sheet(&key_sheet(vec![
            row("G3", "Baseline", 1.0, 2.0),
            row("G3", "Baseline", 1.0, 3.0),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ConflictingKeyEntry {
                first: 2,
                second: 3,
                ..
            }
        ));
    }

    #[test]
    fn missing_columns_are_structural() {
        let sheet = Sheet::from_rows(
            "AnswerKey",
            ["Grade", "Assessment"],
            Vec::<Vec<CellValue>>::new(),
        );
        let err = AnswerKey::from_sheet(&sheet).unwrap_err();
        match err {
            PipelineError::MissingColumns { columns, .. } => {
                assert_eq!(columns, vec!["Question #", "Correct Value"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn from_entries_preserves_order() {
        let entries = [
            AnswerKeyEntry {
                grade: Grade(4),
                phase: Phase::Endline,
                question: 2,
                correct: 1,
            },
            AnswerKeyEntry {
                grade: Grade(3),
                phase: Phase::Baseline,
                question: 1,
                correct: 3,
            },
        ];
        let key = AnswerKey::from_entries(entries).unwrap();
        assert_eq!(key.entries(), &entries);
    }
}
