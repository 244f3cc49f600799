//! Per-student scoring against the answer key.

use serde::{Deserialize, Serialize};

use crate::answer_key::AnswerKey;
use crate::decoder::decode;
use crate::model::{Phase, ScoredRecord, StudentRecord, MAX_QUESTIONS};

/// Score of one student for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StudentScore {
    /// Covered questions answered correctly.
    pub score: u32,
    /// Questions that have both a column and a key entry.
    pub max_score: u32,
    /// Covered questions whose cell held no decodable answer.
    pub unanswered: u32,
}

impl StudentScore {
    /// `score / max_score * 100`, NaN when nothing was covered.
    pub fn percentage(&self) -> f64 {
        if self.max_score == 0 {
            f64::NAN
        } else {
            self.score as f64 / self.max_score as f64 * 100.0
        }
    }
}

/// Score one student's responses for `phase`.
///
/// Only `Q1..=MAX_QUESTIONS` are considered. A question with no key entry
/// for the student's grade contributes nothing; a covered question whose
/// cell does not decode counts as wrong but still takes a `max_score` slot.
pub fn score(record: &StudentRecord, key: &AnswerKey, phase: Phase) -> StudentScore {
    let mut result = StudentScore::default();
    let Some(grade) = record.grade else {
        return result;
    };

    for question in 1..=MAX_QUESTIONS {
        let Some(cell) = record.answer(question) else {
            continue;
        };
        let Some(correct) = key.lookup(grade, phase, question) else {
            continue;
        };

        result.max_score += 1;
        match decode(cell) {
            Some(answer) if answer == correct => result.score += 1,
            Some(_) => {}
            None => result.unanswered += 1,
        }
    }

    result
}

/// Score every record of a phase, attaching the derived fields.
pub fn score_records(records: Vec<StudentRecord>, key: &AnswerKey, phase: Phase) -> Vec<ScoredRecord> {
    records
        .into_iter()
        .map(|record| {
            let s = score(&record, key, phase);
            ScoredRecord {
                record,
                score: s.score,
                max_score: s.max_score,
                unanswered: s.unanswered,
                percentage: s.percentage(),
            }
        })
        .collect()
}
