//! Per-question accuracy and difficulty ranking.

use serde::{Deserialize, Serialize};

use crate::answer_key::AnswerKey;
use crate::decoder::decode;
use crate::model::{question_column, Grade, Phase, QuestionAccuracy, StudentRecord, MAX_QUESTIONS};

/// Accuracy of every covered question, per grade, for one phase.
///
/// Grades appear in the order they are first seen in `rows`. For each grade
/// the denominator is every row of that grade: blank or undecodable answers
/// count as incorrect. Questions without a key entry for the grade, or with
/// no column in any of the grade's rows, emit nothing. Rows with an unknown
/// grade are ignored.
pub fn analyze<'a>(
    rows: impl IntoIterator<Item = &'a StudentRecord>,
    key: &AnswerKey,
    phase: Phase,
) -> Vec<QuestionAccuracy> {
    let mut groups: Vec<(Grade, Vec<&StudentRecord>)> = Vec::new();
    for row in rows {
        let Some(grade) = row.grade else {
            continue;
        };
        match groups.iter_mut().find(|(g, _)| *g == grade) {
            Some((_, members)) => members.push(row),
            None => groups.push((grade, vec![row])),
        }
    }

    let mut stats = Vec::new();
    for (grade, members) in &groups {
        for question in 1..=MAX_QUESTIONS {
            if !members.iter().any(|r| r.answer(question).is_some()) {
                continue;
            }
            let Some(correct_value) = key.lookup(*grade, phase, question) else {
                continue;
            };

            let correct = members
                .iter()
                .filter(|r| r.answer(question).and_then(decode) == Some(correct_value))
                .count();
            let students = members.len();

            stats.push(QuestionAccuracy {
                grade: *grade,
                question,
                accuracy: correct as f64 / students as f64 * 100.0,
                correct,
                students,
            });
        }
    }
    stats
}

/// Mean accuracy of one question across grades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionMean {
    pub question: u32,
    pub mean_accuracy: f64,
    /// Number of grades contributing to the mean.
    pub grades: usize,
}

impl QuestionMean {
    pub fn label(&self) -> String {
        question_column(self.question)
    }
}

/// Questions ranked from hardest to easiest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDifficulty {
    /// Ascending by mean accuracy; ties keep question-number order.
    pub ranking: Vec<QuestionMean>,
    pub hardest: QuestionMean,
    pub easiest: QuestionMean,
}

impl QuestionDifficulty {
    /// Rank questions by their mean accuracy across grades.
    ///
    /// `hardest` is the first question (by number) with the lowest mean and
    /// `easiest` the first with the highest. Returns `None` for no records.
    pub fn from_records(records: &[QuestionAccuracy]) -> Option<Self> {
        let mut means: Vec<QuestionMean> = Vec::new();
        for question in 1..=MAX_QUESTIONS {
            let values: Vec<f64> = records
                .iter()
                .filter(|r| r.question == question)
                .map(|r| r.accuracy)
                .collect();
            if values.is_empty() {
                continue;
            }
            means.push(QuestionMean {
                question,
                mean_accuracy: values.iter().sum::<f64>() / values.len() as f64,
                grades: values.len(),
            });
        }

        let hardest = means
            .iter()
            .fold(None::<&QuestionMean>, |best, m| match best {
                Some(b) if b.mean_accuracy <= m.mean_accuracy => Some(b),
                _ => Some(m),
            })?
            .clone();
        let easiest = means
            .iter()
            .fold(None::<&QuestionMean>, |best, m| match best {
                Some(b) if b.mean_accuracy >= m.mean_accuracy => Some(b),
                _ => Some(m),
            })?
            .clone();

        // `sort_by` is stable, so equal means stay in question order.
        means.sort_by(|a, b| a.mean_accuracy.total_cmp(&b.mean_accuracy));

        Some(Self {
            ranking: means,
            hardest,
            easiest,
        })
    }
}
