//! Error types.
//!
//! Two tiers: [`PipelineError`] is a structural failure that aborts a whole
//! processing call, while [`DecodeFailure`] describes why a single answer
//! cell could not be read. Decode failures never leave the decoder as errors;
//! they exist so the cause stays inspectable in logs and tests.

use thiserror::Error;

use crate::model::{Grade, Phase};

/// Fatal, structural problems with an uploaded workbook.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// One or more of the required sheets is absent.
    #[error("missing required sheet(s): {}", sheets.join(", "))]
    MissingSheets { sheets: Vec<String> },

    /// A required sheet lacks required columns.
    #[error("sheet '{sheet}' is missing required column(s): {}", columns.join(", "))]
    MissingColumns { sheet: String, columns: Vec<String> },

    /// Two answer key rows disagree about the same question.
    #[error(
        "conflicting answer key entries for {} {phase} Q{question}: {first} vs {second}",
        grade.code()
    )]
    ConflictingKeyEntry {
        grade: Grade,
        phase: Phase,
        question: u32,
        first: i64,
        second: i64,
    },
}

/// Why an answer cell did not decode to an answer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DecodeFailure {
    /// The cell is absent or blank.
    #[error("cell is empty")]
    Empty,

    /// The (unquoted) text is not valid JSON.
    #[error("cell is not valid JSON")]
    InvalidJson,

    /// The JSON is valid but not an object.
    #[error("cell JSON is not an object")]
    NotAnObject,

    /// The object has no `value` field.
    #[error("cell JSON has no \"value\" field")]
    MissingValue,

    /// The `value` field cannot be converted to an integer.
    #[error("cell \"value\" is not an integer")]
    NotAnInteger,
}
