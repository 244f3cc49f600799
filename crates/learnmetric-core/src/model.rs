//! Core data model types for learnmetric.
//!
//! These are the fundamental types the whole pipeline passes around: raw
//! sheets and cells, assessment phases and grades, per-phase student records,
//! and the derived growth and question-accuracy records.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Highest question number that is ever scored (`Q1..=Q10`).
pub const MAX_QUESTIONS: u32 = 10;

/// Fixed, case-sensitive column vocabulary of the input sheets.
pub mod columns {
    pub const STUDENT_ID: &str = "Student ID";
    pub const STATE: &str = "State";
    pub const CENTER: &str = "Center";
    pub const GRADE: &str = "Grade";

    pub const ASSESSMENT: &str = "Assessment";
    pub const QUESTION_NUMBER: &str = "Question #";
    pub const CORRECT_VALUE: &str = "Correct Value";

    /// Columns every response sheet must carry.
    pub const RESPONSE: [&str; 4] = [STUDENT_ID, STATE, CENTER, GRADE];
    /// Columns the answer key sheet must carry.
    pub const ANSWER_KEY: [&str; 4] = [GRADE, ASSESSMENT, QUESTION_NUMBER, CORRECT_VALUE];
}

/// Column header for a question number, e.g. `Q3`.
pub fn question_column(question: u32) -> String {
    format!("Q{question}")
}

// ---------------------------------------------------------------------------
// Cells, sheets, workbooks
// ---------------------------------------------------------------------------

/// A single spreadsheet cell as delivered by a sheet reader.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// True for empty cells, whitespace-only text, and NaN numbers.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
            CellValue::Bool(_) => false,
        }
    }

    /// Render the cell as text, or `None` when it is blank.
    ///
    /// Integral numbers render without a fractional part so that an ID read
    /// as `1001.0` compares equal to the text `1001`.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        if self.is_blank() {
            return None;
        }
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
            CellValue::Number(n) => Some(Cow::Owned(format_number(*n))),
            CellValue::Bool(b) => Some(Cow::Owned(if *b { "True" } else { "False" }.to_string())),
        }
    }

    /// Interpret the cell as an integer: integral numbers or integer text.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                if *n >= i64::MIN as f64 && *n < i64::MAX as f64 {
                    Some(*n as i64)
                } else {
                    None
                }
            }
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Trimmed text form, empty for blank cells.
    pub fn to_trimmed_string(&self) -> String {
        self.as_text()
            .map(|t| t.trim().to_string())
            .unwrap_or_default()
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

pub(crate) static EMPTY_CELL: CellValue = CellValue::Empty;

/// One named table of a workbook: a header row plus data rows.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: String,
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        let mut index = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            index.entry(header.clone()).or_insert(i);
        }
        Self {
            name: name.into(),
            headers,
            index,
            rows: Vec::new(),
        }
    }

    /// Build a sheet from string headers and rows (handy for tests and fixtures).
    pub fn from_rows<H, R, C>(name: &str, headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = Vec<C>>,
        C: Into<CellValue>,
    {
        let mut sheet = Sheet::new(name, headers.into_iter().map(Into::into).collect());
        for row in rows {
            sheet.push_row(row.into_iter().map(Into::into).collect());
        }
        sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// Required columns that this sheet lacks, in the order given.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row { sheet: self, cells })
    }
}

/// Borrowed view of one data row, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    sheet: &'a Sheet,
    cells: &'a [CellValue],
}

impl<'a> Row<'a> {
    /// The cell under `column`, or `None` if the sheet has no such column.
    ///
    /// Short rows yield an empty cell for trailing columns.
    pub fn get(&self, column: &str) -> Option<&'a CellValue> {
        let idx = *self.sheet.index.get(column)?;
        Some(self.cells.get(idx).unwrap_or(&EMPTY_CELL))
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.sheet.has_column(column)
    }
}

/// Content identity of an uploaded workbook: hex SHA-256 of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        ContentId(hex::encode(Sha256::digest(bytes)))
    }

    /// Hash several named parts (e.g. the files of a CSV directory).
    ///
    /// Parts are hashed in the order given, each prefixed by its name and length.
    pub fn of_parts<'a>(parts: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Self {
        let mut hasher = Sha256::new();
        for (name, bytes) in parts {
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        ContentId(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed workbook: named sheets plus the content identity of the source.
#[derive(Debug, Clone)]
pub struct Workbook {
    content_id: ContentId,
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(content_id: ContentId) -> Self {
        Self {
            content_id,
            sheets: Vec::new(),
        }
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.add_sheet(sheet);
        self
    }

    /// Add a sheet, replacing any existing sheet of the same name.
    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.retain(|s| s.name() != sheet.name());
        self.sheets.push(sheet);
    }

    pub fn content_id(&self) -> &ContentId {
        &self.content_id
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name() == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name()).collect()
    }
}

/// Names of the three required sheets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetNames {
    #[serde(default = "default_baseline_sheet")]
    pub baseline: String,
    #[serde(default = "default_endline_sheet")]
    pub endline: String,
    #[serde(default = "default_answer_key_sheet")]
    pub answer_key: String,
}

fn default_baseline_sheet() -> String {
    "WB-Baseline-English".to_string()
}

fn default_endline_sheet() -> String {
    "WB-Endline-English".to_string()
}

fn default_answer_key_sheet() -> String {
    "AnswerKey".to_string()
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            baseline: default_baseline_sheet(),
            endline: default_endline_sheet(),
            answer_key: default_answer_key_sheet(),
        }
    }
}

impl SheetNames {
    pub fn for_phase(&self, phase: Phase) -> &str {
        match phase {
            Phase::Baseline => &self.baseline,
            Phase::Endline => &self.endline,
        }
    }
}

// ---------------------------------------------------------------------------
// Domain vocabulary
// ---------------------------------------------------------------------------

/// Assessment phase: pre- or post-intervention test administration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Baseline,
    Endline,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Baseline, Phase::Endline];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Baseline => write!(f, "Baseline"),
            Phase::Endline => write!(f, "Endline"),
        }
    }
}

impl FromStr for Phase {
    type Err = String;

    /// Exact, case-sensitive match on the answer key vocabulary.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Baseline" => Ok(Phase::Baseline),
            "Endline" => Ok(Phase::Endline),
            other => Err(format!("unknown assessment phase: {other}")),
        }
    }
}

/// Academic grade level.
///
/// Student sheets carry the bare number (`5`), the answer key carries the
/// prefixed code (`G5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grade(pub u32);

impl Grade {
    /// The answer key code for this grade, e.g. `G5`.
    pub fn code(&self) -> String {
        format!("G{}", self.0)
    }

    /// Parse an answer key code of the exact form `G<n>`.
    pub fn from_code(code: &str) -> Option<Grade> {
        let digits = code.trim().strip_prefix('G')?;
        parse_digits(digits).map(Grade)
    }

    /// Parse a student grade cell: an integral number or unsigned integer text.
    pub fn from_cell(cell: &CellValue) -> Option<Grade> {
        match cell {
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 && *n >= 0.0 => {
                u32::try_from(*n as i64).ok().map(Grade)
            }
            CellValue::Text(s) => parse_digits(s.trim()).map(Grade),
            _ => None,
        }
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Grade {
    type Err = String;

    /// Accepts both `5` and `G5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        parse_digits(s)
            .map(Grade)
            .or_else(|| Grade::from_code(s))
            .ok_or_else(|| format!("invalid grade: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One student's responses for one assessment phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: String,
    pub state: String,
    pub center: String,
    /// `None` when the grade cell could not be read as a number.
    pub grade: Option<Grade>,
    /// Answer cells keyed by question number; only questions whose column
    /// exists in the sheet are present.
    #[serde(default)]
    pub answers: BTreeMap<u32, CellValue>,
}

impl StudentRecord {
    pub fn from_row(row: &Row<'_>) -> Self {
        let text = |column: &str| {
            row.get(column)
                .map(CellValue::to_trimmed_string)
                .unwrap_or_default()
        };

        let mut answers = BTreeMap::new();
        for question in 1..=MAX_QUESTIONS {
            if let Some(cell) = row.get(&question_column(question)) {
                answers.insert(question, cell.clone());
            }
        }

        Self {
            student_id: text(columns::STUDENT_ID),
            state: text(columns::STATE),
            center: text(columns::CENTER),
            grade: row.get(columns::GRADE).and_then(Grade::from_cell),
            answers,
        }
    }

    /// The raw answer cell for `question`, or `None` if there is no such column.
    pub fn answer(&self, question: u32) -> Option<&CellValue> {
        self.answers.get(&question)
    }
}

/// A student record with its derived score for one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: StudentRecord,
    pub score: u32,
    pub max_score: u32,
    /// Covered questions whose cell did not decode to an answer.
    pub unanswered: u32,
    /// `score / max_score * 100`; NaN when `max_score == 0`.
    #[serde(with = "nan_as_null")]
    pub percentage: f64,
}

/// A student matched across baseline and endline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRecord {
    pub student_id: String,
    pub state: String,
    pub center: String,
    pub grade: Option<Grade>,
    pub score_baseline: u32,
    pub score_endline: u32,
    #[serde(with = "nan_as_null")]
    pub percentage_baseline: f64,
    #[serde(with = "nan_as_null")]
    pub percentage_endline: f64,
    /// `percentage_endline - percentage_baseline`.
    #[serde(with = "nan_as_null")]
    pub growth: f64,
}

/// Share of a grade's students that answered one question correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAccuracy {
    pub grade: Grade,
    pub question: u32,
    /// Percentage in `[0, 100]`.
    pub accuracy: f64,
    pub correct: usize,
    pub students: usize,
}

impl QuestionAccuracy {
    pub fn label(&self) -> String {
        question_column(self.question)
    }
}

/// Serialize NaN as JSON `null` and read `null` back as NaN.
pub(crate) mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
