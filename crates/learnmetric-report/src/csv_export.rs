//! CSV exports of the growth table and question accuracy.

use std::path::Path;

use anyhow::{Context, Result};

use learnmetric_core::model::{GrowthRecord, QuestionAccuracy};

const GROWTH_HEADERS: [&str; 9] = [
    "Student ID",
    "State",
    "Center",
    "Grade",
    "Score_Baseline",
    "Percentage_Baseline",
    "Score_Endline",
    "Percentage_Endline",
    "Growth",
];

const QUESTION_HEADERS: [&str; 5] = ["Grade", "Question", "Accuracy", "Correct", "Students"];

/// Undefined percentages are written as empty fields.
fn number(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format!("{value:.2}")
    }
}

/// Write the matched growth table.
pub fn write_growth_csv(records: &[GrowthRecord], path: &Path) -> Result<()> {
    let mut writer = create_writer(path)?;
    writer.write_record(GROWTH_HEADERS)?;
    for r in records {
        writer.write_record([
            r.student_id.clone(),
            r.state.clone(),
            r.center.clone(),
            r.grade.map(|g| g.to_string()).unwrap_or_default(),
            r.score_baseline.to_string(),
            number(r.percentage_baseline),
            r.score_endline.to_string(),
            number(r.percentage_endline),
            number(r.growth),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Write per-question accuracy records.
pub fn write_question_csv(records: &[QuestionAccuracy], path: &Path) -> Result<()> {
    let mut writer = create_writer(path)?;
    writer.write_record(QUESTION_HEADERS)?;
    for q in records {
        writer.write_record([
            q.grade.code(),
            q.label(),
            number(q.accuracy),
            q.correct.to_string(),
            q.students.to_string(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn create_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    csv::Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnmetric_core::model::Grade;

    #[test]
    fn growth_csv_has_header_and_blank_nan() {
        let records = vec![
            GrowthRecord {
                student_id: "1001".into(),
                state: "KA".into(),
                center: "Hubli, North".into(),
                grade: Some(Grade(3)),
                score_baseline: 1,
                score_endline: 2,
                percentage_baseline: 50.0,
                percentage_endline: 100.0,
                growth: 50.0,
            },
            GrowthRecord {
                student_id: "1002".into(),
                state: "KA".into(),
                center: "Hubli".into(),
                grade: None,
                score_baseline: 0,
                score_endline: 0,
                percentage_baseline: f64::NAN,
                percentage_endline: f64::NAN,
                growth: f64::NAN,
            },
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("growth.csv");
        write_growth_csv(&records, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "Student ID,State,Center,Grade,Score_Baseline,Percentage_Baseline,Score_Endline,Percentage_Endline,Growth"
        );
        assert_eq!(lines[1], "1001,KA,\"Hubli, North\",3,1,50.00,2,100.00,50.00");
        assert_eq!(lines[2], "1002,KA,Hubli,,0,,0,,");
    }

    #[test]
    fn question_csv_uses_labels() {
        let records = vec![QuestionAccuracy {
            grade: Grade(4),
            question: 7,
            accuracy: 62.5,
            correct: 5,
            students: 8,
        }];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("questions.csv");
        write_question_csv(&records, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Grade,Question,Accuracy,Correct,Students\nG4,Q7,62.50,5,8\n");
    }
}
