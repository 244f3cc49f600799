//! Cohort-level aggregate statistics over the growth table.
//!
//! Means skip NaN values, so students whose grade had no key entries for a
//! phase do not drag averages down; a mean with no finite input is NaN.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{nan_as_null, Grade, GrowthRecord};

/// Mean of the non-NaN values, or NaN if there are none.
pub fn mean_ignoring_nan(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// State and grade selection applied before aggregation.
///
/// `None` means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortFilter {
    #[serde(default)]
    pub states: Option<BTreeSet<String>>,
    #[serde(default)]
    pub grades: Option<BTreeSet<Grade>>,
}

impl CohortFilter {
    pub fn with_states<S: Into<String>>(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.states = Some(states.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_grades(mut self, grades: impl IntoIterator<Item = Grade>) -> Self {
        self.grades = Some(grades.into_iter().collect());
        self
    }

    pub fn is_unrestricted(&self) -> bool {
        self.states.is_none() && self.grades.is_none()
    }

    /// Rows with an unknown grade only pass when grades are unrestricted.
    pub fn matches(&self, state: &str, grade: Option<Grade>) -> bool {
        let state_ok = self.states.as_ref().map_or(true, |s| s.contains(state));
        let grade_ok = match (&self.grades, grade) {
            (None, _) => true,
            (Some(set), Some(g)) => set.contains(&g),
            (Some(_), None) => false,
        };
        state_ok && grade_ok
    }

    pub fn apply<'a>(&self, records: &'a [GrowthRecord]) -> Vec<&'a GrowthRecord> {
        records
            .iter()
            .filter(|r| self.matches(&r.state, r.grade))
            .collect()
    }
}

/// Headline numbers for a cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub students: usize,
    #[serde(with = "nan_as_null")]
    pub avg_baseline: f64,
    #[serde(with = "nan_as_null")]
    pub avg_endline: f64,
    #[serde(with = "nan_as_null")]
    pub avg_growth: f64,
    /// `avg_endline - avg_baseline`.
    #[serde(with = "nan_as_null")]
    pub delta: f64,
}

impl ExecutiveSummary {
    pub fn compute(records: &[&GrowthRecord]) -> Self {
        let avg_baseline = mean_ignoring_nan(records.iter().map(|r| r.percentage_baseline));
        let avg_endline = mean_ignoring_nan(records.iter().map(|r| r.percentage_endline));
        Self {
            students: records.len(),
            avg_baseline,
            avg_endline,
            avg_growth: mean_ignoring_nan(records.iter().map(|r| r.growth)),
            delta: avg_endline - avg_baseline,
        }
    }

    /// One-paragraph impact statement.
    pub fn insight(&self) -> String {
        format!(
            "Across {} students, the average proficiency score moved from {:.1}% in the \
             baseline to {:.1}% in the endline assessment, a net learning outcome of \
             {:+.1}% for the selected cohort.",
            self.students, self.avg_baseline, self.avg_endline, self.avg_growth
        )
    }
}

/// Baseline vs endline averages for one grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeStats {
    pub grade: Grade,
    pub students: usize,
    #[serde(with = "nan_as_null")]
    pub avg_baseline: f64,
    #[serde(with = "nan_as_null")]
    pub avg_endline: f64,
}

/// Per-grade averages, sorted by grade. Records with no grade are left out.
pub fn grade_stats(records: &[&GrowthRecord]) -> Vec<GradeStats> {
    let mut by_grade: BTreeMap<Grade, Vec<&GrowthRecord>> = BTreeMap::new();
    for r in records {
        if let Some(grade) = r.grade {
            by_grade.entry(grade).or_default().push(r);
        }
    }
    by_grade
        .into_iter()
        .map(|(grade, group)| GradeStats {
            grade,
            students: group.len(),
            avg_baseline: mean_ignoring_nan(group.iter().map(|r| r.percentage_baseline)),
            avg_endline: mean_ignoring_nan(group.iter().map(|r| r.percentage_endline)),
        })
        .collect()
}

/// Where a centre sits on the growth vs proficiency matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// Above-average endline and above-average growth.
    Leading,
    /// Below-average endline but above-average growth.
    Improving,
    /// Above-average endline but below-average growth.
    Plateaued,
    /// Below average on both axes.
    NeedsAttention,
}

/// Aggregates for one centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CenterStats {
    pub center: String,
    pub students: usize,
    #[serde(with = "nan_as_null")]
    pub avg_growth: f64,
    #[serde(with = "nan_as_null")]
    pub avg_endline: f64,
    /// `None` when either axis is undefined for this centre.
    pub quadrant: Option<Quadrant>,
}

/// Centre performance matrix with its reference lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CenterMatrix {
    /// Sorted by centre name.
    pub centers: Vec<CenterStats>,
    /// Mean of the centres' average growth.
    #[serde(with = "nan_as_null")]
    pub mean_growth: f64,
    /// Mean of the centres' average endline score.
    #[serde(with = "nan_as_null")]
    pub mean_endline: f64,
}

impl CenterMatrix {
    pub fn compute(records: &[&GrowthRecord]) -> Self {
        let mut by_center: BTreeMap<&str, Vec<&GrowthRecord>> = BTreeMap::new();
        for r in records {
            by_center.entry(r.center.as_str()).or_default().push(r);
        }

        let mut centers: Vec<CenterStats> = by_center
            .into_iter()
            .map(|(center, group)| CenterStats {
                center: center.to_string(),
                students: group.len(),
                avg_growth: mean_ignoring_nan(group.iter().map(|r| r.growth)),
                avg_endline: mean_ignoring_nan(group.iter().map(|r| r.percentage_endline)),
                quadrant: None,
            })
            .collect();

        let mean_growth = mean_ignoring_nan(centers.iter().map(|c| c.avg_growth));
        let mean_endline = mean_ignoring_nan(centers.iter().map(|c| c.avg_endline));

        for c in &mut centers {
            c.quadrant = classify(c.avg_endline, c.avg_growth, mean_endline, mean_growth);
        }

        Self {
            centers,
            mean_growth,
            mean_endline,
        }
    }
}

fn classify(endline: f64, growth: f64, mean_endline: f64, mean_growth: f64) -> Option<Quadrant> {
    if [endline, growth, mean_endline, mean_growth].iter().any(|v| v.is_nan()) {
        return None;
    }
    Some(match (endline >= mean_endline, growth >= mean_growth) {
        (true, true) => Quadrant::Leading,
        (false, true) => Quadrant::Improving,
        (true, false) => Quadrant::Plateaued,
        (false, false) => Quadrant::NeedsAttention,
    })
}

/// Students whose ID contains `term`, or whose centre contains it ignoring case.
pub fn search_students<'a>(records: &[&'a GrowthRecord], term: &str) -> Vec<&'a GrowthRecord> {
    let term = term.trim();
    if term.is_empty() {
        return records.to_vec();
    }
    let lowered = term.to_lowercase();
    records
        .iter()
        .copied()
        .filter(|r| r.student_id.contains(term) || r.center.to_lowercase().contains(&lowered))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn growth(id: &str, state: &str, center: &str, grade: u32, bl: f64, el: f64) -> GrowthRecord {
        GrowthRecord {
            student_id: id.into(),
            state: state.into(),
            center: center.into(),
            grade: Some(Grade(grade)),
            score_baseline: 0,
            score_endline: 0,
            percentage_baseline: bl,
            percentage_endline: el,
            growth: el - bl,
        }
    }

    fn cohort() -> Vec<GrowthRecord> {
        vec![
            growth("1001", "KA", "Hubli", 3, 40.0, 80.0),
            growth("1002", "KA", "Hubli", 4, 60.0, 70.0),
            growth("2001", "TN", "Madurai North", 3, 20.0, 30.0),
            growth("2002", "TN", "Madurai North", 3, f64::NAN, 50.0),
        ]
    }

    #[test]
    fn mean_skips_nan() {
        assert_eq!(mean_ignoring_nan([1.0, f64::NAN, 3.0]), 2.0);
        assert!(mean_ignoring_nan([f64::NAN]).is_nan());
        assert!(mean_ignoring_nan(Vec::new()).is_nan());
    }

    #[test]
    fn filter_by_state_and_grade() {
        let data = cohort();
        assert_eq!(CohortFilter::default().apply(&data).len(), 4);
        assert_eq!(CohortFilter::default().with_states(["KA"]).apply(&data).len(), 2);
        let f = CohortFilter::default()
            .with_states(["TN", "KA"])
            .with_grades([Grade(4)]);
        let picked = f.apply(&data);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].student_id, "1002");
        assert!(!f.matches("KA", None));
        assert!(CohortFilter::default().matches("KA", None));
    }

    #[test]
    fn executive_summary_matches_hand_computation() {
        let data = cohort();
        let all = CohortFilter::default().apply(&data);
        let s = ExecutiveSummary::compute(&all);
        assert_eq!(s.students, 4);
        assert_eq!(s.avg_baseline, 40.0);
        assert_eq!(s.avg_endline, 57.5);
        assert!((s.avg_growth - (40.0 + 10.0 + 10.0) / 3.0).abs() < 1e-9);
        assert_eq!(s.delta, 17.5);
        assert!(s.insight().contains("Across 4 students"));
    }

    #[test]
    fn empty_cohort_summary_is_nan_not_panic() {
        let s = ExecutiveSummary::compute(&[]);
        assert_eq!(s.students, 0);
        assert!(s.avg_baseline.is_nan());
        assert!(s.delta.is_nan());
    }

    #[test]
    fn grade_stats_sorted_by_grade() {
        let data = cohort();
        let all = CohortFilter::default().apply(&data);
        let stats = grade_stats(&all);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].grade, Grade(3));
        assert_eq!(stats[0].students, 3);
        assert_eq!(stats[0].avg_baseline, 30.0);
        assert_eq!(stats[1].grade, Grade(4));
    }

    #[test]
    fn center_matrix_classifies_against_means() {
        let data = cohort();
        let all = CohortFilter::default().apply(&data);
        let m = CenterMatrix::compute(&all);
        assert_eq!(m.centers.len(), 2);
        let hubli = &m.centers[0];
        assert_eq!(hubli.center, "Hubli");
        assert_eq!(hubli.students, 2);
        assert_eq!(hubli.avg_growth, 25.0);
        assert_eq!(hubli.avg_endline, 75.0);
        assert_eq!(hubli.quadrant, Some(Quadrant::Leading));
        assert_eq!(m.centers[1].quadrant, Some(Quadrant::NeedsAttention));
        assert_eq!(m.mean_growth, (25.0 + 10.0) / 2.0);
    }

    #[test]
    fn search_matches_id_or_center() {
        let data = cohort();
        let all = CohortFilter::default().apply(&data);
        assert_eq!(search_students(&all, "100").len(), 2);
        assert_eq!(search_students(&all, "madurai").len(), 2);
        assert_eq!(search_students(&all, "HUBLI").len(), 2);
        assert_eq!(search_students(&all, "").len(), 4);
        assert!(search_students(&all, "zzz").is_empty());
    }
}
