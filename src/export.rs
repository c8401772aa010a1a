use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use crate::classifier::{self, COHORT_WEAK_THRESHOLD};
use crate::metrics::percent;
use crate::models::QuestionAnalytics;

pub const COHORT_PERFORMANCE_FILE: &str = "cohort_performance.csv";
pub const STUDENT_SUMMARY_FILE: &str = "student_summary.csv";
pub const DETAILED_TIMING_FILE: &str = "detailed_timing.csv";

#[derive(Debug, Serialize)]
struct CohortPerformanceRow<'a> {
    question_id: &'a str,
    accuracy_pct: u32,
    students_attempted: u64,
    is_weak: bool,
    question_text: String,
}

#[derive(Debug, Serialize)]
struct StudentSummaryRow<'a> {
    student_id: &'a str,
    overall_accuracy_pct: u32,
    total_attempts: u64,
    weak_question_count: usize,
}

#[derive(Debug, Serialize)]
struct TimingRow<'a> {
    student_id: &'a str,
    question_id: &'a str,
    student_time: f64,
    cohort_time: f64,
    difference: f64,
}

/// Writes the three question-analytics tables into `out_dir`, creating it
/// if needed. Returns the written paths. Timing rows are one per student and
/// question, from each student's comparison against the cohort.
pub fn export_question_analytics(
    data: &QuestionAnalytics,
    out_dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let cohort = &data.cohort;

    let performance = cohort.question_wise.iter().map(|stat| CohortPerformanceRow {
        question_id: &stat.question_id,
        accuracy_pct: percent(stat.accuracy),
        students_attempted: stat.students_attempted,
        is_weak: classifier::is_weak(stat.accuracy, COHORT_WEAK_THRESHOLD),
        question_text: stat.display_text(),
    });

    let students = data.students.iter().map(|record| StudentSummaryRow {
        student_id: &record.student_id,
        overall_accuracy_pct: percent(record.overall_accuracy),
        total_attempts: record.total_attempts,
        weak_question_count: classifier::weak_count(record),
    });

    let timing = data.students.iter().flat_map(|record| {
        record
            .time_comparison
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(move |row| TimingRow {
                student_id: &record.student_id,
                question_id: &row.question_id,
                student_time: row.student_time,
                cohort_time: row.cohort_time,
                difference: row.difference,
            })
    });

    let written = vec![
        write_rows(&out_dir.join(COHORT_PERFORMANCE_FILE), performance)?,
        write_rows(&out_dir.join(STUDENT_SUMMARY_FILE), students)?,
        write_rows(&out_dir.join(DETAILED_TIMING_FILE), timing)?,
    ];

    info!(dir = %out_dir.display(), files = written.len(), "csv export complete");
    Ok(written)
}

fn write_rows<T, I>(path: &Path, rows: I) -> anyhow::Result<PathBuf>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write a row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, Flow};
    use crate::payload::validate;
    use serde_json::json;
    use uuid::Uuid;

    fn sample() -> QuestionAnalytics {
        let raw = json!({
            "cohort": {
                "question_wise": {
                    "Q1": { "Accuracy": 0.8, "Students Attempted": 10, "Question Text": "Define force, mass" },
                    "Q2": { "Accuracy": 0.4, "Students Attempted": 9 }
                },
                "time_analysis": {
                    "Q2": { "mean": 42.5, "median": 40.0, "std": 3.0 }
                }
            },
            "students": {
                "S1": {
                    "overall_accuracy": 0.6,
                    "weak_questions": { "Q2": { "Accuracy": 0.0 } },
                    "total_attempts": 4,
                    "time_comparison": {
                        "Q1": { "student_time": 30.0, "cohort_time": 35.5, "difference": -5.5 },
                        "Q2": { "student_time": 60.0, "cohort_time": 42.5, "difference": 17.5 }
                    }
                },
                "S2": {
                    "overall_accuracy": 0.9,
                    "weak_questions": [],
                    "total_attempts": 1
                }
            }
        });
        match validate(&raw, Flow::QuestionAnalytics).unwrap() {
            AnalysisResult::QuestionAnalytics(data) => data,
            AnalysisResult::ModuleActivity(_) => panic!("expected question analytics"),
        }
    }

    #[test]
    fn writes_all_three_tables() {
        let dir = std::env::temp_dir().join(format!("learning-gaps-{}", Uuid::new_v4()));
        let written = export_question_analytics(&sample(), &dir).unwrap();
        assert_eq!(written.len(), 3);

        let performance = fs::read_to_string(dir.join(COHORT_PERFORMANCE_FILE)).unwrap();
        let mut lines = performance.lines();
        assert_eq!(
            lines.next(),
            Some("question_id,accuracy_pct,students_attempted,is_weak,question_text")
        );
        assert_eq!(lines.next(), Some("Q1,80,10,false,\"Define force, mass\""));
        assert_eq!(lines.next(), Some("Q2,40,9,true,Question Q2"));

        let students = fs::read_to_string(dir.join(STUDENT_SUMMARY_FILE)).unwrap();
        assert!(students.contains("S1,60,4,1"));

        let timing = fs::read_to_string(dir.join(DETAILED_TIMING_FILE)).unwrap();
        let rows: Vec<&str> = timing.lines().collect();
        assert_eq!(
            rows,
            vec![
                "student_id,question_id,student_time,cohort_time,difference",
                "S1,Q1,30.0,35.5,-5.5",
                "S1,Q2,60.0,42.5,17.5",
            ]
        );

        fs::remove_dir_all(&dir).unwrap();
    }
}
