use std::cmp::Ordering;

use serde::Serialize;

use crate::classifier;
use crate::models::{
    placeholder_text, CohortAnalysis, QuestionId, QuestionStat, StudentId, StudentRecord,
};

pub const QUESTION_TEXT_WIDTH: usize = 50;

/// Round half up to the nearest integer; non-finite input maps to 0.
pub fn round_half_up(value: f64) -> i64 {
    if value.is_finite() {
        (value + 0.5).floor() as i64
    } else {
        0
    }
}

/// Ratio in `[0, 1]` to a whole percentage, clamped to `[0, 100]`.
pub fn percent(ratio: f64) -> u32 {
    round_half_up(ratio * 100.0).clamp(0, 100) as u32
}

pub fn truncate_text(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let head: String = text.chars().take(width).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPerformance {
    pub question_id: QuestionId,
    pub accuracy_pct: u32,
    pub students_attempted: u64,
    pub question_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPerformance {
    pub student_id: StudentId,
    pub accuracy_pct: u32,
    pub weak_question_count: usize,
    pub total_attempts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTiming {
    pub question_id: QuestionId,
    pub avg_time_sec: i64,
    pub median_time_sec: i64,
    pub std_dev_sec: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortSummary {
    pub total_students: usize,
    pub total_questions: usize,
    pub avg_accuracy_pct: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTiming {
    pub question_id: QuestionId,
    pub student_time_sec: i64,
    pub cohort_time_sec: i64,
    pub difference_sec: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOption {
    pub id: StudentId,
    pub label: String,
    pub accuracy_pct: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowQuestion {
    pub question_id: QuestionId,
    pub mean_time_sec: f64,
    pub question_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeDirection {
    Slower,
    Faster,
}

impl TimeDirection {
    pub fn label(self) -> &'static str {
        match self {
            TimeDirection::Slower => "Much slower",
            TimeDirection::Faster => "Much faster",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeIssue {
    pub question_id: QuestionId,
    pub direction: TimeDirection,
    pub gap_secs: f64,
}

pub fn question_performance(cohort: &CohortAnalysis) -> Vec<QuestionPerformance> {
    cohort
        .question_wise
        .iter()
        .map(|stat| QuestionPerformance {
            question_id: stat.question_id.clone(),
            accuracy_pct: percent(stat.accuracy),
            students_attempted: stat.students_attempted,
            question_text: truncate_text(&stat.display_text(), QUESTION_TEXT_WIDTH),
        })
        .collect()
}

pub fn student_performance(students: &[StudentRecord]) -> Vec<StudentPerformance> {
    students
        .iter()
        .map(|record| StudentPerformance {
            student_id: record.student_id.clone(),
            accuracy_pct: percent(record.overall_accuracy),
            weak_question_count: classifier::weak_count(record),
            total_attempts: record.total_attempts,
        })
        .collect()
}

pub fn time_analysis(cohort: &CohortAnalysis) -> Vec<QuestionTiming> {
    cohort
        .time_analysis
        .iter()
        .map(|stat| QuestionTiming {
            question_id: stat.question_id.clone(),
            avg_time_sec: round_half_up(stat.mean),
            median_time_sec: round_half_up(stat.median),
            std_dev_sec: round_half_up(stat.std_dev),
        })
        .collect()
}

pub fn cohort_summary(cohort: &CohortAnalysis, students: &[StudentRecord]) -> CohortSummary {
    let avg_accuracy_pct = if students.is_empty() {
        0
    } else {
        let total: f64 = students.iter().map(|s| s.overall_accuracy).sum();
        percent(total / students.len() as f64)
    };

    CohortSummary {
        total_students: students.len(),
        total_questions: cohort.question_wise.len(),
        avg_accuracy_pct,
    }
}

/// Mean weak-question count across the cohort, rounded; 0 without students.
pub fn cohort_avg_weak_count(students: &[StudentRecord]) -> u32 {
    if students.is_empty() {
        return 0;
    }
    let total: usize = students.iter().map(classifier::weak_count).sum();
    round_half_up(total as f64 / students.len() as f64).max(0) as u32
}

pub fn student_time_comparison(record: &StudentRecord) -> Vec<StudentTiming> {
    record
        .time_comparison
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|row| StudentTiming {
            question_id: row.question_id.clone(),
            student_time_sec: round_half_up(row.student_time),
            cohort_time_sec: round_half_up(row.cohort_time),
            difference_sec: round_half_up(row.difference),
        })
        .collect()
}

pub fn student_options(students: &[StudentRecord]) -> Vec<StudentOption> {
    students
        .iter()
        .map(|record| StudentOption {
            id: record.student_id.clone(),
            label: format!("Student {}", record.student_id),
            accuracy_pct: percent(record.overall_accuracy),
        })
        .collect()
}

/// Linear-interpolated quantile of `values`; `None` when empty.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Questions whose mean time is strictly above the `q` quantile of all means.
pub fn slow_questions(cohort: &CohortAnalysis, q: f64) -> Vec<SlowQuestion> {
    let means: Vec<f64> = cohort.time_analysis.iter().map(|stat| stat.mean).collect();
    let Some(threshold) = quantile(&means, q) else {
        return Vec::new();
    };

    cohort
        .time_analysis
        .iter()
        .filter(|stat| stat.mean > threshold)
        .map(|stat| SlowQuestion {
            question_id: stat.question_id.clone(),
            mean_time_sec: stat.mean,
            question_text: cohort
                .question(&stat.question_id)
                .map(QuestionStat::display_text)
                .unwrap_or_else(|| placeholder_text(&stat.question_id)),
        })
        .collect()
}

/// Largest timing gaps against the cohort, beyond `threshold_secs`.
pub fn time_issues(record: &StudentRecord, threshold_secs: f64, limit: usize) -> Vec<TimeIssue> {
    let mut issues: Vec<TimeIssue> = record
        .time_comparison
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|row| row.difference.abs() > threshold_secs)
        .map(|row| TimeIssue {
            question_id: row.question_id.clone(),
            direction: if row.difference > 0.0 {
                TimeDirection::Slower
            } else {
                TimeDirection::Faster
            },
            gap_secs: row.difference.abs(),
        })
        .collect();

    issues.sort_by(|a, b| b.gap_secs.partial_cmp(&a.gap_secs).unwrap_or(Ordering::Equal));
    issues.truncate(limit);
    issues
}
