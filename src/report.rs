use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::classifier::{COHORT_WEAK_THRESHOLD, STUDENT_WEAK_THRESHOLD};
use crate::config::Config;
use crate::metrics::{self, percent, truncate_text};
use crate::models::{AnalysisResult, ModuleActivity, QuestionAnalytics, StudentRecord};
use crate::selection;

pub fn build_report(
    result: &AnalysisResult,
    config: &Config,
    generated_at: DateTime<Utc>,
) -> String {
    match result {
        AnalysisResult::QuestionAnalytics(data) => {
            build_question_report(data, config, generated_at)
        }
        AnalysisResult::ModuleActivity(data) => build_module_report(data, generated_at),
    }
}

pub fn build_question_report(
    data: &QuestionAnalytics,
    config: &Config,
    generated_at: DateTime<Utc>,
) -> String {
    let summary = metrics::cohort_summary(&data.cohort, &data.students);
    let mut output = String::new();

    let _ = writeln!(output, "# Learning Gaps Report");
    let _ = writeln!(
        output,
        "Generated {} for {} students and {} questions (average accuracy {}%)",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        summary.total_students,
        summary.total_questions,
        summary.avg_accuracy_pct
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "## Weakest Questions (Class Accuracy < {}%)",
        percent(COHORT_WEAK_THRESHOLD)
    );

    if data.cohort.weak_questions.is_empty() {
        let _ = writeln!(output, "No questions fall below the cohort threshold.");
    } else {
        for item in &data.cohort.weak_questions {
            let _ = writeln!(
                output,
                "- Question {}: {:.1}% correct",
                item.question_id,
                item.accuracy * 100.0
            );
            let _ = writeln!(
                output,
                "  '{}'",
                truncate_text(&item.question_text, config.report_text_width)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Slow Questions");

    let slow = metrics::slow_questions(&data.cohort, config.slow_question_quantile);
    if data.cohort.time_analysis.is_empty() {
        let _ = writeln!(output, "No timing data recorded.");
    } else if slow.is_empty() {
        let _ = writeln!(output, "No questions stand out as slow.");
    } else {
        for question in &slow {
            let _ = writeln!(
                output,
                "- Question {}: {:.1} seconds - '{}'",
                question.question_id,
                question.mean_time_sec,
                truncate_text(&question.question_text, config.short_text_width)
            );
        }
    }

    let mut students: Vec<&StudentRecord> = data.students.iter().collect();
    students.sort_by(|a, b| {
        a.overall_accuracy
            .partial_cmp(&b.overall_accuracy)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");

    if students.is_empty() {
        let _ = writeln!(output, "No students in this analysis.");
    }

    for record in students {
        write_student(&mut output, record, config);
    }

    output
}

fn write_student(output: &mut String, record: &StudentRecord, config: &Config) {
    let _ = writeln!(output);
    let _ = writeln!(output, "### Student {}", record.student_id);
    let _ = writeln!(
        output,
        "- Overall accuracy: {:.1}%",
        record.overall_accuracy * 100.0
    );
    let _ = writeln!(output, "- Total attempts: {}", record.total_attempts);

    if record.weak_questions.is_empty() {
        let _ = writeln!(output, "- Weak questions: none");
    } else {
        let _ = writeln!(
            output,
            "- Weak questions (accuracy < {}%):",
            percent(STUDENT_WEAK_THRESHOLD)
        );
        for item in &record.weak_questions {
            let _ = writeln!(
                output,
                "  - Question {}: {:.1}% correct ('{}')",
                item.question_id,
                item.accuracy * 100.0,
                truncate_text(&item.question_text, config.short_text_width)
            );
        }
    }

    let issues = metrics::time_issues(record, config.time_gap_secs, config.top_time_issues);
    if !issues.is_empty() {
        let _ = writeln!(output, "- Time spent vs class average:");
        for issue in &issues {
            let _ = writeln!(
                output,
                "  - Question {}: {} ({:.1}s difference)",
                issue.question_id,
                issue.direction.label(),
                issue.gap_secs
            );
        }
    }
}

pub fn build_module_report(data: &ModuleActivity, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Module Activity Report");
    let _ = write!(
        output,
        "Generated {} for {} students across {} modules",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        data.student_ids.len(),
        data.overall_learning_chart.len()
    );
    match data.session_id.as_deref() {
        Some(session_id) => {
            let _ = writeln!(output, " (session {session_id})");
        }
        None => {
            let _ = writeln!(output);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Self-Learning Hours per Module");

    if data.overall_learning_chart.is_empty() {
        let _ = writeln!(output, "No module activity recorded.");
    } else {
        for module in &data.overall_learning_chart {
            let _ = writeln!(
                output,
                "- {}: {:.2} hours",
                module.activity_name, module.self_learning_hours
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");

    if data.student_ids.is_empty() {
        let _ = writeln!(output, "No students in this analysis.");
    }

    for student_id in &data.student_ids {
        let totals = selection::student_metrics(data, student_id);
        let modules = selection::available_modules(data, student_id);
        let _ = writeln!(
            output,
            "- {}: {:.2} hours across {} attempts in {} modules, average score {:.2}%",
            student_id,
            totals.total_hours,
            totals.total_attempts,
            modules.len(),
            totals.avg_score_pct
        );
    }

    output
}
