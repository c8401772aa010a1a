use serde::Serialize;
use tracing::debug;

use crate::classifier;
use crate::metrics::{self, percent};
use crate::models::{
    AnalysisResult, ModuleActivity, ModuleAttemptRecord, QuestionAnalytics, StudentId,
};
use crate::natural::sort_natural;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    pub student: Option<StudentId>,
    /// Only ever set for module activity payloads.
    pub module: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    SelectStudent(StudentId),
    ClearStudent,
    SelectModule(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMetrics {
    pub total_hours: f64,
    pub total_attempts: usize,
    pub avg_score_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonPair {
    pub student_accuracy_pct: u32,
    pub cohort_avg_accuracy_pct: u32,
    pub student_weak_count: usize,
    pub cohort_avg_weak_count: u32,
}

/// Returns the next state with the module already reconciled against the
/// selected student.
pub fn reduce(
    result: &AnalysisResult,
    state: &SelectionState,
    event: &SelectionEvent,
) -> SelectionState {
    match event {
        SelectionEvent::SelectStudent(student_id) => {
            if !is_known_student(result, student_id) {
                debug!(student = %student_id, "unknown student, clearing selection");
                return SelectionState::default();
            }
            SelectionState {
                student: Some(student_id.clone()),
                module: reconcile_module(result, student_id, state.module.as_deref()),
            }
        }
        SelectionEvent::ClearStudent => SelectionState::default(),
        SelectionEvent::SelectModule(module) => match state.student.as_deref() {
            Some(student_id) => SelectionState {
                student: state.student.clone(),
                module: reconcile_module(result, student_id, Some(module)),
            },
            None => {
                debug!(%module, "module selected without a student, ignoring");
                state.clone()
            }
        },
    }
}

pub fn is_known_student(result: &AnalysisResult, student_id: &str) -> bool {
    match result {
        AnalysisResult::QuestionAnalytics(data) => data.student(student_id).is_some(),
        AnalysisResult::ModuleActivity(data) => {
            data.student_ids.iter().any(|id| id == student_id)
                || data.attempts_for(student_id).next().is_some()
        }
    }
}

/// Keeps `requested` when the student has it, else falls back to the
/// student's first module in natural order.
fn reconcile_module(
    result: &AnalysisResult,
    student_id: &str,
    requested: Option<&str>,
) -> Option<String> {
    let AnalysisResult::ModuleActivity(data) = result else {
        return None;
    };
    let modules = available_modules(data, student_id);
    match requested {
        Some(name) if modules.iter().any(|m| m == name) => Some(name.to_string()),
        _ => {
            let corrected = modules.into_iter().next();
            if requested.is_some() {
                debug!(
                    student = %student_id,
                    requested = ?requested,
                    corrected = ?corrected,
                    "module not available for student, auto-correcting"
                );
            }
            corrected
        }
    }
}

/// Distinct modules a student attempted, in natural order.
pub fn available_modules(data: &ModuleActivity, student_id: &str) -> Vec<String> {
    let mut modules: Vec<String> = Vec::new();
    for module in data.attempts_for(student_id).filter_map(ModuleAttemptRecord::module) {
        if !modules.iter().any(|m| m == module) {
            modules.push(module.to_string());
        }
    }
    sort_natural(&mut modules);
    modules
}

/// The student's attempts at one module, ascending by attempt number.
pub fn module_attempts(
    data: &ModuleActivity,
    student_id: &str,
    module: &str,
) -> Vec<ModuleAttemptRecord> {
    let mut attempts: Vec<ModuleAttemptRecord> = data
        .attempts_for(student_id)
        .filter(|record| record.module() == Some(module))
        .cloned()
        .collect();
    attempts.sort_by(|a, b| a.attempt_no.cmp(&b.attempt_no));
    attempts
}

pub fn student_metrics(data: &ModuleActivity, student_id: &str) -> StudentMetrics {
    let mut total_hours = 0.0;
    let mut total_attempts = 0;
    let mut scored = 0.0;
    let mut possible = 0.0;

    for record in data.attempts_for(student_id) {
        total_hours += record.self_learning_hours;
        total_attempts += 1;
        scored += record.calculated_score;
        possible += record.total_score;
    }

    let avg_score_pct = if possible > 0.0 {
        100.0 * scored / possible
    } else {
        0.0
    };

    StudentMetrics {
        total_hours,
        total_attempts,
        avg_score_pct,
    }
}

/// Side-by-side numbers for one student against the cohort.
pub fn comparison_pair(data: &QuestionAnalytics, student_id: &str) -> Option<ComparisonPair> {
    let record = data.student(student_id)?;
    let summary = metrics::cohort_summary(&data.cohort, &data.students);
    Some(ComparisonPair {
        student_accuracy_pct: percent(record.overall_accuracy),
        cohort_avg_accuracy_pct: summary.avg_accuracy_pct,
        student_weak_count: classifier::weak_count(record),
        cohort_avg_weak_count: metrics::cohort_avg_weak_count(&data.students),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CohortAnalysis, StudentRecord};

    fn attempt(
        student: &str,
        module: &str,
        no: u32,
        score: f64,
        total: f64,
    ) -> ModuleAttemptRecord {
        ModuleAttemptRecord {
            student_id: student.to_string(),
            activity_name: Some(module.to_string()),
            attempt_no: no,
            self_learning_hours: 1.5,
            calculated_score: score,
            total_score: total,
        }
    }

    fn modules_payload() -> AnalysisResult {
        AnalysisResult::ModuleActivity(ModuleActivity {
            student_ids: vec!["A1".to_string(), "B2".to_string(), "C3".to_string()],
            all_student_data: vec![
                attempt("A1", "Module 2", 2, 8.0, 10.0),
                attempt("A1", "Module 10", 1, 3.0, 10.0),
                attempt("A1", "Module 2", 1, 5.0, 10.0),
                attempt("A1", "Module 1", 1, 9.0, 10.0),
                attempt("B2", "Module 10", 1, 6.0, 10.0),
                attempt("B2", "Module 3", 1, 2.0, 0.0),
            ],
            overall_learning_chart: Vec::new(),
            session_id: None,
        })
    }

    fn module_data(result: &AnalysisResult) -> &ModuleActivity {
        match result {
            AnalysisResult::ModuleActivity(data) => data,
            AnalysisResult::QuestionAnalytics(_) => panic!("expected module activity"),
        }
    }

    #[test]
    fn initial_state_selects_nothing() {
        assert_eq!(
            SelectionState::default(),
            SelectionState {
                student: None,
                module: None
            }
        );
    }

    #[test]
    fn modules_are_in_natural_order() {
        let result = modules_payload();
        assert_eq!(
            available_modules(module_data(&result), "A1"),
            vec!["Module 1", "Module 2", "Module 10"]
        );
    }

    #[test]
    fn selecting_a_student_picks_first_module() {
        let result = modules_payload();
        let state = reduce(
            &result,
            &SelectionState::default(),
            &SelectionEvent::SelectStudent("A1".to_string()),
        );
        assert_eq!(state.student.as_deref(), Some("A1"));
        assert_eq!(state.module.as_deref(), Some("Module 1"));
    }

    #[test]
    fn valid_module_survives_student_change() {
        let result = modules_payload();
        let state = SelectionState {
            student: Some("A1".to_string()),
            module: Some("Module 10".to_string()),
        };
        let next = reduce(&result, &state, &SelectionEvent::SelectStudent("B2".to_string()));
        assert_eq!(next.module.as_deref(), Some("Module 10"));
    }

    #[test]
    fn invalid_module_is_corrected_on_student_change() {
        let result = modules_payload();
        let state = SelectionState {
            student: Some("A1".to_string()),
            module: Some("Module 1".to_string()),
        };
        let next = reduce(&result, &state, &SelectionEvent::SelectStudent("B2".to_string()));
        assert_eq!(next.student.as_deref(), Some("B2"));
        assert_eq!(next.module.as_deref(), Some("Module 3"));
    }

    #[test]
    fn unknown_module_request_falls_back_to_first() {
        let result = modules_payload();
        let state = SelectionState {
            student: Some("A1".to_string()),
            module: Some("Module 2".to_string()),
        };
        let next = reduce(&result, &state, &SelectionEvent::SelectModule("Module 99".to_string()));
        assert_eq!(next.module.as_deref(), Some("Module 1"));

        let next = reduce(&result, &state, &SelectionEvent::SelectModule("Module 10".to_string()));
        assert_eq!(next.module.as_deref(), Some("Module 10"));
    }

    #[test]
    fn module_without_student_is_ignored() {
        let result = modules_payload();
        let next = reduce(
            &result,
            &SelectionState::default(),
            &SelectionEvent::SelectModule("Module 1".to_string()),
        );
        assert_eq!(next, SelectionState::default());
    }

    #[test]
    fn unknown_student_means_none_selected() {
        let result = modules_payload();
        let state = SelectionState {
            student: Some("A1".to_string()),
            module: Some("Module 1".to_string()),
        };
        let next = reduce(&result, &state, &SelectionEvent::SelectStudent("ZZ".to_string()));
        assert_eq!(next, SelectionState::default());
    }

    #[test]
    fn listed_student_without_attempts_has_no_module() {
        let result = modules_payload();
        let next = reduce(
            &result,
            &SelectionState::default(),
            &SelectionEvent::SelectStudent("C3".to_string()),
        );
        assert_eq!(next.student.as_deref(), Some("C3"));
        assert_eq!(next.module, None);
    }

    #[test]
    fn attempts_are_sorted_by_number() {
        let result = modules_payload();
        let attempts = module_attempts(module_data(&result), "A1", "Module 2");
        let numbers: Vec<u32> = attempts.iter().map(|a| a.attempt_no).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn metrics_use_score_ratio_of_sums() {
        let result = modules_payload();
        let metrics = student_metrics(module_data(&result), "A1");
        assert_eq!(metrics.total_attempts, 4);
        assert!((metrics.total_hours - 6.0).abs() < 1e-9);
        assert!((metrics.avg_score_pct - 62.5).abs() < 1e-9);
    }

    #[test]
    fn attempts_without_module_still_count() {
        let unattributed = ModuleAttemptRecord {
            activity_name: None,
            self_learning_hours: 3.0,
            ..attempt("A1", "", 2, 10.0, 10.0)
        };
        let data = ModuleActivity {
            student_ids: vec!["A1".to_string()],
            all_student_data: vec![
                ModuleAttemptRecord {
                    self_learning_hours: 1.0,
                    ..attempt("A1", "Module 1", 1, 5.0, 10.0)
                },
                unattributed,
            ],
            ..ModuleActivity::default()
        };

        let metrics = student_metrics(&data, "A1");
        assert_eq!(metrics.total_attempts, 2);
        assert!((metrics.total_hours - 4.0).abs() < 1e-9);
        assert!((metrics.avg_score_pct - 75.0).abs() < 1e-9);

        assert_eq!(available_modules(&data, "A1"), vec!["Module 1"]);
        assert_eq!(module_attempts(&data, "A1", "Module 1").len(), 1);
        assert_eq!(module_attempts(&data, "A1", "").len(), 0);
    }

    #[test]
    fn metrics_guard_zero_denominator() {
        let result = AnalysisResult::ModuleActivity(ModuleActivity {
            all_student_data: vec![attempt("B2", "Module 3", 1, 2.0, 0.0)],
            ..ModuleActivity::default()
        });
        let metrics = student_metrics(module_data(&result), "B2");
        assert_eq!(metrics.avg_score_pct, 0.0);
        assert_eq!(student_metrics(module_data(&result), "nobody").total_attempts, 0);
    }

    #[test]
    fn question_flow_never_selects_a_module() {
        let result = AnalysisResult::QuestionAnalytics(QuestionAnalytics {
            cohort: CohortAnalysis::default(),
            students: vec![StudentRecord {
                student_id: "S1".to_string(),
                overall_accuracy: 0.5,
                total_attempts: 1,
                weak_questions: Vec::new(),
                time_comparison: None,
            }],
        });
        let state = reduce(
            &result,
            &SelectionState::default(),
            &SelectionEvent::SelectStudent("S1".to_string()),
        );
        let state = reduce(&result, &state, &SelectionEvent::SelectModule("Module 1".to_string()));
        assert_eq!(state.student.as_deref(), Some("S1"));
        assert_eq!(state.module, None);
    }

    #[test]
    fn comparison_pair_against_cohort() {
        let student = |id: &str, accuracy: f64, weak: usize| StudentRecord {
            student_id: id.to_string(),
            overall_accuracy: accuracy,
            total_attempts: 1,
            weak_questions: crate::classifier::normalize_weak_questions(Some(
                &serde_json::Value::Array(
                    (0..weak).map(|i| serde_json::json!(format!("Q{i}"))).collect(),
                ),
            )),
            time_comparison: None,
        };
        let data = QuestionAnalytics {
            cohort: CohortAnalysis::default(),
            students: vec![student("S1", 0.4, 3), student("S2", 0.9, 0)],
        };
        let pair = comparison_pair(&data, "S1").unwrap();
        assert_eq!(
            pair,
            ComparisonPair {
                student_accuracy_pct: 40,
                cohort_avg_accuracy_pct: 65,
                student_weak_count: 3,
                cohort_avg_weak_count: 2,
            }
        );
        assert_eq!(comparison_pair(&data, "S9"), None);
    }
}
