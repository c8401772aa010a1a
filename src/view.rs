use serde::Serialize;

use crate::metrics::{self, CohortSummary, StudentOption};
use crate::models::{AnalysisResult, ModuleActivity, QuestionAnalytics, StudentId, WeakItem};
use crate::selection::{self, ComparisonPair, SelectionState, StudentMetrics};
use crate::series::{self, ChartReady, Panel};

pub const CHOOSE_STUDENT_MESSAGE: &str = "Choose a student to see individual analysis.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum DashboardView {
    QuestionAnalytics(CohortView),
    ModuleActivity(ModuleView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortView {
    pub summary: CohortSummary,
    pub student_options: Vec<StudentOption>,
    pub question_performance: Panel,
    pub student_performance: Panel,
    pub time_analysis: Panel,
    pub weak_questions: Panel,
    pub weak_question_details: Vec<WeakItem>,
    pub student: Option<StudentView>,
    /// Set when no student is selected.
    pub student_placeholder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentView {
    pub student_id: StudentId,
    pub total_attempts: u64,
    pub comparison: ComparisonPair,
    pub accuracy_comparison: Panel,
    pub weak_comparison: Panel,
    pub weak_questions: Panel,
    pub weak_question_details: Vec<WeakItem>,
    pub time_comparison: Panel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleView {
    pub student_ids: Vec<StudentId>,
    pub overall_learning: Panel,
    pub selected_student: Option<StudentId>,
    pub modules: Vec<String>,
    pub selected_module: Option<String>,
    pub metrics: Option<StudentMetrics>,
    pub score_progression: Panel,
    pub study_time: Panel,
    pub student_placeholder: Option<String>,
    pub session_id: Option<String>,
}

pub fn build_view(result: &AnalysisResult, selection: &SelectionState) -> DashboardView {
    match result {
        AnalysisResult::QuestionAnalytics(data) => {
            DashboardView::QuestionAnalytics(cohort_view(data, selection))
        }
        AnalysisResult::ModuleActivity(data) => {
            DashboardView::ModuleActivity(module_view(data, selection))
        }
    }
}

fn cohort_view(data: &QuestionAnalytics, selection: &SelectionState) -> CohortView {
    let student = selection
        .student
        .as_deref()
        .and_then(|student_id| student_view(data, student_id));
    let student_placeholder = student
        .is_none()
        .then(|| CHOOSE_STUDENT_MESSAGE.to_string());

    CohortView {
        summary: metrics::cohort_summary(&data.cohort, &data.students),
        student_options: metrics::student_options(&data.students),
        question_performance: Panel::new(
            "Question Performance Overview",
            metrics::question_performance(&data.cohort).chart_series(),
            "No question performance data available",
        ),
        student_performance: Panel::new(
            "Student Performance Distribution",
            metrics::student_performance(&data.students).chart_series(),
            "No student performance data available",
        ),
        time_analysis: Panel::new(
            "Cohort Question Timing Analysis",
            metrics::time_analysis(&data.cohort).chart_series(),
            "No timing data available",
        ),
        weak_questions: Panel::new(
            "Cohort Weak Questions (Accuracy < 70%)",
            data.cohort.weak_questions.chart_series(),
            "No questions below 70% cohort accuracy",
        ),
        weak_question_details: data.cohort.weak_questions.clone(),
        student,
        student_placeholder,
    }
}

fn student_view(data: &QuestionAnalytics, student_id: &str) -> Option<StudentView> {
    let record = data.student(student_id)?;
    let comparison = selection::comparison_pair(data, student_id)?;

    Some(StudentView {
        student_id: student_id.to_string(),
        total_attempts: record.total_attempts,
        comparison,
        accuracy_comparison: Panel::new(
            "Accuracy Comparison",
            series::accuracy_comparison(&comparison),
            "No accuracy data available",
        ),
        weak_comparison: Panel::new(
            "Weak Questions Comparison",
            series::weak_comparison(&comparison),
            "No weak question data available",
        ),
        weak_questions: Panel::new(
            format!("Student {student_id} Weak Questions"),
            record.weak_questions.chart_series(),
            format!("Great job! Student {student_id} has no weak questions."),
        ),
        weak_question_details: record.weak_questions.clone(),
        time_comparison: Panel::new(
            "Student vs Cohort Time Analysis",
            metrics::student_time_comparison(record).chart_series(),
            format!("No timing comparison available for Student {student_id}"),
        ),
    })
}

fn module_view(data: &ModuleActivity, selection: &SelectionState) -> ModuleView {
    let student = selection.student.as_deref();
    let modules = student
        .map(|student_id| selection::available_modules(data, student_id))
        .unwrap_or_default();
    let attempts = match (student, selection.module.as_deref()) {
        (Some(student_id), Some(module)) => selection::module_attempts(data, student_id, module),
        _ => Vec::new(),
    };

    ModuleView {
        student_ids: data.student_ids.clone(),
        overall_learning: Panel::new(
            "Total Self-Learning Time per Module",
            data.overall_learning_chart.chart_series(),
            "No module activity recorded",
        ),
        selected_student: student.map(str::to_string),
        modules,
        selected_module: selection.module.clone(),
        metrics: student.map(|student_id| selection::student_metrics(data, student_id)),
        score_progression: Panel::new(
            "Score Progression",
            series::score_progression(&attempts),
            "No attempts recorded for this module",
        ),
        study_time: Panel::new(
            "Study Time per Attempt",
            series::study_time(&attempts),
            "No attempts recorded for this module",
        ),
        student_placeholder: student
            .is_none()
            .then(|| CHOOSE_STUDENT_MESSAGE.to_string()),
        session_id: data.session_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Flow;
    use crate::payload::validate;
    use crate::selection::{reduce, SelectionEvent};
    use serde_json::json;

    fn question_result() -> AnalysisResult {
        validate(
            &json!({
                "cohort": {
                    "question_wise": {
                        "Q1": { "Accuracy": 0.8, "Students Attempted": 10 },
                        "Q2": { "Accuracy": 0.4, "Students Attempted": 10 }
                    }
                },
                "students": {
                    "S1": { "overall_accuracy": 0.8, "weak_questions": [], "total_attempts": 5 },
                    "S2": {
                        "overall_accuracy": 0.4,
                        "weak_questions": { "Q2": { "Accuracy": 0.3 } },
                        "total_attempts": 2,
                        "time_comparison": {
                            "Q1": { "student_time": 50.0, "cohort_time": 40.0, "difference": 10.0 }
                        }
                    }
                }
            }),
            Flow::QuestionAnalytics,
        )
        .unwrap()
    }

    #[test]
    fn cohort_view_without_selection_shows_placeholder() {
        let view = build_view(&question_result(), &SelectionState::default());
        let DashboardView::QuestionAnalytics(view) = view else {
            panic!("expected cohort view");
        };
        assert_eq!(view.summary.total_students, 2);
        assert_eq!(view.summary.avg_accuracy_pct, 60);
        assert!(view.student.is_none());
        assert_eq!(view.student_placeholder.as_deref(), Some(CHOOSE_STUDENT_MESSAGE));
        assert_eq!(view.weak_questions.series.labels, vec!["Q2"]);
        assert!(!view.time_analysis.has_data());
        assert_eq!(
            view.time_analysis.empty_message.as_deref(),
            Some("No timing data available")
        );
    }

    #[test]
    fn selected_student_gets_their_panels() {
        let result = question_result();
        let state = reduce(
            &result,
            &SelectionState::default(),
            &SelectionEvent::SelectStudent("S2".to_string()),
        );
        let DashboardView::QuestionAnalytics(view) = build_view(&result, &state) else {
            panic!("expected cohort view");
        };
        let student = view.student.expect("student view");
        assert_eq!(student.comparison.student_accuracy_pct, 40);
        assert_eq!(student.comparison.cohort_avg_accuracy_pct, 60);
        assert_eq!(student.weak_question_details[0].accuracy_pct, 30);
        assert_eq!(student.time_comparison.series.labels, vec!["Q1"]);
        assert_eq!(view.student_placeholder, None);
    }

    #[test]
    fn student_without_weak_questions_gets_praise() {
        let result = question_result();
        let state = SelectionState {
            student: Some("S1".to_string()),
            module: None,
        };
        let DashboardView::QuestionAnalytics(view) = build_view(&result, &state) else {
            panic!("expected cohort view");
        };
        let student = view.student.expect("student view");
        assert_eq!(
            student.weak_questions.empty_message.as_deref(),
            Some("Great job! Student S1 has no weak questions.")
        );
        assert!(!student.time_comparison.has_data());
    }

    #[test]
    fn module_view_follows_selection() {
        let result = validate(
            &json!({
                "student_ids": ["A1"],
                "all_student_data": [
                    { "login_id": "A1", "activity_name": "Module 10", "Attempt No": 2,
                      "Self Learning Hours": 1.0, "Calculated Score": 7, "Total Score": 10 },
                    { "login_id": "A1", "activity_name": "Module 10", "Attempt No": 1,
                      "Self Learning Hours": 2.0, "Calculated Score": 4, "Total Score": 10 },
                    { "login_id": "A1", "activity_name": "Module 9", "Attempt No": 1,
                      "Self Learning Hours": 0.5, "Calculated Score": 9, "Total Score": 10 }
                ],
                "overall_learning_chart": [
                    { "activity_name": "Module 9", "Self Learning Hours": 0.5 },
                    { "activity_name": "Module 10", "Self Learning Hours": 3.0 }
                ]
            }),
            Flow::ModuleActivity,
        )
        .unwrap();

        let state = reduce(
            &result,
            &SelectionState::default(),
            &SelectionEvent::SelectStudent("A1".to_string()),
        );
        let state = reduce(&result, &state, &SelectionEvent::SelectModule("Module 10".to_string()));
        let DashboardView::ModuleActivity(view) = build_view(&result, &state) else {
            panic!("expected module view");
        };
        assert_eq!(view.modules, vec!["Module 9", "Module 10"]);
        assert_eq!(view.selected_module.as_deref(), Some("Module 10"));
        assert_eq!(view.score_progression.series.labels, vec!["1", "2"]);
        assert_eq!(view.score_progression.series.series[0].values, vec![4.0, 7.0]);
        assert_eq!(view.metrics.map(|m| m.total_attempts), Some(3));
        assert_eq!(view.overall_learning.series.labels, vec!["Module 9", "Module 10"]);
    }

    #[test]
    fn module_view_without_student_is_placeholder() {
        let result = AnalysisResult::ModuleActivity(ModuleActivity::default());
        let DashboardView::ModuleActivity(view) = build_view(&result, &SelectionState::default())
        else {
            panic!("expected module view");
        };
        assert!(view.modules.is_empty());
        assert_eq!(view.metrics, None);
        assert!(!view.score_progression.has_data());
        assert!(!view.overall_learning.has_data());
        assert_eq!(view.student_placeholder.as_deref(), Some(CHOOSE_STUDENT_MESSAGE));
    }

    #[test]
    fn building_twice_is_identical() {
        let result = question_result();
        let state = SelectionState {
            student: Some("S2".to_string()),
            module: None,
        };
        assert_eq!(build_view(&result, &state), build_view(&result, &state));
    }
}
