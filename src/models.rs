use std::fmt;

use serde::Serialize;

pub type QuestionId = String;
pub type StudentId = String;

/// The two independent analysis pipelines an upload can go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Per-question and per-student accuracy analytics.
    QuestionAnalytics,
    /// Per-attempt module activity analytics.
    ModuleActivity,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::QuestionAnalytics => f.write_str("question analytics"),
            Flow::ModuleActivity => f.write_str("module activity"),
        }
    }
}

pub fn placeholder_text(question_id: &str) -> String {
    format!("Question {question_id}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionStat {
    pub question_id: QuestionId,
    pub accuracy: f64,
    pub students_attempted: u64,
    pub question_text: Option<String>,
}

impl QuestionStat {
    pub fn display_text(&self) -> String {
        self.question_text
            .clone()
            .unwrap_or_else(|| placeholder_text(&self.question_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeStat {
    pub question_id: QuestionId,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

/// Canonical weak-question entry, whatever shape the upstream payload used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeakItem {
    pub question_id: QuestionId,
    /// Ratio in `[0, 1]`.
    pub accuracy: f64,
    pub accuracy_pct: u32,
    pub question_text: String,
    pub students_attempted: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeComparison {
    pub question_id: QuestionId,
    pub student_time: f64,
    pub cohort_time: f64,
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    pub student_id: StudentId,
    pub overall_accuracy: f64,
    pub total_attempts: u64,
    pub weak_questions: Vec<WeakItem>,
    /// Only present for payloads produced by the timing analysis.
    pub time_comparison: Option<Vec<TimeComparison>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CohortAnalysis {
    pub question_wise: Vec<QuestionStat>,
    pub time_analysis: Vec<TimeStat>,
    pub weak_questions: Vec<WeakItem>,
}

impl CohortAnalysis {
    pub fn question(&self, question_id: &str) -> Option<&QuestionStat> {
        self.question_wise
            .iter()
            .find(|stat| stat.question_id == question_id)
    }

    pub fn timing(&self, question_id: &str) -> Option<&TimeStat> {
        self.time_analysis
            .iter()
            .find(|stat| stat.question_id == question_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuestionAnalytics {
    pub cohort: CohortAnalysis,
    pub students: Vec<StudentRecord>,
}

impl QuestionAnalytics {
    pub fn student(&self, student_id: &str) -> Option<&StudentRecord> {
        self.students
            .iter()
            .find(|record| record.student_id == student_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleAttemptRecord {
    pub student_id: StudentId,
    /// Missing when the upstream row names no module; such attempts still
    /// count toward the student's totals.
    pub activity_name: Option<String>,
    pub attempt_no: u32,
    pub self_learning_hours: f64,
    pub calculated_score: f64,
    pub total_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleHours {
    pub activity_name: String,
    pub self_learning_hours: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleActivity {
    pub student_ids: Vec<StudentId>,
    pub all_student_data: Vec<ModuleAttemptRecord>,
    pub overall_learning_chart: Vec<ModuleHours>,
    /// Opaque token for requesting the upstream report download.
    pub session_id: Option<String>,
}

impl ModuleAttemptRecord {
    pub fn module(&self) -> Option<&str> {
        self.activity_name.as_deref()
    }
}

impl ModuleActivity {
    pub fn attempts_for<'a>(
        &'a self,
        student_id: &'a str,
    ) -> impl Iterator<Item = &'a ModuleAttemptRecord> + 'a {
        self.all_student_data
            .iter()
            .filter(move |record| record.student_id == student_id)
    }
}

/// Source of truth for one upload/analysis round-trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum AnalysisResult {
    QuestionAnalytics(QuestionAnalytics),
    ModuleActivity(ModuleActivity),
}

impl AnalysisResult {
    pub fn flow(&self) -> Flow {
        match self {
            AnalysisResult::QuestionAnalytics(_) => Flow::QuestionAnalytics,
            AnalysisResult::ModuleActivity(_) => Flow::ModuleActivity,
        }
    }
}
