//! Key casing upstream is not stable: each list names the canonical key
//! first, then accepted alternates. The first non-null value wins.

use serde_json::{Map, Value};

pub const COHORT: &[&str] = &["cohort"];
pub const STUDENTS: &[&str] = &["students"];
pub const QUESTION_WISE: &[&str] = &["question_wise", "questionWise"];
pub const TIME_ANALYSIS: &[&str] = &["time_analysis", "timeAnalysis"];
pub const WEAK_QUESTIONS: &[&str] = &["weak_questions", "weakQuestions"];

pub const ACCURACY: &[&str] = &["Accuracy", "accuracy"];
pub const STUDENTS_ATTEMPTED: &[&str] =
    &["Students Attempted", "studentsAttempted", "students_attempted"];
pub const QUESTION_TEXT: &[&str] = &["Question Text", "questionText", "question_text"];
pub const QUESTION_ID: &[&str] = &["Question ID", "questionId", "question_id", "id"];

pub const MEAN: &[&str] = &["mean", "Mean"];
pub const MEDIAN: &[&str] = &["median", "Median"];
pub const STD_DEV: &[&str] = &["std", "stdDev", "std_dev"];

pub const OVERALL_ACCURACY: &[&str] = &["overall_accuracy", "overallAccuracy"];
pub const TOTAL_ATTEMPTS: &[&str] = &["total_attempts", "totalAttempts"];
pub const TIME_COMPARISON: &[&str] = &["time_comparison", "timeComparison"];
pub const STUDENT_TIME: &[&str] = &["student_time", "studentTime"];
pub const COHORT_TIME: &[&str] = &["cohort_time", "cohortTime"];
pub const DIFFERENCE: &[&str] = &["difference", "Difference"];

pub const STUDENT_IDS: &[&str] = &["student_ids", "studentIds"];
pub const ALL_STUDENT_DATA: &[&str] = &["all_student_data", "allStudentData"];
pub const OVERALL_LEARNING_CHART: &[&str] = &["overall_learning_chart", "overallLearningChart"];
pub const SESSION_ID: &[&str] = &["session_id", "sessionId"];

pub const LOGIN_ID: &[&str] = &["login_id", "studentId", "student_id", "Login ID"];
pub const ACTIVITY_NAME: &[&str] = &["activity_name", "activityName"];
pub const ATTEMPT_NO: &[&str] = &["Attempt No", "attemptNo", "attempt_no"];
pub const SELF_LEARNING_HOURS: &[&str] =
    &["Self Learning Hours", "selfLearningHours", "self_learning_hours"];
pub const CALCULATED_SCORE: &[&str] =
    &["Calculated Score", "calculatedScore", "calculated_score"];
pub const TOTAL_SCORE: &[&str] = &["Total Score", "totalScore", "total_score"];

pub const ERROR: &[&str] = &["error"];

pub fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| obj.get(*name).filter(|value| !value.is_null()))
}

pub fn object<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Map<String, Value>> {
    field(obj, names).and_then(Value::as_object)
}

pub fn array<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Vec<Value>> {
    field(obj, names).and_then(Value::as_array)
}

/// Finite number, accepting numeric strings.
pub fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

pub fn number(obj: &Map<String, Value>, names: &[&str]) -> Option<f64> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find_map(as_number)
}

/// Identifier-like text: strings as-is, numbers rendered without a trailing `.0`.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.to_string(),
        }),
        _ => None,
    }
}

pub fn text(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find_map(as_text)
}
