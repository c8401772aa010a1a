use std::borrow::Cow;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::classifier::{self, COHORT_WEAK_THRESHOLD};
use crate::error::{PartialDataWarning, ValidationError};
use crate::fields;
use crate::models::{
    AnalysisResult, CohortAnalysis, Flow, ModuleActivity, ModuleAttemptRecord, ModuleHours,
    QuestionAnalytics, QuestionStat, StudentRecord, TimeComparison, TimeStat,
};
use crate::natural::natural_cmp;

#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub result: AnalysisResult,
    pub warnings: Vec<PartialDataWarning>,
}

impl Flow {
    /// Guesses the flow from the sections present in `raw`.
    pub fn infer(raw: &Value) -> Flow {
        let Some(obj) = raw.as_object() else {
            return Flow::QuestionAnalytics;
        };
        let obj = unwrap_envelope(obj).unwrap_or(obj);
        let has_module_sections = fields::field(obj, fields::STUDENT_IDS).is_some()
            || fields::field(obj, fields::ALL_STUDENT_DATA).is_some();
        if has_module_sections {
            Flow::ModuleActivity
        } else {
            Flow::QuestionAnalytics
        }
    }
}

pub fn validate(raw: &Value, flow: Flow) -> Result<AnalysisResult, ValidationError> {
    validate_with_warnings(raw, flow).map(|validated| validated.result)
}

pub fn validate_with_warnings(raw: &Value, flow: Flow) -> Result<Validated, ValidationError> {
    let Some(obj) = raw.as_object() else {
        return Err(ValidationError::missing(flow, "payload"));
    };
    if let Some(message) = fields::field(obj, fields::ERROR) {
        let detail = fields::as_text(message).unwrap_or_else(|| message.to_string());
        return Err(ValidationError::upstream(flow, detail));
    }

    let obj = unwrap_envelope(obj).unwrap_or(obj);

    let mut warnings = Vec::new();
    let result = match flow {
        Flow::QuestionAnalytics => {
            AnalysisResult::QuestionAnalytics(question_analytics(obj, &mut warnings)?)
        }
        Flow::ModuleActivity => {
            AnalysisResult::ModuleActivity(module_activity(obj, &mut warnings)?)
        }
    };

    for warning in &warnings {
        warn!(%flow, "partial data: {warning}");
    }

    Ok(Validated { result, warnings })
}

/// The analysis job wraps its output as `{success, data}`; the HTTP layer
/// usually strips that, but saved job output still carries it.
fn unwrap_envelope(obj: &Map<String, Value>) -> Option<&Map<String, Value>> {
    if !obj.contains_key("success") {
        return None;
    }
    obj.get("data").and_then(Value::as_object)
}

/// Parses a collaborator response body. `flow` is inferred when not given.
pub fn parse_response(body: &str, flow: Option<Flow>) -> Result<Validated, ValidationError> {
    let text = sanitize_non_finite(body);
    let raw: Value = match serde_json::from_str(&text) {
        Ok(raw) => raw,
        Err(err) => {
            let flow = flow.unwrap_or(Flow::QuestionAnalytics);
            warn!(%flow, "analysis response is not valid JSON: {err}");
            return Err(ValidationError::upstream(flow, err.to_string()));
        }
    };
    let flow = flow.unwrap_or_else(|| Flow::infer(&raw));
    debug!(%flow, "validating analysis payload");
    validate_with_warnings(&raw, flow)
}

/// Rewrites bare `NaN` / `Infinity` / `-Infinity` tokens outside string
/// literals to `null`.
pub fn sanitize_non_finite(text: &str) -> Cow<'_, str> {
    if !text.contains("NaN") && !text.contains("Infinity") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
        } else if ch == '"' {
            in_string = true;
        } else if let Some(token) = ["-Infinity", "Infinity", "NaN"]
            .iter()
            .find(|token| rest.starts_with(**token))
        {
            out.push_str("null");
            rest = &rest[token.len()..];
            continue;
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    Cow::Owned(out)
}

fn question_analytics(
    obj: &Map<String, Value>,
    warnings: &mut Vec<PartialDataWarning>,
) -> Result<QuestionAnalytics, ValidationError> {
    let flow = Flow::QuestionAnalytics;
    let cohort = fields::object(obj, fields::COHORT)
        .ok_or_else(|| ValidationError::missing(flow, "cohort"))?;
    let students = fields::object(obj, fields::STUDENTS)
        .ok_or_else(|| ValidationError::missing(flow, "students"))?;

    let cohort = cohort_analysis(cohort, warnings);
    let students = students
        .iter()
        .map(|(student_id, record)| student_record(student_id, record, warnings))
        .collect();

    Ok(QuestionAnalytics { cohort, students })
}

fn cohort_analysis(
    cohort: &Map<String, Value>,
    warnings: &mut Vec<PartialDataWarning>,
) -> CohortAnalysis {
    let question_wise: Vec<QuestionStat> = match fields::object(cohort, fields::QUESTION_WISE) {
        Some(questions) => questions
            .iter()
            .map(|(question_id, stat)| question_stat(question_id, stat, warnings))
            .collect(),
        None => {
            warnings.push(PartialDataWarning::MissingSection {
                section: "question_wise",
                student: None,
            });
            Vec::new()
        }
    };

    let time_analysis = match fields::object(cohort, fields::TIME_ANALYSIS) {
        Some(timings) => timings
            .iter()
            .filter_map(|(question_id, stat)| time_stat(question_id, stat, warnings))
            .collect(),
        None => {
            warnings.push(PartialDataWarning::MissingSection {
                section: "time_analysis",
                student: None,
            });
            Vec::new()
        }
    };

    let weak_questions = match fields::field(cohort, fields::WEAK_QUESTIONS) {
        Some(raw) => classifier::normalize_weak_questions(Some(raw)),
        None => {
            warnings.push(PartialDataWarning::MissingSection {
                section: "weak_questions",
                student: None,
            });
            classifier::derive_weak_questions(&question_wise, COHORT_WEAK_THRESHOLD)
        }
    };

    for item in &weak_questions {
        if !question_wise.iter().any(|q| q.question_id == item.question_id) {
            warnings.push(PartialDataWarning::OrphanWeakQuestion {
                question_id: item.question_id.clone(),
            });
        }
    }

    CohortAnalysis {
        question_wise,
        time_analysis,
        weak_questions,
    }
}

fn question_stat(
    question_id: &str,
    stat: &Value,
    warnings: &mut Vec<PartialDataWarning>,
) -> QuestionStat {
    let Some(obj) = stat.as_object() else {
        warnings.push(PartialDataWarning::MalformedEntry {
            section: "question_wise",
            key: question_id.to_string(),
        });
        return QuestionStat {
            question_id: question_id.to_string(),
            accuracy: 0.0,
            students_attempted: 0,
            question_text: None,
        };
    };

    let question_text = fields::text(obj, fields::QUESTION_TEXT);
    if question_text.is_none() {
        warnings.push(PartialDataWarning::MissingQuestionText {
            question_id: question_id.to_string(),
        });
    }

    QuestionStat {
        question_id: question_id.to_string(),
        accuracy: fields::number(obj, fields::ACCURACY)
            .unwrap_or(0.0)
            .clamp(0.0, 1.0),
        students_attempted: non_negative(fields::number(obj, fields::STUDENTS_ATTEMPTED)) as u64,
        question_text,
    }
}

fn time_stat(
    question_id: &str,
    stat: &Value,
    warnings: &mut Vec<PartialDataWarning>,
) -> Option<TimeStat> {
    let Some(obj) = stat.as_object() else {
        warnings.push(PartialDataWarning::MalformedEntry {
            section: "time_analysis",
            key: question_id.to_string(),
        });
        return None;
    };

    Some(TimeStat {
        question_id: question_id.to_string(),
        mean: non_negative(fields::number(obj, fields::MEAN)),
        median: non_negative(fields::number(obj, fields::MEDIAN)),
        std_dev: non_negative(fields::number(obj, fields::STD_DEV)),
    })
}

fn student_record(
    student_id: &str,
    record: &Value,
    warnings: &mut Vec<PartialDataWarning>,
) -> StudentRecord {
    let empty = Map::new();
    let obj = match record.as_object() {
        Some(obj) => obj,
        None => {
            warnings.push(PartialDataWarning::MalformedEntry {
                section: "students",
                key: student_id.to_string(),
            });
            &empty
        }
    };

    let weak_raw = fields::field(obj, fields::WEAK_QUESTIONS);
    if weak_raw.is_none() {
        warnings.push(PartialDataWarning::MissingSection {
            section: "weak_questions",
            student: Some(student_id.to_string()),
        });
    }

    StudentRecord {
        student_id: student_id.to_string(),
        overall_accuracy: fields::number(obj, fields::OVERALL_ACCURACY)
            .unwrap_or(0.0)
            .clamp(0.0, 1.0),
        total_attempts: non_negative(fields::number(obj, fields::TOTAL_ATTEMPTS)) as u64,
        weak_questions: classifier::normalize_weak_questions(weak_raw),
        time_comparison: fields::object(obj, fields::TIME_COMPARISON)
            .map(|rows| rows.iter().filter_map(time_comparison).collect()),
    }
}

fn time_comparison((question_id, row): (&String, &Value)) -> Option<TimeComparison> {
    let obj = row.as_object()?;
    let student_time = fields::number(obj, fields::STUDENT_TIME).unwrap_or(0.0);
    let cohort_time = fields::number(obj, fields::COHORT_TIME).unwrap_or(student_time);
    Some(TimeComparison {
        question_id: question_id.clone(),
        student_time,
        cohort_time,
        difference: fields::number(obj, fields::DIFFERENCE)
            .unwrap_or(student_time - cohort_time),
    })
}

fn module_activity(
    obj: &Map<String, Value>,
    warnings: &mut Vec<PartialDataWarning>,
) -> Result<ModuleActivity, ValidationError> {
    let flow = Flow::ModuleActivity;
    let student_ids = fields::array(obj, fields::STUDENT_IDS)
        .ok_or_else(|| ValidationError::missing(flow, "student_ids"))?;
    let rows = fields::array(obj, fields::ALL_STUDENT_DATA)
        .ok_or_else(|| ValidationError::missing(flow, "all_student_data"))?;

    let student_ids = student_ids.iter().filter_map(fields::as_text).collect();
    let all_student_data: Vec<ModuleAttemptRecord> = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let Some(record) = attempt_record(row) else {
                warnings.push(PartialDataWarning::MalformedEntry {
                    section: "all_student_data",
                    key: index.to_string(),
                });
                return None;
            };
            if record.activity_name.is_none() {
                warnings.push(PartialDataWarning::MissingSection {
                    section: "activity_name",
                    student: Some(record.student_id.clone()),
                });
            }
            Some(record)
        })
        .collect();

    let overall_learning_chart = match fields::array(obj, fields::OVERALL_LEARNING_CHART) {
        Some(entries) => entries.iter().filter_map(module_hours).collect(),
        None => {
            warnings.push(PartialDataWarning::MissingSection {
                section: "overall_learning_chart",
                student: None,
            });
            derive_module_hours(&all_student_data)
        }
    };

    Ok(ModuleActivity {
        student_ids,
        all_student_data,
        overall_learning_chart,
        session_id: fields::text(obj, fields::SESSION_ID),
    })
}

fn attempt_record(row: &Value) -> Option<ModuleAttemptRecord> {
    let obj = row.as_object()?;
    Some(ModuleAttemptRecord {
        student_id: fields::text(obj, fields::LOGIN_ID)?,
        activity_name: fields::text(obj, fields::ACTIVITY_NAME),
        attempt_no: fields::number(obj, fields::ATTEMPT_NO)
            .map(|n| n.clamp(1.0, f64::from(u32::MAX)) as u32)
            .unwrap_or(1),
        self_learning_hours: non_negative(fields::number(obj, fields::SELF_LEARNING_HOURS)),
        calculated_score: fields::number(obj, fields::CALCULATED_SCORE).unwrap_or(0.0),
        total_score: non_negative(fields::number(obj, fields::TOTAL_SCORE)),
    })
}

fn module_hours(entry: &Value) -> Option<ModuleHours> {
    let obj = entry.as_object()?;
    Some(ModuleHours {
        activity_name: fields::text(obj, fields::ACTIVITY_NAME)?,
        self_learning_hours: non_negative(fields::number(obj, fields::SELF_LEARNING_HOURS)),
    })
}

/// Total self-learning hours per module, in natural module order.
pub fn derive_module_hours(records: &[ModuleAttemptRecord]) -> Vec<ModuleHours> {
    let mut totals: Vec<ModuleHours> = Vec::new();
    for record in records {
        let Some(module) = record.module() else {
            continue;
        };
        match totals.iter_mut().find(|entry| entry.activity_name == module) {
            Some(entry) => entry.self_learning_hours += record.self_learning_hours,
            None => totals.push(ModuleHours {
                activity_name: module.to_string(),
                self_learning_hours: record.self_learning_hours,
            }),
        }
    }
    totals.sort_by(|a, b| natural_cmp(&a.activity_name, &b.activity_name));
    totals
}

fn non_negative(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0).max(0.0)
}
