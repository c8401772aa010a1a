use std::collections::HashSet;

use serde_json::Value;

use crate::fields;
use crate::metrics::percent;
use crate::models::{placeholder_text, QuestionStat, StudentRecord, WeakItem};

/// A question is weak for the cohort below this accuracy.
pub const COHORT_WEAK_THRESHOLD: f64 = 0.70;
/// A question is weak for a single student below this accuracy.
pub const STUDENT_WEAK_THRESHOLD: f64 = 0.60;

pub fn is_weak(accuracy: f64, threshold: f64) -> bool {
    accuracy < threshold
}

/// Normalizes a raw `weak_questions` value into weak items.
///
/// Accepts a mapping of question id to stats, or a sequence whose entries
/// are question ids or stat objects carrying their own id. Anything else
/// yields an empty list. A question id is reported at most once.
pub fn normalize_weak_questions(raw: Option<&Value>) -> Vec<WeakItem> {
    let items: Vec<WeakItem> = match raw {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(question_id, stat)| weak_item(question_id, stat))
            .collect(),
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| list_entry(index, entry))
            .collect(),
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.question_id.clone()))
        .collect()
}

fn list_entry(index: usize, entry: &Value) -> Option<WeakItem> {
    match entry {
        Value::Object(obj) => {
            let question_id = fields::text(obj, fields::QUESTION_ID)
                .unwrap_or_else(|| (index + 1).to_string());
            Some(weak_item(&question_id, entry))
        }
        other => fields::as_text(other).map(|question_id| WeakItem {
            question_text: placeholder_text(&question_id),
            question_id,
            accuracy: 0.0,
            accuracy_pct: 0,
            students_attempted: None,
        }),
    }
}

fn weak_item(question_id: &str, stat: &Value) -> WeakItem {
    match stat {
        Value::Object(obj) => {
            let accuracy = ratio(fields::number(obj, fields::ACCURACY));
            WeakItem {
                question_id: question_id.to_string(),
                accuracy,
                accuracy_pct: percent(accuracy),
                question_text: fields::text(obj, fields::QUESTION_TEXT)
                    .unwrap_or_else(|| placeholder_text(question_id)),
                students_attempted: fields::number(obj, fields::STUDENTS_ATTEMPTED)
                    .map(|n| n.max(0.0) as u64),
            }
        }
        other => {
            let accuracy = ratio(fields::as_number(other));
            WeakItem {
                question_id: question_id.to_string(),
                accuracy,
                accuracy_pct: percent(accuracy),
                question_text: placeholder_text(question_id),
                students_attempted: None,
            }
        }
    }
}

fn ratio(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0).clamp(0.0, 1.0)
}

/// Re-derives weak items from per-question stats, keeping input order.
pub fn derive_weak_questions(questions: &[QuestionStat], threshold: f64) -> Vec<WeakItem> {
    questions
        .iter()
        .filter(|stat| is_weak(stat.accuracy, threshold))
        .map(|stat| WeakItem {
            question_id: stat.question_id.clone(),
            accuracy: stat.accuracy,
            accuracy_pct: percent(stat.accuracy),
            question_text: stat.display_text(),
            students_attempted: Some(stat.students_attempted),
        })
        .collect()
}

pub fn weak_count(record: &StudentRecord) -> usize {
    record.weak_questions.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mapping_form_uses_stats() {
        let raw = json!({ "Q3": { "Accuracy": 0.4 } });
        let items = normalize_weak_questions(Some(&raw));
        assert_eq!(
            items,
            vec![WeakItem {
                question_id: "Q3".to_string(),
                accuracy: 0.4,
                accuracy_pct: 40,
                question_text: "Question Q3".to_string(),
                students_attempted: None,
            }]
        );
    }

    #[test]
    fn mapping_form_falls_back_to_alternate_casing() {
        let raw = json!({
            "Q7": { "accuracy": 0.25, "questionText": "Solve for x" },
            "Q8": { "Accuracy": 0.5, "Question Text": "Factor", "Students Attempted": 12 }
        });
        let items = normalize_weak_questions(Some(&raw));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].accuracy_pct, 25);
        assert_eq!(items[0].question_text, "Solve for x");
        assert_eq!(items[1].students_attempted, Some(12));
    }

    #[test]
    fn sequence_of_ids_reports_each_once() {
        let raw = json!(["Q1", "Q2", 14]);
        let items = normalize_weak_questions(Some(&raw));
        let ids: Vec<&str> = items.iter().map(|i| i.question_id.as_str()).collect();
        assert_eq!(ids, vec!["Q1", "Q2", "14"]);
        assert!(items.iter().all(|i| i.accuracy_pct == 0));
        assert_eq!(items[2].question_text, "Question 14");
    }

    #[test]
    fn duplicate_ids_are_not_double_counted() {
        let raw = json!(["Q1", { "questionId": "Q1", "accuracy": 0.3 }]);
        assert_eq!(normalize_weak_questions(Some(&raw)).len(), 1);
    }

    #[test]
    fn anything_else_is_empty() {
        assert!(normalize_weak_questions(None).is_empty());
        assert!(normalize_weak_questions(Some(&json!("Q1"))).is_empty());
        assert!(normalize_weak_questions(Some(&json!(3))).is_empty());
    }

    #[test]
    fn bare_number_in_mapping_is_accuracy() {
        let raw = json!({ "Q2": 0.55 });
        let items = normalize_weak_questions(Some(&raw));
        assert_eq!(items[0].accuracy_pct, 55);
    }

    #[test]
    fn derived_cohort_weak_uses_strict_threshold() {
        let questions = vec![
            QuestionStat {
                question_id: "Q1".to_string(),
                accuracy: 0.7,
                students_attempted: 10,
                question_text: None,
            },
            QuestionStat {
                question_id: "Q2".to_string(),
                accuracy: 0.69,
                students_attempted: 8,
                question_text: Some("Area of a circle".to_string()),
            },
        ];
        let weak = derive_weak_questions(&questions, COHORT_WEAK_THRESHOLD);
        assert_eq!(weak.len(), 1);
        assert_eq!(weak[0].question_id, "Q2");
        assert_eq!(weak[0].accuracy_pct, 69);
        assert_eq!(weak[0].students_attempted, Some(8));
    }

    #[test]
    fn thresholds_stay_distinct() {
        assert!(is_weak(0.65, COHORT_WEAK_THRESHOLD));
        assert!(!is_weak(0.65, STUDENT_WEAK_THRESHOLD));
    }
}
