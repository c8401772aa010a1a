use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::models::{Flow, QuestionId, StudentId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Required top-level structure is absent, or the upstream call failed.
    #[error("{flow} payload is missing `{section}`{}", detail_suffix(.detail))]
    MissingSection {
        flow: Flow,
        section: &'static str,
        detail: Option<String>,
    },
}

impl ValidationError {
    pub fn missing(flow: Flow, section: &'static str) -> Self {
        ValidationError::MissingSection {
            flow,
            section,
            detail: None,
        }
    }

    pub fn upstream(flow: Flow, detail: impl Into<String>) -> Self {
        ValidationError::MissingSection {
            flow,
            section: "payload",
            detail: Some(detail.into()),
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|text| format!(" ({text})"))
        .unwrap_or_default()
}

/// Optional data that was absent or unusable. Recovered locally with an
/// empty collection or placeholder; never blocks the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartialDataWarning {
    MissingSection {
        section: &'static str,
        student: Option<StudentId>,
    },
    MissingQuestionText {
        question_id: QuestionId,
    },
    OrphanWeakQuestion {
        question_id: QuestionId,
    },
    MalformedEntry {
        section: &'static str,
        key: String,
    },
}

impl fmt::Display for PartialDataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialDataWarning::MissingSection {
                section,
                student: Some(student),
            } => write!(f, "student {student} has no `{section}` data"),
            PartialDataWarning::MissingSection {
                section,
                student: None,
            } => write!(f, "payload has no `{section}` data"),
            PartialDataWarning::MissingQuestionText { question_id } => {
                write!(f, "question {question_id} has no text")
            }
            PartialDataWarning::OrphanWeakQuestion { question_id } => write!(
                f,
                "weak question {question_id} is not listed in question_wise"
            ),
            PartialDataWarning::MalformedEntry { section, key } => {
                write!(f, "ignored malformed `{section}` entry {key}")
            }
        }
    }
}
