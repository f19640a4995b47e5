//! Completion records handed to the persistence collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub course_id: String,
    pub lesson_id: String,
    pub completed: bool,
    pub watched_fraction: f64,
    /// Diagnostic only; never part of the completion predicate.
    pub attention_score: u8,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompletionRecord {
    pub fn partial(course_id: &str, lesson_id: &str, watched_fraction: f64, attention_score: u8) -> Self {
        Self {
            course_id: course_id.to_string(),
            lesson_id: lesson_id.to_string(),
            completed: false,
            watched_fraction,
            attention_score,
            completed_at: None,
        }
    }

    pub fn completed(
        course_id: &str,
        lesson_id: &str,
        watched_fraction: f64,
        attention_score: u8,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            course_id: course_id.to_string(),
            lesson_id: lesson_id.to_string(),
            completed: true,
            watched_fraction,
            attention_score,
            completed_at: Some(completed_at),
        }
    }
}
