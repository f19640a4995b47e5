use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::CompletionRecord;

/// A `lesson_progress` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredProgress {
    #[serde(flatten)]
    pub record: CompletionRecord,
    pub updated_at: DateTime<Utc>,
}
