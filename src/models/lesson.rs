use serde::{Deserialize, Serialize};

/// Identifies the lesson a session plays. Also handed to the content
/// collaborator as session context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonContext {
    pub course_id: String,
    pub lesson_id: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl LessonContext {
    pub fn new(course_id: impl Into<String>, lesson_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            lesson_id: lesson_id.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
