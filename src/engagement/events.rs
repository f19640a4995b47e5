use serde::Serialize;

use crate::models::{CheckpointKind, CompletionRecord};

use super::state::SessionState;

/// User-facing notices the UI should surface.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "notice", rename_all = "camelCase")]
pub enum Notice {
    InactivityPaused,
    TabHiddenPaused,
    CorrectAnswer,
    IncorrectAnswer { retry: bool },
    /// The host refused to play; the learner has to press play themselves.
    TapToResume,
    SeekBlocked,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EngagementEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    #[serde(rename_all = "camelCase")]
    CheckpointActivated {
        id: String,
        kind: CheckpointKind,
        prompt: String,
        code: Option<String>,
    },
    CheckpointAnswered {
        id: String,
        correct: bool,
    },
    Notice(Notice),
    AttentionChanged {
        score: u8,
    },
    LessonCompleted(CompletionRecord),
}
