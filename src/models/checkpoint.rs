use serde::{Deserialize, Serialize};

/// Width of the window, in seconds, during which a checkpoint may fire.
pub const TRIGGER_WINDOW_SECS: f64 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum CheckpointKind {
    Quiz,
    Attention,
    CodeChallenge,
    Conceptual,
    ClickTarget,
    TextInput,
    DragTarget,
    FingerprintCode,
}

impl CheckpointKind {
    pub const ALL: [CheckpointKind; 8] = [
        CheckpointKind::Quiz,
        CheckpointKind::Attention,
        CheckpointKind::CodeChallenge,
        CheckpointKind::Conceptual,
        CheckpointKind::ClickTarget,
        CheckpointKind::TextInput,
        CheckpointKind::DragTarget,
        CheckpointKind::FingerprintCode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointKind::Quiz => "quiz",
            CheckpointKind::Attention => "attention",
            CheckpointKind::CodeChallenge => "codeChallenge",
            CheckpointKind::Conceptual => "conceptual",
            CheckpointKind::ClickTarget => "clickTarget",
            CheckpointKind::TextInput => "textInput",
            CheckpointKind::DragTarget => "dragTarget",
            CheckpointKind::FingerprintCode => "fingerprintCode",
        }
    }

    /// Gesture kinds count any completed interaction as correct.
    pub fn is_gesture(&self) -> bool {
        matches!(self, CheckpointKind::ClickTarget | CheckpointKind::DragTarget)
    }
}

/// Content shown to the learner. Supplied by the content collaborator and
/// opaque to the engine except for `answer` and `key_phrases`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointPayload {
    pub prompt: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub key_phrases: Vec<String>,
    #[serde(default)]
    pub visual: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum CheckpointStatus {
    #[default]
    Pending,
    Active,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub id: String,
    pub trigger_time: f64,
    pub kind: CheckpointKind,
    pub completed: bool,
    pub status: CheckpointStatus,
    pub payload: CheckpointPayload,
}

impl Checkpoint {
    pub fn new(id: String, trigger_time: f64, kind: CheckpointKind, payload: CheckpointPayload) -> Self {
        Self {
            id,
            trigger_time,
            kind,
            completed: false,
            status: CheckpointStatus::Pending,
            payload,
        }
    }

    /// True when `time` lies in `[trigger_time, trigger_time + 1)`.
    pub fn is_due_at(&self, time: f64) -> bool {
        time >= self.trigger_time && time < self.trigger_time + TRIGGER_WINDOW_SECS
    }

    pub fn is_pending(&self) -> bool {
        self.status == CheckpointStatus::Pending
    }
}
