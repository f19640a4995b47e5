use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BlockReason {
    Checkpoint,
    Inactivity,
    TabHidden,
}

/// Control state governing whether the host media element may play.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum SessionState {
    /// Waiting for the learner to opt in to verification.
    #[default]
    Locked,
    Playing,
    Blocked(BlockReason),
    /// Terminal until an explicit reset.
    Completed,
}

impl SessionState {
    pub fn is_blocked(&self) -> bool {
        matches!(self, SessionState::Blocked(_))
    }

    /// Seeking is only honoured while playing; every other state reverts it.
    pub fn allows_seek(&self) -> bool {
        matches!(self, SessionState::Playing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Locked => "locked",
            SessionState::Playing => "playing",
            SessionState::Blocked(BlockReason::Checkpoint) => "blocked(checkpoint)",
            SessionState::Blocked(BlockReason::Inactivity) => "blocked(inactivity)",
            SessionState::Blocked(BlockReason::TabHidden) => "blocked(tabHidden)",
            SessionState::Completed => "completed",
        }
    }
}
