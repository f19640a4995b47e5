use crate::engagement::SessionState;

/// Errors surfaced by the engagement engine.
#[derive(Debug, thiserror::Error)]
pub enum EngagementError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("checkpoint content unavailable: {0}")]
    ContentUnavailable(String),

    #[error("host media call failed: {0}")]
    HostMedia(String),

    #[error("seek rejected while session is {state:?}")]
    SeekRejected { state: SessionState },

    #[error("cannot {action} while session is {from:?}")]
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },

    #[error("persistence failed: {0:#}")]
    Persistence(anyhow::Error),
}

pub type Result<T> = core::result::Result<T, EngagementError>;
