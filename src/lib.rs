//! Engagement-gated lesson playback.
//!
//! The host UI owns the media element and forwards its events into an
//! [`EngagementSession`] (or the async [`EngagementController`]). The session
//! credits only attentively watched seconds, pauses playback for scheduled
//! checkpoints and disengagement, and emits a one-time completion record once
//! coverage and checkpoints are both satisfied.

pub mod attention;
pub mod checkpoints;
pub mod db;
pub mod engagement;
pub mod error;
pub mod media;
pub mod models;
pub mod settings;
pub mod tracking;
pub mod utils;

pub use attention::{AlwaysAttentive, AttentionScore, AttentivenessSignal, SimulatedPresence};
pub use checkpoints::{ContentProvider, FallbackContent, Response, Verdict};
pub use db::Database;
pub use engagement::{
    BlockReason, EngagementController, EngagementEvent, EngagementSession, EngagementSnapshot,
    Notice, SessionBuilder, SessionState,
};
pub use error::{EngagementError, Result};
pub use media::MediaHost;
pub use models::{
    Checkpoint, CheckpointKind, CheckpointPayload, CompletionRecord, LessonContext, MediaCursor,
};
pub use settings::{EngagementConfig, RetryPolicy, SettingsStore};
pub use utils::logging::init_logging;
