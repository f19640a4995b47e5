pub mod content;
pub mod resolution;
pub mod scheduler;

pub use content::{ContentProvider, FallbackContent};
pub use resolution::{evaluate_response, ActiveCheckpoint, CheckpointResolver, Response, Verdict};
pub use scheduler::CheckpointScheduler;
