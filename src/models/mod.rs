mod checkpoint;
mod cursor;
mod interval;
mod lesson;
mod progress;

pub use checkpoint::{
    Checkpoint, CheckpointKind, CheckpointPayload, CheckpointStatus, TRIGGER_WINDOW_SECS,
};
pub use cursor::MediaCursor;
pub use interval::WatchedInterval;
pub use lesson::LessonContext;
pub use progress::CompletionRecord;
