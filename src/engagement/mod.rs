pub mod completion;
pub mod controller;
pub mod events;
pub mod session;
pub mod state;

pub use completion::CompletionEvaluator;
pub use controller::{EngagementController, EngagementSnapshot};
pub use events::{EngagementEvent, Notice};
pub use session::{EngagementSession, SessionBuilder};
pub use state::{BlockReason, SessionState};
