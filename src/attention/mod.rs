pub mod activity;
pub mod score;
pub mod signal;

pub use activity::{ActivityMonitor, ActivityState};
pub use score::AttentionScore;
pub use signal::{AlwaysAttentive, AttentivenessSignal, SimulatedPresence};
