use serde::{Deserialize, Serialize};

/// Snapshot of the host media element, pushed on every time update.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaCursor {
    pub time: f64,
    pub is_playing: bool,
}

impl MediaCursor {
    pub fn playing(time: f64) -> Self {
        Self {
            time,
            is_playing: true,
        }
    }

    pub fn paused(time: f64) -> Self {
        Self {
            time,
            is_playing: false,
        }
    }
}
