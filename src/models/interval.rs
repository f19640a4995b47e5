use serde::{Deserialize, Serialize};

/// A contiguous span of the video the learner actually watched, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchedInterval {
    pub start: f64,
    pub end: f64,
}

impl WatchedInterval {
    pub fn at(time: f64) -> Self {
        Self {
            start: time,
            end: time,
        }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// True when `time` falls inside `[start - epsilon, end + epsilon]`.
    pub fn reaches(&self, time: f64, epsilon: f64) -> bool {
        time >= self.start - epsilon && time <= self.end + epsilon
    }

    /// True when the two intervals overlap or sit within `epsilon` of each other.
    pub fn touches(&self, other: &WatchedInterval, epsilon: f64) -> bool {
        other.start <= self.end + epsilon && self.start <= other.end + epsilon
    }
}
