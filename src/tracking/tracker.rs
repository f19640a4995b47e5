use crate::models::{MediaCursor, WatchedInterval};

use super::merge::merge_intervals;

pub const DEFAULT_MERGE_EPSILON_SECS: f64 = 1.0;

/// Folds media cursor samples into merged watched-interval coverage.
///
/// Repeated samples at the same or nearly the same time extend an existing
/// interval instead of adding time, so high-frequency time updates never
/// double count.
#[derive(Debug, Clone)]
pub struct SegmentTracker {
    intervals: Vec<WatchedInterval>,
    epsilon: f64,
}

impl Default for SegmentTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MERGE_EPSILON_SECS)
    }
}

impl SegmentTracker {
    pub fn new(epsilon: f64) -> Self {
        Self {
            intervals: Vec::new(),
            epsilon: epsilon.max(0.0),
        }
    }

    /// Credit `cursor.time` as watched. No-op when the learner is not attentive.
    pub fn record(&mut self, cursor: MediaCursor, attentive: bool) {
        if !attentive || !cursor.time.is_finite() || cursor.time < 0.0 {
            return;
        }

        let time = cursor.time;
        match self
            .intervals
            .iter_mut()
            .find(|interval| interval.reaches(time, self.epsilon))
        {
            Some(interval) => interval.end = interval.end.max(time),
            None => self.intervals.push(WatchedInterval::at(time)),
        }

        let intervals = std::mem::take(&mut self.intervals);
        self.intervals = merge_intervals(intervals, self.epsilon);
    }

    pub fn watched_seconds(&self) -> f64 {
        self.intervals.iter().map(WatchedInterval::length).sum()
    }

    pub fn watched_fraction(&self, duration: f64) -> f64 {
        if !duration.is_finite() || duration <= 0.0 {
            return 0.0;
        }
        (self.watched_seconds() / duration).clamp(0.0, 1.0)
    }

    pub fn intervals(&self) -> &[WatchedInterval] {
        &self.intervals
    }

    pub fn clear(&mut self) {
        self.intervals.clear();
    }
}
