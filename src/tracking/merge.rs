use crate::models::WatchedInterval;

/// Collapse intervals that overlap or sit within `epsilon` of each other.
/// The result is sorted by start time.
pub fn merge_intervals(mut intervals: Vec<WatchedInterval>, epsilon: f64) -> Vec<WatchedInterval> {
    if intervals.len() < 2 {
        return intervals;
    }

    intervals.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<WatchedInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(current) if current.touches(&interval, epsilon) => {
                current.start = current.start.min(interval.start);
                current.end = current.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }

    merged
}
