pub mod merge;
pub mod tracker;

pub use tracker::SegmentTracker;
