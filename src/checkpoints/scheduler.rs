use rand::Rng;
use uuid::Uuid;

use crate::error::{EngagementError, Result};
use crate::models::{Checkpoint, CheckpointKind, LessonContext};
use crate::settings::EngagementConfig;

use super::content::{payload_or_fallback, ContentProvider};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Checkpoints live inside `[LEAD_IN, LEAD_OUT]` of the video.
const LEAD_IN_FRACTION: f64 = 0.1;
const LEAD_OUT_FRACTION: f64 = 0.9;

/// Offset cap inside each segment, as a fraction of the segment size.
const MAX_OFFSET_FRACTION: f64 = 0.6;

/// Smallest segment that still keeps neighbouring checkpoints at least one
/// trigger window apart: `(1 - MAX_OFFSET_FRACTION) * size >= 1s`.
const MIN_SEGMENT_SECS: f64 = 2.5;

/// Generates a session's randomized checkpoint set from the video duration.
#[derive(Debug, Clone)]
pub struct CheckpointScheduler {
    interval_seconds: f64,
    min_count: usize,
    kinds: Vec<CheckpointKind>,
}

impl CheckpointScheduler {
    pub fn new(interval_seconds: f64, min_count: usize, kinds: Vec<CheckpointKind>) -> Result<Self> {
        if !interval_seconds.is_finite() || interval_seconds <= 0.0 {
            return Err(EngagementError::Configuration(format!(
                "checkpoint interval must be positive, got {interval_seconds}"
            )));
        }
        if kinds.is_empty() {
            return Err(EngagementError::Configuration(
                "checkpoint kind registry is empty".into(),
            ));
        }

        Ok(Self {
            interval_seconds,
            min_count,
            kinds,
        })
    }

    pub fn from_config(config: &EngagementConfig) -> Result<Self> {
        Self::new(
            config.checkpoint_interval_seconds,
            config.min_checkpoint_count,
            config.checkpoint_kinds.clone(),
        )
    }

    /// Number of checkpoints for a video of `duration` seconds.
    pub fn count_for(&self, duration: f64) -> usize {
        let requested = (duration / self.interval_seconds).floor() as usize + self.min_count;
        let usable = duration * (LEAD_OUT_FRACTION - LEAD_IN_FRACTION);
        let ceiling = (usable / MIN_SEGMENT_SECS).floor() as usize;
        requested.min(ceiling)
    }

    /// Place one checkpoint per equal segment of `[0.1 D, 0.9 D]`, at a random
    /// offset below 60% of the segment size.
    pub fn generate<R: Rng>(
        &self,
        duration: f64,
        rng: &mut R,
        content: &dyn ContentProvider,
        lesson: &LessonContext,
    ) -> Result<Vec<Checkpoint>> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(EngagementError::Configuration(format!(
                "video duration must be positive and finite, got {duration}"
            )));
        }

        let count = self.count_for(duration);
        if count == 0 {
            log_info!("No checkpoints scheduled for {:.1}s video", duration);
            return Ok(Vec::new());
        }

        let span_start = duration * LEAD_IN_FRACTION;
        let span_end = duration * LEAD_OUT_FRACTION;
        let segment = (span_end - span_start) / count as f64;

        let checkpoints: Vec<Checkpoint> = (0..count)
            .map(|index| {
                let segment_start = span_start + segment * index as f64;
                let offset = rng.gen::<f64>() * MAX_OFFSET_FRACTION * segment;
                let kind = self.kinds[rng.gen_range(0..self.kinds.len())];
                let payload = payload_or_fallback(content, kind, lesson);
                Checkpoint::new(Uuid::new_v4().to_string(), segment_start + offset, kind, payload)
            })
            .collect();

        log_info!(
            "Scheduled {} checkpoints for lesson {} ({:.1}s): {:?}",
            checkpoints.len(),
            lesson.lesson_id,
            duration,
            checkpoints
                .iter()
                .map(|cp| format!("{:.1}s {}", cp.trigger_time, cp.kind.as_str()))
                .collect::<Vec<_>>()
        );

        Ok(checkpoints)
    }
}
