use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::error::EngagementError;
use crate::models::CheckpointKind;

/// What happens after a wrong answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RetryPolicy {
    /// The checkpoint stays active and the learner answers again right away.
    #[default]
    InPlace,
    /// The checkpoint goes back to pending and fires again on the next pass
    /// through its trigger window.
    ReArm,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LowAttentionNudge {
    /// Score below which a nudge may fire.
    pub threshold: u8,
    /// Chance per tick that a nudge fires while the score stays low.
    pub probability: f64,
}

impl Default for LowAttentionNudge {
    fn default() -> Self {
        Self {
            threshold: 50,
            probability: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngagementConfig {
    pub required_watch_fraction: f64,
    pub idle_threshold_seconds: u64,
    pub idle_check_interval_seconds: u64,
    pub checkpoint_interval_seconds: f64,
    pub min_checkpoint_count: usize,
    pub checkpoint_kinds: Vec<CheckpointKind>,
    pub retry_policy: RetryPolicy,
    pub auto_resume_on_activity: bool,
    pub merge_epsilon_seconds: f64,
    pub idle_penalty: u8,
    pub correct_reward: u8,
    pub incorrect_penalty: u8,
    pub feedback_dwell_ms: u64,
    pub low_attention_nudge: Option<LowAttentionNudge>,
    pub progress_write_every_ticks: Option<u32>,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            required_watch_fraction: 0.9,
            idle_threshold_seconds: 25,
            idle_check_interval_seconds: 5,
            checkpoint_interval_seconds: 90.0,
            min_checkpoint_count: 1,
            checkpoint_kinds: CheckpointKind::ALL.to_vec(),
            retry_policy: RetryPolicy::InPlace,
            auto_resume_on_activity: false,
            merge_epsilon_seconds: 1.0,
            idle_penalty: 5,
            correct_reward: 5,
            incorrect_penalty: 10,
            feedback_dwell_ms: 2000,
            low_attention_nudge: Some(LowAttentionNudge::default()),
            progress_write_every_ticks: None,
        }
    }
}

impl EngagementConfig {
    pub fn validate(&self) -> Result<(), EngagementError> {
        let fraction = self.required_watch_fraction;
        if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
            return Err(EngagementError::Configuration(format!(
                "requiredWatchFraction must be in (0, 1], got {fraction}"
            )));
        }
        if self.idle_threshold_seconds == 0 {
            return Err(EngagementError::Configuration(
                "idleThresholdSeconds must be greater than zero".into(),
            ));
        }
        if self.idle_check_interval_seconds == 0 {
            return Err(EngagementError::Configuration(
                "idleCheckIntervalSeconds must be greater than zero".into(),
            ));
        }
        let interval = self.checkpoint_interval_seconds;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(EngagementError::Configuration(format!(
                "checkpointIntervalSeconds must be positive, got {interval}"
            )));
        }
        if self.checkpoint_kinds.is_empty() {
            return Err(EngagementError::Configuration(
                "checkpointKinds must name at least one kind".into(),
            ));
        }
        let epsilon = self.merge_epsilon_seconds;
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(EngagementError::Configuration(format!(
                "mergeEpsilonSeconds must be non-negative, got {epsilon}"
            )));
        }
        if let Some(nudge) = &self.low_attention_nudge {
            if !(0.0..=1.0).contains(&nudge.probability) {
                return Err(EngagementError::Configuration(format!(
                    "lowAttentionNudge.probability must be in [0, 1], got {}",
                    nudge.probability
                )));
            }
        }
        if self.progress_write_every_ticks == Some(0) {
            return Err(EngagementError::Configuration(
                "progressWriteEveryTicks must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }
}

/// JSON-backed store for the engagement configuration.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngagementConfig>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            EngagementConfig::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn engagement(&self) -> EngagementConfig {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update_engagement(&self, config: EngagementConfig) -> Result<()> {
        config.validate()?;
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = config;
        self.persist(&guard)
    }

    fn persist(&self, data: &EngagementConfig) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
