use serde::{Deserialize, Serialize};

pub const MAX_ATTENTION_SCORE: u8 = 100;

/// Bounded engagement accumulator in `[0, 100]`. Informational only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttentionScore(u8);

impl Default for AttentionScore {
    fn default() -> Self {
        Self(MAX_ATTENTION_SCORE)
    }
}

impl AttentionScore {
    pub fn new(value: u8) -> Self {
        Self(value.min(MAX_ATTENTION_SCORE))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn reward(&mut self, points: u8) {
        self.0 = self.0.saturating_add(points).min(MAX_ATTENTION_SCORE);
    }

    pub fn penalize(&mut self, points: u8) {
        self.0 = self.0.saturating_sub(points);
    }

    pub fn is_below(&self, threshold: u8) -> bool {
        self.0 < threshold
    }
}
