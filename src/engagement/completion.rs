use crate::models::Checkpoint;

/// Fractions this close to the threshold count as reaching it.
const FRACTION_TOLERANCE: f64 = 1e-9;

/// Completion predicate: enough of the video watched and every scheduled
/// checkpoint answered correctly.
#[derive(Debug, Clone, Copy)]
pub struct CompletionEvaluator {
    required_fraction: f64,
}

impl CompletionEvaluator {
    pub fn new(required_fraction: f64) -> Self {
        Self { required_fraction }
    }

    pub fn required_fraction(&self) -> f64 {
        self.required_fraction
    }

    pub fn is_satisfied(&self, watched_fraction: f64, checkpoints: &[Checkpoint]) -> bool {
        watched_fraction + FRACTION_TOLERANCE >= self.required_fraction
            && checkpoints.iter().all(|checkpoint| checkpoint.completed)
    }
}
