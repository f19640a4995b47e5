//! Pluggable attentiveness capability.
//!
//! A real implementation could back this with a camera-based detector. The
//! simulated variant only exists for demos and is not a security boundary.

use rand::{rngs::StdRng, Rng, SeedableRng};

pub trait AttentivenessSignal: Send {
    fn is_attentive(&mut self) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAttentive;

impl AttentivenessSignal for AlwaysAttentive {
    fn is_attentive(&mut self) -> bool {
        true
    }
}

/// Random presence: attentive whenever a uniform draw exceeds `threshold`.
#[derive(Debug, Clone)]
pub struct SimulatedPresence {
    rng: StdRng,
    threshold: f64,
}

impl SimulatedPresence {
    pub fn new(seed: u64, threshold: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            threshold: threshold.clamp(0.0, 1.0),
        }
    }
}

impl AttentivenessSignal for SimulatedPresence {
    fn is_attentive(&mut self) -> bool {
        self.rng.gen::<f64>() > self.threshold
    }
}
