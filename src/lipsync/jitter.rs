//! Random-target lip sync

use super::{MouthEstimator, MouthFrame};

/// Eases the mouth toward a fresh random target every frame:
/// `openness += (random - openness) * smoothing`.
#[derive(Debug, Clone)]
pub struct JitterEstimator {
    smoothing: f32,
}

impl JitterEstimator {
    pub fn new(smoothing: f32) -> Self {
        Self {
            smoothing: smoothing.clamp(0.0, 1.0),
        }
    }
}

impl MouthEstimator for JitterEstimator {
    fn name(&self) -> &'static str {
        "jitter"
    }

    fn next_openness(&mut self, frame: MouthFrame<'_>) -> f32 {
        let target = frame.rng.next_f32();
        let next = frame.current + (target - frame.current) * self.smoothing;
        next.clamp(0.0, 1.0)
    }
}
