//! Audio-energy lip sync

use super::{MouthEstimator, MouthFrame};

const SILENCE_DB: f32 = -100.0;

/// Maps smoothed RMS energy of the played-back audio onto mouth openness.
///
/// Energy at or below `floor_db` closes the mouth, energy at or above
/// `ceiling_db` opens it fully, linear in between.
#[derive(Debug, Clone)]
pub struct AmplitudeEstimator {
    floor_db: f32,
    ceiling_db: f32,
    smoothing_factor: f32,
    smoothed_db: f32,
}

impl AmplitudeEstimator {
    pub fn new(floor_db: f32, ceiling_db: f32, smoothing_factor: f32) -> Self {
        Self {
            floor_db,
            ceiling_db,
            smoothing_factor: smoothing_factor.clamp(0.0, 1.0),
            smoothed_db: SILENCE_DB,
        }
    }

    pub fn energy_db(&self) -> f32 {
        self.smoothed_db
    }

    fn openness(&self) -> f32 {
        let span = self.ceiling_db - self.floor_db;
        if span <= 0.0 {
            return if self.smoothed_db >= self.ceiling_db { 1.0 } else { 0.0 };
        }
        ((self.smoothed_db - self.floor_db) / span).clamp(0.0, 1.0)
    }
}

fn rms_db(samples: &[f32]) -> f32 {
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    let rms = (sum_sq / samples.len() as f32).sqrt();
    if rms > 0.0 {
        (20.0 * rms.log10()).max(SILENCE_DB)
    } else {
        SILENCE_DB
    }
}

impl MouthEstimator for AmplitudeEstimator {
    fn name(&self) -> &'static str {
        "amplitude"
    }

    fn observe_audio(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let energy_db = rms_db(samples);
        self.smoothed_db = self.smoothing_factor * energy_db
            + (1.0 - self.smoothing_factor) * self.smoothed_db;
    }

    fn next_openness(&mut self, _frame: MouthFrame<'_>) -> f32 {
        self.openness()
    }

    fn reset(&mut self) {
        self.smoothed_db = SILENCE_DB;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::FixedSequence;
    use std::time::Duration;

    fn openness(estimator: &mut AmplitudeEstimator) -> f32 {
        let mut rng = FixedSequence::new(vec![0.5]);
        estimator.next_openness(MouthFrame {
            current: 0.0,
            dt: Duration::from_millis(16),
            words: None,
            rng: &mut rng,
        })
    }

    #[test]
    fn test_silence_keeps_mouth_closed() {
        let mut estimator = AmplitudeEstimator::new(-50.0, -10.0, 0.3);
        estimator.observe_audio(&[0.0; 512]);
        assert_eq!(openness(&mut estimator), 0.0);
    }

    #[test]
    fn test_loud_signal_opens_mouth() {
        let mut estimator = AmplitudeEstimator::new(-50.0, -10.0, 0.3);
        let speech: Vec<f32> = (0..512).map(|i| (i as f32 * 0.1).sin() * 0.5).collect();
        // smoothed energy starts at -100 dB and needs several blocks to climb
        for _ in 0..30 {
            estimator.observe_audio(&speech);
        }
        assert_eq!(openness(&mut estimator), 1.0);
    }

    #[test]
    fn test_mid_level_is_proportional() {
        let mut estimator = AmplitudeEstimator::new(-50.0, -10.0, 1.0);
        // constant 0.01 amplitude is -40 dB
        estimator.observe_audio(&[0.01; 256]);
        assert!((estimator.energy_db() + 40.0).abs() < 0.01);
        assert!((openness(&mut estimator) - 0.25).abs() < 0.01);
    }

    #[test]
    fn test_reset_forgets_energy() {
        let mut estimator = AmplitudeEstimator::new(-50.0, -10.0, 1.0);
        estimator.observe_audio(&[0.5; 128]);
        assert!(openness(&mut estimator) > 0.9);
        estimator.reset();
        assert_eq!(openness(&mut estimator), 0.0);
    }
}
