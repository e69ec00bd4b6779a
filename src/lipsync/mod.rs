//! Mouth-openness estimation
//!
//! Three interchangeable strategies sit behind `MouthEstimator`:
//! - `jitter`: smoothed pseudo-random flapping
//! - `word_timing`: open/closed halves of estimated word windows
//! - `amplitude`: energy of the audio being played
//!
//! Estimators are only consulted while speaking. Idle frames go through
//! `release` instead.

pub mod amplitude;
pub mod jitter;
pub mod word_timing;

use std::time::Duration;

use crate::config::{LipSyncConfig, LipSyncStrategy, MouthRelease};
use crate::random::RandomSource;
use crate::speech::WordTimeline;

pub use amplitude::AmplitudeEstimator;
pub use jitter::JitterEstimator;
pub use word_timing::WordTimingEstimator;

/// Below this the decay policy snaps the mouth shut
const CLOSED_EPSILON: f32 = 0.01;

/// Inputs available to an estimator for one frame
pub struct MouthFrame<'a> {
    /// Openness published last frame
    pub current: f32,
    pub dt: Duration,
    /// Word windows of the current utterance and time since it started
    pub words: Option<(&'a WordTimeline, Duration)>,
    pub rng: &'a mut dyn RandomSource,
}

/// Produces the mouth openness for a speaking frame
pub trait MouthEstimator {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Openness in [0, 1] for this frame
    fn next_openness(&mut self, frame: MouthFrame<'_>) -> f32;

    /// Feed a block of mono PCM samples in [-1, 1]
    fn observe_audio(&mut self, _samples: &[f32]) {}

    /// Forget any per-utterance state
    fn reset(&mut self) {}
}

/// Build the estimator selected by configuration
pub fn build_estimator(config: &LipSyncConfig) -> Box<dyn MouthEstimator> {
    match config.strategy {
        LipSyncStrategy::Jitter => Box::new(JitterEstimator::new(config.smoothing_factor)),
        LipSyncStrategy::WordTiming => Box::new(WordTimingEstimator::new(
            config.open_value,
            config.closed_value,
        )),
        LipSyncStrategy::Amplitude => Box::new(AmplitudeEstimator::new(
            config.floor_db,
            config.ceiling_db,
            config.smoothing_factor,
        )),
    }
}

/// One idle frame of mouth release
pub fn release(current: f32, policy: MouthRelease, decay_factor: f32) -> f32 {
    match policy {
        MouthRelease::Reset => 0.0,
        MouthRelease::Decay => {
            let next = current * decay_factor;
            if next < CLOSED_EPSILON {
                0.0
            } else {
                next
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_release() {
        assert_eq!(release(0.8, MouthRelease::Reset, 0.8), 0.0);
    }

    #[test]
    fn test_decay_release_is_bounded() {
        let mut mouth = 1.0;
        let mut frames = 0;
        while mouth > 0.0 {
            mouth = release(mouth, MouthRelease::Decay, 0.8);
            frames += 1;
            assert!(frames <= 25, "mouth still {} after {} frames", mouth, frames);
        }
        // 0.8^21 ≈ 0.009
        assert_eq!(frames, 21);
    }

    #[test]
    fn test_build_estimator() {
        let mut config = LipSyncConfig::default();
        assert_eq!(build_estimator(&config).name(), "jitter");
        config.strategy = LipSyncStrategy::WordTiming;
        assert_eq!(build_estimator(&config).name(), "word_timing");
        config.strategy = LipSyncStrategy::Amplitude;
        assert_eq!(build_estimator(&config).name(), "amplitude");
    }
}
