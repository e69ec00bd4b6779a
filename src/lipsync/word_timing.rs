//! Duration-based visemes from word windows

use super::{MouthEstimator, MouthFrame};

/// Open for the first half of each estimated word window, closed for the
/// second half. This is a timing approximation, not phoneme analysis.
#[derive(Debug, Clone)]
pub struct WordTimingEstimator {
    open: f32,
    closed: f32,
}

impl WordTimingEstimator {
    pub fn new(open: f32, closed: f32) -> Self {
        Self {
            open: open.clamp(0.0, 1.0),
            closed: closed.clamp(0.0, 1.0),
        }
    }
}

impl MouthEstimator for WordTimingEstimator {
    fn name(&self) -> &'static str {
        "word_timing"
    }

    fn next_openness(&mut self, frame: MouthFrame<'_>) -> f32 {
        match frame.words {
            Some((timeline, since)) => timeline.mouth_at(since, self.open, self.closed),
            None => self.closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::FixedSequence;
    use crate::speech::WordTimeline;
    use std::time::Duration;

    #[test]
    fn test_follows_word_windows() {
        let mut estimator = WordTimingEstimator::new(1.0, 0.2);
        let timeline = WordTimeline::new("alpha beta", Duration::from_millis(300));
        let mut rng = FixedSequence::new(vec![0.5]);

        let mut at = |ms: u64| {
            estimator.next_openness(MouthFrame {
                current: 0.0,
                dt: Duration::from_millis(16),
                words: Some((&timeline, Duration::from_millis(ms))),
                rng: &mut rng,
            })
        };
        assert_eq!(at(0), 1.0);
        assert_eq!(at(149), 1.0);
        assert_eq!(at(151), 0.2);
        assert_eq!(at(310), 1.0);
        assert_eq!(at(700), 0.2);
    }

    #[test]
    fn test_without_words_is_closed() {
        let mut estimator = WordTimingEstimator::new(1.0, 0.2);
        let mut rng = FixedSequence::new(vec![0.5]);
        let value = estimator.next_openness(MouthFrame {
            current: 0.7,
            dt: Duration::from_millis(16),
            words: None,
            rng: &mut rng,
        });
        assert_eq!(value, 0.2);
    }
}
