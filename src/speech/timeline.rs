//! Per-word open/closed windows for duration-based visemes

use std::time::Duration;

use super::word_starts;

/// Splits an utterance into equal word windows. Each window shows an open
/// mouth for its first half and a closed mouth for its second half.
///
/// Boundary events re-anchor the schedule so a synthesizer that runs faster
/// or slower than the estimate stays in step.
#[derive(Debug, Clone, PartialEq)]
pub struct WordTimeline {
    starts: Vec<usize>,
    window: Duration,
    anchor_word: usize,
    anchor_at: Duration,
}

impl WordTimeline {
    pub fn new(text: &str, window: Duration) -> Self {
        Self {
            starts: word_starts(text),
            window,
            anchor_word: 0,
            anchor_at: Duration::ZERO,
        }
    }

    pub fn word_count(&self) -> usize {
        self.starts.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Estimated length of the whole utterance
    pub fn estimated_duration(&self) -> Duration {
        self.window * self.starts.len() as u32
    }

    /// Word index and phase in [0, 1) at `since_start`, or `None` once the
    /// last window is over.
    pub fn position(&self, since_start: Duration) -> Option<(usize, f32)> {
        if self.starts.is_empty() || self.window.is_zero() {
            return None;
        }
        let offset = since_start.saturating_sub(self.anchor_at);
        let windows = offset.as_secs_f64() / self.window.as_secs_f64();
        let index = self.anchor_word + windows.floor() as usize;
        if index >= self.starts.len() {
            return None;
        }
        Some((index, windows.fract() as f32))
    }

    /// Mouth value at `since_start`
    pub fn mouth_at(&self, since_start: Duration, open: f32, closed: f32) -> f32 {
        match self.position(since_start) {
            Some((_, phase)) if phase < 0.5 => open,
            _ => closed,
        }
    }

    /// The synthesizer reported that the word at `char_index` (a UTF-16
    /// offset) began at `since_start`.
    pub fn on_boundary(&mut self, char_index: usize, since_start: Duration) {
        self.anchor_word = self
            .starts
            .iter()
            .rposition(|&s| s <= char_index)
            .unwrap_or(0);
        self.anchor_at = since_start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_open_then_closed_per_word() {
        let timeline = WordTimeline::new("alpha beta gamma", ms(200));
        assert_eq!(timeline.estimated_duration(), ms(600));

        assert_eq!(timeline.mouth_at(ms(0), 1.0, 0.2), 1.0);
        assert_eq!(timeline.mouth_at(ms(90), 1.0, 0.2), 1.0);
        assert_eq!(timeline.mouth_at(ms(110), 1.0, 0.2), 0.2);
        assert_eq!(timeline.mouth_at(ms(210), 1.0, 0.2), 1.0);
        assert_eq!(timeline.mouth_at(ms(350), 1.0, 0.2), 0.2);
        assert_eq!(timeline.position(ms(450)).map(|p| p.0), Some(2));
        // Past the estimate the mouth stays closed.
        assert_eq!(timeline.position(ms(650)), None);
        assert_eq!(timeline.mouth_at(ms(650), 1.0, 0.2), 0.2);
    }

    #[test]
    fn test_boundary_reanchors() {
        let mut timeline = WordTimeline::new("alpha beta gamma", ms(200));
        // The synthesizer is slow: "beta" only begins at 300ms.
        assert_eq!(timeline.position(ms(300)).map(|p| p.0), Some(1));
        timeline.on_boundary(6, ms(300));
        let (word, phase) = timeline.position(ms(300)).unwrap();
        assert_eq!(word, 1);
        assert_eq!(phase, 0.0);
        assert_eq!(timeline.mouth_at(ms(350), 1.0, 0.2), 1.0);
        assert_eq!(timeline.position(ms(500)).map(|p| p.0), Some(2));
    }

    #[test]
    fn test_boundary_mid_word_index() {
        let mut timeline = WordTimeline::new("alpha beta gamma", ms(100));
        timeline.on_boundary(13, ms(40));
        assert_eq!(timeline.position(ms(40)).map(|p| p.0), Some(2));
    }

    #[test]
    fn test_boundary_after_astral_characters() {
        // Two emoji are four UTF-16 units, so "a" starts at 5 and "b" at 7
        let mut timeline = WordTimeline::new("\u{1F600}\u{1F600} a b", ms(100));
        timeline.on_boundary(5, ms(40));
        assert_eq!(timeline.position(ms(40)).map(|p| p.0), Some(1));
        timeline.on_boundary(7, ms(90));
        assert_eq!(timeline.position(ms(90)).map(|p| p.0), Some(2));
    }

    #[test]
    fn test_empty_text() {
        let timeline = WordTimeline::new("   ", ms(100));
        assert_eq!(timeline.word_count(), 0);
        assert_eq!(timeline.estimated_duration(), Duration::ZERO);
        assert_eq!(timeline.mouth_at(ms(10), 1.0, 0.2), 0.2);
    }
}
