//! Caption pacing: reveal an utterance one word per interval

use std::time::Duration;

/// Word `i` (0-based) becomes visible `i * interval` after the start.
#[derive(Debug, Clone, PartialEq)]
pub struct WordPacer {
    words: Vec<String>,
    interval: Duration,
    shown: usize,
}

impl WordPacer {
    pub fn new(text: &str, interval: Duration) -> Self {
        Self {
            words: text.split_whitespace().map(str::to_string).collect(),
            interval,
            shown: 0,
        }
    }

    /// Time at which word `index` becomes visible
    pub fn reveal_time(&self, index: usize) -> Duration {
        self.interval * index as u32
    }

    /// Number of words visible `elapsed` after the start
    pub fn visible_count(&self, elapsed: Duration) -> usize {
        if self.words.is_empty() {
            return 0;
        }
        if self.interval.is_zero() {
            return self.words.len();
        }
        let revealed = (elapsed.as_nanos() / self.interval.as_nanos()) as usize + 1;
        revealed.min(self.words.len())
    }

    /// Words that became visible since the previous call. A late call returns
    /// every word it passed over, in order.
    pub fn advance(&mut self, elapsed: Duration) -> &[String] {
        let target = self.visible_count(elapsed).max(self.shown);
        let from = self.shown;
        self.shown = target;
        &self.words[from..target]
    }

    /// Visible words joined by spaces
    pub fn visible(&self) -> String {
        self.words[..self.shown].join(" ")
    }

    pub fn is_complete(&self) -> bool {
        self.shown == self.words.len()
    }
}
