//! Speech activity
//!
//! Utterance lifecycle events from a speech synthesizer drive a small
//! Idle/Speaking state machine. Word windows feed duration-based visemes and
//! a caption pacer reveals the text one word at a time.

pub mod controller;
pub mod pacing;
pub mod simulated;
pub mod synth;
pub mod timeline;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use controller::{SpeechController, StopReason, Transition};
pub use pacing::WordPacer;
pub use simulated::SimulatedSynth;
pub use synth::{select_voice, Narrator, SpeechSynthesizer, Voice};
pub use timeline::WordTimeline;

/// Identifies one utterance across its lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

impl std::fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "utterance#{}", self.0)
    }
}

/// A request to speak some text
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    /// `None` selects the platform default voice
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
}

impl Utterance {
    pub fn new(id: UtteranceId, text: &str) -> Self {
        Self {
            id,
            text: text.to_string(),
            voice: None,
            rate: 1.0,
            pitch: 1.0,
        }
    }

    /// Length of one word window at this utterance's rate
    pub fn word_window(&self, word_ms: u64) -> Duration {
        let rate = if self.rate > 0.0 { self.rate } else { 1.0 };
        let nanos = word_ms as f64 * 1_000_000.0 / f64::from(rate);
        Duration::from_nanos(nanos.round() as u64)
    }
}

/// What happened to an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum SpeechEventKind {
    Start,
    /// A word began at this offset into the text, counted in UTF-16 code
    /// units as platform synthesizers report it
    Boundary { char_index: usize },
    End,
    Cancel,
}

/// Lifecycle callback from the synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechEvent {
    pub utterance: UtteranceId,
    pub kind: SpeechEventKind,
}

impl SpeechEvent {
    pub fn new(utterance: UtteranceId, kind: SpeechEventKind) -> Self {
        Self { utterance, kind }
    }
}

/// UTF-16 offset of the first character of every word, in the same unit as
/// [`SpeechEventKind::Boundary`]
pub fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut in_word = false;
    let mut offset = 0;
    for c in text.chars() {
        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            starts.push(offset);
            in_word = true;
        }
        offset += c.len_utf16();
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_starts() {
        assert_eq!(word_starts("alpha beta gamma"), vec![0, 6, 11]);
        assert_eq!(word_starts("  two   words "), vec![2, 8]);
        assert!(word_starts("   ").is_empty());
    }

    #[test]
    fn test_word_starts_count_utf16_units() {
        // The emoji takes two UTF-16 units
        assert_eq!(word_starts("\u{1F600} hi there"), vec![0, 3, 6]);
        assert_eq!(word_starts("café au lait"), vec![0, 5, 8]);
    }

    #[test]
    fn test_word_window_scales_with_rate() {
        let mut utterance = Utterance::new(UtteranceId(1), "hello");
        assert_eq!(utterance.word_window(300), Duration::from_millis(300));
        utterance.rate = 2.0;
        assert_eq!(utterance.word_window(300), Duration::from_millis(150));
        utterance.rate = 0.0;
        assert_eq!(utterance.word_window(300), Duration::from_millis(300));
    }
}
