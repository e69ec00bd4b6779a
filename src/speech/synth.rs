//! Speech synthesizer seam and voice selection

use serde::{Deserialize, Serialize};

use crate::config::SpeechConfig;
use crate::error::SpeechError;

use super::{Utterance, UtteranceId};

/// A voice offered by the synthesizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub lang: String,
    /// Whether the platform marks this voice as its default
    #[serde(default)]
    pub default: bool,
}

impl Voice {
    pub fn new(name: &str, lang: &str) -> Self {
        Self {
            name: name.to_string(),
            lang: lang.to_string(),
            default: false,
        }
    }
}

/// The platform text-to-speech facility.
///
/// `speak` must not block: lifecycle progress is reported asynchronously
/// through `SpeechEvent`s. `cancel` stops the in-flight utterance and any
/// timers it owns.
pub trait SpeechSynthesizer {
    fn voices(&self) -> Vec<Voice>;

    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError>;

    fn cancel(&mut self);
}

/// Pick the first voice whose name contains `pattern` (case-insensitive).
///
/// Returns `None`, meaning "use the platform default", when the list is
/// empty, no pattern is configured, or nothing matches.
pub fn select_voice(voices: &[Voice], pattern: Option<&str>) -> Option<Voice> {
    let pattern = pattern?.to_lowercase();
    if voices.is_empty() {
        tracing::info!("No voices available, using the default voice");
        return None;
    }

    let found = voices
        .iter()
        .find(|v| v.name.to_lowercase().contains(&pattern))
        .cloned();
    if found.is_none() {
        tracing::info!("No voice matches '{}', using the default voice", pattern);
    }
    found
}

/// Owns the synthesizer and the per-utterance voice settings
pub struct Narrator<S: SpeechSynthesizer> {
    synth: S,
    voice_pattern: Option<String>,
    rate: f32,
    pitch: f32,
}

impl<S: SpeechSynthesizer> Narrator<S> {
    pub fn new(synth: S, config: &SpeechConfig) -> Self {
        Self {
            synth,
            voice_pattern: config.voice.clone(),
            rate: config.rate,
            pitch: config.pitch,
        }
    }

    /// Build the utterance for `text`, resolving the voice now since the
    /// voice list may only become available after startup.
    pub fn prepare(&self, id: UtteranceId, text: &str) -> Utterance {
        let voices = self.synth.voices();
        Utterance {
            id,
            text: text.to_string(),
            voice: select_voice(&voices, self.voice_pattern.as_deref()),
            rate: self.rate,
            pitch: self.pitch,
        }
    }

    pub fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
        tracing::debug!(
            "Speaking {} with voice {}",
            utterance.id,
            utterance.voice.as_ref().map(|v| v.name.as_str()).unwrap_or("default")
        );
        self.synth.speak(utterance)
    }

    pub fn cancel(&mut self) {
        self.synth.cancel();
    }

    pub fn synth(&self) -> &S {
        &self.synth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voices() -> Vec<Voice> {
        vec![
            Voice::new("Google US English", "en-US"),
            Voice::new("Google UK English Female", "en-GB"),
            Voice::new("Microsoft Zira", "en-US"),
        ]
    }

    #[test]
    fn test_select_by_pattern() {
        let voice = select_voice(&voices(), Some("uk english")).unwrap();
        assert_eq!(voice.name, "Google UK English Female");
        let voice = select_voice(&voices(), Some("ZIRA")).unwrap();
        assert_eq!(voice.lang, "en-US");
    }

    #[test]
    fn test_fallback_to_default() {
        assert!(select_voice(&[], Some("female")).is_none());
        assert!(select_voice(&voices(), Some("klingon")).is_none());
        assert!(select_voice(&voices(), None).is_none());
    }

    struct Mute {
        voices: Vec<Voice>,
        spoken: Vec<UtteranceId>,
        cancels: usize,
    }

    impl SpeechSynthesizer for Mute {
        fn voices(&self) -> Vec<Voice> {
            self.voices.clone()
        }

        fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
            self.spoken.push(utterance.id);
            Ok(())
        }

        fn cancel(&mut self) {
            self.cancels += 1;
        }
    }

    #[test]
    fn test_narrator_prepares_utterance() {
        let config = SpeechConfig {
            voice: Some("female".to_string()),
            rate: 1.25,
            pitch: 0.9,
            ..Default::default()
        };
        let mut narrator = Narrator::new(
            Mute {
                voices: voices(),
                spoken: Vec::new(),
                cancels: 0,
            },
            &config,
        );

        let utterance = narrator.prepare(UtteranceId(3), "hello");
        assert_eq!(utterance.rate, 1.25);
        assert_eq!(utterance.pitch, 0.9);
        assert_eq!(
            utterance.voice.as_ref().map(|v| v.name.as_str()),
            Some("Google UK English Female")
        );

        narrator.speak(&utterance).unwrap();
        narrator.cancel();
        assert_eq!(narrator.synth().spoken, vec![UtteranceId(3)]);
        assert_eq!(narrator.synth().cancels, 1);
    }
}
