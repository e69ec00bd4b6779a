//! Timer-driven stand-in for a platform speech synthesizer
//!
//! Produces the same lifecycle events a real synthesizer would (start, one
//! boundary per word, end) on a tokio task, paced by the estimated word
//! duration. No audio is produced.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::SpeechError;

use super::synth::{SpeechSynthesizer, Voice};
use super::{word_starts, SpeechEvent, SpeechEventKind, Utterance, UtteranceId};

/// Simulated synthesizer. At most one utterance task is alive at a time.
pub struct SimulatedSynth {
    events: mpsc::UnboundedSender<SpeechEvent>,
    voices: Vec<Voice>,
    word_ms: u64,
    task: Option<(UtteranceId, JoinHandle<()>)>,
}

impl SimulatedSynth {
    pub fn new(events: mpsc::UnboundedSender<SpeechEvent>, word_ms: u64) -> Self {
        Self {
            events,
            voices: Vec::new(),
            word_ms,
            task: None,
        }
    }

    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }
}

impl SpeechSynthesizer for SimulatedSynth {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| SpeechError::Unavailable)?;
        if self.events.is_closed() {
            return Err(SpeechError::Synthesis(
                "event receiver has been dropped".to_string(),
            ));
        }
        self.cancel();

        let id = utterance.id;
        let window = utterance.word_window(self.word_ms);
        let starts = word_starts(&utterance.text);
        let events = self.events.clone();

        let task = handle.spawn(async move {
            let send = |kind| events.send(SpeechEvent::new(id, kind)).is_ok();

            if !send(SpeechEventKind::Start) {
                return;
            }
            for (i, char_index) in starts.into_iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(window).await;
                }
                if !send(SpeechEventKind::Boundary { char_index }) {
                    return;
                }
            }
            tokio::time::sleep(window).await;
            send(SpeechEventKind::End);
        });

        self.task = Some((id, task));
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some((id, task)) = self.task.take() {
            if !task.is_finished() {
                task.abort();
                tracing::debug!("Cancelled {}", id);
                let _ = self.events.send(SpeechEvent::new(id, SpeechEventKind::Cancel));
            }
        }
    }
}

impl Drop for SimulatedSynth {
    fn drop(&mut self) {
        if let Some((_, task)) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    async fn collect_until_end(
        rx: &mut mpsc::UnboundedReceiver<SpeechEvent>,
        id: UtteranceId,
    ) -> Vec<(SpeechEvent, Duration)> {
        let start = Instant::now();
        let mut out = Vec::new();
        while let Some(event) = rx.recv().await {
            out.push((event, start.elapsed()));
            if event.utterance == id && event.kind == SpeechEventKind::End {
                break;
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut synth = SimulatedSynth::new(tx, 100);
        let id = UtteranceId(1);
        synth.speak(&Utterance::new(id, "alpha beta gamma")).unwrap();

        let events = collect_until_end(&mut rx, id).await;
        let kinds: Vec<_> = events.iter().map(|(e, _)| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SpeechEventKind::Start,
                SpeechEventKind::Boundary { char_index: 0 },
                SpeechEventKind::Boundary { char_index: 6 },
                SpeechEventKind::Boundary { char_index: 11 },
                SpeechEventKind::End,
            ]
        );
        assert_eq!(events[3].1, Duration::from_millis(200));
        assert_eq!(events[4].1, Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_utterance_cancels_old_timers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut synth = SimulatedSynth::new(tx, 100);
        let first = UtteranceId(1);
        let second = UtteranceId(2);

        synth.speak(&Utterance::new(first, "one two three four")).unwrap();
        assert_eq!(rx.recv().await.unwrap().kind, SpeechEventKind::Start);
        assert_eq!(
            rx.recv().await.unwrap().kind,
            SpeechEventKind::Boundary { char_index: 0 }
        );

        synth.speak(&Utterance::new(second, "five six")).unwrap();
        let events = collect_until_end(&mut rx, second).await;

        assert_eq!(
            events[0].0,
            SpeechEvent::new(first, SpeechEventKind::Cancel)
        );
        assert!(events[1..].iter().all(|(e, _)| e.utterance == second));

        // Nothing from the first utterance arrives after its cancel.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_speak_without_listener_fails() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut synth = SimulatedSynth::new(tx, 100);
        drop(rx);
        assert!(matches!(
            synth.speak(&Utterance::new(UtteranceId(1), "hi")),
            Err(SpeechError::Synthesis(_))
        ));
    }

    #[test]
    fn test_speak_without_runtime_is_unavailable() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut synth = SimulatedSynth::new(tx, 100);
        assert_eq!(
            synth.speak(&Utterance::new(UtteranceId(1), "hi")),
            Err(SpeechError::Unavailable)
        );
    }
}
