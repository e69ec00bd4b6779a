//! Speech lifecycle state machine
//!
//! Idle → Speaking on the start event of the requested utterance.
//! Speaking → Idle on its end or cancel event, on explicit cancellation, or
//! when it outlives its estimated duration (missed end event).
//!
//! Only one utterance is tracked at a time. Requesting a new one drops the
//! old one together with its word windows and caption pacer, and events that
//! still arrive for the old id are ignored.

use std::time::Duration;

use crate::avatar::SpeechPhase;
use crate::config::{LipSyncConfig, SpeechConfig};

use super::pacing::WordPacer;
use super::timeline::WordTimeline;
use super::{SpeechEvent, SpeechEventKind, Utterance, UtteranceId};

/// Why an utterance stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Ended,
    Cancelled,
    TimedOut,
}

/// A phase change the drive loop must react to
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Entered Speaking
    Started { id: UtteranceId, text: String },
    /// Entered Idle
    Stopped { id: UtteranceId, reason: StopReason },
}

#[derive(Debug, Clone)]
struct Tracked {
    id: UtteranceId,
    text: String,
    requested_at: Duration,
    /// Loop time of the start event, `None` while pending
    started_at: Option<Duration>,
    /// Speaking is forced to end after this loop time
    deadline: Duration,
    timeline: WordTimeline,
    pacer: WordPacer,
}

/// Tracks the single in-flight utterance
#[derive(Debug, Clone)]
pub struct SpeechController {
    current: Option<Tracked>,
    next_id: u64,
    word_ms: u64,
    caption_interval: Duration,
    timeout_grace: Duration,
    start_timeout: Duration,
}

impl SpeechController {
    pub fn new(speech: &SpeechConfig, lipsync: &LipSyncConfig) -> Self {
        Self {
            current: None,
            next_id: 1,
            word_ms: lipsync.word_ms,
            caption_interval: Duration::from_millis(speech.caption_interval_ms),
            timeout_grace: Duration::from_millis(speech.timeout_grace_ms),
            start_timeout: Duration::from_millis(speech.start_timeout_ms),
        }
    }

    /// Reserve an id for the next utterance
    pub fn allocate_id(&mut self) -> UtteranceId {
        let id = UtteranceId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn phase(&self) -> SpeechPhase {
        match &self.current {
            Some(t) if t.started_at.is_some() => SpeechPhase::Speaking,
            _ => SpeechPhase::Idle,
        }
    }

    /// Whether an utterance is pending or being spoken
    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_id(&self) -> Option<UtteranceId> {
        self.current.as_ref().map(|t| t.id)
    }

    /// Register a newly requested utterance, dropping any previous one
    pub fn begin(&mut self, utterance: &Utterance, now: Duration) -> Option<Transition> {
        let previous = self.cancel();
        if let Some(Transition::Stopped { id, .. }) = &previous {
            tracing::debug!("{} interrupted by {}", id, utterance.id);
        }

        let window = utterance.word_window(self.word_ms);
        self.current = Some(Tracked {
            id: utterance.id,
            text: utterance.text.clone(),
            requested_at: now,
            started_at: None,
            deadline: now,
            timeline: WordTimeline::new(&utterance.text, window),
            pacer: WordPacer::new(&utterance.text, self.caption_interval),
        });
        previous
    }

    /// Drop the current utterance
    pub fn cancel(&mut self) -> Option<Transition> {
        let tracked = self.current.take()?;
        tracked.started_at.map(|_| Transition::Stopped {
            id: tracked.id,
            reason: StopReason::Cancelled,
        })
    }

    /// Apply a lifecycle event received at loop time `now`
    pub fn handle(&mut self, event: &SpeechEvent, now: Duration) -> Option<Transition> {
        let Some(tracked) = self.current.as_mut() else {
            tracing::trace!("Ignoring {:?} for {}: nothing in flight", event.kind, event.utterance);
            return None;
        };
        if tracked.id != event.utterance {
            tracing::trace!("Ignoring stale {:?} for {}", event.kind, event.utterance);
            return None;
        }

        match event.kind {
            SpeechEventKind::Start => self.start(now),
            SpeechEventKind::Boundary { char_index } => {
                let started = self.start(now);
                if let Some(tracked) = self.current.as_mut() {
                    let since = now.saturating_sub(tracked.started_at.unwrap_or(now));
                    tracked.timeline.on_boundary(char_index, since);
                    // Push the deadline out by the words still to come.
                    let remaining = tracked
                        .timeline
                        .estimated_duration()
                        .saturating_sub(tracked.timeline.window() * word_index(&tracked.timeline, since));
                    tracked.deadline = tracked.deadline.max(now + remaining + self.timeout_grace);
                }
                started
            }
            SpeechEventKind::End => self.stop(StopReason::Ended),
            SpeechEventKind::Cancel => self.stop(StopReason::Cancelled),
        }
    }

    /// Check timeouts at loop time `now`
    pub fn poll(&mut self, now: Duration) -> Option<Transition> {
        let tracked = self.current.as_ref()?;
        match tracked.started_at {
            None => {
                if now.saturating_sub(tracked.requested_at) > self.start_timeout {
                    tracing::warn!("{} never started, dropping it", tracked.id);
                    self.current = None;
                }
                None
            }
            Some(_) if now > tracked.deadline => {
                tracing::warn!("{} missed its end event, forcing idle", tracked.id);
                self.stop(StopReason::TimedOut)
            }
            Some(_) => None,
        }
    }

    /// Word windows of the speaking utterance and the time since it started
    pub fn words(&self, now: Duration) -> Option<(&WordTimeline, Duration)> {
        let tracked = self.current.as_ref()?;
        let started = tracked.started_at?;
        Some((&tracked.timeline, now.saturating_sub(started)))
    }

    /// Reveal caption words due by `now`; returns the newly visible ones
    pub fn advance_caption(&mut self, now: Duration) -> Vec<String> {
        match self.current.as_mut() {
            Some(Tracked {
                started_at: Some(started),
                pacer,
                ..
            }) => pacer.advance(now.saturating_sub(*started)).to_vec(),
            _ => Vec::new(),
        }
    }

    /// Caption text revealed so far
    pub fn caption(&self) -> Option<String> {
        self.current
            .as_ref()
            .filter(|t| t.started_at.is_some())
            .map(|t| t.pacer.visible())
    }

    fn start(&mut self, now: Duration) -> Option<Transition> {
        let tracked = self.current.as_mut()?;
        if tracked.started_at.is_some() {
            return None;
        }
        tracked.started_at = Some(now);
        tracked.deadline = now + tracked.timeline.estimated_duration() + self.timeout_grace;
        Some(Transition::Started {
            id: tracked.id,
            text: tracked.text.clone(),
        })
    }

    fn stop(&mut self, reason: StopReason) -> Option<Transition> {
        let tracked = self.current.take()?;
        tracked.started_at.map(|_| Transition::Stopped {
            id: tracked.id,
            reason,
        })
    }
}

fn word_index(timeline: &WordTimeline, since: Duration) -> u32 {
    timeline
        .position(since)
        .map(|(i, _)| i as u32)
        .unwrap_or(timeline.word_count() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn controller() -> SpeechController {
        let speech = SpeechConfig {
            timeout_grace_ms: 500,
            start_timeout_ms: 1000,
            caption_interval_ms: 150,
            ..Default::default()
        };
        let lipsync = LipSyncConfig {
            word_ms: 200,
            ..Default::default()
        };
        SpeechController::new(&speech, &lipsync)
    }

    fn request(ctl: &mut SpeechController, text: &str, now: Duration) -> UtteranceId {
        let id = ctl.allocate_id();
        ctl.begin(&Utterance::new(id, text), now);
        id
    }

    #[test]
    fn test_start_and_end() {
        let mut ctl = controller();
        let id = request(&mut ctl, "hello there", ms(0));
        assert_eq!(ctl.phase(), SpeechPhase::Idle);
        assert!(ctl.is_busy());

        let t = ctl.handle(&SpeechEvent::new(id, SpeechEventKind::Start), ms(10));
        assert_eq!(
            t,
            Some(Transition::Started {
                id,
                text: "hello there".to_string()
            })
        );
        assert_eq!(ctl.phase(), SpeechPhase::Speaking);

        // Duplicate start is a no-op.
        assert!(ctl.handle(&SpeechEvent::new(id, SpeechEventKind::Start), ms(20)).is_none());

        let t = ctl.handle(&SpeechEvent::new(id, SpeechEventKind::End), ms(300));
        assert_eq!(
            t,
            Some(Transition::Stopped {
                id,
                reason: StopReason::Ended
            })
        );
        assert_eq!(ctl.phase(), SpeechPhase::Idle);
        assert!(!ctl.is_busy());
    }

    #[test]
    fn test_new_utterance_cancels_previous() {
        let mut ctl = controller();
        let first = request(&mut ctl, "one two three", ms(0));
        ctl.handle(&SpeechEvent::new(first, SpeechEventKind::Start), ms(0));

        let second = ctl.allocate_id();
        let t = ctl.begin(&Utterance::new(second, "four five"), ms(100));
        assert_eq!(
            t,
            Some(Transition::Stopped {
                id: first,
                reason: StopReason::Cancelled
            })
        );
        assert_eq!(ctl.current_id(), Some(second));

        // Late events for the first utterance are ignored.
        assert!(ctl.handle(&SpeechEvent::new(first, SpeechEventKind::End), ms(150)).is_none());
        assert!(ctl
            .handle(&SpeechEvent::new(first, SpeechEventKind::Boundary { char_index: 4 }), ms(150))
            .is_none());
        assert_eq!(ctl.current_id(), Some(second));

        ctl.handle(&SpeechEvent::new(second, SpeechEventKind::Start), ms(200));
        let (timeline, since) = ctl.words(ms(250)).unwrap();
        assert_eq!(timeline.word_count(), 2);
        assert_eq!(since, ms(50));
    }

    #[test]
    fn test_cancel_pending_has_no_transition() {
        let mut ctl = controller();
        request(&mut ctl, "never heard", ms(0));
        assert!(ctl.cancel().is_none());
        assert!(!ctl.is_busy());
    }

    #[test]
    fn test_boundary_counts_as_start() {
        let mut ctl = controller();
        let id = request(&mut ctl, "alpha beta", ms(0));
        let t = ctl.handle(
            &SpeechEvent::new(id, SpeechEventKind::Boundary { char_index: 0 }),
            ms(40),
        );
        assert!(matches!(t, Some(Transition::Started { .. })));
        assert_eq!(ctl.phase(), SpeechPhase::Speaking);
    }

    #[test]
    fn test_missed_end_times_out() {
        let mut ctl = controller();
        let id = request(&mut ctl, "alpha beta", ms(0));
        ctl.handle(&SpeechEvent::new(id, SpeechEventKind::Start), ms(0));
        // 2 words * 200ms + 500ms grace
        assert!(ctl.poll(ms(900)).is_none());
        assert_eq!(
            ctl.poll(ms(901)),
            Some(Transition::Stopped {
                id,
                reason: StopReason::TimedOut
            })
        );
        assert_eq!(ctl.phase(), SpeechPhase::Idle);
    }

    #[test]
    fn test_boundary_extends_deadline() {
        let mut ctl = controller();
        let id = request(&mut ctl, "alpha beta", ms(0));
        ctl.handle(&SpeechEvent::new(id, SpeechEventKind::Start), ms(0));
        // A slow synthesizer reaches the second word at 800ms.
        ctl.handle(
            &SpeechEvent::new(id, SpeechEventKind::Boundary { char_index: 6 }),
            ms(800),
        );
        assert!(ctl.poll(ms(1200)).is_none());
        assert!(ctl.poll(ms(1600)).is_some());
    }

    #[test]
    fn test_missed_start_is_dropped() {
        let mut ctl = controller();
        request(&mut ctl, "alpha", ms(0));
        assert!(ctl.poll(ms(1000)).is_none());
        assert!(ctl.is_busy());
        assert!(ctl.poll(ms(1001)).is_none());
        assert!(!ctl.is_busy());
    }

    #[test]
    fn test_caption_follows_start() {
        let mut ctl = controller();
        let id = request(&mut ctl, "alpha beta gamma", ms(0));
        assert!(ctl.advance_caption(ms(500)).is_empty());
        assert!(ctl.caption().is_none());

        ctl.handle(&SpeechEvent::new(id, SpeechEventKind::Start), ms(100));
        assert_eq!(ctl.advance_caption(ms(100)), vec!["alpha".to_string()]);
        assert_eq!(
            ctl.advance_caption(ms(400)),
            vec!["beta".to_string(), "gamma".to_string()]
        );
        assert_eq!(ctl.caption().as_deref(), Some("alpha beta gamma"));
    }
}
