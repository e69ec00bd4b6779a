//! Speech phase and per-frame speech state

use serde::{Deserialize, Serialize};

/// Speech dimension of the avatar state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechPhase {
    /// Not speaking
    #[default]
    Idle,
    /// An utterance is being spoken
    Speaking,
}

impl std::fmt::Display for SpeechPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechPhase::Idle => write!(f, "idle"),
            SpeechPhase::Speaking => write!(f, "speaking"),
        }
    }
}

/// Speech activity as seen by the drive loop
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeechState {
    active: bool,
    /// Mouth open amount (0.0 - 1.0)
    mouth_openness: f32,
}

impl SpeechState {
    /// Whether an utterance is currently being spoken
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Get the mouth open amount
    pub fn mouth_openness(&self) -> f32 {
        self.mouth_openness
    }

    /// Create a new state with the speaking flag changed
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Create a new state with mouth openness, clamped to [0, 1]
    pub fn with_mouth_openness(mut self, value: f32) -> Self {
        self.mouth_openness = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }
}
