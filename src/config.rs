//! Configuration parsing and management for rigdrive

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::avatar::expression::KeywordRule;
use crate::avatar::params::{default_bindings, ParameterBinding};
use crate::error::{ConfigError, RigdriveError};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub frame: FrameConfig,
    pub viewport: ViewportConfig,
    pub placement: PlacementConfig,
    pub interaction: InteractionConfig,
    pub bindings: Vec<ParameterBinding>,
    pub lipsync: LipSyncConfig,
    pub speech: SpeechConfig,
    pub expression: ExpressionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            viewport: ViewportConfig::default(),
            placement: PlacementConfig::default(),
            interaction: InteractionConfig::default(),
            bindings: default_bindings(),
            lipsync: LipSyncConfig::default(),
            speech: SpeechConfig::default(),
            expression: ExpressionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RigdriveError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> Result<Self, RigdriveError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, RigdriveError> {
        let paths = [
            PathBuf::from("rigdrive.toml"),
            PathBuf::from("config/rigdrive.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RigdriveError> {
        if self.frame.fps == 0 {
            return Err(invalid("frame.fps", "Frame rate must be greater than 0"));
        }

        if self.viewport.width <= 0.0 || self.viewport.height <= 0.0 {
            return Err(invalid("viewport", "Viewport dimensions must be positive"));
        }

        if self.placement.model_size[0] <= 0.0 || self.placement.model_size[1] <= 0.0 {
            return Err(invalid(
                "placement.model_size",
                "Model dimensions must be positive",
            ));
        }

        if self.placement.scale <= 0.0 {
            return Err(invalid("placement.scale", "Scale must be greater than 0"));
        }

        let mut seen = HashSet::new();
        for binding in &self.bindings {
            if !seen.insert(binding.id.as_str()) {
                return Err(invalid(
                    "bindings",
                    &format!("Duplicate parameter id: {}", binding.id),
                ));
            }
            if !binding.range().is_valid() {
                return Err(invalid(
                    "bindings",
                    &format!("{}: min and max must be finite and min must not exceed max", binding.id),
                ));
            }
            if !binding.gain.is_finite() {
                return Err(invalid(
                    "bindings",
                    &format!("{}: gain must be finite", binding.id),
                ));
            }
        }

        let lipsync = &self.lipsync;
        if !(lipsync.smoothing_factor > 0.0 && lipsync.smoothing_factor <= 1.0) {
            return Err(invalid(
                "lipsync.smoothing_factor",
                "Smoothing factor must be in (0.0, 1.0]",
            ));
        }
        if !(0.0..1.0).contains(&lipsync.decay_factor) {
            return Err(invalid(
                "lipsync.decay_factor",
                "Decay factor must be in [0.0, 1.0)",
            ));
        }
        if !(0.0..=1.0).contains(&lipsync.open_value) || !(0.0..=1.0).contains(&lipsync.closed_value)
        {
            return Err(invalid(
                "lipsync.open_value",
                "Open and closed values must be between 0.0 and 1.0",
            ));
        }
        if lipsync.word_ms == 0 {
            return Err(invalid("lipsync.word_ms", "Word duration must be greater than 0"));
        }
        if lipsync.floor_db >= lipsync.ceiling_db {
            return Err(invalid(
                "lipsync.floor_db",
                "Floor must be below ceiling",
            ));
        }

        if self.speech.rate <= 0.0 {
            return Err(invalid("speech.rate", "Speech rate must be greater than 0"));
        }
        if self.speech.caption_interval_ms == 0 {
            return Err(invalid(
                "speech.caption_interval_ms",
                "Caption interval must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> RigdriveError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Frame scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Target frames per second for the host ticker
    pub fps: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { fps: 60 }
    }
}

/// Rendering surface size in screen pixels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Where and how large the model is drawn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Model height as a fraction of the viewport height
    pub scale: f32,
    /// Anchor point within the model (0.5, 0.5 = centre)
    pub anchor: [f32; 2],
    /// Anchor position as a fraction of the viewport
    pub position: [f32; 2],
    /// Extra screen-space offset in pixels
    pub offset: [f32; 2],
    /// Natural model size, used when the runtime does not report one
    pub model_size: [f32; 2],
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            scale: 0.9,
            anchor: [0.5, 0.5],
            position: [0.25, 0.5],
            offset: [0.0, 0.0],
            model_size: [1800.0, 2400.0],
        }
    }
}

/// Pointer interaction with the model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Hit area that triggers a random expression
    pub head_area: String,
    /// Hit area that triggers a random motion
    pub body_area: String,
    /// Motion group played on body taps
    pub tap_motion_group: String,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            head_area: "Head".to_string(),
            body_area: "Body".to_string(),
            tap_motion_group: "Idle".to_string(),
        }
    }
}

/// Mouth-openness estimator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LipSyncStrategy {
    /// Smoothed pseudo-random flapping
    #[default]
    Jitter,
    /// Open/closed windows per estimated word
    WordTiming,
    /// Audio block energy
    Amplitude,
}

impl std::str::FromStr for LipSyncStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jitter" | "random" => Ok(Self::Jitter),
            "word_timing" | "words" | "timing" => Ok(Self::WordTiming),
            "amplitude" | "audio" | "energy" => Ok(Self::Amplitude),
            other => Err(ConfigError::InvalidValue {
                field: "lipsync.strategy".to_string(),
                message: format!("unknown strategy '{}'", other),
            }),
        }
    }
}

/// What happens to the mouth when speech stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouthRelease {
    /// Snap shut on entry to idle
    #[default]
    Reset,
    /// Multiply by `decay_factor` every idle frame
    Decay,
}

/// Lip sync tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LipSyncConfig {
    pub strategy: LipSyncStrategy,
    pub release: MouthRelease,
    /// Exponential smoothing factor for jitter and amplitude strategies
    pub smoothing_factor: f32,
    /// Per-frame multiplier used by the decay release policy
    pub decay_factor: f32,
    /// Mouth value for the first half of a word window
    pub open_value: f32,
    /// Mouth value for the second half of a word window
    pub closed_value: f32,
    /// Estimated duration of one word at rate 1.0
    pub word_ms: u64,
    /// Energy mapped to a closed mouth
    pub floor_db: f32,
    /// Energy mapped to a fully open mouth
    pub ceiling_db: f32,
}

impl Default for LipSyncConfig {
    fn default() -> Self {
        Self {
            strategy: LipSyncStrategy::Jitter,
            release: MouthRelease::Reset,
            smoothing_factor: 0.35,
            decay_factor: 0.8,
            open_value: 1.0,
            closed_value: 0.2,
            word_ms: 350,
            floor_db: -50.0,
            ceiling_db: -10.0,
        }
    }
}

/// Speech synthesis and lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Case-insensitive substring of the preferred voice name
    pub voice: Option<String>,
    pub rate: f32,
    pub pitch: f32,
    /// Slack added to the estimated duration before a speaking state times out
    pub timeout_grace_ms: u64,
    /// How long a requested utterance may wait for its start event
    pub start_timeout_ms: u64,
    /// Caption pacing, one word per interval
    pub caption_interval_ms: u64,
    /// Motion group played once when speech starts
    pub gesture_group: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice: None,
            rate: 1.0,
            pitch: 1.0,
            timeout_grace_ms: 1500,
            start_timeout_ms: 2000,
            caption_interval_ms: 150,
            gesture_group: None,
        }
    }
}

/// How an expression is chosen when speech starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionMode {
    #[default]
    Keyword,
    Random,
    Off,
}

/// Expression selection rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    pub mode: ExpressionMode,
    /// Expression restored when speech ends and used when nothing matches
    pub neutral: String,
    /// Ordered keyword rules, first match wins
    pub rules: Vec<KeywordRule>,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            mode: ExpressionMode::Keyword,
            neutral: "neutral".to_string(),
            rules: vec![
                KeywordRule::new("happy", &["thank you", "thanks"]),
                KeywordRule::new("sad", &["sorry"]),
            ],
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("rigdrive");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/rigdrive");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/rigdrive");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("rigdrive");
        }
    }

    PathBuf::from(".")
}
