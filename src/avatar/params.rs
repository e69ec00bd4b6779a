//! Animation parameter sets and the coefficient table that derives them

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Head yaw
pub const PARAM_ANGLE_X: &str = "ParamAngleX";
/// Head pitch
pub const PARAM_ANGLE_Y: &str = "ParamAngleY";
/// Head roll
pub const PARAM_ANGLE_Z: &str = "ParamAngleZ";
/// Body lean
pub const PARAM_BODY_ANGLE_X: &str = "ParamBodyAngleX";
pub const PARAM_EYE_BALL_X: &str = "ParamEyeBallX";
pub const PARAM_EYE_BALL_Y: &str = "ParamEyeBallY";
pub const PARAM_MOUTH_OPEN_Y: &str = "ParamMouthOpenY";

/// Which drive input a binding reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputChannel {
    /// Horizontal gaze offset in [-1, 1]
    X,
    /// Vertical gaze offset in [-1, 1]
    Y,
    /// Product of both gaze offsets
    Xy,
    /// Mouth openness in [0, 1]
    Mouth,
}

/// Valid range of a model parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Both bounds are finite and `min <= max`
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Clamp a value into this range. Non-finite values become the in-range
    /// value closest to zero. Never panics, even when the range is invalid.
    pub fn clamp(&self, value: f32) -> f32 {
        let value = if value.is_finite() { value } else { 0.0 };
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// One row of the coefficient table: `id = channel * gain`, limited to `[min, max]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterBinding {
    pub id: String,
    pub channel: InputChannel,
    pub gain: f32,
    pub min: f32,
    pub max: f32,
}

impl ParameterBinding {
    pub fn new(id: &str, channel: InputChannel, gain: f32, min: f32, max: f32) -> Self {
        Self {
            id: id.to_string(),
            channel,
            gain,
            min,
            max,
        }
    }

    /// Fallback range when the model does not declare one
    pub fn range(&self) -> ParamRange {
        ParamRange::new(self.min, self.max)
    }

    /// Evaluate the binding for a gaze vector and mouth openness
    pub fn evaluate(&self, x: f32, y: f32, mouth: f32) -> f32 {
        let input = match self.channel {
            InputChannel::X => x,
            InputChannel::Y => y,
            InputChannel::Xy => x * y,
            InputChannel::Mouth => mouth,
        };
        input * self.gain
    }
}

/// The stock coefficient table for a standard head/eye/body rig.
pub fn default_bindings() -> Vec<ParameterBinding> {
    vec![
        ParameterBinding::new(PARAM_ANGLE_X, InputChannel::X, 30.0, -30.0, 30.0),
        ParameterBinding::new(PARAM_ANGLE_Y, InputChannel::Y, 30.0, -30.0, 30.0),
        ParameterBinding::new(PARAM_ANGLE_Z, InputChannel::Xy, -30.0, -30.0, 30.0),
        ParameterBinding::new(PARAM_BODY_ANGLE_X, InputChannel::X, 10.0, -10.0, 10.0),
        ParameterBinding::new(PARAM_EYE_BALL_X, InputChannel::X, 1.0, -1.0, 1.0),
        ParameterBinding::new(PARAM_EYE_BALL_Y, InputChannel::Y, 1.0, -1.0, 1.0),
        ParameterBinding::new(PARAM_MOUTH_OPEN_Y, InputChannel::Mouth, 1.0, 0.0, 1.0),
    ]
}

/// Named parameter values for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: HashMap<String, f32>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate every binding for the given inputs
    pub fn derive(bindings: &[ParameterBinding], x: f32, y: f32, mouth: f32) -> Self {
        let values = bindings
            .iter()
            .map(|b| (b.id.clone(), b.evaluate(x, y, mouth)))
            .collect();
        Self { values }
    }

    pub fn set(&mut self, id: &str, value: f32) {
        self.values.insert(id.to_string(), value);
    }

    pub fn get(&self, id: &str) -> Option<f32> {
        self.values.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Keep only the ids for which `keep` returns true
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.values.retain(|id, _| keep(id));
    }

    /// Return a copy with every value clamped to the range reported by
    /// `range_of`. Ids without a range are clamped to a non-finite guard only.
    pub fn clamped<F>(&self, range_of: F) -> Self
    where
        F: Fn(&str) -> Option<ParamRange>,
    {
        let values = self
            .values
            .iter()
            .map(|(id, &value)| {
                let value = match range_of(id) {
                    Some(range) => range.clamp(value),
                    None if value.is_finite() => value,
                    None => 0.0,
                };
                (id.clone(), value)
            })
            .collect();
        Self { values }
    }
}
