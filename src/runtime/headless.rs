//! In-memory model runtime and render host
//!
//! Used by the CLI host and by tests. The model validates every write the
//! way a strict runtime would: unknown ids and out-of-range values are
//! rejected rather than silently stored.

use std::collections::HashMap;
use std::time::Duration;

use crate::avatar::params::{
    ParamRange, PARAM_ANGLE_X, PARAM_ANGLE_Y, PARAM_ANGLE_Z, PARAM_BODY_ANGLE_X,
    PARAM_EYE_BALL_X, PARAM_EYE_BALL_Y, PARAM_MOUTH_OPEN_Y,
};
use crate::error::ModelError;

use super::{ModelRuntime, RenderHost};

/// Axis-aligned screen rectangle: x, y, width, height
pub type HitRect = [f32; 4];

/// A rigged model that only keeps its parameter table in memory
#[derive(Debug, Clone)]
pub struct HeadlessModel {
    ranges: HashMap<String, ParamRange>,
    values: HashMap<String, f32>,
    size: [f32; 2],
    expressions: Vec<String>,
    expression: Option<String>,
    motions: HashMap<String, usize>,
    motion: Option<(String, usize)>,
    hit_areas: HashMap<String, HitRect>,
    elapsed: Duration,
    updates: u64,
}

impl Default for HeadlessModel {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessModel {
    /// A model with the standard head/eye/body/mouth parameters
    pub fn new() -> Self {
        let mut ranges = HashMap::new();
        for id in [PARAM_ANGLE_X, PARAM_ANGLE_Y, PARAM_ANGLE_Z] {
            ranges.insert(id.to_string(), ParamRange::new(-30.0, 30.0));
        }
        ranges.insert(PARAM_BODY_ANGLE_X.to_string(), ParamRange::new(-10.0, 10.0));
        ranges.insert(PARAM_EYE_BALL_X.to_string(), ParamRange::new(-1.0, 1.0));
        ranges.insert(PARAM_EYE_BALL_Y.to_string(), ParamRange::new(-1.0, 1.0));
        ranges.insert(PARAM_MOUTH_OPEN_Y.to_string(), ParamRange::new(0.0, 1.0));

        Self {
            ranges,
            values: HashMap::new(),
            size: [1800.0, 2400.0],
            expressions: Vec::new(),
            expression: None,
            motions: HashMap::new(),
            motion: None,
            hit_areas: HashMap::new(),
            elapsed: Duration::ZERO,
            updates: 0,
        }
    }

    /// Declare (or narrow) a parameter range
    pub fn with_parameter(mut self, id: &str, range: ParamRange) -> Self {
        self.ranges.insert(id.to_string(), range);
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = [width, height];
        self
    }

    pub fn with_expressions(mut self, ids: &[&str]) -> Self {
        self.expressions = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_motions(mut self, group: &str, count: usize) -> Self {
        self.motions.insert(group.to_string(), count);
        self
    }

    pub fn with_hit_area(mut self, name: &str, rect: HitRect) -> Self {
        self.hit_areas.insert(name.to_string(), rect);
        self
    }

    /// Last value written to a parameter
    pub fn value(&self, id: &str) -> Option<f32> {
        self.values.get(id).copied()
    }

    /// Current expression
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// Most recently started motion
    pub fn motion(&self) -> Option<(&str, usize)> {
        self.motion.as_ref().map(|(g, i)| (g.as_str(), *i))
    }

    /// Total time advanced through `update`
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of `update` calls
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

impl ModelRuntime for HeadlessModel {
    fn set_parameter(&mut self, id: &str, value: f32) -> Result<(), ModelError> {
        let range = self
            .ranges
            .get(id)
            .ok_or_else(|| ModelError::UnknownParameter(id.to_string()))?;
        if !range.contains(value) {
            return Err(ModelError::Rejected {
                id: id.to_string(),
                value,
            });
        }
        tracing::trace!("{} = {:.3}", id, value);
        self.values.insert(id.to_string(), value);
        Ok(())
    }

    fn parameter_range(&self, id: &str) -> Option<ParamRange> {
        self.ranges.get(id).copied()
    }

    fn update(&mut self, dt: Duration) {
        self.elapsed += dt;
        self.updates += 1;
    }

    fn natural_size(&self) -> Option<[f32; 2]> {
        Some(self.size)
    }

    fn expression_ids(&self) -> Vec<String> {
        self.expressions.clone()
    }

    fn set_expression(&mut self, id: &str) -> Result<(), ModelError> {
        // The neutral pose is always available even if not listed.
        if !self.expressions.is_empty() && !self.expressions.iter().any(|e| e == id) {
            return Err(ModelError::UnknownExpression(id.to_string()));
        }
        self.expression = Some(id.to_string());
        Ok(())
    }

    fn motion_count(&self, group: &str) -> usize {
        self.motions.get(group).copied().unwrap_or(0)
    }

    fn start_motion(&mut self, group: &str, index: usize) -> Result<(), ModelError> {
        if index >= self.motion_count(group) {
            return Err(ModelError::UnknownMotion {
                group: group.to_string(),
                index,
            });
        }
        self.motion = Some((group.to_string(), index));
        Ok(())
    }

    fn hit_test(&self, area: &str, x: f32, y: f32) -> bool {
        self.hit_areas
            .get(area)
            .map(|&[rx, ry, w, h]| x >= rx && x <= rx + w && y >= ry && y <= ry + h)
            .unwrap_or(false)
    }
}

/// Render host that only counts frames
#[derive(Debug, Clone, Default)]
pub struct FrameCounter {
    frames: u64,
}

impl FrameCounter {
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl RenderHost for FrameCounter {
    fn request_render(&mut self) {
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range() {
        let mut model = HeadlessModel::new();
        assert!(model.set_parameter(PARAM_ANGLE_X, 12.0).is_ok());
        assert_eq!(model.value(PARAM_ANGLE_X), Some(12.0));
        assert_eq!(
            model.set_parameter(PARAM_ANGLE_X, 31.0),
            Err(ModelError::Rejected {
                id: PARAM_ANGLE_X.to_string(),
                value: 31.0
            })
        );
        assert_eq!(model.value(PARAM_ANGLE_X), Some(12.0));
        assert!(matches!(
            model.set_parameter("ParamTail", 0.0),
            Err(ModelError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_expressions_and_motions() {
        let mut model = HeadlessModel::new()
            .with_expressions(&["happy", "sad", "neutral"])
            .with_motions("Idle", 2);
        assert!(model.set_expression("happy").is_ok());
        assert_eq!(model.expression(), Some("happy"));
        assert!(model.set_expression("angry").is_err());

        assert!(model.start_motion("Idle", 1).is_ok());
        assert_eq!(model.motion(), Some(("Idle", 1)));
        assert!(model.start_motion("Idle", 2).is_err());
        assert!(model.start_motion("TapBody", 0).is_err());
    }

    #[test]
    fn test_hit_areas() {
        let model = HeadlessModel::new().with_hit_area("Head", [100.0, 50.0, 80.0, 60.0]);
        assert!(model.hit_test("Head", 120.0, 70.0));
        assert!(!model.hit_test("Head", 90.0, 70.0));
        assert!(!model.hit_test("Body", 120.0, 70.0));
    }

    #[test]
    fn test_frame_counter() {
        let mut host = FrameCounter::default();
        host.request_render();
        host.request_render();
        assert_eq!(host.frames(), 2);
    }
}
