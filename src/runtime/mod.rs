//! Seams to the rendering host and the rigged model runtime
//!
//! The drive loop only needs a narrow slice of both collaborators; these
//! traits are that slice. `headless` provides in-memory implementations.

pub mod headless;

use std::time::Duration;

use crate::avatar::ParamRange;
use crate::error::ModelError;

pub use headless::{FrameCounter, HeadlessModel};

/// The rigged model runtime
pub trait ModelRuntime {
    /// Set a named parameter for the next update
    fn set_parameter(&mut self, id: &str, value: f32) -> Result<(), ModelError>;

    /// Declared valid range of a parameter, if the model has it
    fn parameter_range(&self, id: &str) -> Option<ParamRange>;

    /// Advance the model's own animation state (physics, blinking, motions)
    fn update(&mut self, dt: Duration);

    /// Natural (unscaled) model size in pixels
    fn natural_size(&self) -> Option<[f32; 2]> {
        None
    }

    /// Expression ids the model ships with
    fn expression_ids(&self) -> Vec<String> {
        Vec::new()
    }

    fn set_expression(&mut self, id: &str) -> Result<(), ModelError>;

    /// Number of motions in a motion group
    fn motion_count(&self, _group: &str) -> usize {
        0
    }

    fn start_motion(&mut self, group: &str, index: usize) -> Result<(), ModelError>;

    /// Whether screen point `(x, y)` falls inside the named hit area
    fn hit_test(&self, _area: &str, _x: f32, _y: f32) -> bool {
        false
    }
}

/// The rendering host
pub trait RenderHost {
    /// Draw the current frame
    fn request_render(&mut self);
}
