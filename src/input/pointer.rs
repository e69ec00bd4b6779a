//! Pointer and drag tracking

use super::layout::ModelLayout;

/// Normalized pointer input as read by the drive loop
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    /// Horizontal offset in [-1, 1]
    pub normalized_x: f32,
    /// Vertical offset in [-1, 1]
    pub normalized_y: f32,
    /// Whether a drag is in progress
    pub dragging: bool,
}

impl PointerState {
    /// The gaze vector with both axes clamped to [-1, 1]; non-finite axes are
    /// treated as neutral.
    pub fn gaze(&self) -> (f32, f32) {
        (unit(self.normalized_x), unit(self.normalized_y))
    }
}

fn unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn normalize(delta: f32, half_span: f32) -> f32 {
    if half_span > 0.0 {
        unit(delta / half_span)
    } else {
        0.0
    }
}

/// Turns raw screen-space pointer events into a `PointerState`.
///
/// Follow offsets are measured from the model centre against half the
/// viewport; drag offsets against half the model's on-screen size. While a
/// drag is active, the drag offset wins and follow moves are ignored.
#[derive(Debug, Clone)]
pub struct PointerTracker {
    layout: ModelLayout,
    dragging: bool,
    drag: [f32; 2],
    follow: [f32; 2],
}

impl PointerTracker {
    pub fn new(layout: ModelLayout) -> Self {
        Self {
            layout,
            dragging: false,
            drag: [0.0, 0.0],
            follow: [0.0, 0.0],
        }
    }

    pub fn layout(&self) -> &ModelLayout {
        &self.layout
    }

    /// Replace the layout, e.g. after the viewport is resized
    pub fn set_layout(&mut self, layout: ModelLayout) {
        self.layout = layout;
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.dragging = true;
        self.drag = self.drag_offset(x, y);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if self.dragging {
            self.drag = self.drag_offset(x, y);
        } else {
            self.follow = self.follow_offset(x, y);
        }
    }

    /// End a drag; the drag offset returns to neutral
    pub fn pointer_up(&mut self) {
        self.dragging = false;
        self.drag = [0.0, 0.0];
    }

    /// Current state with drag precedence applied
    pub fn state(&self) -> PointerState {
        let [x, y] = if self.dragging { self.drag } else { self.follow };
        PointerState {
            normalized_x: x,
            normalized_y: y,
            dragging: self.dragging,
        }
    }

    fn follow_offset(&self, x: f32, y: f32) -> [f32; 2] {
        let [hw, hh] = self.layout.half_viewport();
        [
            normalize(x - self.layout.center[0], hw),
            normalize(y - self.layout.center[1], hh),
        ]
    }

    fn drag_offset(&self, x: f32, y: f32) -> [f32; 2] {
        let [hw, hh] = self.layout.half_size();
        [
            normalize(x - self.layout.center[0], hw),
            normalize(y - self.layout.center[1], hh),
        ]
    }
}
