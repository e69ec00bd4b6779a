//! On-screen model placement

use crate::config::{PlacementConfig, ViewportConfig};

/// Where the model sits on screen, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelLayout {
    /// Viewport width and height
    pub viewport: [f32; 2],
    /// Model centre
    pub center: [f32; 2],
    /// Scaled model width and height
    pub size: [f32; 2],
}

impl ModelLayout {
    /// Fit a model of `natural` size into the viewport: scale it to a fraction
    /// of the viewport height, then put its anchor at a fractional viewport
    /// position plus a pixel offset.
    pub fn resolve(
        placement: &PlacementConfig,
        viewport: &ViewportConfig,
        natural: [f32; 2],
    ) -> Self {
        let scale = if natural[1] > 0.0 {
            viewport.height / natural[1] * placement.scale
        } else {
            1.0
        };
        let size = [natural[0] * scale, natural[1] * scale];

        let anchor_x = viewport.width * placement.position[0] + placement.offset[0];
        let anchor_y = viewport.height * placement.position[1] + placement.offset[1];

        // Shift from the anchor point to the geometric centre.
        let center = [
            anchor_x + (0.5 - placement.anchor[0]) * size[0],
            anchor_y + (0.5 - placement.anchor[1]) * size[1],
        ];

        Self {
            viewport: [viewport.width, viewport.height],
            center,
            size,
        }
    }

    /// Half of the viewport, the follow-mode normalization span
    pub fn half_viewport(&self) -> [f32; 2] {
        [self.viewport[0] * 0.5, self.viewport[1] * 0.5]
    }

    /// Half of the scaled model, the drag-mode normalization span
    pub fn half_size(&self) -> [f32; 2] {
        [self.size[0] * 0.5, self.size[1] * 0.5]
    }
}
