//! Simulated video frames.
//!
//! A `SimFrame` carries the ground truth a real frame would only hold as
//! pixels; the simulated tracker and detector read it directly.

use follow_core::{BoundingBox, Frame, FrameSize};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimFrame {
    pub index: u64,
    pub timestamp: f64,
    pub size: FrameSize,
    /// Projected box of the followed target (may extend past the frame)
    pub target: Option<BoundingBox>,
    /// Target is hidden behind an occluder
    pub occluded: bool,
    /// Projected boxes of the other objects
    pub distractors: Vec<BoundingBox>,
}

impl SimFrame {
    /// Target box when any part of it is inside the frame.
    pub fn visible_target(&self) -> Option<BoundingBox> {
        self.target.filter(|b| intersects(b, self.size))
    }
}

impl Frame for SimFrame {
    fn size(&self) -> FrameSize {
        self.size
    }

    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// True if `b` overlaps the frame rectangle.
pub fn intersects(b: &BoundingBox, frame: FrameSize) -> bool {
    b.x < frame.width as i32 && b.y < frame.height as i32 && b.x + b.w > 0 && b.y + b.h > 0
}

/// Shift `b` so that it lies inside the frame, keeping its size.
pub fn clip_into(b: BoundingBox, frame: FrameSize) -> BoundingBox {
    let max_x = (frame.width as i32 - b.w).max(0);
    let max_y = (frame.height as i32 - b.h).max(0);
    BoundingBox {
        x: b.x.clamp(0, max_x),
        y: b.y.clamp(0, max_y),
        ..b
    }
}
