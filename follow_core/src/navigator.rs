//! Navigator: consensus box → clamped per-axis displacement.
//!
//! x/y are the offset of the box center from the frame center (y flipped so
//! "up" is positive), z compares the box area with a reference area and is
//! positive when the target is too small (too far away).

use crate::{
    config::FollowConfig,
    error::ConfigError,
    types::{BoundingBox, FrameSize, Location},
};
use serde::{Deserialize, Serialize};

/// The unit published from the frame domain to the guidance domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Navigation {
    pub location: Location,
    /// A location has been computed from a real box
    pub ready: bool,
}

impl Navigation {
    pub const NOT_READY: Navigation = Navigation {
        location: Location::ZERO,
        ready: false,
    };
}

#[derive(Clone, Debug, PartialEq)]
pub struct Navigator {
    x_limit: f64,
    y_limit: f64,
    z_limit: f64,
    target_area: f64,
}

impl Navigator {
    pub fn new(config: &FollowConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            x_limit: config.frame_size.width as f64 / 2.0,
            y_limit: config.frame_size.height as f64 / 2.0,
            z_limit: config.max_distance,
            target_area: config.target_area(),
        })
    }

    pub fn target_area(&self) -> f64 {
        self.target_area
    }

    /// Compute the displacement for `bbox` in a frame of `frame` pixels.
    ///
    /// A missing or malformed box, or an empty frame, yields
    /// [`Navigation::NOT_READY`].
    pub fn compute(&self, bbox: Option<&BoundingBox>, frame: FrameSize) -> Navigation {
        let Some(b) = bbox.filter(|b| b.is_valid()) else {
            return Navigation::NOT_READY;
        };
        if frame.is_empty() {
            return Navigation::NOT_READY;
        }

        let c = b.center();
        let fc = frame.center();
        let dx = (c.cx - fc.cx) as f64;
        let dy = (c.cy - fc.cy) as f64;

        let x_axis = dx.clamp(-self.x_limit, self.x_limit);
        let y_axis = -dy.clamp(-self.y_limit, self.y_limit);

        let area = b.area() as f64;
        let z_value = (area - self.target_area) / (self.target_area / self.z_limit);
        let z_axis = -z_value.clamp(-self.z_limit, self.z_limit);

        Navigation {
            location: Location::new(x_axis, y_axis, z_axis),
            ready: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
