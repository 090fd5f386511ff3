//! Platform parameters.

use serde::{Deserialize, Serialize};

/// Physical limits and tuning of a follow platform.
///
/// Axis order everywhere is (lateral, vertical, forward), matching the
/// navigator's (x, y, z).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformParams {
    /// Maximum speed per axis (units/s)
    pub max_speed: [f64; 3],
    /// Proportional gain per axis (1/s): speed = gain · displacement
    pub gain: [f64; 3],
    /// First-order velocity response time constant (s); 0 = instantaneous
    pub response_time: f64,
    /// Deceleration applied by an abrupt stop (units/s²); 0 = immediate
    pub brake_decel: f64,
}

impl Default for PlatformParams {
    fn default() -> Self {
        Self {
            max_speed: [200.0, 150.0, 100.0],
            gain: [1.5, 1.5, 1.0],
            response_time: 0.15,
            brake_decel: 0.0,
        }
    }
}
