//! Command models: axis displacement → velocity setpoint, and the platform
//! velocity response.
//!
//! # Models
//! - **Proportional**: v = clamp(gain · d, ±max_speed)
//! - **Bang-bang**: v = sign(d) · max_speed

use crate::params::PlatformParams;
use follow_core::Location;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Trait for a displacement-to-velocity command model.
pub trait CommandModel {
    /// Velocity setpoint for a `move(x, y, z)` command
    fn velocity(&self, displacement: &Location) -> Vector3<f64>;
}

fn as_vector(loc: &Location) -> Vector3<f64> {
    Vector3::new(loc.x_axis, loc.y_axis, loc.z_axis)
}

// ---------------------------------------------------------------------------
// Proportional
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProportionalCommand {
    pub gain: Vector3<f64>,
    pub max_speed: Vector3<f64>,
}

impl ProportionalCommand {
    pub fn new(params: &PlatformParams) -> Self {
        Self {
            gain: Vector3::from(params.gain),
            max_speed: Vector3::from(params.max_speed),
        }
    }
}

impl CommandModel for ProportionalCommand {
    fn velocity(&self, displacement: &Location) -> Vector3<f64> {
        let raw = self.gain.component_mul(&as_vector(displacement));
        raw.zip_map(&self.max_speed, |v, m| v.clamp(-m, m))
    }
}

// ---------------------------------------------------------------------------
// Bang-bang
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BangBangCommand {
    pub max_speed: Vector3<f64>,
}

impl BangBangCommand {
    pub fn new(params: &PlatformParams) -> Self {
        Self {
            max_speed: Vector3::from(params.max_speed),
        }
    }
}

impl CommandModel for BangBangCommand {
    fn velocity(&self, displacement: &Location) -> Vector3<f64> {
        as_vector(displacement).zip_map(&self.max_speed, |d, m| {
            if d > 0.0 {
                m
            } else if d < 0.0 {
                -m
            } else {
                0.0
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Velocity response
// ---------------------------------------------------------------------------

/// Platform velocity following its setpoint with a first-order lag.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VelocityResponse {
    pub velocity: Vector3<f64>,
    pub setpoint: Vector3<f64>,
    /// Abrupt stop in progress
    braking: bool,
}

impl VelocityResponse {
    pub fn command(&mut self, setpoint: Vector3<f64>) {
        self.setpoint = setpoint;
        self.braking = false;
    }

    /// Zero the setpoint. An abrupt stop brakes at `brake_decel` (or halts
    /// immediately when that is 0) instead of following the lag.
    pub fn stop(&mut self, abrupt: bool, params: &PlatformParams) {
        self.setpoint = Vector3::zeros();
        self.braking = abrupt;
        if abrupt && params.brake_decel <= 0.0 {
            self.velocity = Vector3::zeros();
        }
    }

    /// Advance by `dt` seconds and return the displacement travelled.
    pub fn step(&mut self, dt: f64, params: &PlatformParams) -> Vector3<f64> {
        if dt <= 0.0 {
            return Vector3::zeros();
        }
        let before = self.velocity;
        if self.braking {
            let speed = self.velocity.norm();
            let drop = params.brake_decel * dt;
            self.velocity = if speed <= drop || speed == 0.0 {
                Vector3::zeros()
            } else {
                self.velocity * ((speed - drop) / speed)
            };
        } else if params.response_time <= 0.0 {
            self.velocity = self.setpoint;
        } else {
            let alpha = 1.0 - (-dt / params.response_time).exp();
            self.velocity += (self.setpoint - self.velocity) * alpha;
        }
        (before + self.velocity) * (0.5 * dt)
    }

    pub fn is_still(&self) -> bool {
        self.velocity.norm() < 1e-9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_scales_and_clamps() {
        let params = PlatformParams::default();
        let model = ProportionalCommand::new(&params);
        let v = model.velocity(&Location::new(100.0, -20.0, 300.0));
        assert_eq!(v, Vector3::new(150.0, -30.0, 100.0));
        let v = model.velocity(&Location::new(-1000.0, 0.0, 0.0));
        assert_eq!(v.x, -200.0);
    }

    #[test]
    fn bang_bang_uses_full_speed() {
        let model = BangBangCommand::new(&PlatformParams::default());
        let v = model.velocity(&Location::new(3.0, 0.0, -0.5));
        assert_eq!(v, Vector3::new(200.0, 0.0, -100.0));
    }

    #[test]
    fn response_converges_to_setpoint() {
        let params = PlatformParams::default();
        let mut r = VelocityResponse::default();
        r.command(Vector3::new(100.0, 0.0, 0.0));
        for _ in 0..200 {
            r.step(0.01, &params);
        }
        assert!((r.velocity.x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn abrupt_stop_halts() {
        let params = PlatformParams::default();
        let mut r = VelocityResponse::default();
        r.command(Vector3::new(100.0, 50.0, 0.0));
        r.step(1.0, &params);
        r.stop(true, &params);
        assert!(r.is_still());
        assert_eq!(r.step(0.1, &params), Vector3::zeros());
    }

    #[test]
    fn braking_decelerates_linearly() {
        let params = PlatformParams {
            response_time: 0.0,
            brake_decel: 100.0,
            ..Default::default()
        };
        let mut r = VelocityResponse::default();
        r.command(Vector3::new(50.0, 0.0, 0.0));
        r.step(0.1, &params);
        r.stop(true, &params);
        r.step(0.2, &params);
        assert!((r.velocity.x - 30.0).abs() < 1e-9);
        r.step(1.0, &params);
        assert!(r.is_still());
    }
}
