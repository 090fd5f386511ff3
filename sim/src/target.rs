//! Scene object trajectories.
//!
//! Each object has a true world state [px, py, pz, vx, vy, vz] (x right,
//! y up, z forward from the camera) and a `MotionSpec` describing how it
//! moves. The simulator steps each object forward in time.

use serde::{Deserialize, Serialize};

/// Describes object motion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MotionSpec {
    /// Constant velocity: no acceleration.
    ConstantVelocity,
    /// Velocity oscillates around its initial value: v(t) = v0 + a·ω·cos(ωt).
    Weave { amplitude: [f64; 3], period: f64 },
    /// Constant acceleration in units/s².
    ConstantAccel { ax: f64, ay: f64, az: f64 },
    /// Switch motion model at given sim times. Sorted by start time; the
    /// active spec is the last one whose start time is <= current t.
    Segmented {
        segments: Vec<(f64, Box<MotionSpec>)>,
    },
}

/// A simulated object with ground-truth state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Target {
    pub id: u64,
    /// True state [px, py, pz, vx, vy, vz]
    pub state: [f64; 6],
    /// Physical (width, height) in world units
    pub size: [f64; 2],
    pub motion: MotionSpec,
    /// Object appears at this time (not rendered before)
    pub appear_at: Option<f64>,
    /// Object disappears at this time
    pub disappear_at: Option<f64>,
    /// Base velocity for `Weave`
    #[serde(skip)]
    base_velocity: Option<[f64; 3]>,
}

impl Target {
    pub fn new(id: u64, pos: [f64; 3], vel: [f64; 3], size: [f64; 2], motion: MotionSpec) -> Self {
        Self {
            id,
            state: [pos[0], pos[1], pos[2], vel[0], vel[1], vel[2]],
            size,
            motion,
            appear_at: None,
            disappear_at: None,
            base_velocity: None,
        }
    }

    pub fn with_window(mut self, appear_at: Option<f64>, disappear_at: Option<f64>) -> Self {
        self.appear_at = appear_at;
        self.disappear_at = disappear_at;
        self
    }

    /// Propagate true state by `dt` seconds.
    pub fn step(&mut self, t: f64, dt: f64) {
        let motion = self.motion.clone();
        self.apply(&motion, t, dt);
    }

    fn apply(&mut self, motion: &MotionSpec, t: f64, dt: f64) {
        let base = *self
            .base_velocity
            .get_or_insert([self.state[3], self.state[4], self.state[5]]);
        let s = &mut self.state;
        match motion {
            MotionSpec::ConstantVelocity => {
                s[0] += s[3] * dt;
                s[1] += s[4] * dt;
                s[2] += s[5] * dt;
            }
            MotionSpec::Weave { amplitude, period } => {
                let w = std::f64::consts::TAU / period.max(1e-6);
                for i in 0..3 {
                    s[3 + i] = base[i] + amplitude[i] * w * (w * t).cos();
                    s[i] += s[3 + i] * dt;
                }
            }
            MotionSpec::ConstantAccel { ax, ay, az } => {
                s[0] += s[3] * dt + 0.5 * ax * dt * dt;
                s[1] += s[4] * dt + 0.5 * ay * dt * dt;
                s[2] += s[5] * dt + 0.5 * az * dt * dt;
                s[3] += ax * dt;
                s[4] += ay * dt;
                s[5] += az * dt;
            }
            MotionSpec::Segmented { segments } => {
                match segments.iter().filter(|(start, _)| *start <= t).last() {
                    Some((_, spec)) => {
                        let spec = spec.as_ref().clone();
                        self.apply(&spec, t, dt);
                    }
                    None => self.apply(&MotionSpec::ConstantVelocity, t, dt),
                }
            }
        }
    }

    /// True if the object exists at time `t`.
    pub fn is_active(&self, t: f64) -> bool {
        if self.appear_at.is_some_and(|a| t < a) {
            return false;
        }
        if self.disappear_at.is_some_and(|d| t >= d) {
            return false;
        }
        true
    }

    pub fn position(&self) -> [f64; 3] {
        [self.state[0], self.state[1], self.state[2]]
    }
}
