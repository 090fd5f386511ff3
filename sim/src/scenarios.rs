//! Scenario definitions.
//!
//! Each scenario is a scene, tracker behaviour and platform setup. World
//! units are pixels at the reference depth of 100, so a 40×50 target at
//! depth 100 covers the default reference area of 2000 px².
//! All scenarios are deterministic given the same seed.

use crate::{
    scene::Scene,
    sim_tracker::SimTrackerParams,
    target::{MotionSpec, Target},
    vehicle::CommandKind,
};
use follow_core::FrameSize;
use platform::PlatformParams;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const Z_REF: f64 = 100.0;
const TARGET_SIZE: [f64; 2] = [40.0, 50.0];

/// Which pre-defined scenario to load.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// Hovering target with a gentle weave
    Steady,
    /// Target drifting diagonally; the platform has to keep up
    Drifting,
    /// Target passes behind an occluder and is re-acquired afterwards
    Occlusion,
    /// Target accelerates out of view faster than the platform can follow
    BorderExit,
    /// Look-alike objects cross close to the target
    Distractor,
    /// Target starts far away and approaches past the reference distance
    Approach,
}

/// A fully configured simulation scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    /// Seconds
    pub duration: f64,
    /// Frame period (s)
    pub frame_dt: f64,
    pub scene: Scene,
    pub tracker: SimTrackerParams,
    pub platform: PlatformParams,
    pub command: CommandKind,
    pub camera_start: [f64; 3],
}

impl Scenario {
    /// Build the named scenario. Uses `seed` for repeatability.
    pub fn build(kind: ScenarioKind, seed: u64) -> Self {
        match kind {
            ScenarioKind::Steady => Self::steady(seed),
            ScenarioKind::Drifting => Self::drifting(seed),
            ScenarioKind::Occlusion => Self::occlusion(seed),
            ScenarioKind::BorderExit => Self::border_exit(seed),
            ScenarioKind::Distractor => Self::distractor(seed),
            ScenarioKind::Approach => Self::approach(seed),
        }
    }

    pub fn frame_count(&self) -> u64 {
        (self.duration / self.frame_dt).round() as u64
    }

    fn base(name: &str, seed: u64, duration: f64, target: Target) -> Self {
        Self {
            name: name.into(),
            seed,
            duration,
            frame_dt: 1.0 / 30.0,
            scene: Scene {
                frame_size: FrameSize::new(640, 480),
                z_ref: Z_REF,
                target,
                distractors: Vec::new(),
                occlusions: Vec::new(),
            },
            tracker: SimTrackerParams::default(),
            platform: PlatformParams::default(),
            command: CommandKind::Proportional,
            camera_start: [0.0; 3],
        }
    }

    // -----------------------------------------------------------------------
    // Steady
    // -----------------------------------------------------------------------
    fn steady(seed: u64) -> Self {
        let target = Target::new(
            0,
            [0.0, 0.0, Z_REF],
            [0.0; 3],
            TARGET_SIZE,
            MotionSpec::Weave {
                amplitude: [6.0, 4.0, 0.0],
                period: 4.0,
            },
        );
        Self::base("steady", seed, 10.0, target)
    }

    // -----------------------------------------------------------------------
    // Drifting
    // -----------------------------------------------------------------------
    fn drifting(seed: u64) -> Self {
        let target = Target::new(
            0,
            [0.0, 0.0, Z_REF],
            [60.0, 25.0, 0.0],
            TARGET_SIZE,
            MotionSpec::Weave {
                amplitude: [20.0, 10.0, 0.0],
                period: 6.0,
            },
        );
        Self::base("drifting", seed, 15.0, target)
    }

    // -----------------------------------------------------------------------
    // Occlusion
    // -----------------------------------------------------------------------
    fn occlusion(seed: u64) -> Self {
        let target = Target::new(
            0,
            [0.0, 0.0, Z_REF],
            [30.0, 0.0, 0.0],
            TARGET_SIZE,
            MotionSpec::ConstantVelocity,
        );
        let mut s = Self::base("occlusion", seed, 12.0, target);
        s.scene.occlusions = vec![[4.0, 5.5]];
        s
    }

    // -----------------------------------------------------------------------
    // Border exit
    // -----------------------------------------------------------------------
    fn border_exit(seed: u64) -> Self {
        let motion = MotionSpec::Segmented {
            segments: vec![
                (0.0, Box::new(MotionSpec::ConstantVelocity)),
                (
                    1.0,
                    Box::new(MotionSpec::ConstantAccel {
                        ax: 800.0,
                        ay: 0.0,
                        az: 0.0,
                    }),
                ),
            ],
        };
        let target = Target::new(0, [0.0, 0.0, Z_REF], [0.0; 3], TARGET_SIZE, motion);
        let mut s = Self::base("border_exit", seed, 8.0, target);
        // Platform-limited: no failures, so only the border watchdog can drop slots
        s.tracker.p_fail = 0.0;
        s
    }

    // -----------------------------------------------------------------------
    // Distractor
    // -----------------------------------------------------------------------
    fn distractor(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
        let target = Target::new(
            0,
            [0.0, 0.0, Z_REF],
            [0.0; 3],
            TARGET_SIZE,
            MotionSpec::Weave {
                amplitude: [5.0, 5.0, 0.0],
                period: 5.0,
            },
        );
        let mut s = Self::base("distractor", seed, 15.0, target);

        // Crossers pass through the target position from alternating sides
        s.scene.distractors = (0..4)
            .map(|i| {
                let dir = if i % 2 == 0 { 1.0 } else { -1.0 };
                let speed = 70.0 + rng.gen::<f64>() * 40.0;
                let dy = (rng.gen::<f64>() - 0.5) * 30.0;
                let start = 2.0 + i as f64 * 3.0;
                Target::new(
                    i as u64 + 1,
                    [-dir * 300.0, dy, Z_REF],
                    [dir * speed, 0.0, 0.0],
                    TARGET_SIZE,
                    MotionSpec::ConstantVelocity,
                )
                .with_window(Some(start), Some(start + 600.0 / speed))
            })
            .collect();
        s.tracker.p_snap = 0.05;
        s
    }

    // -----------------------------------------------------------------------
    // Approach
    // -----------------------------------------------------------------------
    fn approach(seed: u64) -> Self {
        let target = Target::new(
            0,
            [0.0, 0.0, 2.0 * Z_REF],
            [0.0, 0.0, -25.0],
            TARGET_SIZE,
            MotionSpec::ConstantVelocity,
        );
        Self::base("approach", seed, 12.0, target)
    }
}
