//! Stepped scenario runner.
//!
//! # Processing steps per frame
//! 1. Advance the platform and the scene by one frame period
//! 2. Render the frame from the current camera position
//! 3. While not tracking: recognise, select a target and arm on it
//! 4. Follow loop step (guidance ticks, ensemble, navigation, grid)
//! 5. Score the step against ground truth and record it
//!
//! Everything runs on one thread against frame time, so a run is fully
//! determined by the scenario, its seed and the config.

use crate::{
    frame::SimFrame,
    replay::{FrameRecord, ReplayLog},
    scenarios::Scenario,
    sim_tracker::{tracker_factory, SimDetector},
    vehicle::SimPlatform,
};
use follow_core::{
    metrics::FollowMetrics, select::TargetSelector, ConfigError, Detector, Frame, FollowConfig,
    FollowLoop, NullOverlay, StepOutput,
};
use nalgebra::Vector3;
use std::time::Instant;
use tracing::{debug, info};

/// Result of a complete run.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub metrics: FollowMetrics,
    pub replay: ReplayLog,
    /// Number of times the ensemble was armed
    pub arms: u64,
    pub final_camera: [f64; 3],
    pub wall_time_ms: f64,
}

pub struct ScenarioRunner {
    scenario: Scenario,
    config: FollowConfig,
    follow: FollowLoop<SimFrame>,
    platform: SimPlatform,
    detector: SimDetector,
    selector: TargetSelector,
    metrics: FollowMetrics,
    records: Vec<FrameRecord>,
    index: u64,
    time: f64,
    arms: u64,
}

impl ScenarioRunner {
    /// Build a runner. The config's frame size is taken from the scene.
    pub fn new(scenario: Scenario, mut config: FollowConfig) -> Result<Self, ConfigError> {
        config.frame_size = scenario.scene.frame_size;
        config.validate()?;
        let factory = tracker_factory(scenario.tracker.clone(), scenario.seed ^ config.rng_seed);
        let follow = FollowLoop::new(&config, factory)?;
        let platform = SimPlatform::new(
            scenario.platform.clone(),
            scenario.command,
            Vector3::from(scenario.camera_start),
        );
        Ok(Self {
            selector: TargetSelector::new(config.recognition_distance_threshold),
            detector: SimDetector::default(),
            metrics: FollowMetrics::default(),
            records: Vec::with_capacity(scenario.frame_count() as usize),
            index: 0,
            time: 0.0,
            arms: 0,
            scenario,
            config,
            follow,
            platform,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.scenario.frame_count()
    }

    /// Process the next frame. Returns `None` once the scenario is over.
    pub fn step(&mut self) -> Option<&FrameRecord> {
        if self.is_finished() {
            return None;
        }
        let dt = self.scenario.frame_dt;
        if self.index > 0 {
            self.platform.advance(dt);
            self.scenario.scene.step(self.time, dt);
            self.time += dt;
        }

        let camera = self.platform.position();
        let frame = self.scenario.scene.render(self.index, self.time, &camera);
        let truth = frame.visible_target().filter(|_| !frame.occluded);

        let step = match self.acquire(&frame) {
            Some(reference) => self.arm(&frame, reference),
            None => self
                .follow
                .step(&frame, &mut self.platform, &mut NullOverlay),
        };

        self.metrics.accumulate(&step, truth.map(|b| b.center()));
        self.platform.drain_commands();
        self.records.push(FrameRecord {
            time: self.time,
            camera: camera.into(),
            truth,
            step,
        });
        self.index += 1;
        self.records.last()
    }

    /// Run to the end of the scenario.
    pub fn run(mut self) -> RunOutcome {
        let start = Instant::now();
        info!(
            scenario = %self.scenario.name,
            frames = self.scenario.frame_count(),
            seed = self.scenario.seed,
            "scenario started"
        );
        while self.step().is_some() {}
        let wall_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            tracking_ratio = self.metrics.tracking_ratio(),
            lost = self.metrics.lost_events,
            arms = self.arms,
            "scenario finished"
        );
        let final_camera = self.platform.position().into();
        let arms = self.arms;
        let metrics = self.metrics.clone();
        RunOutcome {
            replay: self.into_replay(),
            metrics,
            arms,
            final_camera,
            wall_time_ms,
        }
    }

    /// Recognition and selection while the ensemble is not tracking.
    fn acquire(&mut self, frame: &SimFrame) -> Option<follow_core::BoundingBox> {
        if self.follow.snapshot().is_tracking() {
            return None;
        }
        let detections = self.detector.detect(frame);
        if self.selector.observe(detections).is_none() {
            // Several candidates: the operator clicks on the real target
            let click = frame.visible_target().filter(|_| !frame.occluded)?;
            let c = crate::frame::clip_into(click, frame.size).center();
            self.selector.select_at(c.cx, c.cy)?;
        }
        let selected = self.selector.selected()?;
        if !selected.is_known() {
            debug!(bbox = %selected.bbox, "ignoring unrecognised candidate");
            return None;
        }
        self.selector.reference()
    }

    /// Arm on `frame`. Initialisation consumes the frame, so only the due
    /// guidance ticks run.
    fn arm(&mut self, frame: &SimFrame, reference: follow_core::BoundingBox) -> StepOutput {
        let commands = self.follow.advance_clock(frame.timestamp(), &mut self.platform);
        self.follow.arm(frame, Some(reference), &mut NullOverlay);
        self.arms += 1;
        self.selector.clear();
        info!(t = frame.timestamp(), %reference, "armed");
        StepOutput {
            timestamp: frame.timestamp(),
            ensemble: follow_core::EnsembleOutput {
                snapshot: self.follow.snapshot(),
                ..Default::default()
            },
            navigation: self.follow.navigation(),
            cell: None,
            commands,
        }
    }

    pub fn metrics(&self) -> &FollowMetrics {
        &self.metrics
    }

    pub fn camera(&self) -> Vector3<f64> {
        self.platform.position()
    }

    pub fn arms(&self) -> u64 {
        self.arms
    }

    pub fn into_replay(self) -> ReplayLog {
        ReplayLog {
            scenario_name: self.scenario.name,
            seed: self.scenario.seed,
            frame_dt: self.scenario.frame_dt,
            duration: self.scenario.duration,
            config: self.config,
            frames: self.records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::ScenarioKind;

    #[test]
    fn arms_on_first_frame_and_tracks() {
        let scenario = Scenario::build(ScenarioKind::Steady, 3);
        let mut runner = ScenarioRunner::new(scenario, FollowConfig::default()).unwrap();
        let first = runner.step().unwrap();
        assert!(first.step.ensemble.snapshot.is_tracking());
        assert_eq!(runner.arms(), 1);
        for _ in 0..30 {
            runner.step();
        }
        assert!(runner.metrics().n_tracking >= 30);
    }

    #[test]
    fn stops_after_duration() {
        let mut scenario = Scenario::build(ScenarioKind::Steady, 0);
        scenario.duration = 0.5;
        let expected = scenario.frame_count();
        let mut runner = ScenarioRunner::new(scenario, FollowConfig::default()).unwrap();
        let mut n = 0;
        while runner.step().is_some() {
            n += 1;
        }
        assert_eq!(n, expected);
        assert!(runner.step().is_none());
    }

    #[test]
    fn invalid_config_rejected() {
        let scenario = Scenario::build(ScenarioKind::Steady, 0);
        let cfg = FollowConfig {
            lost_quorum: 0,
            ..Default::default()
        };
        assert!(matches!(
            ScenarioRunner::new(scenario, cfg),
            Err(ConfigError::ZeroQuorum)
        ));
    }
}
