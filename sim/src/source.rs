//! Realtime scenario playback through the threaded [`Scheduler`].
//!
//! The frame source owns the scene and integrates the shared platform
//! between frames; the scheduler's tick thread commands that platform. An
//! operator loop on the caller's thread re-arms whenever the ensemble is
//! not tracking.

use crate::{
    frame::SimFrame,
    scenarios::Scenario,
    sim_tracker::{tracker_factory, SimDetector},
    vehicle::{SharedPlatform, SimPlatform},
};
use follow_core::{
    select::TargetSelector, ConfigError, Detector, FollowConfig, FrameSource, NullOverlay,
    Scheduler,
};
use nalgebra::Vector3;
use parking_lot::Mutex;
use std::{sync::Arc, thread, time::Duration};
use tracing::info;

/// Last frame handed to the scheduler, for the operator loop.
pub type FrameTap = Arc<Mutex<Option<SimFrame>>>;

pub struct SimFrameSource {
    scenario: Scenario,
    platform: SharedPlatform,
    tap: FrameTap,
    /// Wall-clock delay per frame; `None` runs as fast as possible
    pace: Option<Duration>,
    index: u64,
    time: f64,
}

impl SimFrameSource {
    pub fn new(scenario: Scenario, platform: SharedPlatform, pace: Option<Duration>) -> Self {
        Self {
            scenario,
            platform,
            tap: Arc::new(Mutex::new(None)),
            pace,
            index: 0,
            time: 0.0,
        }
    }

    pub fn tap(&self) -> FrameTap {
        self.tap.clone()
    }
}

impl FrameSource<SimFrame> for SimFrameSource {
    fn next_frame(&mut self) -> Option<SimFrame> {
        if self.index >= self.scenario.frame_count() {
            return None;
        }
        if let Some(pace) = self.pace {
            thread::sleep(pace);
        }
        let dt = self.scenario.frame_dt;
        let camera = {
            let mut platform = self.platform.0.lock();
            if self.index > 0 {
                platform.advance(dt);
            }
            platform.position()
        };
        if self.index > 0 {
            self.scenario.scene.step(self.time, dt);
            self.time += dt;
        }
        let frame = self.scenario.scene.render(self.index, self.time, &camera);
        *self.tap.lock() = Some(frame.clone());
        self.index += 1;
        Some(frame)
    }
}

/// Summary of a realtime run.
#[derive(Clone, Debug)]
pub struct RealtimeOutcome {
    pub frames: u64,
    pub ticks: u64,
    pub arms: u64,
    pub move_commands: usize,
    pub stop_commands: usize,
    pub final_camera: [f64; 3],
}

/// Play `scenario` through the scheduler. With `pace` set to the frame
/// period the run takes the scenario's duration in wall-clock time.
pub fn run_realtime(
    scenario: Scenario,
    mut config: FollowConfig,
    pace: Option<Duration>,
    poll: Duration,
) -> Result<RealtimeOutcome, ConfigError> {
    config.frame_size = scenario.scene.frame_size;
    config.validate()?;

    let platform = SharedPlatform::new(SimPlatform::new(
        scenario.platform.clone(),
        scenario.command,
        Vector3::from(scenario.camera_start),
    ));
    let factory = tracker_factory(scenario.tracker.clone(), scenario.seed ^ config.rng_seed);
    let name = scenario.name.clone();
    let source = SimFrameSource::new(scenario, platform.clone(), pace);
    let tap = source.tap();

    let mut scheduler = Scheduler::spawn(&config, factory, source, platform.clone(), NullOverlay)?;
    info!(scenario = %name, "realtime run started");

    let mut detector = SimDetector::default();
    let mut selector = TargetSelector::new(config.recognition_distance_threshold);
    let mut arms = 0;
    // Frame count when the last arm was queued; it applies on the next frame
    let mut armed_at: Option<u64> = None;
    while !scheduler.shared().is_source_exhausted() {
        thread::sleep(poll);
        let frames = scheduler.shared().frames_processed();
        if armed_at.is_some_and(|at| frames <= at + 1) || scheduler.snapshot().is_tracking() {
            continue;
        }
        let Some(frame) = tap.lock().clone() else {
            continue;
        };
        selector.observe(detector.detect(&frame));
        let known = selector.selected().is_some_and(|d| d.is_known());
        if let (true, Some(reference)) = (known, selector.reference()) {
            if scheduler.arm(Some(reference)) {
                arms += 1;
                armed_at = Some(frames);
            }
        }
    }

    scheduler.wait_for_source();
    let frames = scheduler.shared().frames_processed();
    scheduler.shutdown();
    let ticks = scheduler.shared().ticks_run();

    let p = platform.0.lock();
    let moves = p
        .commands()
        .iter()
        .filter(|c| matches!(c, follow_core::MotionCommand::Move(_)))
        .count();
    let outcome = RealtimeOutcome {
        frames,
        ticks,
        arms,
        move_commands: moves,
        stop_commands: p.commands().len() - moves,
        final_camera: p.position().into(),
    };
    info!(frames, ticks, arms, "realtime run finished");
    Ok(outcome)
}
