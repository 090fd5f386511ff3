//! Single-threaded follow loop.
//!
//! # Processing steps per frame
//! 1. Run guidance ticks that fell due before this frame's timestamp
//! 2. Ensemble update (trackers, border watchdogs, voting, quorum, consensus)
//! 3. Navigation from the consensus box (or not-ready on loss / idle)
//! 4. Grid cell classification and overlay updates
//!
//! Ticks are driven by frame time, so a run is reproducible for a given
//! frame sequence. The threaded equivalent lives in [`crate::scheduler`].

use crate::{
    capability::{Frame, MotionActuator, Overlay, TrackerFactory},
    config::FollowConfig,
    ensemble::{EnsembleEvent, EnsembleOutput, EnsembleSnapshot, EnsembleTracker},
    error::ConfigError,
    guidance::GuidanceController,
    navigator::{Navigation, Navigator},
    types::{BoundingBox, GridCell, MotionCommand},
};
use serde::{Deserialize, Serialize};

/// Everything one call to [`FollowLoop::step`] produced.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StepOutput {
    /// Frame timestamp (seconds)
    pub timestamp: f64,
    pub ensemble: EnsembleOutput,
    pub navigation: Navigation,
    /// Grid cell of the working direction (None when navigation is not ready)
    pub cell: Option<GridCell>,
    /// Commands issued by the ticks run before this frame
    pub commands: Vec<MotionCommand>,
}

pub struct FollowLoop<F: ?Sized> {
    ensemble: EnsembleTracker<F>,
    navigator: Navigator,
    guidance: GuidanceController,
    navigation: Navigation,
    tick_interval: f64,
    next_tick: Option<f64>,
}

impl<F: Frame + Sync + ?Sized> FollowLoop<F> {
    pub fn new(
        config: &FollowConfig,
        factory: impl TrackerFactory<F> + 'static,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            ensemble: EnsembleTracker::new(config, factory)?,
            navigator: Navigator::new(config)?,
            guidance: GuidanceController::new(config)?,
            navigation: Navigation::NOT_READY,
            tick_interval: config.guidance_tick_interval_ms as f64 / 1000.0,
            next_tick: None,
        })
    }

    /// Arm on `frame`. `None` disarms.
    pub fn arm(
        &mut self,
        frame: &F,
        reference: Option<BoundingBox>,
        overlay: &mut dyn Overlay,
    ) -> Option<EnsembleEvent> {
        let event = self.ensemble.arm(frame, reference);
        match self.ensemble.snapshot().consensus_box {
            Some(b) if self.ensemble.snapshot().is_tracking() => {
                self.navigation = self.navigator.compute(Some(&b), frame.size());
                overlay.update_boundary(b);
                overlay.update_center(b.center());
                overlay.show_boundary();
                overlay.show_center();
            }
            _ => self.settle(overlay),
        }
        event
    }

    pub fn disarm(&mut self, overlay: &mut dyn Overlay) -> Option<EnsembleEvent> {
        let event = self.ensemble.disarm();
        self.settle(overlay);
        event
    }

    /// Advance the guidance clock to `now`, then process `frame`.
    pub fn step(
        &mut self,
        frame: &F,
        actuator: &mut dyn MotionActuator,
        overlay: &mut dyn Overlay,
    ) -> StepOutput {
        let commands = self.advance_clock(frame.timestamp(), actuator);
        let (ensemble, cell) = self.process_frame(frame, overlay);
        StepOutput {
            timestamp: frame.timestamp(),
            ensemble,
            navigation: self.navigation,
            cell,
            commands,
        }
    }

    /// Frame-rate half: ensemble, navigation, grid.
    pub fn process_frame(
        &mut self,
        frame: &F,
        overlay: &mut dyn Overlay,
    ) -> (EnsembleOutput, Option<GridCell>) {
        let out = self.ensemble.update(frame);

        if matches!(out.event, Some(EnsembleEvent::Lost { .. })) {
            self.settle(overlay);
        } else if let (true, Some(b)) = (out.snapshot.is_tracking(), out.snapshot.consensus_box) {
            self.navigation = self.navigator.compute(Some(&b), frame.size());
            overlay.update_boundary(b);
            overlay.update_center(b.center());
        } else {
            self.navigation = Navigation::NOT_READY;
        }

        let cell = self.guidance.update_grid(&self.navigation, overlay);
        (out, cell)
    }

    /// Tick-rate half: one guidance step from the last published navigation.
    pub fn tick(&mut self, actuator: &mut dyn MotionActuator) -> Option<MotionCommand> {
        self.guidance.tick(&self.navigation, actuator)
    }

    /// Run the tick due at or before `now` (seconds). The first call anchors
    /// the clock and ticks once. After a gap of more than one interval the
    /// missed ticks are dropped: one tick runs and the clock re-anchors on
    /// `now`.
    pub fn advance_clock(
        &mut self,
        now: f64,
        actuator: &mut dyn MotionActuator,
    ) -> Vec<MotionCommand> {
        let due = *self.next_tick.get_or_insert(now);
        if due > now {
            return Vec::new();
        }
        let commands: Vec<MotionCommand> = self.tick(actuator).into_iter().collect();
        let next = due + self.tick_interval;
        self.next_tick = Some(if next <= now {
            tracing::debug!(gap = now - due, "guidance ticks skipped");
            now + self.tick_interval
        } else {
            next
        });
        commands
    }

    /// Drop the navigation and zero guidance so the next tick stops.
    fn settle(&mut self, overlay: &mut dyn Overlay) {
        self.navigation = Navigation::NOT_READY;
        self.guidance.clear_direction();
        overlay.hide_boundary();
        overlay.hide_center();
    }

    pub fn snapshot(&self) -> EnsembleSnapshot {
        self.ensemble.snapshot()
    }

    pub fn navigation(&self) -> Navigation {
        self.navigation
    }

    pub fn guidance(&self) -> &GuidanceController {
        &self.guidance
    }

    pub fn ensemble(&self) -> &EnsembleTracker<F> {
        &self.ensemble
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        capability::{NullOverlay, SingleTracker},
        guidance::MotionState,
        testing::{RecordingActuator, RecordingOverlay, ScriptedTracker, TestFrame},
    };

    fn frame(t: f64) -> TestFrame {
        TestFrame::new(640, 480, t)
    }

    fn echo_loop(cfg: &FollowConfig) -> FollowLoop<TestFrame> {
        FollowLoop::new(cfg, |_slot: usize| {
            Box::new(ScriptedTracker::echo()) as Box<dyn SingleTracker<TestFrame>>
        })
        .unwrap()
    }

    #[test]
    fn ticks_follow_frame_time() {
        let cfg = FollowConfig::default();
        let mut lp = echo_loop(&cfg);
        let mut act = RecordingActuator::default();
        // Far right of center: every tick moves
        let target = BoundingBox::new(560, 215, 40, 50).unwrap();
        lp.arm(&frame(0.0), Some(target), &mut NullOverlay);

        let mut moves = 0;
        for i in 0..10 {
            // 33 ms per frame, 50 ms per tick
            let out = lp.step(&frame(i as f64 * 0.033), &mut act, &mut NullOverlay);
            moves += out.commands.len();
        }
        // Frames span 0..297 ms: ticks at 0, 50, 100, 150, 200, 250 ms
        assert_eq!(moves, 6);
        assert_eq!(act.moves(), 6);
        assert_eq!(lp.guidance().state(), MotionState::Moving);
    }

    #[test]
    fn frame_gap_runs_a_single_tick() {
        let cfg = FollowConfig::default();
        let mut lp = echo_loop(&cfg);
        let mut act = RecordingActuator::default();
        let target = BoundingBox::new(560, 215, 40, 50).unwrap();
        lp.arm(&frame(0.0), Some(target), &mut NullOverlay);

        assert_eq!(lp.step(&frame(0.0), &mut act, &mut NullOverlay).commands.len(), 1);
        // Stream stalls for 10 s
        let out = lp.step(&frame(10.0), &mut act, &mut NullOverlay);
        assert_eq!(out.commands.len(), 1);
        assert_eq!(act.moves(), 2);

        // Clock re-anchored on 10.0: next tick at 10.05
        assert!(lp.step(&frame(10.03), &mut act, &mut NullOverlay).commands.is_empty());
        assert_eq!(lp.step(&frame(10.06), &mut act, &mut NullOverlay).commands.len(), 1);
        assert_eq!(act.moves(), 3);
    }

    #[test]
    fn navigation_published_while_tracking() {
        let cfg = FollowConfig::default();
        let mut lp = echo_loop(&cfg);
        let mut overlay = RecordingOverlay::default();
        let target = BoundingBox::new(40, 215, 40, 50).unwrap();
        lp.arm(&frame(0.0), Some(target), &mut overlay);
        assert!(overlay.boundary_visible);

        let out = lp.step(&frame(0.03), &mut RecordingActuator::default(), &mut overlay);
        assert!(out.navigation.ready);
        assert_eq!(out.navigation.location.x_axis, -260.0);
        assert_eq!(out.cell, Some(GridCell { row: 1, col: 0 }));
        assert_eq!(overlay.boundary, Some(target));
        assert_eq!(overlay.highlighted.last(), Some(&GridCell { row: 1, col: 0 }));
    }

    #[test]
    fn consensus_loss_stops_platform_once() {
        let cfg = FollowConfig::default();
        let target = BoundingBox::new(560, 215, 40, 50).unwrap();
        // Two good frames, then every slot fails
        let mut lp = FollowLoop::new(&cfg, move |_slot: usize| {
            Box::new(ScriptedTracker::new(vec![Some(target), Some(target), None]))
                as Box<dyn SingleTracker<TestFrame>>
        })
        .unwrap();
        let mut act = RecordingActuator::default();
        let mut overlay = RecordingOverlay::default();
        lp.arm(&frame(0.0), Some(target), &mut overlay);

        let mut lost_seen = false;
        for i in 1..12 {
            let out = lp.step(&frame(i as f64 * 0.05), &mut act, &mut overlay);
            if matches!(out.ensemble.event, Some(EnsembleEvent::Lost { .. })) {
                lost_seen = true;
                assert!(!out.navigation.ready);
                assert!(!overlay.boundary_visible);
            }
        }
        assert!(lost_seen);
        assert!(lp.snapshot().is_lost());
        assert!(act.moves() >= 1);
        assert_eq!(act.stops(), 1);
        assert_eq!(act.commands.last(), Some(&MotionCommand::Stop { abrupt: true }));
        assert_eq!(lp.guidance().state(), MotionState::Static);
    }

    #[test]
    fn idle_loop_issues_nothing() {
        let cfg = FollowConfig::default();
        let mut lp = echo_loop(&cfg);
        let mut act = RecordingActuator::default();
        for i in 0..10 {
            let out = lp.step(&frame(i as f64 * 0.05), &mut act, &mut NullOverlay);
            assert!(!out.navigation.ready);
            assert_eq!(out.cell, None);
        }
        assert!(act.commands.is_empty());
    }

    #[test]
    fn disarm_settles_the_platform() {
        let cfg = FollowConfig::default();
        let mut lp = echo_loop(&cfg);
        let mut act = RecordingActuator::default();
        let target = BoundingBox::new(560, 215, 40, 50).unwrap();
        lp.arm(&frame(0.0), Some(target), &mut NullOverlay);
        lp.step(&frame(0.0), &mut act, &mut NullOverlay);
        assert_eq!(act.moves(), 1);

        assert_eq!(lp.disarm(&mut NullOverlay), Some(EnsembleEvent::Disarmed));
        lp.step(&frame(0.05), &mut act, &mut NullOverlay);
        lp.step(&frame(0.10), &mut act, &mut NullOverlay);
        assert_eq!(act.stops(), 1);
    }
}
