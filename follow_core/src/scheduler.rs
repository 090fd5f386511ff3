//! Threaded dual-rate runtime.
//!
//! Two OS threads share [`SharedFollowState`]:
//! - the frame task pulls frames from a [`FrameSource`], applies queued
//!   operator commands, updates the ensemble and publishes a [`Navigation`]
//! - the tick task wakes every `guidance_tick_interval_ms` and runs one
//!   guidance step against the last published navigation
//!
//! Lock order is guidance → navigation → ensemble.

use crate::{
    capability::{Frame, FrameSource, MotionActuator, Overlay, TrackerFactory},
    config::FollowConfig,
    ensemble::{EnsembleEvent, EnsembleSnapshot, EnsembleTracker},
    error::ConfigError,
    guidance::GuidanceController,
    navigator::{Navigation, Navigator},
    types::BoundingBox,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// Operator requests, applied by the frame task between frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorCommand {
    /// Arm on the next frame; `None` disarms
    Arm(Option<BoundingBox>),
    Disarm,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct SharedFollowState<F: ?Sized> {
    /// Written by the frame task only; read for snapshots.
    pub ensemble: Mutex<EnsembleTracker<F>>,
    /// Replaced as one value so the tick task never sees a torn update.
    pub navigation: RwLock<Navigation>,
    pub guidance: Mutex<GuidanceController>,
    shutdown_requested: AtomicBool,
    halted: AtomicBool,
    source_exhausted: AtomicBool,
    frames: AtomicU64,
    ticks: AtomicU64,
}

impl<F: ?Sized> SharedFollowState<F> {
    fn new(ensemble: EnsembleTracker<F>, guidance: GuidanceController) -> Arc<Self> {
        Arc::new(Self {
            ensemble: Mutex::new(ensemble),
            navigation: RwLock::new(Navigation::NOT_READY),
            guidance: Mutex::new(guidance),
            shutdown_requested: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            source_exhausted: AtomicBool::new(false),
            frames: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
        })
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// While halted the tick task settles the platform and issues nothing.
    pub fn set_halted(&self, value: bool) {
        self.halted.store(value, Ordering::SeqCst);
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn is_source_exhausted(&self) -> bool {
        self.source_exhausted.load(Ordering::SeqCst)
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Publish a new navigation, zeroing guidance first when it is not ready.
    fn publish(&self, nav: Navigation, lost: bool, overlay: &mut dyn Overlay) {
        let mut guidance = self.guidance.lock();
        *self.navigation.write() = nav;
        if lost {
            guidance.clear_direction();
        }
        guidance.update_grid(&nav, overlay);
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct Scheduler<F: ?Sized> {
    shared: Arc<SharedFollowState<F>>,
    commands: Sender<OperatorCommand>,
    frame_handle: Option<JoinHandle<()>>,
    tick_handle: Option<JoinHandle<()>>,
}

impl<F: Frame + Send + Sync + 'static> Scheduler<F> {
    /// Validate `config`, build the core and start both tasks.
    pub fn spawn(
        config: &FollowConfig,
        factory: impl TrackerFactory<F> + 'static,
        source: impl FrameSource<F> + 'static,
        actuator: impl MotionActuator + 'static,
        overlay: impl Overlay + Send + 'static,
    ) -> Result<Self, ConfigError> {
        let ensemble = EnsembleTracker::new(config, factory)?;
        let navigator = Navigator::new(config)?;
        let guidance = GuidanceController::new(config)?;
        let shared = SharedFollowState::new(ensemble, guidance);
        let (tx, rx) = unbounded();

        let frame_handle = Self::spawn_frame_task(shared.clone(), navigator, source, rx, overlay);
        let interval = Duration::from_millis(config.guidance_tick_interval_ms);
        let tick_handle = Self::spawn_tick_task(shared.clone(), interval, actuator);

        tracing::info!(tick_ms = config.guidance_tick_interval_ms, "scheduler started");
        Ok(Self {
            shared,
            commands: tx,
            frame_handle: Some(frame_handle),
            tick_handle: Some(tick_handle),
        })
    }

    fn spawn_frame_task(
        shared: Arc<SharedFollowState<F>>,
        navigator: Navigator,
        mut source: impl FrameSource<F> + 'static,
        commands: Receiver<OperatorCommand>,
        mut overlay: impl Overlay + Send + 'static,
    ) -> JoinHandle<()> {
        thread::spawn(move || {
            tracing::debug!("frame task started");
            while !shared.is_shutdown_requested() {
                let Some(frame) = source.next_frame() else {
                    shared.source_exhausted.store(true, Ordering::SeqCst);
                    tracing::info!(frames = shared.frames_processed(), "frame source ended");
                    break;
                };

                let mut armed = false;
                for cmd in commands.try_iter() {
                    armed |= apply_command(&shared, &navigator, &frame, cmd, &mut overlay);
                }
                if !armed {
                    process_frame(&shared, &navigator, &frame, &mut overlay);
                }
                shared.frames.fetch_add(1, Ordering::SeqCst);
            }
            tracing::debug!("frame task exiting");
        })
    }

    fn spawn_tick_task(
        shared: Arc<SharedFollowState<F>>,
        interval: Duration,
        mut actuator: impl MotionActuator + 'static,
    ) -> JoinHandle<()> {
        thread::spawn(move || {
            let ticker = crossbeam_channel::tick(interval);
            while !shared.is_shutdown_requested() {
                if ticker.recv().is_err() {
                    break;
                }
                if shared.is_shutdown_requested() {
                    break;
                }
                let mut guidance = shared.guidance.lock();
                let nav = if shared.is_halted() {
                    guidance.clear_direction();
                    Navigation::NOT_READY
                } else {
                    *shared.navigation.read()
                };
                guidance.tick(&nav, &mut actuator);
                shared.ticks.fetch_add(1, Ordering::SeqCst);
            }

            // Leave the platform static
            let mut guidance = shared.guidance.lock();
            guidance.clear_direction();
            guidance.tick(&Navigation::NOT_READY, &mut actuator);
            tracing::debug!(ticks = shared.ticks_run(), "tick task exiting");
        })
    }

    /// Queue an operator command. Returns false once the frame task is gone.
    pub fn send(&self, cmd: OperatorCommand) -> bool {
        self.commands.send(cmd).is_ok()
    }

    pub fn arm(&self, reference: Option<BoundingBox>) -> bool {
        self.send(OperatorCommand::Arm(reference))
    }

    pub fn disarm(&self) -> bool {
        self.send(OperatorCommand::Disarm)
    }

    pub fn halt(&self) {
        self.shared.set_halted(true);
    }

    pub fn resume(&self) {
        self.shared.set_halted(false);
    }

    pub fn snapshot(&self) -> EnsembleSnapshot {
        self.shared.ensemble.lock().snapshot()
    }

    pub fn navigation(&self) -> Navigation {
        *self.shared.navigation.read()
    }

    pub fn shared(&self) -> &Arc<SharedFollowState<F>> {
        &self.shared
    }

    /// Block until the frame source is exhausted (or shutdown is requested).
    pub fn wait_for_source(&mut self) {
        if let Some(handle) = self.frame_handle.take() {
            if handle.join().is_err() {
                tracing::warn!("frame task panicked");
            }
        }
    }
}

impl<F: ?Sized> Scheduler<F> {
    /// Stop both tasks, settle the platform and reset every tracker.
    pub fn shutdown(&mut self) {
        self.shared.request_shutdown();
        for handle in [self.frame_handle.take(), self.tick_handle.take()]
            .into_iter()
            .flatten()
        {
            if handle.join().is_err() {
                tracing::warn!("follow task panicked");
            }
        }
        if self.shared.ensemble.lock().disarm().is_some() {
            tracing::info!("ensemble torn down");
        }
    }
}

impl<F: ?Sized> Drop for Scheduler<F> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Frame task steps
// ---------------------------------------------------------------------------

/// Apply one command on `frame`. Returns true if the ensemble was armed,
/// in which case the frame has been consumed by tracker initialisation.
fn apply_command<F: Frame + Sync + ?Sized>(
    shared: &SharedFollowState<F>,
    navigator: &Navigator,
    frame: &F,
    cmd: OperatorCommand,
    overlay: &mut dyn Overlay,
) -> bool {
    let reference = match cmd {
        OperatorCommand::Arm(r) => r,
        OperatorCommand::Disarm => None,
    };
    let event = shared.ensemble.lock().arm(frame, reference);
    match (event, reference) {
        (Some(EnsembleEvent::Armed { .. }), Some(b)) => {
            let nav = navigator.compute(Some(&b), frame.size());
            overlay.update_boundary(b);
            overlay.update_center(b.center());
            overlay.show_boundary();
            overlay.show_center();
            shared.publish(nav, false, overlay);
            true
        }
        _ => {
            overlay.hide_boundary();
            overlay.hide_center();
            shared.publish(Navigation::NOT_READY, true, overlay);
            false
        }
    }
}

fn process_frame<F: Frame + Sync + ?Sized>(
    shared: &SharedFollowState<F>,
    navigator: &Navigator,
    frame: &F,
    overlay: &mut dyn Overlay,
) {
    let out = shared.ensemble.lock().update(frame);
    let lost = matches!(out.event, Some(EnsembleEvent::Lost { .. }));

    let nav = match out.snapshot.consensus_box {
        Some(b) if out.snapshot.is_tracking() => {
            overlay.update_boundary(b);
            overlay.update_center(b.center());
            navigator.compute(Some(&b), frame.size())
        }
        _ => Navigation::NOT_READY,
    };
    if lost {
        overlay.hide_boundary();
        overlay.hide_center();
    }
    shared.publish(nav, lost, overlay);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        capability::{NullOverlay, SingleTracker},
        testing::{RecordingOverlay, ScriptedTracker, SharedActuator, TestFrame, VecSource},
        types::MotionCommand,
    };

    fn frames(n: usize) -> Vec<TestFrame> {
        (0..n)
            .map(|i| TestFrame::new(640, 480, i as f64 * 0.002))
            .collect()
    }

    fn config() -> FollowConfig {
        FollowConfig {
            guidance_tick_interval_ms: 5,
            ..Default::default()
        }
    }

    fn echo(_slot: usize) -> Box<dyn SingleTracker<TestFrame>> {
        Box::new(ScriptedTracker::echo())
    }

    #[test]
    fn processes_finite_source_and_publishes_navigation() {
        let target = BoundingBox::new(560, 215, 40, 50).unwrap();
        let actuator = SharedActuator::default();
        let source = VecSource::new(frames(60)).paced(Duration::from_millis(2));
        let mut sched =
            Scheduler::spawn(&config(), echo, source, actuator.clone(), NullOverlay).unwrap();
        assert!(sched.arm(Some(target)));

        sched.wait_for_source();
        assert!(sched.shared().is_source_exhausted());
        assert_eq!(sched.shared().frames_processed(), 60);
        assert!(sched.snapshot().is_tracking());
        let nav = sched.navigation();
        assert!(nav.ready);
        assert_eq!(nav.location.x_axis, 260.0);

        thread::sleep(Duration::from_millis(30));
        sched.shutdown();
        let cmds = actuator.commands();
        assert!(cmds.iter().any(|c| matches!(c, MotionCommand::Move(_))));
        // Shutdown leaves the platform static
        assert_eq!(cmds.last(), Some(&MotionCommand::Stop { abrupt: true }));
        assert_eq!(
            sched.snapshot().status,
            crate::ensemble::EnsembleStatus::Idle
        );
    }

    #[test]
    fn halted_scheduler_never_moves() {
        let target = BoundingBox::new(560, 215, 40, 50).unwrap();
        let actuator = SharedActuator::default();
        let source = VecSource::new(frames(30)).paced(Duration::from_millis(2));
        let mut sched =
            Scheduler::spawn(&config(), echo, source, actuator.clone(), NullOverlay).unwrap();
        sched.halt();
        sched.arm(Some(target));
        sched.wait_for_source();
        thread::sleep(Duration::from_millis(20));
        sched.shutdown();

        assert!(sched.shared().ticks_run() > 0);
        assert!(actuator.commands().is_empty());
    }

    #[test]
    fn disarm_command_returns_to_idle() {
        let target = BoundingBox::new(300, 200, 40, 50).unwrap();
        let source = VecSource::new(frames(40)).paced(Duration::from_millis(2));
        let mut sched = Scheduler::spawn(
            &config(),
            echo,
            source,
            SharedActuator::default(),
            NullOverlay,
        )
        .unwrap();
        sched.arm(Some(target));
        sched.disarm();
        sched.wait_for_source();
        assert!(!sched.snapshot().is_tracking());
        assert!(!sched.navigation().ready);
    }

    #[test]
    fn arm_and_disarm_toggle_overlay_center() {
        let cfg = config();
        let shared = SharedFollowState::new(
            EnsembleTracker::new(&cfg, echo).unwrap(),
            GuidanceController::new(&cfg).unwrap(),
        );
        let navigator = Navigator::new(&cfg).unwrap();
        let frame = TestFrame::new(640, 480, 0.0);
        let target = BoundingBox::new(560, 215, 40, 50).unwrap();
        let mut overlay = RecordingOverlay::default();

        let armed = apply_command(
            &shared,
            &navigator,
            &frame,
            OperatorCommand::Arm(Some(target)),
            &mut overlay,
        );
        assert!(armed);
        assert!(overlay.boundary_visible && overlay.center_visible);
        assert_eq!(overlay.center, Some(target.center()));
        assert!(shared.navigation.read().ready);

        let armed = apply_command(
            &shared,
            &navigator,
            &frame,
            OperatorCommand::Disarm,
            &mut overlay,
        );
        assert!(!armed);
        assert!(!overlay.boundary_visible && !overlay.center_visible);
        assert!(!shared.navigation.read().ready);
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = FollowConfig {
            ensemble_size: 0,
            ..Default::default()
        };
        let res = Scheduler::spawn(
            &cfg,
            echo,
            VecSource::new(Vec::new()),
            SharedActuator::default(),
            NullOverlay,
        );
        assert!(matches!(res, Err(ConfigError::EmptyEnsemble)));
    }
}
