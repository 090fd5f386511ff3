//! Test doubles shared by the unit tests of this crate.

use crate::{
    capability::{Frame, FrameSource, MotionActuator, Overlay, SingleTracker},
    error::{AcquisitionFailure, ActuatorError},
    types::{BoundingBox, Center, FrameSize, GridCell, Location, MotionCommand},
};
use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

#[derive(Clone, Debug)]
pub struct TestFrame {
    pub size: FrameSize,
    pub timestamp: f64,
}

impl TestFrame {
    pub fn new(width: u32, height: u32, timestamp: f64) -> Self {
        Self {
            size: FrameSize::new(width, height),
            timestamp,
        }
    }
}

impl Frame for TestFrame {
    fn size(&self) -> FrameSize {
        self.size
    }
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// Counts lifecycle calls across clones.
#[derive(Clone, Debug, Default)]
pub struct CallCounts {
    pub inits: Arc<AtomicUsize>,
    pub resets: Arc<AtomicUsize>,
    pub updates: Arc<AtomicUsize>,
}

impl CallCounts {
    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

/// Replays a fixed script of results; the last entry repeats forever.
/// An empty script echoes the init box.
pub struct ScriptedTracker {
    script: Vec<Option<BoundingBox>>,
    cursor: usize,
    init_box: Option<BoundingBox>,
    timeout_capable: bool,
    counts: CallCounts,
}

impl ScriptedTracker {
    pub fn new(script: Vec<Option<BoundingBox>>) -> Self {
        Self {
            script,
            cursor: 0,
            init_box: None,
            timeout_capable: true,
            counts: CallCounts::default(),
        }
    }

    pub fn repeating(b: BoundingBox) -> Self {
        Self::new(vec![Some(b)])
    }

    /// Echo whatever box the tracker was initialised with.
    pub fn echo() -> Self {
        Self::new(Vec::new())
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout_capable = false;
        self
    }

    pub fn with_counts(mut self, counts: CallCounts) -> Self {
        self.counts = counts;
        self
    }
}

impl<F: ?Sized> SingleTracker<F> for ScriptedTracker {
    fn init(&mut self, _frame: &F, bbox: BoundingBox) {
        self.counts.inits.fetch_add(1, Ordering::SeqCst);
        self.init_box = Some(bbox);
        self.cursor = 0;
    }

    fn update(&mut self, _frame: &F) -> Result<BoundingBox, AcquisitionFailure> {
        self.counts.updates.fetch_add(1, Ordering::SeqCst);
        if self.script.is_empty() {
            return self.init_box.ok_or(AcquisitionFailure::NotInitialised);
        }
        let idx = self.cursor.min(self.script.len() - 1);
        self.cursor += 1;
        self.script[idx].ok_or(AcquisitionFailure::NoTarget)
    }

    fn reset(&mut self) {
        self.counts.resets.fetch_add(1, Ordering::SeqCst);
        self.init_box = None;
        self.cursor = 0;
    }

    fn timeout_capable(&self) -> bool {
        self.timeout_capable
    }
}

/// Records every command it receives.
#[derive(Clone, Debug, Default)]
pub struct RecordingActuator {
    pub commands: Vec<MotionCommand>,
    pub fail_moves: bool,
}

impl RecordingActuator {
    pub fn stops(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, MotionCommand::Stop { .. }))
            .count()
    }

    pub fn moves(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, MotionCommand::Move(_)))
            .count()
    }
}

impl MotionActuator for RecordingActuator {
    fn move_axes(&mut self, x_axis: f64, y_axis: f64, z_axis: f64) -> Result<(), ActuatorError> {
        if self.fail_moves {
            return Err(ActuatorError::Disconnected);
        }
        self.commands
            .push(MotionCommand::Move(Location::new(x_axis, y_axis, z_axis)));
        Ok(())
    }

    fn stop(&mut self, abrupt: bool) -> Result<(), ActuatorError> {
        self.commands.push(MotionCommand::Stop { abrupt });
        Ok(())
    }
}

/// Recording actuator that can be handed to another thread.
#[derive(Clone, Debug, Default)]
pub struct SharedActuator(pub Arc<Mutex<RecordingActuator>>);

impl SharedActuator {
    pub fn commands(&self) -> Vec<MotionCommand> {
        self.0.lock().commands.clone()
    }
}

impl MotionActuator for SharedActuator {
    fn move_axes(&mut self, x_axis: f64, y_axis: f64, z_axis: f64) -> Result<(), ActuatorError> {
        self.0.lock().move_axes(x_axis, y_axis, z_axis)
    }

    fn stop(&mut self, abrupt: bool) -> Result<(), ActuatorError> {
        self.0.lock().stop(abrupt)
    }
}

/// Finite frame source, optionally paced.
pub struct VecSource {
    frames: VecDeque<TestFrame>,
    pace: Option<Duration>,
}

impl VecSource {
    pub fn new(frames: Vec<TestFrame>) -> Self {
        Self {
            frames: frames.into(),
            pace: None,
        }
    }

    pub fn paced(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }
}

impl FrameSource<TestFrame> for VecSource {
    fn next_frame(&mut self) -> Option<TestFrame> {
        if let Some(p) = self.pace {
            std::thread::sleep(p);
        }
        self.frames.pop_front()
    }
}

#[derive(Debug, Default)]
pub struct RecordingOverlay {
    pub highlighted: Vec<GridCell>,
    pub highlight_area: Option<BoundingBox>,
    pub boundary: Option<BoundingBox>,
    pub boundary_visible: bool,
    pub center: Option<Center>,
    pub center_visible: bool,
}

impl Overlay for RecordingOverlay {
    fn show_boundary(&mut self) {
        self.boundary_visible = true;
    }
    fn hide_boundary(&mut self) {
        self.boundary_visible = false;
    }
    fn update_boundary(&mut self, bbox: BoundingBox) {
        self.boundary = Some(bbox);
    }
    fn highlight(&mut self, cell: GridCell, area: BoundingBox) {
        self.highlighted.push(cell);
        self.highlight_area = Some(area);
    }
    fn show_center(&mut self) {
        self.center_visible = true;
    }
    fn hide_center(&mut self) {
        self.center_visible = false;
    }
    fn update_center(&mut self, center: Center) {
        self.center = Some(center);
    }
}
