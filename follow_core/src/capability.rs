//! Injected capabilities: the opaque collaborators the core drives.
//!
//! Nothing here is implemented by the core itself. Real deployments plug in a
//! camera, a visual tracker, a recogniser, an overlay and a flight controller;
//! the `sim` crate plugs in deterministic stand-ins.

use crate::{
    error::{AcquisitionFailure, ActuatorError},
    types::{BoundingBox, Center, FrameSize, GridCell},
};

/// A video frame as seen by the core. Pixel access is the primitive's business.
pub trait Frame {
    fn size(&self) -> FrameSize;
    /// Capture time in seconds on a monotonic clock.
    fn timestamp(&self) -> f64;
}

/// Single-object visual tracking primitive.
pub trait SingleTracker<F: ?Sized>: Send {
    /// Start tracking `bbox` on `frame`.
    fn init(&mut self, frame: &F, bbox: BoundingBox);

    /// Advance one frame.
    fn update(&mut self, frame: &F) -> Result<BoundingBox, AcquisitionFailure>;

    /// Drop any per-target state so a later `init` starts clean.
    fn reset(&mut self);

    /// Whether the border watchdog applies to this primitive.
    fn timeout_capable(&self) -> bool {
        true
    }
}

/// Builds one independent tracker per ensemble slot.
pub trait TrackerFactory<F: ?Sized>: Send {
    fn create(&mut self, slot: usize) -> Box<dyn SingleTracker<F>>;
}

impl<F, C> TrackerFactory<F> for C
where
    F: ?Sized,
    C: FnMut(usize) -> Box<dyn SingleTracker<F>> + Send,
{
    fn create(&mut self, slot: usize) -> Box<dyn SingleTracker<F>> {
        self(slot)
    }
}

/// Blocking frame producer. `None` means the stream has ended.
pub trait FrameSource<F>: Send {
    fn next_frame(&mut self) -> Option<F>;
}

/// Platform motion interface.
pub trait MotionActuator: Send {
    fn move_axes(&mut self, x_axis: f64, y_axis: f64, z_axis: f64) -> Result<(), ActuatorError>;
    fn stop(&mut self, abrupt: bool) -> Result<(), ActuatorError>;
}

/// Operator-facing overlay. All methods default to no-ops.
pub trait Overlay {
    fn show_boundary(&mut self) {}
    fn hide_boundary(&mut self) {}
    fn update_boundary(&mut self, _bbox: BoundingBox) {}
    fn show_center(&mut self) {}
    fn hide_center(&mut self) {}
    fn update_center(&mut self, _center: Center) {}
    /// Mark `cell`, covering `area` of the frame.
    fn highlight(&mut self, _cell: GridCell, _area: BoundingBox) {}
}

/// Overlay that draws nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullOverlay;

impl Overlay for NullOverlay {}

/// One result of the recognition capability.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Best matching identity, if any
    pub label: Option<String>,
    /// Distance to the best match (lower = more similar)
    pub match_distance: f64,
}

/// Object / face recognition capability.
pub trait Detector<F: ?Sized> {
    fn detect(&mut self, frame: &F) -> Vec<Detection>;
}
