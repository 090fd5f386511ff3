//! `follow_core`: Ensemble tracking and guidance for camera-following platforms.
//!
//! # Module layout
//! - [`types`]: Pixel geometry, axis displacements, grid cells, commands
//! - [`capability`]: Injected collaborators (tracker, frames, actuator, overlay, detector)
//! - [`config`]: `FollowConfig` and its validation
//! - [`seeding`]: Perturbed seed boxes for arming
//! - [`border`]: Border-contact watchdog
//! - [`slot`]: One ensemble member and its status
//! - [`voting`]: Mutual-distance outlier voting
//! - [`consensus`]: Consensus selection strategies
//! - [`ensemble`]: Ensemble consensus tracker (arm / update / lost)
//! - [`navigator`]: Consensus box → clamped (x, y, z) displacement
//! - [`guidance`]: Deadband, edge-triggered stop, 3×3 grid cell
//! - [`grid`]: 3×3 screen partition geometry
//! - [`select`]: Reference-box selection from recognition results
//! - [`follow_loop`]: Deterministic single-threaded orchestrator
//! - [`scheduler`]: Threaded dual-rate runtime
//! - [`metrics`]: RMSE, precision/recall, loss and command counts

pub mod border;
pub mod capability;
pub mod config;
pub mod consensus;
pub mod ensemble;
pub mod error;
pub mod follow_loop;
pub mod grid;
pub mod guidance;
pub mod metrics;
pub mod navigator;
pub mod scheduler;
pub mod seeding;
pub mod select;
pub mod slot;
pub mod types;
pub mod voting;

#[cfg(test)]
pub(crate) mod testing;

pub use capability::{
    Detection, Detector, Frame, FrameSource, MotionActuator, NullOverlay, Overlay, SingleTracker,
    TrackerFactory,
};
pub use config::{ConsensusStrategy, FollowConfig};
pub use ensemble::{EnsembleEvent, EnsembleOutput, EnsembleSnapshot, EnsembleStatus, EnsembleTracker};
pub use error::{AcquisitionFailure, ActuatorError, ConfigError};
pub use follow_loop::{FollowLoop, StepOutput};
pub use guidance::{GuidanceController, MotionState};
pub use navigator::{Navigation, Navigator};
pub use scheduler::{OperatorCommand, Scheduler};
pub use slot::SlotStatus;
pub use types::{BoundingBox, Center, FrameSize, GridCell, Location, MotionCommand, SlotId};
pub use voting::VoteRule;
