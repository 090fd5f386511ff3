//! `sim`: Scenario simulator: scene, simulated tracker and platform,
//! stepped and realtime runners, replay.

pub mod frame;
pub mod replay;
pub mod runner;
pub mod scenarios;
pub mod scene;
pub mod sim_tracker;
pub mod source;
pub mod target;
pub mod vehicle;

pub use frame::SimFrame;
pub use replay::{load_replay, replay_metrics, save_replay, FrameRecord, ReplayLog};
pub use runner::{RunOutcome, ScenarioRunner};
pub use scenarios::{Scenario, ScenarioKind};
pub use scene::Scene;
pub use sim_tracker::{tracker_factory, SimDetector, SimTracker, SimTrackerParams};
pub use source::{run_realtime, RealtimeOutcome, SimFrameSource};
pub use target::{MotionSpec, Target};
pub use vehicle::{CommandKind, SharedPlatform, SimPlatform};
