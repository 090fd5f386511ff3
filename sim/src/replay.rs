//! Replay: serialize/deserialize run logs for offline analysis.

use follow_core::{metrics::FollowMetrics, BoundingBox, FollowConfig, StepOutput};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A full recorded run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayLog {
    pub scenario_name: String,
    pub seed: u64,
    pub frame_dt: f64,
    pub duration: f64,
    pub config: FollowConfig,
    /// One record per frame, in order
    pub frames: Vec<FrameRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameRecord {
    pub time: f64,
    /// Camera position when the frame was taken
    pub camera: [f64; 3],
    /// True target box when visible and unoccluded
    pub truth: Option<BoundingBox>,
    pub step: StepOutput,
}

/// Save a replay log to a JSON file.
pub fn save_replay(log: &ReplayLog, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, log)?;
    Ok(())
}

/// Load a replay log from a JSON file.
pub fn load_replay(path: &Path) -> anyhow::Result<ReplayLog> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let log: ReplayLog = serde_json::from_reader(reader)?;
    Ok(log)
}

/// Re-score a recorded run.
pub fn replay_metrics(log: &ReplayLog) -> FollowMetrics {
    let mut metrics = FollowMetrics::default();
    for rec in &log.frames {
        metrics.accumulate(&rec.step, rec.truth.map(|b| b.center()));
    }
    metrics
}
