//! Follow metrics: center-error RMSE, tracking precision/recall, loss and
//! command statistics.

use crate::{
    ensemble::EnsembleEvent,
    follow_loop::StepOutput,
    slot::SlotStatus,
    types::{Center, GridCell, MotionCommand},
};
use serde::{Deserialize, Serialize};

/// Consensus centers farther than this from the truth count as wrong-target
/// (pixels).
pub const MATCH_RADIUS_PX: f64 = 50.0;

/// Accumulated metric statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FollowMetrics {
    /// Number of frames evaluated
    pub n_frames: u64,
    /// Frames with a consensus box
    pub n_tracking: u64,
    /// Frames where the consensus matched the true target
    pub n_matched: u64,
    /// Sum of squared center errors over matched frames (for RMSE)
    pub sum_sq_center_err: f64,
    /// Tracking the true target while it was visible
    pub true_positives: u64,
    /// Tracking while the target was invisible, or tracking something else
    pub false_positives: u64,
    /// Target visible but not tracked
    pub false_negatives: u64,
    pub lost_events: u64,
    pub slot_failures: u64,
    pub slot_outliers: u64,
    pub slot_border_timeouts: u64,
    pub move_commands: u64,
    pub stop_commands: u64,
    /// Frames whose grid cell was the center cell
    pub centred_frames: u64,
}

impl FollowMetrics {
    /// Root-mean-square center error (pixels).
    pub fn rmse_center(&self) -> f64 {
        if self.n_matched == 0 {
            return 0.0;
        }
        (self.sum_sq_center_err / self.n_matched as f64).sqrt()
    }

    /// Precision = TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        let denom = (self.true_positives + self.false_positives) as f64;
        if denom == 0.0 { 1.0 } else { self.true_positives as f64 / denom }
    }

    /// Recall = TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        let denom = (self.true_positives + self.false_negatives) as f64;
        if denom == 0.0 { 1.0 } else { self.true_positives as f64 / denom }
    }

    pub fn tracking_ratio(&self) -> f64 {
        if self.n_frames == 0 {
            return 0.0;
        }
        self.n_tracking as f64 / self.n_frames as f64
    }

    /// Accumulate one step. `truth` is the true target center when the
    /// target is visible in the frame.
    pub fn accumulate(&mut self, step: &StepOutput, truth: Option<Center>) {
        self.n_frames += 1;

        let out = &step.ensemble;
        self.slot_failures += out.count(SlotStatus::Failed) as u64;
        self.slot_outliers += out.count(SlotStatus::Outlier) as u64;
        self.slot_border_timeouts += out.count(SlotStatus::BorderTimeout) as u64;
        if matches!(out.event, Some(EnsembleEvent::Lost { .. })) {
            self.lost_events += 1;
        }

        for cmd in &step.commands {
            match cmd {
                MotionCommand::Move(_) => self.move_commands += 1,
                MotionCommand::Stop { .. } => self.stop_commands += 1,
            }
        }
        if step.cell == Some(GridCell::CENTER) {
            self.centred_frames += 1;
        }

        let estimate = out.snapshot.center();
        if estimate.is_some() {
            self.n_tracking += 1;
        }
        match (estimate, truth) {
            (Some(est), Some(gt)) => {
                let d = est.distance(&gt);
                if d <= MATCH_RADIUS_PX {
                    self.sum_sq_center_err += d * d;
                    self.n_matched += 1;
                    self.true_positives += 1;
                } else {
                    self.false_positives += 1;
                    self.false_negatives += 1;
                }
            }
            (Some(_), None) => self.false_positives += 1,
            (None, Some(_)) => self.false_negatives += 1,
            (None, None) => {}
        }
    }
}
