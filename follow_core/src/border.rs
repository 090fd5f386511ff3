//! Border watchdog for one tracker slot.
//!
//! A box that keeps touching the frame edge usually means the target left the
//! field of view while the primitive is still "tracking" background. After
//! `timeout` seconds of uninterrupted contact the slot is declared lost.

use crate::types::{BoundingBox, FrameSize};
use serde::{Deserialize, Serialize};

/// Outcome of one border observation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum BorderVerdict {
    /// Box is clear of the border
    Clear,
    /// Box touches the border; contact has lasted `elapsed` seconds
    Touching { elapsed: f64 },
    /// Contact lasted at least the timeout
    TimedOut { elapsed: f64 },
}

#[derive(Clone, Debug)]
pub struct BorderTimeoutGuard {
    margin_px: i32,
    timeout: f64,
    /// Frame time of the first touch in the current contact run
    touched_since: Option<f64>,
}

impl BorderTimeoutGuard {
    pub fn new(margin_px: i32, timeout_seconds: f64) -> Self {
        Self {
            margin_px,
            timeout: timeout_seconds,
            touched_since: None,
        }
    }

    /// Feed the slot's box for the frame captured at `now`.
    pub fn observe(&mut self, bbox: &BoundingBox, frame: FrameSize, now: f64) -> BorderVerdict {
        if !bbox.touches_border(frame, self.margin_px) {
            self.touched_since = None;
            return BorderVerdict::Clear;
        }
        let since = *self.touched_since.get_or_insert(now);
        let elapsed = (now - since).max(0.0);
        if elapsed >= self.timeout {
            BorderVerdict::TimedOut { elapsed }
        } else {
            BorderVerdict::Touching { elapsed }
        }
    }

    /// Seconds of continuous contact as of `now` (0 when clear).
    pub fn elapsed(&self, now: f64) -> f64 {
        self.touched_since.map_or(0.0, |t| (now - t).max(0.0))
    }

    pub fn is_touching(&self) -> bool {
        self.touched_since.is_some()
    }

    pub fn reset(&mut self) {
        self.touched_since = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
