//! TrackerSlot: one ensemble member, its tracker, status and border watchdog.

use crate::{
    border::{BorderTimeoutGuard, BorderVerdict},
    capability::{Frame, SingleTracker},
    error::AcquisitionFailure,
    types::{BoundingBox, Center, SlotId},
};
use serde::{Deserialize, Serialize};

/// Per-frame status of a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    /// Armed, no frame processed yet
    Idle,
    /// Produced a box this frame and passed voting
    Active,
    /// Primitive reported failure this frame (retried next frame)
    Failed,
    /// Produced a box but was voted out this frame (retried next frame)
    Outlier,
    /// Border watchdog expired; stays lost until re-arm
    BorderTimeout,
}

impl SlotStatus {
    pub fn is_lost(self) -> bool {
        matches!(
            self,
            SlotStatus::Failed | SlotStatus::Outlier | SlotStatus::BorderTimeout
        )
    }
}

/// One ensemble member. Owns exactly one tracker instance.
pub struct TrackerSlot<F: ?Sized> {
    pub id: SlotId,
    /// Box the tracker was initialised with
    pub seed: BoundingBox,
    /// Last box reported by the tracker (None when failed / reset)
    pub bbox: Option<BoundingBox>,
    pub status: SlotStatus,
    /// Consecutive frames lost
    pub misses: u32,
    tracker: Box<dyn SingleTracker<F>>,
    border: Option<BorderTimeoutGuard>,
}

impl<F: Frame + ?Sized> TrackerSlot<F> {
    /// Wrap a freshly built tracker and initialise it on `frame`.
    pub fn arm(
        id: SlotId,
        mut tracker: Box<dyn SingleTracker<F>>,
        frame: &F,
        seed: BoundingBox,
        border: Option<BorderTimeoutGuard>,
    ) -> Self {
        tracker.init(frame, seed);
        let border = if tracker.timeout_capable() { border } else { None };
        Self {
            id,
            seed,
            bbox: Some(seed),
            status: SlotStatus::Idle,
            misses: 0,
            tracker,
            border,
        }
    }

    /// Run the tracker on `frame` and the border watchdog on its result.
    ///
    /// Sets the status to `Active`, `Failed` or `BorderTimeout`; voting may
    /// later demote an `Active` slot to `Outlier`.
    pub fn step(&mut self, frame: &F) -> SlotStatus {
        if self.status == SlotStatus::BorderTimeout {
            self.register_miss();
            return self.status;
        }

        let result = self
            .tracker
            .update(frame)
            .and_then(|b| if b.is_valid() { Ok(b) } else { Err(AcquisitionFailure::DegenerateBox) });

        match result {
            Ok(b) => {
                if let Some(guard) = &mut self.border {
                    if let BorderVerdict::TimedOut { elapsed } =
                        guard.observe(&b, frame.size(), frame.timestamp())
                    {
                        tracing::debug!(slot = %self.id, elapsed, "border timeout");
                        self.bbox = None;
                        self.status = SlotStatus::BorderTimeout;
                        self.register_miss();
                        return self.status;
                    }
                }
                self.bbox = Some(b);
                self.status = SlotStatus::Active;
                self.misses = 0;
            }
            Err(reason) => {
                tracing::debug!(slot = %self.id, %reason, "acquisition failure");
                self.bbox = None;
                self.status = SlotStatus::Failed;
                self.register_miss();
            }
        }
        self.status
    }

    /// Demote an active slot after voting.
    pub fn mark_outlier(&mut self) {
        if self.status == SlotStatus::Active {
            self.status = SlotStatus::Outlier;
            self.register_miss();
        }
    }
}

impl<F: ?Sized> TrackerSlot<F> {
    /// Re-initialise the underlying tracker and forget all per-target state.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.bbox = None;
        self.status = SlotStatus::Idle;
        self.misses = 0;
        if let Some(guard) = &mut self.border {
            guard.reset();
        }
    }

    /// Seconds of border contact at `now` (0 without a watchdog).
    pub fn border_elapsed(&self, now: f64) -> f64 {
        self.border.as_ref().map_or(0.0, |g| g.elapsed(now))
    }

    pub fn center(&self) -> Option<Center> {
        self.bbox.map(|b| b.center())
    }

    fn register_miss(&mut self) {
        self.misses = self.misses.saturating_add(1);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
