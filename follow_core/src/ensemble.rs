//! Ensemble consensus tracker.
//!
//! # Processing steps per frame
//! 1. Step every slot's tracker (optionally on the rayon pool; joined before 2)
//! 2. Border watchdog per slot (inside the slot step)
//! 3. Count lost slots, advance the scan pointer past leading failures
//! 4. Mutual-distance voting over slots that produced a box
//! 5. Quorum check: `lost_count ≥ lost_quorum` or scan pointer exhausted ⇒ lost
//! 6. Consensus selection among the surviving slots
//!
//! Lost is a state, not an error: once lost, `update` is a no-op until the
//! next `arm`.

use crate::{
    border::BorderTimeoutGuard,
    capability::{Frame, TrackerFactory},
    config::{ConsensusStrategy, FollowConfig},
    consensus::select_consensus,
    error::ConfigError,
    seeding::seed_boxes,
    slot::{SlotStatus, TrackerSlot},
    types::{BoundingBox, Center, SlotId},
    voting::{mutual_distance_vote, VoteRule},
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Top-level ensemble state. `Tracking` and `Lost` are mutually exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnsembleStatus {
    /// Never armed, or armed without a reference box
    #[default]
    Idle,
    Tracking,
    Lost,
}

/// Transitions surfaced to consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnsembleEvent {
    Armed { slots: usize },
    /// Consensus loss: consumers must stop issuing motion and await re-arm
    Lost { lost_count: usize, exhausted: bool },
    Disarmed,
}

/// Read-only copy of the consensus state handed to navigation and UI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleSnapshot {
    pub status: EnsembleStatus,
    pub consensus_box: Option<BoundingBox>,
}

impl EnsembleSnapshot {
    pub fn is_tracking(&self) -> bool {
        self.status == EnsembleStatus::Tracking
    }

    pub fn is_lost(&self) -> bool {
        self.status == EnsembleStatus::Lost
    }

    /// Derived from the consensus box.
    pub fn center(&self) -> Option<Center> {
        self.consensus_box.map(|b| b.center())
    }
}

// ---------------------------------------------------------------------------
// Per-frame output
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotReport {
    pub id: SlotId,
    pub bbox: Option<BoundingBox>,
    pub status: SlotStatus,
    /// Disagreeing neighbours in this frame's vote
    pub far_neighbors: usize,
    /// Consecutive frames this slot has been lost
    pub misses: u32,
}

/// Everything one `update` produced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnsembleOutput {
    pub snapshot: EnsembleSnapshot,
    pub slots: Vec<SlotReport>,
    pub lost_count: usize,
    pub scan_pointer: usize,
    pub event: Option<EnsembleEvent>,
    /// Wall-clock time of processing
    pub total_time_us: u64,
}

impl EnsembleOutput {
    pub fn count(&self, status: SlotStatus) -> usize {
        self.slots.iter().filter(|s| s.status == status).count()
    }
}

// ---------------------------------------------------------------------------
// Ensemble
// ---------------------------------------------------------------------------

/// Settings the ensemble reads from [`FollowConfig`].
#[derive(Clone, Debug)]
struct EnsembleSettings {
    size: usize,
    lost_quorum: usize,
    outlier_distance: f64,
    outlier_min_far: usize,
    vote_rule: VoteRule,
    seed_offset: i32,
    random_seed_range: i32,
    strategy: ConsensusStrategy,
    parallel: bool,
    border_margin: i32,
    border_timeout: f64,
}

impl From<&FollowConfig> for EnsembleSettings {
    fn from(c: &FollowConfig) -> Self {
        Self {
            size: c.ensemble_size,
            lost_quorum: c.lost_quorum,
            outlier_distance: c.outlier_distance_threshold,
            outlier_min_far: c.outlier_min_far_neighbors,
            vote_rule: c.outlier_vote_rule,
            seed_offset: c.seed_offset_px,
            random_seed_range: c.random_seed_range_px,
            strategy: c.consensus_strategy,
            parallel: c.parallel_update,
            border_margin: c.border_margin_px,
            border_timeout: c.border_lost_timeout_seconds,
        }
    }
}

/// N independently constructed trackers voting on one target.
pub struct EnsembleTracker<F: ?Sized> {
    settings: EnsembleSettings,
    factory: Box<dyn TrackerFactory<F>>,
    slots: Vec<TrackerSlot<F>>,
    status: EnsembleStatus,
    consensus_box: Option<BoundingBox>,
    rng: ChaCha8Rng,
}

impl<F: Frame + Sync + ?Sized> EnsembleTracker<F> {
    /// Create an unarmed ensemble. The factory is invoked once per slot on
    /// every `arm`.
    pub fn new(
        config: &FollowConfig,
        factory: impl TrackerFactory<F> + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            settings: EnsembleSettings::from(config),
            factory: Box::new(factory),
            slots: Vec::new(),
            status: EnsembleStatus::Idle,
            consensus_box: None,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        })
    }

    /// Seed N fresh trackers around `reference` on `frame`.
    ///
    /// Without a reference the ensemble is torn down to `Idle` and `None` is
    /// returned.
    pub fn arm(&mut self, frame: &F, reference: Option<BoundingBox>) -> Option<EnsembleEvent> {
        let Some(reference) = reference.filter(BoundingBox::is_valid) else {
            tracing::debug!("arm without a reference box");
            self.disarm();
            return None;
        };

        self.teardown();
        let s = &self.settings;
        let seeds = seed_boxes(
            reference,
            s.size,
            s.seed_offset,
            s.random_seed_range,
            &mut self.rng,
        );
        let (margin, timeout) = (s.border_margin, s.border_timeout);

        for (i, seed) in seeds.into_iter().enumerate() {
            let tracker = self.factory.create(i);
            let guard = BorderTimeoutGuard::new(margin, timeout);
            self.slots
                .push(TrackerSlot::arm(SlotId(i), tracker, frame, seed, Some(guard)));
        }

        self.status = EnsembleStatus::Tracking;
        self.consensus_box = Some(reference);
        tracing::info!(slots = self.slots.len(), %reference, "ensemble armed");
        Some(EnsembleEvent::Armed {
            slots: self.slots.len(),
        })
    }

    /// Process one frame.
    pub fn update(&mut self, frame: &F) -> EnsembleOutput {
        let start = Instant::now();
        if self.status != EnsembleStatus::Tracking {
            return EnsembleOutput {
                snapshot: self.snapshot(),
                ..Default::default()
            };
        }

        // Step 1-2: trackers + border watchdogs
        if self.settings.parallel && self.slots.len() > 1 {
            self.slots.par_iter_mut().for_each(|slot| {
                slot.step(frame);
            });
        } else {
            for slot in &mut self.slots {
                slot.step(frame);
            }
        }

        // Step 3: primitive losses and scan pointer
        let mut lost_count = 0;
        let mut scan_pointer = 0;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.status.is_lost() {
                lost_count += 1;
                if scan_pointer == i {
                    scan_pointer += 1;
                }
            }
        }

        // Step 4: voting among slots with a box
        let candidates: Vec<(usize, Center)> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.status == SlotStatus::Active)
            .filter_map(|(i, s)| s.center().map(|c| (i, c)))
            .collect();
        let vote = mutual_distance_vote(
            &candidates,
            self.settings.outlier_distance,
            self.settings.outlier_min_far,
            self.settings.vote_rule,
        );
        for &i in &vote.outliers {
            self.slots[i].mark_outlier();
            lost_count += 1;
        }
        if !vote.outliers.is_empty() {
            tracing::debug!(outliers = ?vote.outliers, "slots voted out");
        }

        let reports: Vec<SlotReport> = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, s)| SlotReport {
                id: s.id,
                bbox: s.bbox,
                status: s.status,
                far_neighbors: vote.far_count(i),
                misses: s.misses,
            })
            .collect();

        // Step 5-6: quorum, then consensus
        let exhausted = scan_pointer >= self.slots.len();
        let survivors: Vec<(usize, BoundingBox)> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.status == SlotStatus::Active)
            .filter_map(|(i, s)| s.bbox.map(|b| (i, b)))
            .collect();
        let consensus = select_consensus(self.settings.strategy, &survivors);

        let event = match consensus {
            Some(b) if !exhausted && lost_count < self.settings.lost_quorum => {
                self.consensus_box = Some(b);
                None
            }
            _ => {
                tracing::info!(lost_count, exhausted, "ensemble lost target");
                self.on_lost();
                Some(EnsembleEvent::Lost {
                    lost_count,
                    exhausted,
                })
            }
        };

        EnsembleOutput {
            snapshot: self.snapshot(),
            slots: reports,
            lost_count,
            scan_pointer,
            event,
            total_time_us: start.elapsed().as_micros() as u64,
        }
    }
}

impl<F: ?Sized> EnsembleTracker<F> {
    /// Enter the terminal `Lost` state and reset every tracker.
    pub fn on_lost(&mut self) {
        self.status = EnsembleStatus::Lost;
        self.consensus_box = None;
        for slot in &mut self.slots {
            slot.reset();
        }
    }

    /// Tear down all slots and return to `Idle`.
    pub fn disarm(&mut self) -> Option<EnsembleEvent> {
        let was_armed = !self.slots.is_empty();
        self.teardown();
        self.status = EnsembleStatus::Idle;
        self.consensus_box = None;
        was_armed.then_some(EnsembleEvent::Disarmed)
    }

    pub fn snapshot(&self) -> EnsembleSnapshot {
        EnsembleSnapshot {
            status: self.status,
            consensus_box: self.consensus_box,
        }
    }

    pub fn status(&self) -> EnsembleStatus {
        self.status
    }

    pub fn slots(&self) -> &[TrackerSlot<F>] {
        &self.slots
    }

    pub fn size(&self) -> usize {
        self.settings.size
    }

    fn teardown(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
        self.slots.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
