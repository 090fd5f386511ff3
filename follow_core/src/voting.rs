//! Mutual-distance outlier voting between ensemble members.
//!
//! Every slot with a box votes on every other: a pair "disagrees" when the
//! Euclidean distance between their centers exceeds the threshold. A slot that
//! disagrees with at least `min_far` others has most likely snapped onto a
//! different object.
//!
//! With [`VoteRule::Majority`] a slot must also disagree with more slots than
//! it agrees with, so a majority cluster stays intact when two strays
//! disagree with every member of it. [`VoteRule::MinFar`] applies the
//! `min_far` count alone.
//!
//! Cost is O(k²) in the number of valid slots; k is small.

use crate::types::Center;
use serde::{Deserialize, Serialize};

/// Which slots a voting round flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteRule {
    /// Far from at least `min_far` others, and from more than it is near
    #[default]
    Majority,
    /// Far from at least `min_far` others
    MinFar,
}

/// Result of one voting round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteResult {
    /// (slot index, number of disagreeing neighbours), in input order
    pub far_counts: Vec<(usize, usize)>,
    /// Slot indices flagged as outliers, ascending
    pub outliers: Vec<usize>,
}

impl VoteResult {
    pub fn is_outlier(&self, slot: usize) -> bool {
        self.outliers.binary_search(&slot).is_ok()
    }

    pub fn far_count(&self, slot: usize) -> usize {
        self.far_counts
            .iter()
            .find(|(i, _)| *i == slot)
            .map_or(0, |(_, n)| *n)
    }
}

/// Vote over `(slot index, center)` candidates.
pub fn mutual_distance_vote(
    candidates: &[(usize, Center)],
    threshold: f64,
    min_far: usize,
    rule: VoteRule,
) -> VoteResult {
    let mut far_counts = Vec::with_capacity(candidates.len());
    let mut outliers = Vec::new();

    for (a, (slot_a, center_a)) in candidates.iter().enumerate() {
        let far = candidates
            .iter()
            .enumerate()
            .filter(|(b, (_, center_b))| *b != a && center_a.distance(center_b) > threshold)
            .count();
        let near = candidates.len() - 1 - far;
        far_counts.push((*slot_a, far));
        let majority = match rule {
            VoteRule::Majority => far > near,
            VoteRule::MinFar => true,
        };
        if min_far > 0 && far >= min_far && majority {
            outliers.push(*slot_a);
        }
    }
    outliers.sort_unstable();

    VoteResult {
        far_counts,
        outliers,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
