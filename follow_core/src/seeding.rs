//! Perturbed seed boxes for the ensemble.
//!
//! Seed order: the reference box, its four diagonal copies
//! (up-left, up-right, low-left, low-right), then uniformly jittered copies
//! when more than five slots are requested. Sizes are never perturbed.

use crate::types::BoundingBox;
use rand::Rng;

/// Number of deterministic seeds (reference + four diagonals).
pub const FIXED_SEEDS: usize = 5;

/// Build `n` seed boxes around `reference`.
pub fn seed_boxes<R: Rng + ?Sized>(
    reference: BoundingBox,
    n: usize,
    offset: i32,
    random_range: i32,
    rng: &mut R,
) -> Vec<BoundingBox> {
    let d = offset;
    let fixed = [(0, 0), (-d, d), (d, d), (-d, -d), (d, -d)];

    let mut seeds: Vec<BoundingBox> = fixed
        .iter()
        .take(n)
        .map(|&(dx, dy)| reference.translated(dx, dy))
        .collect();

    while seeds.len() < n {
        let dx = rng.gen_range(-random_range..=random_range);
        let dy = rng.gen_range(-random_range..=random_range);
        seeds.push(reference.translated(dx, dy));
    }
    seeds
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
