//! Consensus selection among the slots that survived this frame.

use crate::{config::ConsensusStrategy, types::BoundingBox};

/// Pick the consensus box from `(slot index, box)` candidates given in slot
/// order. Returns `None` when there is nothing to choose from.
pub fn select_consensus(
    strategy: ConsensusStrategy,
    candidates: &[(usize, BoundingBox)],
) -> Option<BoundingBox> {
    match strategy {
        ConsensusStrategy::FirstValid => candidates.first().map(|(_, b)| *b),
        ConsensusStrategy::Centroid => centroid(candidates),
    }
}

/// Component-wise mean of the candidate boxes, rounded to the nearest pixel.
fn centroid(candidates: &[(usize, BoundingBox)]) -> Option<BoundingBox> {
    if candidates.is_empty() {
        return None;
    }
    let n = candidates.len() as f64;
    let (mut x, mut y, mut w, mut h) = (0.0, 0.0, 0.0, 0.0);
    for (_, b) in candidates {
        x += b.x as f64;
        y += b.y as f64;
        w += b.w as f64;
        h += b.h as f64;
    }
    BoundingBox::new(
        (x / n).round() as i32,
        (y / n).round() as i32,
        (w / n).round() as i32,
        (h / n).round() as i32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(x: i32, y: i32) -> BoundingBox {
        BoundingBox::new(x, y, 40, 40).unwrap()
    }

    #[test]
    fn first_valid_prefers_lowest_index() {
        let cands = vec![(2, b(10, 10)), (3, b(20, 20))];
        assert_eq!(
            select_consensus(ConsensusStrategy::FirstValid, &cands),
            Some(b(10, 10))
        );
    }

    #[test]
    fn centroid_averages() {
        let cands = vec![(0, b(10, 10)), (1, b(20, 30)), (4, b(30, 20))];
        assert_eq!(
            select_consensus(ConsensusStrategy::Centroid, &cands),
            Some(b(20, 20))
        );
    }

    #[test]
    fn empty_candidates() {
        assert_eq!(select_consensus(ConsensusStrategy::Centroid, &[]), None);
        assert_eq!(select_consensus(ConsensusStrategy::FirstValid, &[]), None);
    }
}
