//! Simulated single-object tracker and recognition.
//!
//! The tracker locks onto the scene object nearest its seed box and then
//! reports that object's box with:
//! - a seed offset that decays toward zero (re-centring)
//! - uniform per-frame noise and a random-walk drift
//! - random failures, much more likely while the target is occluded
//! - occasional snapping onto a nearby distractor
//!
//! Boxes are kept inside the frame, so an object that leaves the view is
//! reported stuck to the edge, as real correlation trackers do.

use crate::frame::{clip_into, SimFrame};
use follow_core::{AcquisitionFailure, BoundingBox, Detection, Detector, SingleTracker};
use nalgebra::Vector2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Behaviour of the simulated tracking primitive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimTrackerParams {
    /// Uniform noise half-width on the box origin (pixels)
    pub noise_px: f64,
    /// Fraction of the seed offset removed per update
    pub convergence: f64,
    /// Random-walk step half-width per update (pixels)
    pub drift_px: f64,
    /// Failure probability per update
    pub p_fail: f64,
    /// Failure probability per update while the target is occluded
    pub p_fail_occluded: f64,
    /// Distractors closer than this can capture the tracker (pixels)
    pub snap_radius: f64,
    /// Capture probability per update when a distractor is in range
    pub p_snap: f64,
    /// Whether the border watchdog applies
    pub timeout_capable: bool,
}

impl Default for SimTrackerParams {
    fn default() -> Self {
        Self {
            noise_px: 2.0,
            convergence: 0.3,
            drift_px: 0.3,
            p_fail: 0.01,
            p_fail_occluded: 0.8,
            snap_radius: 60.0,
            p_snap: 0.0,
            timeout_capable: true,
        }
    }
}

/// What the tracker is following.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lock {
    /// Nothing under the seed: keeps reporting the last box
    Background,
    Target,
    Distractor(usize),
}

pub struct SimTracker {
    params: SimTrackerParams,
    rng: ChaCha8Rng,
    lock: Lock,
    /// Box center minus object center (pixels)
    offset: Vector2<f64>,
    last: Option<BoundingBox>,
}

impl SimTracker {
    pub fn new(params: SimTrackerParams, seed: u64) -> Self {
        Self {
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
            lock: Lock::Background,
            offset: Vector2::zeros(),
            last: None,
        }
    }

    fn object_box(&self, frame: &SimFrame, lock: Lock) -> Option<BoundingBox> {
        match lock {
            Lock::Background => None,
            Lock::Target => frame.target,
            Lock::Distractor(i) => frame.distractors.get(i).copied(),
        }
    }

    fn uniform(&mut self, half_width: f64) -> f64 {
        if half_width <= 0.0 {
            return 0.0;
        }
        self.rng.gen::<f64>() * half_width * 2.0 - half_width
    }

    /// Maybe jump to a distractor near the current box.
    fn maybe_snap(&mut self, frame: &SimFrame, current: Vector2<f64>) {
        if self.lock != Lock::Target || self.params.p_snap <= 0.0 {
            return;
        }
        let nearest = frame
            .distractors
            .iter()
            .enumerate()
            .map(|(i, d)| (i, center_of(d)))
            .map(|(i, c)| (i, c, (c - current).norm()))
            .filter(|(_, _, dist)| *dist < self.params.snap_radius)
            .min_by(|a, b| a.2.total_cmp(&b.2));
        if let Some((i, c, _)) = nearest {
            if self.rng.gen::<f64>() < self.params.p_snap {
                self.lock = Lock::Distractor(i);
                self.offset = current - c;
            }
        }
    }
}

fn center_of(b: &BoundingBox) -> Vector2<f64> {
    Vector2::new(b.x as f64 + b.w as f64 / 2.0, b.y as f64 + b.h as f64 / 2.0)
}

impl SingleTracker<SimFrame> for SimTracker {
    fn init(&mut self, frame: &SimFrame, bbox: BoundingBox) {
        let seed = center_of(&bbox);
        let candidates = frame
            .target
            .map(|b| (Lock::Target, b))
            .into_iter()
            .chain(
                frame
                    .distractors
                    .iter()
                    .enumerate()
                    .map(|(i, b)| (Lock::Distractor(i), *b)),
            );
        let best = candidates
            .map(|(lock, b)| (lock, center_of(&b)))
            .min_by(|a, b| (a.1 - seed).norm().total_cmp(&(b.1 - seed).norm()));

        let reach = bbox.w.max(bbox.h) as f64;
        match best {
            Some((lock, c)) if (c - seed).norm() < reach => {
                self.lock = lock;
                self.offset = seed - c;
            }
            _ => {
                self.lock = Lock::Background;
                self.offset = Vector2::zeros();
            }
        }
        self.last = Some(bbox);
    }

    fn update(&mut self, frame: &SimFrame) -> Result<BoundingBox, AcquisitionFailure> {
        let last = self.last.ok_or(AcquisitionFailure::NotInitialised)?;

        let p_fail = if self.lock == Lock::Target && frame.occluded {
            self.params.p_fail_occluded
        } else {
            self.params.p_fail
        };
        if self.rng.gen::<f64>() < p_fail {
            return Err(AcquisitionFailure::NoTarget);
        }

        let Some(object) = self.object_box(frame, self.lock) else {
            if self.lock != Lock::Background {
                // Object gone from the scene
                return Err(AcquisitionFailure::NoTarget);
            }
            return Ok(last);
        };
        if self.lock == Lock::Target && frame.occluded {
            // Hold position on the occluder
            return Ok(last);
        }

        let drift = Vector2::new(
            self.uniform(self.params.drift_px),
            self.uniform(self.params.drift_px),
        );
        self.offset = self.offset * (1.0 - self.params.convergence.clamp(0.0, 1.0)) + drift;
        let current = center_of(&object) + self.offset;
        self.maybe_snap(frame, current);

        let object = self.object_box(frame, self.lock).unwrap_or(object);
        let c = center_of(&object) + self.offset;
        let nx = self.uniform(self.params.noise_px);
        let ny = self.uniform(self.params.noise_px);
        let raw = BoundingBox {
            x: (c.x - object.w as f64 / 2.0 + nx).round() as i32,
            y: (c.y - object.h as f64 / 2.0 + ny).round() as i32,
            w: object.w,
            h: object.h,
        };
        let b = clip_into(raw, frame.size);
        self.last = Some(b);
        Ok(b)
    }

    fn reset(&mut self) {
        self.lock = Lock::Background;
        self.offset = Vector2::zeros();
        self.last = None;
    }

    fn timeout_capable(&self) -> bool {
        self.params.timeout_capable
    }
}

/// Factory producing independently seeded trackers. Every arm gets fresh
/// random streams.
pub fn tracker_factory(
    params: SimTrackerParams,
    seed: u64,
) -> impl FnMut(usize) -> Box<dyn SingleTracker<SimFrame>> + Send {
    let mut generation = 0u64;
    move |slot: usize| {
        if slot == 0 {
            generation += 1;
        }
        let stream = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(generation << 16)
            .wrapping_add(slot as u64);
        Box::new(SimTracker::new(params.clone(), stream)) as Box<dyn SingleTracker<SimFrame>>
    }
}

// ---------------------------------------------------------------------------
// Recognition
// ---------------------------------------------------------------------------

/// Detector reporting every unoccluded object in view. The target is
/// recognised under `label`; distractors get a poor match.
#[derive(Clone, Debug)]
pub struct SimDetector {
    pub label: String,
    pub target_distance: f64,
    pub distractor_distance: f64,
}

impl Default for SimDetector {
    fn default() -> Self {
        Self {
            label: "target".into(),
            target_distance: 0.2,
            distractor_distance: 0.9,
        }
    }
}

impl Detector<SimFrame> for SimDetector {
    fn detect(&mut self, frame: &SimFrame) -> Vec<Detection> {
        let mut out = Vec::new();
        if let Some(b) = frame.visible_target().filter(|_| !frame.occluded) {
            out.push(Detection {
                bbox: clip_into(b, frame.size),
                label: Some(self.label.clone()),
                match_distance: self.target_distance,
            });
        }
        for d in &frame.distractors {
            if crate::frame::intersects(d, frame.size) {
                out.push(Detection {
                    bbox: clip_into(*d, frame.size),
                    label: None,
                    match_distance: self.distractor_distance,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use follow_core::FrameSize;

    fn frame(t: f64, target: Option<BoundingBox>) -> SimFrame {
        SimFrame {
            index: 0,
            timestamp: t,
            size: FrameSize::new(640, 480),
            target,
            occluded: false,
            distractors: Vec::new(),
        }
    }

    fn quiet() -> SimTrackerParams {
        SimTrackerParams {
            noise_px: 0.0,
            drift_px: 0.0,
            p_fail: 0.0,
            convergence: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn converges_onto_target() {
        let truth = BoundingBox::new(300, 215, 40, 50).unwrap();
        let mut t = SimTracker::new(quiet(), 1);
        t.init(&frame(0.0, Some(truth)), truth.translated(25, 25));
        let mut last = None;
        for i in 1..20 {
            last = Some(t.update(&frame(i as f64 * 0.03, Some(truth))).unwrap());
        }
        let b = last.unwrap();
        assert!((b.x - truth.x).abs() <= 1 && (b.y - truth.y).abs() <= 1);
    }

    #[test]
    fn target_leaving_view_sticks_to_edge() {
        let mut t = SimTracker::new(quiet(), 2);
        let truth = BoundingBox::new(500, 200, 40, 40).unwrap();
        t.init(&frame(0.0, Some(truth)), truth);
        let gone = truth.translated(400, 0);
        let b = t.update(&frame(0.1, Some(gone))).unwrap();
        assert_eq!(b.x, 600);
        assert!(b.touches_border(FrameSize::new(640, 480), 5));
    }

    #[test]
    fn occlusion_raises_failures() {
        let truth = BoundingBox::new(300, 215, 40, 50).unwrap();
        let params = SimTrackerParams {
            p_fail_occluded: 1.0,
            ..quiet()
        };
        let mut t = SimTracker::new(params, 3);
        t.init(&frame(0.0, Some(truth)), truth);
        let mut f = frame(0.1, Some(truth));
        f.occluded = true;
        assert_eq!(t.update(&f), Err(AcquisitionFailure::NoTarget));
    }

    #[test]
    fn snaps_onto_nearby_distractor() {
        let truth = BoundingBox::new(300, 215, 40, 50).unwrap();
        let params = SimTrackerParams {
            p_snap: 1.0,
            convergence: 1.0,
            ..quiet()
        };
        let mut t = SimTracker::new(params, 4);
        let mut f = frame(0.0, Some(truth));
        t.init(&f, truth);
        f.distractors = vec![truth.translated(30, 0)];
        t.update(&f).unwrap();
        // Distractor moves away; the tracker follows it
        f.distractors = vec![truth.translated(200, 0)];
        let b = t.update(&f).unwrap();
        assert_eq!(b.x, truth.x + 200);
    }

    #[test]
    fn uninitialised_update_fails() {
        let mut t = SimTracker::new(quiet(), 5);
        assert_eq!(t.update(&frame(0.0, None)), Err(AcquisitionFailure::NotInitialised));
    }

    #[test]
    fn factory_streams_differ_per_slot_and_arm() {
        let mut factory = tracker_factory(SimTrackerParams::default(), 9);
        let truth = BoundingBox::new(300, 215, 40, 50).unwrap();
        let f = frame(0.0, Some(truth));
        let mut a = factory(0);
        let mut b = factory(1);
        a.init(&f, truth);
        b.init(&f, truth);
        let ra: Vec<_> = (0..5).map(|_| a.update(&f)).collect();
        let rb: Vec<_> = (0..5).map(|_| b.update(&f)).collect();
        assert_ne!(ra, rb);
    }

    #[test]
    fn detector_skips_occluded_target() {
        let truth = BoundingBox::new(300, 215, 40, 50).unwrap();
        let mut det = SimDetector::default();
        let mut f = frame(0.0, Some(truth));
        f.distractors = vec![truth.translated(-150, 0)];
        assert_eq!(det.detect(&f).len(), 2);
        f.occluded = true;
        let d = det.detect(&f);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].label, None);
    }
}
