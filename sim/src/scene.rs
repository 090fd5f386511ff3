//! Scene: objects in world space seen through a pinhole camera.
//!
//! World axes are x right, y up, z forward. An object at depth `z_ref` is
//! drawn at one pixel per world unit; nearer objects grow as `z_ref / depth`.

use crate::{frame::SimFrame, target::Target};
use follow_core::{BoundingBox, FrameSize};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Objects closer than this are behind the image plane.
const MIN_DEPTH: f64 = 1.0;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scene {
    pub frame_size: FrameSize,
    /// Depth rendered at unit scale
    pub z_ref: f64,
    /// The object to follow
    pub target: Target,
    pub distractors: Vec<Target>,
    /// [start, end) time windows during which the target is occluded
    pub occlusions: Vec<[f64; 2]>,
}

impl Scene {
    /// Advance every object. Objects outside their activity window hold
    /// their position.
    pub fn step(&mut self, t: f64, dt: f64) {
        for obj in std::iter::once(&mut self.target).chain(&mut self.distractors) {
            if obj.is_active(t) {
                obj.step(t, dt);
            }
        }
    }

    pub fn is_occluded(&self, t: f64) -> bool {
        self.occlusions.iter().any(|w| t >= w[0] && t < w[1])
    }

    /// Image-space box of `obj` as seen from `camera`.
    pub fn project(&self, obj: &Target, camera: &Vector3<f64>) -> Option<BoundingBox> {
        let rel = Vector3::from(obj.position()) - camera;
        if rel.z < MIN_DEPTH {
            return None;
        }
        let scale = self.z_ref / rel.z;
        let w = (obj.size[0] * scale).max(1.0);
        let h = (obj.size[1] * scale).max(1.0);
        let cx = self.frame_size.width as f64 / 2.0 + rel.x * scale;
        let cy = self.frame_size.height as f64 / 2.0 - rel.y * scale;
        BoundingBox::new(
            (cx - w / 2.0).round() as i32,
            (cy - h / 2.0).round() as i32,
            w.round() as i32,
            h.round() as i32,
        )
    }

    /// Render frame `index` at time `t` from `camera`.
    pub fn render(&self, index: u64, t: f64, camera: &Vector3<f64>) -> SimFrame {
        let target = if self.target.is_active(t) {
            self.project(&self.target, camera)
        } else {
            None
        };
        let distractors = self
            .distractors
            .iter()
            .filter(|d| d.is_active(t))
            .filter_map(|d| self.project(d, camera))
            .collect();
        SimFrame {
            index,
            timestamp: t,
            size: self.frame_size,
            target,
            occluded: target.is_some() && self.is_occluded(t),
            distractors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::MotionSpec;

    fn scene() -> Scene {
        Scene {
            frame_size: FrameSize::new(640, 480),
            z_ref: 100.0,
            target: Target::new(0, [0.0, 0.0, 100.0], [0.0; 3], [40.0, 50.0], MotionSpec::ConstantVelocity),
            distractors: Vec::new(),
            occlusions: vec![[1.0, 2.0]],
        }
    }

    #[test]
    fn centred_target_at_reference_depth() {
        let f = scene().render(0, 0.0, &Vector3::zeros());
        assert_eq!(f.target, BoundingBox::new(300, 215, 40, 50));
        assert_eq!(f.target.map(|b| b.area()), Some(2000));
    }

    #[test]
    fn camera_offset_shifts_image() {
        let s = scene();
        // Camera moved right and up: target appears left and lower
        let b = s.project(&s.target, &Vector3::new(10.0, 20.0, 0.0)).unwrap();
        assert_eq!((b.x, b.y), (290, 235));
    }

    #[test]
    fn nearer_target_is_larger() {
        let s = scene();
        let b = s.project(&s.target, &Vector3::new(0.0, 0.0, 50.0)).unwrap();
        assert_eq!((b.w, b.h), (80, 100));
        assert!(s.project(&s.target, &Vector3::new(0.0, 0.0, 100.0)).is_none());
    }

    #[test]
    fn occlusion_window() {
        let s = scene();
        assert!(!s.render(0, 0.5, &Vector3::zeros()).occluded);
        assert!(s.render(1, 1.5, &Vector3::zeros()).occluded);
        assert!(!s.render(2, 2.0, &Vector3::zeros()).occluded);
    }
}
