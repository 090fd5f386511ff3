//! Target selection from recognition results.
//!
//! Turns the detections of a [`Detector`](crate::capability::Detector) into a
//! reference box for arming the ensemble: a lone detection is picked
//! automatically, otherwise the operator clicks inside one.

use crate::{
    capability::Detection,
    types::{BoundingBox, Center},
};
use serde::{Deserialize, Serialize};

/// Label used when no identity matches closely enough.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A detection after identity thresholding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelledDetection {
    pub bbox: BoundingBox,
    pub label: String,
    pub match_distance: f64,
}

impl LabelledDetection {
    pub fn center(&self) -> Center {
        self.bbox.center()
    }

    pub fn is_known(&self) -> bool {
        self.label != UNKNOWN_LABEL
    }
}

#[derive(Clone, Debug)]
pub struct TargetSelector {
    distance_threshold: f64,
    detections: Vec<LabelledDetection>,
    selected: Option<LabelledDetection>,
}

impl TargetSelector {
    pub fn new(distance_threshold: f64) -> Self {
        Self {
            distance_threshold,
            detections: Vec::new(),
            selected: None,
        }
    }

    /// Replace the current detections with this frame's results.
    ///
    /// A single detection is selected automatically; an empty frame clears
    /// the selection. Returns the auto-selected detection, if any.
    pub fn observe(&mut self, detections: Vec<Detection>) -> Option<&LabelledDetection> {
        let threshold = self.distance_threshold;
        self.detections = detections
            .into_iter()
            .filter(|d| d.bbox.is_valid())
            .map(|d| {
                let label = match d.label {
                    Some(l) if d.match_distance < threshold => l,
                    _ => UNKNOWN_LABEL.to_string(),
                };
                LabelledDetection {
                    bbox: d.bbox,
                    label,
                    match_distance: d.match_distance,
                }
            })
            .collect();

        match self.detections.as_slice() {
            [] => {
                self.selected = None;
                None
            }
            [only] => {
                tracing::debug!(label = %only.label, bbox = %only.bbox, "auto-selected target");
                self.selected = Some(only.clone());
                self.selected.as_ref()
            }
            _ => None,
        }
    }

    /// Select the first detection whose box contains the click point
    /// (edges inclusive).
    pub fn select_at(&mut self, px: i32, py: i32) -> Option<&LabelledDetection> {
        let hit = self
            .detections
            .iter()
            .find(|d| d.bbox.contains(px, py))
            .cloned();
        match hit {
            Some(d) => {
                tracing::info!(label = %d.label, distance = d.match_distance, "target selected");
                self.selected = Some(d);
                self.selected.as_ref()
            }
            None => {
                tracing::debug!(px, py, "click outside all detections");
                None
            }
        }
    }

    /// Reference box for arming.
    pub fn reference(&self) -> Option<BoundingBox> {
        self.selected.as_ref().map(|d| d.bbox)
    }

    pub fn selected(&self) -> Option<&LabelledDetection> {
        self.selected.as_ref()
    }

    pub fn detections(&self) -> &[LabelledDetection] {
        &self.detections
    }

    pub fn clear(&mut self) {
        self.detections.clear();
        self.selected = None;
    }
}
