//! Configuration for the follow loop.
//!
//! Plain struct with `Default`; every constructor that accepts it calls
//! [`FollowConfig::validate`] first. The JSON form uses the same field names.

use crate::{error::ConfigError, types::FrameSize, voting::VoteRule};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the consensus box is chosen among the non-lost slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusStrategy {
    /// Box of the lowest-index non-lost slot.
    #[default]
    FirstValid,
    /// Mean of all non-lost slot boxes.
    Centroid,
}

/// Full configuration surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    /// Reference frame size; half of it gives the x/y clamp limits
    pub frame_size: FrameSize,
    /// Size of the center grid cell (pixels); also the x/y deadband × 2
    pub grid_center_size: FrameSize,
    /// z clamp limit and depth scale
    pub max_distance: f64,
    /// Divisor applied to the grid-center area to get the reference target area
    pub distance_threshold: f64,
    /// z deadband
    pub safe_distance: f64,

    /// Number of trackers in the ensemble
    pub ensemble_size: usize,
    /// Lost slots needed to declare the whole ensemble lost
    pub lost_quorum: usize,
    /// Center distance above which two slots disagree (pixels)
    pub outlier_distance_threshold: f64,
    /// Disagreeing neighbours needed to flag a slot as an outlier
    pub outlier_min_far_neighbors: usize,
    /// Whether an outlier must also disagree with more slots than it agrees with
    pub outlier_vote_rule: VoteRule,
    /// Diagonal offset of the four fixed seed boxes (pixels)
    pub seed_offset_px: i32,
    /// Half-range of the random seed offsets used beyond five slots (pixels)
    pub random_seed_range_px: i32,
    /// Seed for the random seed offsets
    pub rng_seed: u64,
    pub consensus_strategy: ConsensusStrategy,
    /// Run slot trackers on the rayon pool
    pub parallel_update: bool,

    /// Distance from the frame edge that counts as touching (pixels)
    pub border_margin_px: i32,
    /// Continuous border contact before a slot is lost (seconds)
    pub border_lost_timeout_seconds: f64,

    /// Guidance tick period (milliseconds)
    pub guidance_tick_interval_ms: u64,

    /// Recognition match distance at or above which a detection is "Unknown"
    pub recognition_distance_threshold: f64,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            frame_size: FrameSize::new(640, 480),
            grid_center_size: FrameSize::new(100, 100),
            max_distance: 100.0,
            distance_threshold: 5.0,
            safe_distance: 20.0,
            ensemble_size: 5,
            lost_quorum: 3,
            outlier_distance_threshold: 90.0,
            outlier_min_far_neighbors: 2,
            outlier_vote_rule: VoteRule::Majority,
            seed_offset_px: 25,
            random_seed_range_px: 30,
            rng_seed: 0,
            consensus_strategy: ConsensusStrategy::FirstValid,
            parallel_update: false,
            border_margin_px: 5,
            border_lost_timeout_seconds: 1.5,
            guidance_tick_interval_ms: 50,
            recognition_distance_threshold: 0.7,
        }
    }
}

impl FollowConfig {
    /// Check every limit. Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let FrameSize { width, height } = self.frame_size;
        if self.frame_size.is_empty() {
            return Err(ConfigError::EmptyFrame { width, height });
        }
        let grid = self.grid_center_size;
        if grid.is_empty() {
            return Err(ConfigError::EmptyGridCenter {
                width: grid.width,
                height: grid.height,
            });
        }
        if grid.width > width || grid.height > height {
            return Err(ConfigError::GridCenterTooLarge {
                grid_w: grid.width,
                grid_h: grid.height,
                frame_w: width,
                frame_h: height,
            });
        }
        if self.ensemble_size == 0 {
            return Err(ConfigError::EmptyEnsemble);
        }
        if self.lost_quorum == 0 {
            return Err(ConfigError::ZeroQuorum);
        }

        positive("max_distance", self.max_distance)?;
        positive("distance_threshold", self.distance_threshold)?;
        positive("outlier_distance_threshold", self.outlier_distance_threshold)?;
        positive(
            "border_lost_timeout_seconds",
            self.border_lost_timeout_seconds,
        )?;
        positive(
            "guidance_tick_interval_ms",
            self.guidance_tick_interval_ms as f64,
        )?;
        non_negative("safe_distance", self.safe_distance)?;
        non_negative("border_margin_px", self.border_margin_px as f64)?;
        non_negative("seed_offset_px", self.seed_offset_px as f64)?;
        non_negative("random_seed_range_px", self.random_seed_range_px as f64)?;
        positive(
            "recognition_distance_threshold",
            self.recognition_distance_threshold,
        )?;
        Ok(())
    }

    /// Area the target should cover when at the desired distance.
    pub fn target_area(&self) -> f64 {
        let g = self.grid_center_size;
        (g.width as f64 * g.height as f64) / self.distance_threshold
    }

    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: FollowConfig =
            serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        FollowConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_grid_center_rejected() {
        let cfg = FollowConfig {
            grid_center_size: FrameSize::new(0, 100),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::EmptyGridCenter { .. })
        ));
    }

    #[test]
    fn empty_ensemble_rejected() {
        let cfg = FollowConfig {
            ensemble_size: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyEnsemble));
    }

    #[test]
    fn non_positive_threshold_rejected() {
        let cfg = FollowConfig {
            distance_threshold: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositive {
                name: "distance_threshold",
                ..
            })
        ));
    }

    #[test]
    fn partial_json_takes_defaults() {
        let cfg = FollowConfig::from_json_str(
            r#"{ "ensemble_size": 7, "consensus_strategy": "centroid" }"#,
        )
        .unwrap();
        assert_eq!(cfg.ensemble_size, 7);
        assert_eq!(cfg.consensus_strategy, ConsensusStrategy::Centroid);
        assert_eq!(cfg.frame_size, FrameSize::new(640, 480));
        assert_eq!(cfg.outlier_vote_rule, VoteRule::Majority);
    }

    #[test]
    fn vote_rule_parses_from_json() {
        let cfg = FollowConfig::from_json_str(r#"{ "outlier_vote_rule": "min_far" }"#).unwrap();
        assert_eq!(cfg.outlier_vote_rule, VoteRule::MinFar);
    }

    #[test]
    fn json_roundtrip() {
        let cfg = FollowConfig {
            parallel_update: true,
            rng_seed: 9,
            ..Default::default()
        };
        let text = serde_json::to_string(&cfg).unwrap();
        assert_eq!(FollowConfig::from_json_str(&text).unwrap(), cfg);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(matches!(
            FollowConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn target_area_divides_grid_area() {
        let cfg = FollowConfig::default();
        assert!((cfg.target_area() - 2000.0).abs() < 1e-9);
    }
}
