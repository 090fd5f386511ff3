//! Error taxonomy.
//!
//! Ordinary tracking loss is not an error: it is the `Lost` state of the
//! ensemble (see [`crate::ensemble::EnsembleEvent`]). The types here cover
//! the things that can actually go wrong around it.

use thiserror::Error;

/// Why a single tracker produced no box this cycle.
///
/// Recovered locally: the slot is marked lost and the ensemble carries on.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AcquisitionFailure {
    #[error("tracker reported no target")]
    NoTarget,
    #[error("tracker is not initialised")]
    NotInitialised,
    #[error("tracker returned a degenerate box")]
    DegenerateBox,
    #[error("tracker failed: {0}")]
    Other(String),
}

/// Invalid limits or thresholds. Fatal at construction, never clamped.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("frame size must be non-zero, got {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },

    #[error("grid center size must be non-zero, got {width}x{height}")]
    EmptyGridCenter { width: u32, height: u32 },

    #[error("grid center {grid_w}x{grid_h} does not fit in frame {frame_w}x{frame_h}")]
    GridCenterTooLarge {
        grid_w: u32,
        grid_h: u32,
        frame_w: u32,
        frame_h: u32,
    },

    #[error("ensemble size must be at least 1")]
    EmptyEnsemble,

    #[error("lost quorum must be at least 1")]
    ZeroQuorum,

    #[error("`{name}` must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("`{name}` must be non-negative and finite, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("could not parse config: {0}")]
    Parse(String),
}

/// Failure reported by a motion actuator. Logged, never retried.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActuatorError {
    #[error("actuator is disconnected")]
    Disconnected,
    #[error("actuator rejected command: {0}")]
    Rejected(String),
}
