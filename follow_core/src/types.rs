//! Fundamental types used across the entire workspace.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifier types
// ---------------------------------------------------------------------------

/// Index of one ensemble member. Stable between arms.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SlotId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Pixel geometry
// ---------------------------------------------------------------------------

/// Size of a video frame in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Geometric center, integer division (matches pixel addressing).
    pub fn center(&self) -> Center {
        Center {
            cx: (self.width / 2) as i32,
            cy: (self.height / 2) as i32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Integer pixel rectangle, origin top-left, frame-relative.
///
/// Fields are public so capabilities can build boxes cheaply; use
/// [`BoundingBox::new`] when the `w > 0, h > 0` invariant must be checked at
/// the boundary, and [`BoundingBox::is_valid`] before trusting a box built
/// field-by-field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundingBox {
    /// Returns `None` when the box is degenerate.
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Option<Self> {
        let b = Self { x, y, w, h };
        b.is_valid().then_some(b)
    }

    pub fn is_valid(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// Center point, always derived from the box.
    pub fn center(&self) -> Center {
        Center {
            cx: self.x + self.w / 2,
            cy: self.y + self.h / 2,
        }
    }

    pub fn area(&self) -> i64 {
        self.w as i64 * self.h as i64
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// True if the box lies within `margin` pixels of any frame edge
    /// (or extends past it).
    pub fn touches_border(&self, frame: FrameSize, margin: i32) -> bool {
        let (fw, fh) = (frame.width as i32, frame.height as i32);
        self.x < margin
            || self.y < margin
            || self.x + self.w > fw - margin
            || self.y + self.h > fh - margin
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}x{}]", self.x, self.y, self.w, self.h)
    }
}

/// Integer pixel point. Obtained from [`BoundingBox::center`]; never stored
/// apart from its source box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Center {
    pub cx: i32,
    pub cy: i32,
}

impl Center {
    pub fn to_point(self) -> Point2<f64> {
        Point2::new(self.cx as f64, self.cy as f64)
    }

    /// Euclidean distance in pixels.
    pub fn distance(&self, other: &Center) -> f64 {
        nalgebra::distance(&self.to_point(), &other.to_point())
    }
}

// ---------------------------------------------------------------------------
// Guidance outputs
// ---------------------------------------------------------------------------

/// Signed per-axis displacement produced by the navigator.
///
/// `x_axis` positive = target right of center, `y_axis` positive = target
/// above center, `z_axis` positive = target too far (move forward).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x_axis: f64,
    pub y_axis: f64,
    pub z_axis: f64,
}

impl Location {
    pub const ZERO: Location = Location {
        x_axis: 0.0,
        y_axis: 0.0,
        z_axis: 0.0,
    };

    pub fn new(x_axis: f64, y_axis: f64, z_axis: f64) -> Self {
        Self {
            x_axis,
            y_axis,
            z_axis,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x_axis == 0.0 && self.y_axis == 0.0 && self.z_axis == 0.0
    }
}

/// One cell of the 3×3 screen grid. Row 0 is the top of the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub row: u8,
    pub col: u8,
}

impl GridCell {
    /// No correction needed.
    pub const CENTER: GridCell = GridCell { row: 1, col: 1 };

    /// Build a cell from a (right, up) direction using a three-way sign
    /// classifier. Screen-up maps to row 0.
    pub fn from_direction(x_axis: f64, y_axis: f64) -> Self {
        Self {
            row: sign_index(-y_axis),
            col: sign_index(x_axis),
        }
    }
}

impl Default for GridCell {
    fn default() -> Self {
        Self::CENTER
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

fn sign_index(v: f64) -> u8 {
    if v > 0.0 {
        2
    } else if v < 0.0 {
        0
    } else {
        1
    }
}

/// A command sent to the motion actuator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum MotionCommand {
    Move(Location),
    Stop { abrupt: bool },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
