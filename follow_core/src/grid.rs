//! 3×3 screen partition around a configured center cell.

use crate::types::{BoundingBox, FrameSize, GridCell};
use serde::{Deserialize, Serialize};

/// Cell geometry for a frame. Side columns/rows share what the center cell
/// leaves over; the right/bottom ones absorb odd pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    pub frame: FrameSize,
    pub center: FrameSize,
}

impl GridLayout {
    pub fn new(frame: FrameSize, center: FrameSize) -> Self {
        Self { frame, center }
    }

    fn side(&self) -> (i32, i32) {
        let side_w = (self.frame.width.saturating_sub(self.center.width) / 2) as i32;
        let side_h = (self.frame.height.saturating_sub(self.center.height) / 2) as i32;
        (side_w, side_h)
    }

    /// Column and row boundaries: `[0, side, side + center, full]`.
    fn edges(&self) -> ([i32; 4], [i32; 4]) {
        let (sw, sh) = self.side();
        let (cw, ch) = (self.center.width as i32, self.center.height as i32);
        let (fw, fh) = (self.frame.width as i32, self.frame.height as i32);
        ([0, sw, sw + cw, fw], [0, sh, sh + ch, fh])
    }

    /// Vertical and horizontal grid line positions, for drawing.
    pub fn lines(&self) -> ([i32; 2], [i32; 2]) {
        let (xs, ys) = self.edges();
        ([xs[1], xs[2]], [ys[1], ys[2]])
    }

    /// Pixel rectangle of `cell`. `None` for an out-of-range cell or a
    /// degenerate side strip.
    pub fn cell_rect(&self, cell: GridCell) -> Option<BoundingBox> {
        if cell.row > 2 || cell.col > 2 {
            return None;
        }
        let (xs, ys) = self.edges();
        let (c, r) = (cell.col as usize, cell.row as usize);
        BoundingBox::new(xs[c], ys[r], xs[c + 1] - xs[c], ys[r + 1] - ys[r])
    }

    /// Cell containing pixel `(px, py)`, if it lies inside the frame.
    pub fn cell_at(&self, px: i32, py: i32) -> Option<GridCell> {
        let (xs, ys) = self.edges();
        let locate = |v: i32, e: &[i32; 4]| -> Option<u8> {
            if v < e[0] || v >= e[3] {
                return None;
            }
            Some(if v < e[1] { 0 } else if v < e[2] { 1 } else { 2 })
        };
        Some(GridCell {
            row: locate(py, &ys)?,
            col: locate(px, &xs)?,
        })
    }
}
