//! Guidance: deadband, move/stop decision and grid-cell feedback.
//!
//! The controller keeps a working direction that is refreshed from the latest
//! [`Navigation`] on every call. It has two entry points:
//! - [`GuidanceController::tick`]: fixed-rate; talks to the actuator
//! - [`GuidanceController::update_grid`]: frame-rate; talks to the overlay
//!
//! Stops are edge-triggered: exactly one `stop(abrupt = true)` is sent on the
//! transition from `Moving` to `Static`.

use crate::{
    capability::{MotionActuator, Overlay},
    config::FollowConfig,
    error::ConfigError,
    grid::GridLayout,
    navigator::Navigation,
    types::{GridCell, Location, MotionCommand},
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionState {
    #[default]
    Static,
    Moving,
}

/// Per-axis magnitudes below which no correction is issued.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deadband {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Deadband {
    pub fn from_config(config: &FollowConfig) -> Self {
        Self {
            x: config.grid_center_size.width as f64 / 2.0,
            y: config.grid_center_size.height as f64 / 2.0,
            z: config.safe_distance,
        }
    }

    pub fn apply(&self, loc: &Location) -> Location {
        let cut = |v: f64, limit: f64| if v.abs() < limit { 0.0 } else { v };
        Location::new(
            cut(loc.x_axis, self.x),
            cut(loc.y_axis, self.y),
            cut(loc.z_axis, self.z),
        )
    }
}

#[derive(Clone, Debug)]
pub struct GuidanceController {
    deadband: Deadband,
    layout: GridLayout,
    direction: Location,
    cell: GridCell,
    state: MotionState,
    enabled: bool,
}

impl GuidanceController {
    pub fn new(config: &FollowConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            deadband: Deadband::from_config(config),
            layout: GridLayout::new(config.frame_size, config.grid_center_size),
            direction: Location::ZERO,
            cell: GridCell::CENTER,
            state: MotionState::Static,
            enabled: true,
        })
    }

    /// Refresh the working direction. Leaves it untouched when `nav` is not
    /// ready.
    pub fn recompute_direction(&mut self, nav: &Navigation) {
        if !nav.ready {
            return;
        }
        self.direction = self.deadband.apply(&nav.location);
    }

    /// Grid cell of the current working direction.
    pub fn classify_cell(&self) -> GridCell {
        GridCell::from_direction(self.direction.x_axis, self.direction.y_axis)
    }

    /// Frame-rate companion of `tick`: recompute, classify and highlight the
    /// cell on `overlay` unless it is the center. Returns `None` when `nav`
    /// is not ready.
    pub fn update_grid(&mut self, nav: &Navigation, overlay: &mut dyn Overlay) -> Option<GridCell> {
        if !nav.ready {
            return None;
        }
        self.recompute_direction(nav);
        self.cell = self.classify_cell();
        if self.cell != GridCell::CENTER {
            if let Some(area) = self.layout.cell_rect(self.cell) {
                overlay.highlight(self.cell, area);
            }
        }
        Some(self.cell)
    }

    /// One fixed-rate guidance step. Returns the command issued, if any.
    ///
    /// Actuator errors are logged and not retried; the state still advances.
    pub fn tick(
        &mut self,
        nav: &Navigation,
        actuator: &mut dyn MotionActuator,
    ) -> Option<MotionCommand> {
        if !self.enabled {
            return None;
        }
        self.recompute_direction(nav);

        if !self.direction.is_zero() {
            self.state = MotionState::Moving;
            let Location {
                x_axis,
                y_axis,
                z_axis,
            } = self.direction;
            if let Err(e) = actuator.move_axes(x_axis, y_axis, z_axis) {
                tracing::warn!(error = %e, "move command failed");
            }
            return Some(MotionCommand::Move(self.direction));
        }

        if self.state == MotionState::Moving {
            self.state = MotionState::Static;
            if let Err(e) = actuator.stop(true) {
                tracing::warn!(error = %e, "stop command failed");
            }
            tracing::debug!("platform static");
            return Some(MotionCommand::Stop { abrupt: true });
        }
        None
    }

    /// Zero the working direction so the next tick settles the platform.
    pub fn clear_direction(&mut self) {
        self.direction = Location::ZERO;
        self.cell = GridCell::CENTER;
    }

    /// Disabled controllers ignore ticks.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn direction(&self) -> Location {
        self.direction
    }

    pub fn cell(&self) -> GridCell {
        self.cell
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn deadband(&self) -> Deadband {
        self.deadband
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingActuator, RecordingOverlay};
    use crate::types::BoundingBox;

    fn ctl() -> GuidanceController {
        GuidanceController::new(&FollowConfig::default()).unwrap()
    }

    fn nav(x: f64, y: f64, z: f64) -> Navigation {
        Navigation {
            location: Location::new(x, y, z),
            ready: true,
        }
    }

    #[test]
    fn deadband_zeroes_small_axes() {
        let mut c = ctl();
        c.recompute_direction(&nav(49.9, -49.9, 19.9));
        assert!(c.direction().is_zero());

        c.recompute_direction(&nav(50.0, -10.0, -20.0));
        assert_eq!(c.direction(), Location::new(50.0, 0.0, -20.0));
    }

    #[test]
    fn not_ready_keeps_previous_direction() {
        let mut c = ctl();
        c.recompute_direction(&nav(100.0, 0.0, 0.0));
        c.recompute_direction(&Navigation::NOT_READY);
        assert_eq!(c.direction().x_axis, 100.0);
    }

    #[test]
    fn cell_from_direction() {
        let mut c = ctl();
        c.recompute_direction(&nav(100.0, 100.0, 0.0));
        // Right and up: top-right
        assert_eq!(c.classify_cell(), GridCell { row: 0, col: 2 });
        c.recompute_direction(&nav(-100.0, -100.0, 0.0));
        assert_eq!(c.classify_cell(), GridCell { row: 2, col: 0 });
        c.recompute_direction(&nav(10.0, 10.0, 90.0));
        assert_eq!(c.classify_cell(), GridCell::CENTER);
    }

    #[test]
    fn stop_is_edge_triggered() {
        let mut c = ctl();
        let mut act = RecordingActuator::default();

        // Static and centred: nothing sent
        assert_eq!(c.tick(&nav(0.0, 0.0, 0.0), &mut act), None);
        assert!(act.commands.is_empty());

        // Off-center: move every tick
        for _ in 0..3 {
            assert!(matches!(
                c.tick(&nav(120.0, 0.0, 0.0), &mut act),
                Some(MotionCommand::Move(_))
            ));
        }
        assert_eq!(c.state(), MotionState::Moving);

        // Centred again: exactly one stop over many ticks
        for _ in 0..5 {
            c.tick(&nav(3.0, -2.0, 5.0), &mut act);
        }
        assert_eq!(act.moves(), 3);
        assert_eq!(act.stops(), 1);
        assert_eq!(act.commands.last(), Some(&MotionCommand::Stop { abrupt: true }));
        assert_eq!(c.state(), MotionState::Static);
    }

    #[test]
    fn move_carries_deadbanded_axes() {
        let mut c = ctl();
        let mut act = RecordingActuator::default();
        c.tick(&nav(200.0, 10.0, -60.0), &mut act);
        assert_eq!(
            act.commands,
            vec![MotionCommand::Move(Location::new(200.0, 0.0, -60.0))]
        );
    }

    #[test]
    fn clear_direction_triggers_single_stop() {
        let mut c = ctl();
        let mut act = RecordingActuator::default();
        c.tick(&nav(200.0, 0.0, 0.0), &mut act);
        c.clear_direction();
        c.tick(&Navigation::NOT_READY, &mut act);
        c.tick(&Navigation::NOT_READY, &mut act);
        assert_eq!(act.stops(), 1);
        assert_eq!(act.moves(), 1);
    }

    #[test]
    fn actuator_error_still_advances_state() {
        let mut c = ctl();
        let mut act = RecordingActuator {
            fail_moves: true,
            ..Default::default()
        };
        let cmd = c.tick(&nav(200.0, 0.0, 0.0), &mut act);
        assert!(matches!(cmd, Some(MotionCommand::Move(_))));
        assert_eq!(c.state(), MotionState::Moving);
        assert!(act.commands.is_empty());
    }

    #[test]
    fn update_grid_highlights_off_center_cells_only() {
        let mut c = ctl();
        let mut overlay = RecordingOverlay::default();

        assert_eq!(c.update_grid(&nav(0.0, 0.0, 0.0), &mut overlay), Some(GridCell::CENTER));
        assert!(overlay.highlighted.is_empty());

        let cell = c.update_grid(&nav(-300.0, 0.0, 0.0), &mut overlay);
        assert_eq!(cell, Some(GridCell { row: 1, col: 0 }));
        assert_eq!(overlay.highlighted, vec![GridCell { row: 1, col: 0 }]);
        assert_eq!(overlay.highlight_area, BoundingBox::new(0, 190, 270, 100));

        assert_eq!(c.update_grid(&Navigation::NOT_READY, &mut overlay), None);
    }

    #[test]
    fn disabled_controller_is_silent() {
        let mut c = ctl();
        let mut act = RecordingActuator::default();
        c.set_enabled(false);
        assert_eq!(c.tick(&nav(300.0, 0.0, 0.0), &mut act), None);
        assert!(act.commands.is_empty());
    }
}
