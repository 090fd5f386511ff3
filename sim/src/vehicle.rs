//! Simulated follow vehicle: the camera carrier the guidance loop drives.

use follow_core::{ActuatorError, Location, MotionActuator, MotionCommand};
use nalgebra::Vector3;
use parking_lot::Mutex;
use platform::{BangBangCommand, CommandModel, PlatformParams, ProportionalCommand, VelocityResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which displacement-to-velocity model the platform applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum CommandKind {
    /// Speed proportional to the displacement
    #[default]
    Proportional,
    /// Full speed toward the displacement sign
    BangBang,
}

impl CommandKind {
    pub fn model(self, params: &PlatformParams) -> Box<dyn CommandModel + Send> {
        match self {
            CommandKind::Proportional => Box::new(ProportionalCommand::new(params)),
            CommandKind::BangBang => Box::new(BangBangCommand::new(params)),
        }
    }
}

pub struct SimPlatform {
    params: PlatformParams,
    model: Box<dyn CommandModel + Send>,
    response: VelocityResponse,
    /// Camera position in world units
    position: Vector3<f64>,
    log: Vec<MotionCommand>,
    connected: bool,
}

impl SimPlatform {
    pub fn new(params: PlatformParams, kind: CommandKind, start: Vector3<f64>) -> Self {
        let model = kind.model(&params);
        Self {
            params,
            model,
            response: VelocityResponse::default(),
            position: start,
            log: Vec::new(),
            connected: true,
        }
    }

    /// Integrate the platform motion over `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.position += self.response.step(dt, &self.params);
    }

    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    pub fn velocity(&self) -> Vector3<f64> {
        self.response.velocity
    }

    pub fn commands(&self) -> &[MotionCommand] {
        &self.log
    }

    /// Take the commands received since the last call.
    pub fn drain_commands(&mut self) -> Vec<MotionCommand> {
        std::mem::take(&mut self.log)
    }

    /// A disconnected platform rejects every command.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl MotionActuator for SimPlatform {
    fn move_axes(&mut self, x_axis: f64, y_axis: f64, z_axis: f64) -> Result<(), ActuatorError> {
        if !self.connected {
            return Err(ActuatorError::Disconnected);
        }
        let displacement = Location::new(x_axis, y_axis, z_axis);
        self.response.command(self.model.velocity(&displacement));
        self.log.push(MotionCommand::Move(displacement));
        Ok(())
    }

    fn stop(&mut self, abrupt: bool) -> Result<(), ActuatorError> {
        if !self.connected {
            return Err(ActuatorError::Disconnected);
        }
        self.response.stop(abrupt, &self.params);
        self.log.push(MotionCommand::Stop { abrupt });
        Ok(())
    }
}

/// Handle for driving one platform from the tick thread while the frame
/// thread integrates it.
#[derive(Clone)]
pub struct SharedPlatform(pub Arc<Mutex<SimPlatform>>);

impl SharedPlatform {
    pub fn new(platform: SimPlatform) -> Self {
        Self(Arc::new(Mutex::new(platform)))
    }
}

impl MotionActuator for SharedPlatform {
    fn move_axes(&mut self, x_axis: f64, y_axis: f64, z_axis: f64) -> Result<(), ActuatorError> {
        self.0.lock().move_axes(x_axis, y_axis, z_axis)
    }

    fn stop(&mut self, abrupt: bool) -> Result<(), ActuatorError> {
        self.0.lock().stop(abrupt)
    }
}
