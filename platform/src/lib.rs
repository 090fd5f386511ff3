//! `platform`: Platform parameters, command models and velocity response.

pub mod command;
pub mod params;

pub use command::{BangBangCommand, CommandModel, ProportionalCommand, VelocityResponse};
pub use params::PlatformParams;
