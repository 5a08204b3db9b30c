//! Error types for control system operations.

use core::fmt;

use cf_core::{CoreError, InstrumentId};
use thiserror::Error;

/// Result type for control system operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// The claim that collided during control loop registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisteredEntity {
    Sensor(InstrumentId),
    Actuator(InstrumentId),
    ControlLoop(String),
}

impl fmt::Display for RegisteredEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(id) => write!(f, "sensor {id}"),
            Self::Actuator(id) => write!(f, "actuator {id}"),
            Self::ControlLoop(id) => write!(f, "control loop {id}"),
        }
    }
}

/// Errors that can occur in control system operations.
///
/// All of these are constructional: they abort the construction that raised
/// them and leave every other piece of state as it was.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Proportional gain of exactly zero (or not finite).
    #[error("Cannot create a proportional controller with gain {gain}")]
    InvalidGain { gain: f64 },

    /// Sensor, actuator, or loop already participates in a control loop.
    #[error("{entity} has already been registered")]
    DuplicateRegistration { entity: RegisteredEntity },

    /// Identity allocation or numeric validation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
