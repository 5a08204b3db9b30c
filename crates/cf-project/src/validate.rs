//! Plant file validation logic.
//!
//! Runs before anything is constructed, so a bad file never leaves a
//! half-built plant behind.

use std::collections::{HashMap, HashSet};

use crate::schema::{ActuatorDef, BehaviourDef, LoopDef, MeasurementDef, PlantDef, SensorDef};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_plant(plant: &PlantDef) -> Result<(), ValidationError> {
    if plant.version == 0 || plant.version > crate::schema::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: plant.version,
        });
    }

    // Sensors and actuators share one identity namespace.
    let mut instrument_ids = HashSet::new();
    for sensor in &plant.sensors {
        check_id(&sensor.id, "sensor")?;
        if !instrument_ids.insert(sensor.id.as_str()) {
            return Err(duplicate(&sensor.id, "instruments"));
        }
        validate_sensor(sensor)?;
    }
    for actuator in &plant.actuators {
        check_id(&actuator.id, "actuator")?;
        if !instrument_ids.insert(actuator.id.as_str()) {
            return Err(duplicate(&actuator.id, "instruments"));
        }
        validate_actuator(actuator)?;
    }

    let mut loop_ids = HashSet::new();
    let mut sensor_owner: HashMap<&str, &str> = HashMap::new();
    let mut actuator_owner: HashMap<&str, &str> = HashMap::new();
    for control_loop in &plant.loops {
        check_id(&control_loop.id, "loop")?;
        if !loop_ids.insert(control_loop.id.as_str()) {
            return Err(duplicate(&control_loop.id, "loops"));
        }
        validate_loop(plant, control_loop)?;

        claim(&mut sensor_owner, control_loop, &control_loop.sensor_id, "sensor_id")?;
        claim(
            &mut actuator_owner,
            control_loop,
            &control_loop.actuator_id,
            "actuator_id",
        )?;
    }

    Ok(())
}

fn validate_sensor(sensor: &SensorDef) -> Result<(), ValidationError> {
    if sensor.sampling_period_ms == 0 {
        return Err(ValidationError::InvalidValue {
            field: format!("sensor '{}' sampling_period_ms", sensor.id),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if let MeasurementDef::Constant { value } = sensor.measurement {
        check_finite(value, format!("sensor '{}' measurement value", sensor.id))?;
    }
    Ok(())
}

fn validate_actuator(actuator: &ActuatorDef) -> Result<(), ValidationError> {
    check_finite(
        actuator.initial_value,
        format!("actuator '{}' initial_value", actuator.id),
    )
}

fn validate_loop(plant: &PlantDef, control_loop: &LoopDef) -> Result<(), ValidationError> {
    if plant.sensor(&control_loop.sensor_id).is_none() {
        return Err(ValidationError::MissingReference {
            id: control_loop.sensor_id.clone(),
            context: format!("loop '{}' sensor_id", control_loop.id),
        });
    }
    if plant.actuator(&control_loop.actuator_id).is_none() {
        return Err(ValidationError::MissingReference {
            id: control_loop.actuator_id.clone(),
            context: format!("loop '{}' actuator_id", control_loop.id),
        });
    }
    if control_loop.update_period_ms == 0 {
        return Err(ValidationError::InvalidValue {
            field: format!("loop '{}' update_period_ms", control_loop.id),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    check_finite(
        control_loop.set_point,
        format!("loop '{}' set_point", control_loop.id),
    )?;

    match control_loop.behaviour {
        BehaviourDef::Proportional { gain } => {
            let field = format!("loop '{}' gain", control_loop.id);
            check_finite(gain, field.clone())?;
            if gain == 0.0 {
                return Err(ValidationError::InvalidValue {
                    field,
                    value: gain.to_string(),
                    reason: "proportional gain must be non-zero".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn claim<'a>(
    owners: &mut HashMap<&'a str, &'a str>,
    control_loop: &'a LoopDef,
    instrument_id: &'a str,
    field: &str,
) -> Result<(), ValidationError> {
    if let Some(owner) = owners.insert(instrument_id, control_loop.id.as_str()) {
        return Err(ValidationError::InvalidValue {
            field: format!("loop '{}' {field}", control_loop.id),
            value: instrument_id.to_string(),
            reason: format!("already controlled by loop '{owner}'"),
        });
    }
    Ok(())
}

fn check_id(id: &str, kind: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: format!("{kind} id"),
            value: format!("{id:?}"),
            reason: "must not be blank".to_string(),
        });
    }
    Ok(())
}

fn check_finite(value: f64, field: String) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidValue {
            field,
            value: value.to_string(),
            reason: "must be finite".to_string(),
        });
    }
    Ok(())
}

fn duplicate(id: &str, context: &str) -> ValidationError {
    ValidationError::DuplicateId {
        id: id.to_string(),
        context: context.to_string(),
    }
}
