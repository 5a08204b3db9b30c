//! Plant file loading, saving, validation, and introspection.

use std::path::Path;

use cf_core::SignalUnit;
use cf_project::ProjectError;
use cf_project::schema::{BehaviourDef, MeasurementDef, PlantDef};

use crate::error::{AppError, AppResult};

/// Summary of a plant for listing.
#[derive(Debug, Clone)]
pub struct PlantSummary {
    pub name: String,
    pub version: u32,
    pub sensor_count: usize,
    pub actuator_count: usize,
    pub loop_count: usize,
}

/// One sensor as it appears in a listing.
#[derive(Debug, Clone)]
pub struct SensorListing {
    pub id: String,
    pub unit: SignalUnit,
    pub sampling_period_ms: u64,
    pub measurement: String,
}

/// One control loop as it appears in a listing.
#[derive(Debug, Clone)]
pub struct LoopListing {
    pub id: String,
    pub sensor_id: String,
    pub actuator_id: String,
    pub set_point: f64,
    pub update_period_ms: u64,
    pub behaviour: String,
}

/// Load a plant from a YAML or JSON file, chosen by extension.
///
/// Any other extension is rejected before the file is read.
pub fn load_plant(path: &Path) -> AppResult<PlantDef> {
    let plant = cf_project::load_path(path).map_err(|e| match e {
        ProjectError::Io(source) => AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source,
        },
        other => AppError::from(other),
    })?;
    tracing::info!(path = %path.display(), plant = %plant.name, "plant file loaded");
    Ok(plant)
}

/// Save a plant to a YAML file.
pub fn save_plant(path: &Path, plant: &PlantDef) -> AppResult<()> {
    validate_plant(plant)?;
    let content = serde_yaml::to_string(plant)
        .map_err(|e| AppError::Project(format!("Failed to serialize plant: {}", e)))?;

    std::fs::write(path, content).map_err(|e| AppError::ProjectFileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Validate plant structure.
pub fn validate_plant(plant: &PlantDef) -> AppResult<()> {
    cf_project::validate_plant(plant)?;
    Ok(())
}

pub fn describe_plant(plant: &PlantDef) -> PlantSummary {
    PlantSummary {
        name: plant.name.clone(),
        version: plant.version,
        sensor_count: plant.sensors.len(),
        actuator_count: plant.actuators.len(),
        loop_count: plant.loops.len(),
    }
}

pub fn list_sensors(plant: &PlantDef) -> Vec<SensorListing> {
    plant
        .sensors
        .iter()
        .map(|sensor| SensorListing {
            id: sensor.id.clone(),
            unit: sensor.unit,
            sampling_period_ms: sensor.sampling_period_ms,
            measurement: match sensor.measurement {
                MeasurementDef::Constant { value } => format!("constant {value}"),
                MeasurementDef::Sampled => "sampled".to_string(),
            },
        })
        .collect()
}

pub fn list_loops(plant: &PlantDef) -> Vec<LoopListing> {
    plant
        .loops
        .iter()
        .map(|control_loop| LoopListing {
            id: control_loop.id.clone(),
            sensor_id: control_loop.sensor_id.clone(),
            actuator_id: control_loop.actuator_id.clone(),
            set_point: control_loop.set_point,
            update_period_ms: control_loop.update_period_ms,
            behaviour: match control_loop.behaviour {
                BehaviourDef::Proportional { gain } => format!("proportional (gain {gain})"),
            },
        })
        .collect()
}
