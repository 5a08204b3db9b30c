//! Plant file schema definitions.

use std::time::Duration;

use cf_core::SignalUnit;
use serde::{Deserialize, Serialize};

/// Newest plant file version this crate reads and writes.
pub const LATEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantDef {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub sensors: Vec<SensorDef>,
    #[serde(default)]
    pub actuators: Vec<ActuatorDef>,
    #[serde(default)]
    pub loops: Vec<LoopDef>,
}

impl PlantDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: LATEST_VERSION,
            name: name.into(),
            sensors: Vec::new(),
            actuators: Vec::new(),
            loops: Vec::new(),
        }
    }

    pub fn sensor(&self, id: &str) -> Option<&SensorDef> {
        self.sensors.iter().find(|s| s.id == id)
    }

    pub fn actuator(&self, id: &str) -> Option<&ActuatorDef> {
        self.actuators.iter().find(|a| a.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorDef {
    pub id: String,
    pub sampling_period_ms: u64,
    pub unit: SignalUnit,
    pub measurement: MeasurementDef,
}

impl SensorDef {
    pub fn sampling_period(&self) -> Duration {
        Duration::from_millis(self.sampling_period_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MeasurementDef {
    /// Always reports `value`.
    Constant { value: f64 },
    /// Uniform random reading in [0, 1).
    Sampled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActuatorDef {
    pub id: String,
    #[serde(default)]
    pub initial_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoopDef {
    pub id: String,
    pub sensor_id: String,
    pub actuator_id: String,
    pub set_point: f64,
    pub update_period_ms: u64,
    pub behaviour: BehaviourDef,
}

impl LoopDef {
    pub fn update_period(&self) -> Duration {
        Duration::from_millis(self.update_period_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum BehaviourDef {
    Proportional { gain: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = r#"
version: 1
name: Demo plant
sensors:
  - id: TT-101
    sampling_period_ms: 20
    unit: celsius
    measurement: { type: Constant, value: 0.0 }
  - id: FT-102
    sampling_period_ms: 50
    unit: m3_per_hour
    measurement: { type: Sampled }
actuators:
  - id: TV-101
loops:
  - id: TIC-101
    sensor_id: TT-101
    actuator_id: TV-101
    set_point: 2.0
    update_period_ms: 40
    behaviour: { type: Proportional, gain: 1.0 }
"#;

    #[test]
    fn parses_tagged_enums_and_units() {
        let plant: PlantDef = serde_yaml::from_str(DEMO).unwrap();
        assert_eq!(plant.sensors.len(), 2);
        assert_eq!(plant.sensors[1].unit, SignalUnit::M3PerHour);
        assert_eq!(plant.sensors[1].measurement, MeasurementDef::Sampled);
        assert_eq!(
            plant.sensors[0].measurement,
            MeasurementDef::Constant { value: 0.0 }
        );
        assert_eq!(plant.loops[0].behaviour, BehaviourDef::Proportional { gain: 1.0 });
        assert_eq!(plant.loops[0].update_period(), Duration::from_millis(40));
    }

    #[test]
    fn actuator_initial_value_defaults_to_zero() {
        let plant: PlantDef = serde_yaml::from_str(DEMO).unwrap();
        assert_eq!(plant.actuator("TV-101").unwrap().initial_value, 0.0);
    }

    #[test]
    fn unknown_unit_is_rejected() {
        let yaml = "id: X\nsampling_period_ms: 1\nunit: kelvin\nmeasurement: { type: Sampled }\n";
        assert!(serde_yaml::from_str::<SensorDef>(yaml).is_err());
    }
}
