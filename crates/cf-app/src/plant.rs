//! A running plant built from a [`PlantDef`].
//!
//! The plant owns its identity and loop registries, so two plants never
//! share instrument ids or loop claims. Every sensor and actuator gets a
//! [`SignalRecorder`] attached at build time; run summaries are computed
//! from those recordings.

use std::sync::Arc;

use cf_controls::{
    Actuator, ConstantMeasurement, ControlLoop, ControlLoopRegistry, ProportionalControl,
    SampledMeasurement, Sensor, SignalRecorder,
};
use cf_core::IdentityRegistry;
use cf_project::schema::{BehaviourDef, LoopDef, MeasurementDef, PlantDef, SensorDef};
use tracing::info;

use crate::error::{AppError, AppResult};

/// A device together with the recorder listening to it.
pub struct Recorded<T> {
    pub device: Arc<T>,
    pub recorder: Arc<SignalRecorder>,
}

pub struct Plant {
    name: String,
    identities: IdentityRegistry,
    registry: ControlLoopRegistry,
    sensors: Vec<Recorded<Sensor>>,
    actuators: Vec<Recorded<Actuator>>,
    loops: Vec<ControlLoop>,
}

impl Plant {
    /// Validate `def` and construct every instrument and loop in it.
    ///
    /// Nothing is started.
    pub fn build(def: &PlantDef) -> AppResult<Self> {
        cf_project::validate_plant(def)?;

        let identities = IdentityRegistry::new();
        let registry = ControlLoopRegistry::new();

        let mut sensors = Vec::with_capacity(def.sensors.len());
        for sensor_def in &def.sensors {
            let sensor = build_sensor(&identities, sensor_def)?;
            let recorder = SignalRecorder::shared();
            sensor.add_listener(recorder.clone());
            sensors.push(Recorded {
                device: Arc::new(sensor),
                recorder,
            });
        }

        let mut actuators = Vec::with_capacity(def.actuators.len());
        for actuator_def in &def.actuators {
            let actuator = Actuator::new(&identities, &actuator_def.id, actuator_def.initial_value)?;
            let recorder = SignalRecorder::shared();
            actuator.add_listener(recorder.clone());
            actuators.push(Recorded {
                device: Arc::new(actuator),
                recorder,
            });
        }

        let mut loops = Vec::with_capacity(def.loops.len());
        for loop_def in &def.loops {
            loops.push(build_loop(&registry, &sensors, &actuators, loop_def)?);
        }

        info!(
            plant = %def.name,
            sensors = sensors.len(),
            actuators = actuators.len(),
            loops = loops.len(),
            "plant built"
        );
        Ok(Self {
            name: def.name.clone(),
            identities,
            registry,
            sensors,
            actuators,
            loops,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start every sensor, then every loop.
    pub fn start(&self) {
        for sensor in &self.sensors {
            sensor.device.start_measuring();
        }
        for control_loop in &self.loops {
            control_loop.start_controlling();
        }
        info!(plant = %self.name, "plant started");
    }

    /// Stop every loop, then every sensor.
    pub fn stop(&self) {
        for control_loop in &self.loops {
            control_loop.stop_controlling();
        }
        for sensor in &self.sensors {
            sensor.device.stop_measuring();
        }
        info!(plant = %self.name, "plant stopped");
    }

    pub fn sensors(&self) -> &[Recorded<Sensor>] {
        &self.sensors
    }

    pub fn actuators(&self) -> &[Recorded<Actuator>] {
        &self.actuators
    }

    pub fn loops(&self) -> &[ControlLoop] {
        &self.loops
    }

    pub fn sensor(&self, id: &str) -> Option<&Recorded<Sensor>> {
        self.sensors
            .iter()
            .find(|s| s.device.instrument_id().as_str() == id)
    }

    pub fn actuator(&self, id: &str) -> Option<&Recorded<Actuator>> {
        self.actuators
            .iter()
            .find(|a| a.device.instrument_id().as_str() == id)
    }

    pub fn control_loop(&self, id: &str) -> Option<&ControlLoop> {
        self.loops.iter().find(|l| l.loop_id() == id)
    }

    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    pub fn registry(&self) -> &ControlLoopRegistry {
        &self.registry
    }
}

fn build_sensor(identities: &IdentityRegistry, def: &SensorDef) -> AppResult<Sensor> {
    let sensor = match def.measurement {
        MeasurementDef::Constant { value } => Sensor::new(
            identities,
            &def.id,
            def.sampling_period(),
            def.unit,
            ConstantMeasurement::new(value),
        )?,
        MeasurementDef::Sampled => Sensor::new(
            identities,
            &def.id,
            def.sampling_period(),
            def.unit,
            SampledMeasurement::new(),
        )?,
    };
    Ok(sensor)
}

fn build_loop(
    registry: &ControlLoopRegistry,
    sensors: &[Recorded<Sensor>],
    actuators: &[Recorded<Actuator>],
    def: &LoopDef,
) -> AppResult<ControlLoop> {
    let sensor = sensors
        .iter()
        .find(|s| s.device.instrument_id().as_str() == def.sensor_id)
        .ok_or_else(|| AppError::InstrumentNotFound(def.sensor_id.clone()))?;
    let actuator = actuators
        .iter()
        .find(|a| a.device.instrument_id().as_str() == def.actuator_id)
        .ok_or_else(|| AppError::InstrumentNotFound(def.actuator_id.clone()))?;

    let behaviour = match def.behaviour {
        BehaviourDef::Proportional { gain } => ProportionalControl::new(gain)?,
    };

    let control_loop = ControlLoop::new(
        registry,
        &def.id,
        Arc::clone(&sensor.device),
        Arc::clone(&actuator.device),
        def.set_point,
        def.update_period(),
        behaviour,
    )?;
    Ok(control_loop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_core::SignalUnit;
    use cf_project::schema::ActuatorDef;
    use std::time::Duration;

    fn def() -> PlantDef {
        let mut def = PlantDef::new("unit");
        def.sensors.push(SensorDef {
            id: "TT-1".to_string(),
            sampling_period_ms: 10,
            unit: SignalUnit::Celsius,
            measurement: MeasurementDef::Constant { value: 1.0 },
        });
        def.actuators.push(ActuatorDef {
            id: "TV-1".to_string(),
            initial_value: 0.0,
        });
        def.loops.push(LoopDef {
            id: "TIC-1".to_string(),
            sensor_id: "TT-1".to_string(),
            actuator_id: "TV-1".to_string(),
            set_point: 3.0,
            update_period_ms: 20,
            behaviour: BehaviourDef::Proportional { gain: 0.5 },
        });
        def
    }

    #[test]
    fn build_claims_every_instrument() {
        let plant = Plant::build(&def()).unwrap();
        assert_eq!(plant.identities().len(), 2);
        assert!(plant.registry().is_loop_registered("TIC-1"));
        assert!(plant.sensor("TT-1").is_some());
        assert!(plant.actuator("TV-1").is_some());
        assert!(plant.control_loop("TIC-1").is_some());
        assert!(plant.sensor("TV-1").is_none());
    }

    #[test]
    fn build_is_idle() {
        let plant = Plant::build(&def()).unwrap();
        assert!(!plant.sensors()[0].device.is_measuring());
        assert!(!plant.loops()[0].is_controlling());
    }

    #[test]
    fn invalid_def_builds_nothing() {
        let mut bad = def();
        bad.loops[0].behaviour = BehaviourDef::Proportional { gain: 0.0 };
        assert!(matches!(Plant::build(&bad), Err(AppError::Validation(_))));
    }

    #[test]
    fn two_plants_do_not_share_identities() {
        let first = Plant::build(&def()).unwrap();
        let second = Plant::build(&def()).unwrap();
        assert_eq!(first.identities().len(), second.identities().len());
    }

    #[test]
    fn start_then_stop_drives_actuator() {
        let plant = Plant::build(&def()).unwrap();
        plant.start();
        let recorder = &plant.actuators()[0].recorder;
        assert!(recorder.wait_for_len(3, Duration::from_secs(2)));
        plant.stop();

        assert!(!plant.loops()[0].is_controlling());
        assert!(!plant.sensors()[0].device.is_measuring());
        // 0.5 * (3.0 - 1.0)
        assert_eq!(plant.actuators()[0].device.signal_value(), 1.0);
    }
}
