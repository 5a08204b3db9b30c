//! Closed control loops.
//!
//! A [`ControlLoop`] ties one sensor to one actuator. On every tick it reads
//! the sensor's latest cached reading, asks its control behaviour for a new
//! output and applies it to the actuator. The loop polls the sensor; the two
//! run on independent schedules.
//!
//! States: Idle (constructed or stopped) and Running. Only
//! [`ControlLoop::start_controlling`] and [`ControlLoop::stop_controlling`]
//! move between them; calling either from the wrong state is a warned no-op.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cf_core::ensure_finite;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::actuator::Actuator;
use crate::controller::ControlBehaviour;
use crate::error::{ControlError, ControlResult};
use crate::executor::{PeriodicExecutor, StartOutcome, StopOutcome};
use crate::registry::ControlLoopRegistry;
use crate::sensor::Sensor;

struct LoopSettings {
    set_point: f64,
    behaviour: Arc<dyn ControlBehaviour>,
}

struct LoopCore {
    loop_id: String,
    sensor: Arc<Sensor>,
    actuator: Arc<Actuator>,
    /// Held for the whole of a tick.
    tick_lock: Mutex<()>,
    settings: RwLock<LoopSettings>,
}

impl LoopCore {
    fn update_manipulated_variable(&self) {
        let _tick = self.tick_lock.lock();
        let Some(reading) = self.sensor.latest_signal() else {
            debug!(control_loop = %self.loop_id, sensor = %self.sensor, "no reading yet; tick skipped");
            return;
        };

        let (set_point, behaviour) = {
            let settings = self.settings.read();
            (settings.set_point, Arc::clone(&settings.behaviour))
        };
        let output = behaviour.compute_output(set_point, reading.quantity);
        debug!(
            control_loop = %self.loop_id,
            set_point,
            measured = reading.quantity,
            output,
            "control loop tick"
        );
        self.actuator.adjust(output);
    }
}

/// Drives an actuator so that a sensor's reading tracks a set point.
pub struct ControlLoop {
    core: Arc<LoopCore>,
    executor: PeriodicExecutor,
}

impl ControlLoop {
    /// Create an idle control loop and claim its sensor and actuator.
    ///
    /// # Arguments
    ///
    /// * `registry` - Ledger recording which loop owns which instrument
    /// * `loop_id` - Unique id of this loop
    /// * `sensor` - Controlled variable (shared, not owned)
    /// * `actuator` - Manipulated variable (shared, not owned)
    /// * `set_point` - Initial target for the controlled variable
    /// * `update_period` - How often the actuator is recomputed
    /// * `behaviour` - Initial control behaviour
    ///
    /// # Errors
    ///
    /// [`ControlError::DuplicateRegistration`] if the sensor, actuator or loop
    /// id is already claimed; `InvalidArg`/`Core` for a zero period or
    /// non-finite set point. The sensor, actuator and registry are untouched
    /// on failure.
    pub fn new(
        registry: &ControlLoopRegistry,
        loop_id: &str,
        sensor: Arc<Sensor>,
        actuator: Arc<Actuator>,
        set_point: f64,
        update_period: Duration,
        behaviour: impl ControlBehaviour + 'static,
    ) -> ControlResult<Self> {
        if update_period.is_zero() {
            return Err(ControlError::InvalidArg {
                what: "update period must be positive",
            });
        }
        ensure_finite(set_point, "set point")?;

        registry.register(loop_id, sensor.instrument_id(), actuator.instrument_id())?;

        let core = Arc::new(LoopCore {
            loop_id: loop_id.to_string(),
            sensor,
            actuator,
            tick_lock: Mutex::new(()),
            settings: RwLock::new(LoopSettings {
                set_point,
                behaviour: Arc::new(behaviour),
            }),
        });
        let tick_core = Arc::clone(&core);
        let executor = PeriodicExecutor::new(loop_id, update_period, move || {
            tick_core.update_manipulated_variable()
        })?;

        info!(
            control_loop = loop_id,
            sensor = %core.sensor,
            actuator = %core.actuator,
            set_point,
            update_period_ms = update_period.as_millis() as u64,
            "control loop created"
        );
        Ok(Self { core, executor })
    }

    pub fn loop_id(&self) -> &str {
        &self.core.loop_id
    }

    pub fn sensor(&self) -> &Arc<Sensor> {
        &self.core.sensor
    }

    pub fn actuator(&self) -> &Arc<Actuator> {
        &self.core.actuator
    }

    pub fn update_period(&self) -> Duration {
        self.executor.period()
    }

    /// Idle -> Running.
    pub fn start_controlling(&self) -> StartOutcome {
        self.executor.start()
    }

    /// Running -> Idle.
    pub fn stop_controlling(&self) -> StopOutcome {
        self.executor.stop()
    }

    pub fn is_controlling(&self) -> bool {
        self.executor.is_running()
    }

    /// Number of ticks executed so far (including skipped ones).
    pub fn update_count(&self) -> u64 {
        self.executor.tick_count()
    }

    pub fn set_point(&self) -> f64 {
        self.core.settings.read().set_point
    }

    /// Replace the set point; takes effect on the next tick.
    pub fn update_set_point(&self, new_set_point: f64) {
        let old_set_point = {
            let mut settings = self.core.settings.write();
            std::mem::replace(&mut settings.set_point, new_set_point)
        };
        info!(
            control_loop = %self.core.loop_id,
            old_set_point,
            new_set_point,
            "set point updated"
        );
    }

    pub fn control_behaviour(&self) -> Arc<dyn ControlBehaviour> {
        Arc::clone(&self.core.settings.read().behaviour)
    }

    /// Replace the control behaviour; takes effect on the next tick.
    pub fn switch_control_behaviour(&self, new_behaviour: impl ControlBehaviour + 'static) {
        let new_behaviour: Arc<dyn ControlBehaviour> = Arc::new(new_behaviour);
        let old_behaviour = {
            let mut settings = self.core.settings.write();
            std::mem::replace(&mut settings.behaviour, Arc::clone(&new_behaviour))
        };
        info!(
            control_loop = %self.core.loop_id,
            old = ?old_behaviour,
            new = ?new_behaviour,
            "control behaviour switched"
        );
    }
}

impl fmt::Display for ControlLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.core.loop_id)
    }
}

impl fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self.core.settings.read();
        f.debug_struct("ControlLoop")
            .field("loop_id", &self.core.loop_id)
            .field("sensor", &self.core.sensor.instrument_id())
            .field("actuator", &self.core.actuator.instrument_id())
            .field("set_point", &settings.set_point)
            .field("behaviour", &settings.behaviour)
            .field("running", &self.executor.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ProportionalControl;
    use crate::listener::SignalRecorder;
    use crate::measured::ConstantMeasurement;
    use cf_core::{IdentityRegistry, SignalUnit};

    struct Plant {
        ids: IdentityRegistry,
        loops: ControlLoopRegistry,
    }

    impl Plant {
        fn new() -> Self {
            Self {
                ids: IdentityRegistry::new(),
                loops: ControlLoopRegistry::new(),
            }
        }

        fn sensor(&self, id: &str, measured: f64) -> Arc<Sensor> {
            Arc::new(
                Sensor::new(
                    &self.ids,
                    id,
                    Duration::from_millis(20),
                    SignalUnit::Celsius,
                    ConstantMeasurement::new(measured),
                )
                .unwrap(),
            )
        }

        fn actuator(&self, id: &str) -> Arc<Actuator> {
            Arc::new(Actuator::new(&self.ids, id, 0.0).unwrap())
        }

        fn control_loop(
            &self,
            id: &str,
            sensor: &Arc<Sensor>,
            actuator: &Arc<Actuator>,
        ) -> ControlResult<ControlLoop> {
            ControlLoop::new(
                &self.loops,
                id,
                Arc::clone(sensor),
                Arc::clone(actuator),
                2.0,
                Duration::from_millis(40),
                ProportionalControl::new(1.0)?,
            )
        }
    }

    #[test]
    fn idle_loop_does_not_adjust() {
        let plant = Plant::new();
        let (s, a) = (plant.sensor("TT-1", 0.0), plant.actuator("TV-1"));
        let recorder = SignalRecorder::shared();
        a.add_listener(recorder.clone());
        s.start_measuring();

        let control_loop = plant.control_loop("TIC-1", &s, &a).unwrap();
        assert!(!recorder.wait_for_len(1, Duration::from_millis(150)));
        assert!(!control_loop.is_controlling());
        s.stop_measuring();
    }

    #[test]
    fn set_point_round_trip() {
        let plant = Plant::new();
        let (s, a) = (plant.sensor("TT-1", 0.0), plant.actuator("TV-1"));
        let control_loop = plant.control_loop("TIC-1", &s, &a).unwrap();
        assert_eq!(control_loop.set_point(), 2.0);
        control_loop.update_set_point(4.0);
        assert_eq!(control_loop.set_point(), 4.0);
    }

    #[test]
    fn tick_without_reading_is_skipped() {
        let plant = Plant::new();
        let (s, a) = (plant.sensor("TT-1", 0.0), plant.actuator("TV-1"));
        let control_loop = plant.control_loop("TIC-1", &s, &a).unwrap();

        control_loop.start_controlling();
        std::thread::sleep(Duration::from_millis(100));
        control_loop.stop_controlling();

        assert!(control_loop.update_count() >= 1);
        assert_eq!(a.signal_value(), 0.0);
    }

    #[test]
    fn second_loop_on_same_sensor_fails() {
        let plant = Plant::new();
        let (s, a1, a2) = (
            plant.sensor("TT-1", 0.0),
            plant.actuator("TV-1"),
            plant.actuator("TV-2"),
        );
        let _first = plant.control_loop("TIC-1", &s, &a1).unwrap();
        let err = plant.control_loop("TIC-2", &s, &a2).unwrap_err();
        assert!(matches!(err, ControlError::DuplicateRegistration { .. }));
        assert_eq!(a2.listener_count(), 0);
        assert!(plant.loops.actuator_owner(a2.instrument_id()).is_none());
    }

    #[test]
    fn zero_period_leaves_registry_untouched() {
        let plant = Plant::new();
        let (s, a) = (plant.sensor("TT-1", 0.0), plant.actuator("TV-1"));
        let result = ControlLoop::new(
            &plant.loops,
            "TIC-1",
            Arc::clone(&s),
            Arc::clone(&a),
            1.0,
            Duration::ZERO,
            ProportionalControl::new(1.0).unwrap(),
        );
        assert!(result.is_err());
        assert!(plant.loops.is_empty());
        assert!(plant.control_loop("TIC-1", &s, &a).is_ok());
    }

    #[test]
    fn redundant_transitions_are_noops() {
        let plant = Plant::new();
        let (s, a) = (plant.sensor("TT-1", 0.0), plant.actuator("TV-1"));
        let control_loop = plant.control_loop("TIC-1", &s, &a).unwrap();

        assert_eq!(control_loop.stop_controlling(), StopOutcome::AlreadyStopped);
        assert_eq!(control_loop.start_controlling(), StartOutcome::Started);
        assert_eq!(control_loop.start_controlling(), StartOutcome::AlreadyRunning);
        assert_eq!(control_loop.stop_controlling(), StopOutcome::Stopped);
        assert_eq!(control_loop.stop_controlling(), StopOutcome::AlreadyStopped);
    }

    #[test]
    fn switch_behaviour_doubles_output() {
        let plant = Plant::new();
        let (s, a) = (plant.sensor("TT-1", 0.0), plant.actuator("TV-1"));
        let recorder = SignalRecorder::shared();
        a.add_listener(recorder.clone());
        s.start_measuring();
        assert!(wait_for_reading(&s));

        let control_loop = plant.control_loop("TIC-1", &s, &a).unwrap();
        control_loop.start_controlling();
        assert!(recorder.wait_for_len(1, Duration::from_secs(1)));
        let before = recorder.last().map(|sig| sig.quantity);

        control_loop.switch_control_behaviour(ProportionalControl::new(2.0).unwrap());
        // At most one tick can still be carrying the old behaviour.
        let seen = recorder.len();
        assert!(recorder.wait_for_len(seen + 2, Duration::from_secs(1)));
        let after = recorder.last().map(|sig| sig.quantity);
        control_loop.stop_controlling();
        s.stop_measuring();

        assert_eq!(before, Some(2.0));
        assert_eq!(after, Some(4.0));
    }

    fn wait_for_reading(sensor: &Sensor) -> bool {
        let deadline = std::time::Instant::now() + Duration::from_secs(1);
        while std::time::Instant::now() < deadline {
            if sensor.latest_signal().is_some() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }
}
