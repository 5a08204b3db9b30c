//! Periodically sampling sensors.
//!
//! A [`Sensor`] owns a [`PeriodicExecutor`]. On every tick it asks its
//! measurement strategy for a new [`Signal`], caches it as the latest reading
//! and hands it to every listener in registration order. Control loops poll
//! the cached reading; they are never pushed to.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cf_core::{IdentityRegistry, InstrumentId, SignalUnit};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{ControlError, ControlResult};
use crate::executor::{PeriodicExecutor, StartOutcome, StopOutcome};
use crate::listener::{ListenerRef, Listeners};
use crate::measured::MeasurementBehaviour;
use crate::signal::Signal;

struct SensorCore {
    instrument_id: InstrumentId,
    unit: SignalUnit,
    measurement: Box<dyn MeasurementBehaviour>,
    /// Held for the whole of a tick so ticks never interleave.
    tick_lock: Mutex<()>,
    latest: RwLock<Option<Signal>>,
    listeners: Listeners,
}

impl SensorCore {
    fn take_measurement(&self) {
        let _tick = self.tick_lock.lock();
        let signal =
            self.measurement
                .take_measurement(&self.instrument_id, self.unit, cf_core::utc_now);
        debug!(instrument = %self.instrument_id, quantity = signal.quantity, "measurement taken");
        *self.latest.write() = Some(signal.clone());
        self.listeners.notify(&signal);
    }
}

/// An instrument that measures a process variable at a fixed sampling period.
pub struct Sensor {
    core: Arc<SensorCore>,
    sampling_period: Duration,
    executor: PeriodicExecutor,
}

impl Sensor {
    /// Create a sensor. It does not measure until [`Sensor::start_measuring`].
    ///
    /// # Arguments
    ///
    /// * `identities` - Registry the instrument id is allocated from
    /// * `instrument_id` - Unique id of the sensor
    /// * `sampling_period` - How often a new measurement is taken
    /// * `unit` - Unit of every measurement
    /// * `measurement` - How measurements are produced
    ///
    /// # Errors
    ///
    /// Fails if the id is already allocated or the period is zero. Nothing is
    /// allocated on failure.
    pub fn new(
        identities: &IdentityRegistry,
        instrument_id: &str,
        sampling_period: Duration,
        unit: SignalUnit,
        measurement: impl MeasurementBehaviour + 'static,
    ) -> ControlResult<Self> {
        if sampling_period.is_zero() {
            return Err(ControlError::InvalidArg {
                what: "sampling period must be positive",
            });
        }
        let id = identities.allocate(instrument_id)?;

        let core = Arc::new(SensorCore {
            instrument_id: id.clone(),
            unit,
            measurement: Box::new(measurement),
            tick_lock: Mutex::new(()),
            latest: RwLock::new(None),
            listeners: Listeners::default(),
        });
        let tick_core = Arc::clone(&core);
        let executor = PeriodicExecutor::new(id.to_string(), sampling_period, move || {
            tick_core.take_measurement()
        })?;

        info!(
            instrument = %id,
            sampling_period_ms = sampling_period.as_millis() as u64,
            unit = %unit,
            "sensor created"
        );
        Ok(Self {
            core,
            sampling_period,
            executor,
        })
    }

    pub fn instrument_id(&self) -> &InstrumentId {
        &self.core.instrument_id
    }

    pub fn unit(&self) -> SignalUnit {
        self.core.unit
    }

    pub fn sampling_period(&self) -> Duration {
        self.sampling_period
    }

    pub fn start_measuring(&self) -> StartOutcome {
        self.executor.start()
    }

    pub fn stop_measuring(&self) -> StopOutcome {
        self.executor.stop()
    }

    pub fn is_measuring(&self) -> bool {
        self.executor.is_running()
    }

    /// Most recent reading, or `None` before the first tick.
    pub fn latest_signal(&self) -> Option<Signal> {
        self.core.latest.read().clone()
    }

    /// Number of measurements taken so far.
    pub fn measurement_count(&self) -> u64 {
        self.executor.tick_count()
    }

    /// Subscribe `listener` to future measurements.
    ///
    /// Returns `false` (with a warning) if it is already subscribed.
    pub fn add_listener(&self, listener: ListenerRef) -> bool {
        let added = self.core.listeners.add(listener);
        if added {
            info!(instrument = %self.core.instrument_id, "sensor listener added");
        } else {
            warn!(
                instrument = %self.core.instrument_id,
                "cannot add listener; it is already subscribed"
            );
        }
        added
    }

    /// Unsubscribe `listener`.
    ///
    /// Returns `false` (with a warning) if it was not subscribed.
    pub fn remove_listener(&self, listener: &ListenerRef) -> bool {
        let removed = self.core.listeners.remove(listener);
        if removed {
            info!(instrument = %self.core.instrument_id, "sensor listener removed");
        } else {
            warn!(
                instrument = %self.core.instrument_id,
                "cannot remove listener; it is not subscribed"
            );
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.core.listeners.len()
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.core.instrument_id, f)
    }
}

impl fmt::Debug for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("instrument_id", &self.core.instrument_id)
            .field("unit", &self.core.unit)
            .field("sampling_period", &self.sampling_period)
            .field("measurement", &self.core.measurement)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::SignalRecorder;
    use crate::measured::{ConstantMeasurement, SampledMeasurement};
    use cf_core::CoreError;

    const PERIOD: Duration = Duration::from_millis(10);

    fn sampled_sensor(ids: &IdentityRegistry, id: &str) -> Sensor {
        Sensor::new(ids, id, PERIOD, SignalUnit::Celsius, SampledMeasurement::new()).unwrap()
    }

    #[test]
    fn duplicate_id_rejected() {
        let ids = IdentityRegistry::new();
        let _first = sampled_sensor(&ids, "fakeId");
        let err = Sensor::new(&ids, "fakeId", PERIOD, SignalUnit::Celsius, SampledMeasurement)
            .unwrap_err();
        assert!(matches!(
            err,
            ControlError::Core(CoreError::DuplicateIdentity { .. })
        ));
    }

    #[test]
    fn blank_id_rejected() {
        let ids = IdentityRegistry::new();
        let err = Sensor::new(&ids, "  ", PERIOD, SignalUnit::Celsius, SampledMeasurement)
            .unwrap_err();
        assert!(matches!(
            err,
            ControlError::Core(CoreError::InvalidArg { .. })
        ));
        assert!(ids.is_empty());
    }

    #[test]
    fn zero_period_allocates_nothing() {
        let ids = IdentityRegistry::new();
        let result = Sensor::new(
            &ids,
            "TT-0",
            Duration::ZERO,
            SignalUnit::Celsius,
            ConstantMeasurement::new(1.0),
        );
        assert!(result.is_err());
        assert!(!ids.is_allocated("TT-0"));
    }

    #[test]
    fn no_reading_before_first_tick() {
        let ids = IdentityRegistry::new();
        let sensor = sampled_sensor(&ids, "TT-1");
        assert!(sensor.latest_signal().is_none());
        assert!(!sensor.is_measuring());
    }

    #[test]
    fn start_measuring_notifies_listeners() {
        let ids = IdentityRegistry::new();
        let sensor = sampled_sensor(&ids, "TT-2");
        let recorder = SignalRecorder::shared();
        sensor.add_listener(recorder.clone());

        assert!(!recorder.wait_for_len(1, PERIOD * 5));
        sensor.start_measuring();
        assert!(recorder.wait_for_len(1, Duration::from_secs(1)));
        sensor.stop_measuring();
    }

    #[test]
    fn stop_measuring_halts_notifications() {
        let ids = IdentityRegistry::new();
        let sensor = sampled_sensor(&ids, "TT-3");
        let recorder = SignalRecorder::shared();
        sensor.add_listener(recorder.clone());

        sensor.start_measuring();
        assert!(recorder.wait_for_len(2, Duration::from_secs(1)));
        sensor.stop_measuring();
        let count = recorder.len();
        std::thread::sleep(PERIOD * 5);
        assert_eq!(recorder.len(), count);
    }

    #[test]
    fn latest_signal_matches_last_notification() {
        let ids = IdentityRegistry::new();
        let sensor = sampled_sensor(&ids, "TT-4");
        let recorder = SignalRecorder::shared();
        sensor.add_listener(recorder.clone());

        sensor.start_measuring();
        assert!(recorder.wait_for_len(20, Duration::from_secs(5)));
        sensor.stop_measuring();

        let signals = recorder.signals();
        for pair in signals.windows(2) {
            assert_ne!(pair[0], pair[1]);
            assert_eq!(pair[1].unit, SignalUnit::Celsius);
        }
        assert_eq!(sensor.latest_signal(), signals.last().cloned());
        assert_eq!(sensor.measurement_count(), signals.len() as u64);
    }

    #[test]
    fn duplicate_add_and_absent_remove_are_noops() {
        let ids = IdentityRegistry::new();
        let sensor = sampled_sensor(&ids, "TT-5");
        let recorder: ListenerRef = SignalRecorder::shared();

        assert!(sensor.add_listener(Arc::clone(&recorder)));
        assert!(!sensor.add_listener(Arc::clone(&recorder)));
        assert_eq!(sensor.listener_count(), 1);

        assert!(sensor.remove_listener(&recorder));
        assert!(!sensor.remove_listener(&recorder));
        assert_eq!(sensor.listener_count(), 0);
    }

    #[test]
    fn removed_listener_receives_nothing() {
        let ids = IdentityRegistry::new();
        let sensor = sampled_sensor(&ids, "TT-6");
        let recorder = SignalRecorder::shared();
        let listener: ListenerRef = recorder.clone();
        sensor.add_listener(Arc::clone(&listener));
        sensor.remove_listener(&listener);

        sensor.start_measuring();
        std::thread::sleep(PERIOD * 10);
        sensor.stop_measuring();
        assert!(recorder.is_empty());
        assert!(sensor.latest_signal().is_some());
    }
}
