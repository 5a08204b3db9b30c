//! Measurement strategies for sensors.
//!
//! A sensor does not know how its values are produced; on every tick it asks
//! its [`MeasurementBehaviour`] for a fresh [`Signal`]. Strategies are pure
//! functions of (identity, unit, clock) and hold no state shared between
//! sensors.

use std::fmt::Debug;

use cf_core::{InstrumentId, SignalUnit};
use chrono::{DateTime, Utc};
use rand::Rng;

use crate::signal::Signal;

/// Source of timestamps for new signals. Sensors use [`cf_core::utc_now`].
pub type Clock = fn() -> DateTime<Utc>;

/// Produces one measurement per sensor tick.
pub trait MeasurementBehaviour: Debug + Send + Sync {
    fn take_measurement(&self, instrument_id: &InstrumentId, unit: SignalUnit, clock: Clock)
    -> Signal;
}

/// Always reports the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantMeasurement {
    constant: f64,
}

impl ConstantMeasurement {
    pub fn new(constant: f64) -> Self {
        Self { constant }
    }

    pub fn value(&self) -> f64 {
        self.constant
    }
}

impl MeasurementBehaviour for ConstantMeasurement {
    fn take_measurement(
        &self,
        instrument_id: &InstrumentId,
        unit: SignalUnit,
        clock: Clock,
    ) -> Signal {
        Signal::new(instrument_id.clone(), self.constant, unit, clock())
    }
}

/// Reports a uniformly distributed pseudorandom value in `[0, 1)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampledMeasurement;

impl SampledMeasurement {
    pub fn new() -> Self {
        Self
    }
}

impl MeasurementBehaviour for SampledMeasurement {
    fn take_measurement(
        &self,
        instrument_id: &InstrumentId,
        unit: SignalUnit,
        clock: Clock,
    ) -> Signal {
        let quantity = rand::thread_rng().gen_range(0.0..1.0);
        Signal::new(instrument_id.clone(), quantity, unit, clock())
    }
}
