//! Timestamped signal values.

use cf_core::{InstrumentId, SignalUnit};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single reading (from a sensor) or command (applied to an actuator).
///
/// Created fresh on every tick and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    /// Instrument that produced the signal.
    pub instrument_id: InstrumentId,
    /// Signal value.
    pub quantity: f64,
    pub unit: SignalUnit,
    /// UTC time at which the value was produced.
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn new(
        instrument_id: InstrumentId,
        quantity: f64,
        unit: SignalUnit,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            instrument_id,
            quantity,
            unit,
            timestamp,
        }
    }

    /// Create a signal stamped with the current UTC time.
    pub fn now(instrument_id: InstrumentId, quantity: f64, unit: SignalUnit) -> Self {
        Self::new(instrument_id, quantity, unit, cf_core::utc_now())
    }
}
