//! Actuators driven by control loop output.
//!
//! An [`Actuator`] holds its current output value. Every adjustment stamps a
//! new [`Signal`] in [`SignalUnit::Percentage`] and hands it to each listener,
//! in registration order, before `adjust` returns.

use std::fmt;

use cf_core::{IdentityRegistry, InstrumentId, SignalUnit};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::ControlResult;
use crate::listener::{ListenerRef, Listeners};
use crate::signal::Signal;

/// Unit of every actuator signal.
pub const OUTPUT_UNIT: SignalUnit = SignalUnit::Percentage;

/// An instrument whose output is set by a control loop (e.g. a valve).
pub struct Actuator {
    instrument_id: InstrumentId,
    /// Held for the whole of an adjustment so notifications never interleave.
    adjust_lock: Mutex<()>,
    signal_value: RwLock<f64>,
    listeners: Listeners,
}

impl Actuator {
    /// Create an actuator reporting `initial_value` until its first adjustment.
    ///
    /// # Errors
    ///
    /// Fails if the id is already allocated.
    pub fn new(
        identities: &IdentityRegistry,
        instrument_id: &str,
        initial_value: f64,
    ) -> ControlResult<Self> {
        let instrument_id = identities.allocate(instrument_id)?;
        info!(instrument = %instrument_id, initial_value, "actuator created");
        Ok(Self {
            instrument_id,
            adjust_lock: Mutex::new(()),
            signal_value: RwLock::new(initial_value),
            listeners: Listeners::default(),
        })
    }

    pub fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    /// Apply a new output value and notify listeners.
    pub fn adjust(&self, new_value: f64) {
        let _adjusting = self.adjust_lock.lock();
        debug!(instrument = %self.instrument_id, new_value, "adjusting signal");
        *self.signal_value.write() = new_value;
        let signal = Signal::now(self.instrument_id.clone(), new_value, OUTPUT_UNIT);
        self.listeners.notify(&signal);
    }

    /// Last applied value (the initial value before any adjustment).
    pub fn signal_value(&self) -> f64 {
        *self.signal_value.read()
    }

    /// Subscribe `listener` to future adjustments.
    ///
    /// Returns `false` (with a warning) if it is already subscribed.
    pub fn add_listener(&self, listener: ListenerRef) -> bool {
        let added = self.listeners.add(listener);
        if added {
            info!(instrument = %self.instrument_id, "actuator listener added");
        } else {
            warn!(
                instrument = %self.instrument_id,
                "cannot add listener; it is already subscribed"
            );
        }
        added
    }

    /// Unsubscribe `listener`.
    ///
    /// Returns `false` (with a warning) if it was not subscribed.
    pub fn remove_listener(&self, listener: &ListenerRef) -> bool {
        let removed = self.listeners.remove(listener);
        if removed {
            info!(instrument = %self.instrument_id, "actuator listener removed");
        } else {
            warn!(
                instrument = %self.instrument_id,
                "cannot remove listener; it is not subscribed"
            );
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.instrument_id, f)
    }
}

impl fmt::Debug for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actuator")
            .field("instrument_id", &self.instrument_id)
            .field("signal_value", &self.signal_value())
            .finish()
    }
}
