//! Listener capability shared by sensors and actuators.
//!
//! Sensors fan every new reading out to their listeners and actuators fan out
//! every adjustment. Fan-out is synchronous and in registration order; a
//! listener must return quickly and must not call back into the instrument
//! that is notifying it (adding or removing listeners from a callback is fine).

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};

use crate::signal::Signal;

/// Receives signals from a sensor or actuator.
pub trait SignalListener: Send + Sync {
    fn on_signal(&self, signal: &Signal);
}

impl<F> SignalListener for F
where
    F: Fn(&Signal) + Send + Sync,
{
    fn on_signal(&self, signal: &Signal) {
        self(signal)
    }
}

/// Shared handle to a listener. Identity (for duplicate detection) is the
/// allocation the handle points at, not the listener's contents.
pub type ListenerRef = Arc<dyn SignalListener>;

fn same_listener(a: &ListenerRef, b: &ListenerRef) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Ordered, duplicate-free listener list.
#[derive(Default)]
pub(crate) struct Listeners {
    inner: RwLock<Vec<ListenerRef>>,
}

impl Listeners {
    /// Returns `false` (and changes nothing) if `listener` is already present.
    pub(crate) fn add(&self, listener: ListenerRef) -> bool {
        let mut inner = self.inner.write();
        if inner.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        inner.push(listener);
        true
    }

    /// Returns `false` (and changes nothing) if `listener` is absent.
    pub(crate) fn remove(&self, listener: &ListenerRef) -> bool {
        let mut inner = self.inner.write();
        match inner.iter().position(|l| same_listener(l, listener)) {
            Some(index) => {
                inner.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Notify every listener registered at the time of the call, in order.
    pub(crate) fn notify(&self, signal: &Signal) {
        let snapshot: Vec<ListenerRef> = self.inner.read().clone();
        for listener in &snapshot {
            listener.on_signal(signal);
        }
    }
}

/// Listener that keeps every signal it receives.
#[derive(Debug, Default)]
pub struct SignalRecorder {
    signals: Mutex<Vec<Signal>>,
    arrived: Condvar,
}

impl SignalRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor returning the shared handle instruments expect.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Copy of every signal recorded so far, oldest first.
    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.signals.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.lock().is_empty()
    }

    pub fn last(&self) -> Option<Signal> {
        self.signals.lock().last().cloned()
    }

    /// Block until at least `count` signals have been recorded or `timeout`
    /// elapses. Returns whether the count was reached.
    pub fn wait_for_len(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signals = self.signals.lock();
        while signals.len() < count {
            if self.arrived.wait_until(&mut signals, deadline).timed_out() {
                return signals.len() >= count;
            }
        }
        true
    }
}

impl SignalListener for SignalRecorder {
    fn on_signal(&self, signal: &Signal) {
        self.signals.lock().push(signal.clone());
        self.arrived.notify_all();
    }
}
