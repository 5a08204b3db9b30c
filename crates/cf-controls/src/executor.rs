//! Start/stop wrapper around a fixed-rate repeating task.
//!
//! Each running [`PeriodicExecutor`] owns one background thread. The first
//! tick fires as soon as the thread starts; later ticks follow a
//! [`SampleClock`], so a slow tick is followed immediately by the next one
//! rather than pushing the whole schedule back.

use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cf_core::AccumulatingTimer;
use crossbeam_channel::{RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ControlError, ControlResult};
use crate::sampled::SampleClock;

/// Result of [`PeriodicExecutor::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// The executor was already running; nothing changed.
    AlreadyRunning,
}

/// Result of [`PeriodicExecutor::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// The executor was already stopped; nothing changed.
    AlreadyStopped,
}

type Task = Arc<dyn Fn() + Send + Sync>;

static NEXT_EXECUTOR_TOKEN: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    // Token of the executor whose worker is the current thread (0 = none).
    static CURRENT_EXECUTOR: Cell<usize> = const { Cell::new(0) };
}

struct Worker {
    // Dropping the sender disconnects the channel, which is the stop signal.
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Runs a callback at a fixed rate on a background thread.
pub struct PeriodicExecutor {
    name: String,
    period: Duration,
    task: Task,
    token: usize,
    /// Serializes start/stop calls made from outside the worker thread.
    lifecycle: Mutex<()>,
    worker: Mutex<Option<Worker>>,
    ticks: Arc<AccumulatingTimer>,
}

impl PeriodicExecutor {
    /// Create a stopped executor.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidArg`] if `period` is zero.
    pub fn new<F>(name: impl Into<String>, period: Duration, task: F) -> ControlResult<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if period.is_zero() {
            return Err(ControlError::InvalidArg {
                what: "execution period must be positive",
            });
        }
        Ok(Self {
            name: name.into(),
            period,
            task: Arc::new(task),
            token: NEXT_EXECUTOR_TOKEN.fetch_add(1, Ordering::Relaxed),
            lifecycle: Mutex::new(()),
            worker: Mutex::new(None),
            ticks: Arc::new(AccumulatingTimer::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Total number of ticks executed over the executor's lifetime.
    pub fn tick_count(&self) -> u64 {
        self.ticks.count()
    }

    /// Average time spent inside the callback per tick.
    pub fn average_tick_time(&self) -> Duration {
        self.ticks.average()
    }

    /// Begin ticking. The first tick fires immediately.
    ///
    /// Calling this while already running is a no-op reported as
    /// [`StartOutcome::AlreadyRunning`] and a warning.
    pub fn start(&self) -> StartOutcome {
        let _lifecycle = self.lifecycle_guard();
        let mut worker = self.worker.lock();
        if worker.is_some() {
            warn!(executor = %self.name, "cannot start; it is already executing");
            return StartOutcome::AlreadyRunning;
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let name = self.name.clone();
        let period = self.period;
        let task = Arc::clone(&self.task);
        let ticks = Arc::clone(&self.ticks);
        let token = self.token;

        let handle = thread::spawn(move || {
            CURRENT_EXECUTOR.with(|current| current.set(token));
            debug!(executor = %name, "worker thread started");

            let mut clock = SampleClock::new(period, Instant::now());
            loop {
                match stop_rx.recv_deadline(clock.next_sample_time()) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
                let started = Instant::now();
                task();
                ticks.record(started.elapsed());
                clock.advance();
            }

            debug!(executor = %name, "worker thread finished");
        });

        *worker = Some(Worker { stop_tx, handle });
        info!(executor = %self.name, period_ms = self.period.as_millis() as u64, "started");
        StartOutcome::Started
    }

    /// Stop ticking.
    ///
    /// A tick already in progress is allowed to finish; once this returns no
    /// further tick will start. When called from inside the executor's own
    /// callback the stop is signalled without waiting, and the current tick
    /// is the last one.
    ///
    /// Calling this while already stopped is a no-op reported as
    /// [`StopOutcome::AlreadyStopped`] and a warning.
    pub fn stop(&self) -> StopOutcome {
        let _lifecycle = self.lifecycle_guard();
        let Some(worker) = self.worker.lock().take() else {
            warn!(executor = %self.name, "cannot stop; it is already stopped");
            return StopOutcome::AlreadyStopped;
        };

        let Worker { stop_tx, handle } = worker;
        drop(stop_tx);
        if !self.on_worker_thread() && handle.join().is_err() {
            warn!(executor = %self.name, "worker thread panicked");
        }

        info!(
            executor = %self.name,
            ticks = self.tick_count(),
            average_tick_us = self.average_tick_time().as_micros() as u64,
            "stopped"
        );
        StopOutcome::Stopped
    }

    fn on_worker_thread(&self) -> bool {
        CURRENT_EXECUTOR.with(|current| current.get() == self.token)
    }

    fn lifecycle_guard(&self) -> Option<parking_lot::MutexGuard<'_, ()>> {
        if self.on_worker_thread() {
            None
        } else {
            Some(self.lifecycle.lock())
        }
    }
}

impl Drop for PeriodicExecutor {
    fn drop(&mut self) {
        if let Some(Worker { stop_tx, handle }) = self.worker.get_mut().take() {
            drop(stop_tx);
            if !self.on_worker_thread() {
                let _ = handle.join();
            }
        }
    }
}

impl std::fmt::Debug for PeriodicExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicExecutor")
            .field("name", &self.name)
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}
