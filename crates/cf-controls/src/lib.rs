//! Closed-loop instrument control for ctrlflow.
//!
//! This crate holds the concurrency-bearing core: sensors sample on their own
//! schedule, control loops poll the latest reading on theirs, and actuators
//! apply the computed output.
//!
//! # Architecture
//!
//! - [`PeriodicExecutor`] runs a callback at a fixed rate on a background
//!   thread (one thread per started sensor and per started loop)
//! - [`Sensor`] caches its latest [`Signal`] and fans it out to listeners
//! - [`Actuator`] holds the current output and fans out adjustments
//! - [`ControlBehaviour`] maps (set point, measured value) to output;
//!   [`ProportionalControl`] is the provided implementation
//! - [`ControlLoop`] glues one sensor to one actuator
//! - [`ControlLoopRegistry`] guarantees a sensor or actuator belongs to at
//!   most one loop
//!
//! # Design Principles
//!
//! - **Explicit ownership of shared state**: identity and loop registries are
//!   constructed by the caller and passed in, never global
//! - **Polling between sensor and loop**: a loop sees whichever reading was
//!   latest when its tick runs
//! - **Redundant calls are not errors**: repeated start/stop and duplicate
//!   listener changes are warned no-ops

pub mod actuator;
pub mod control_loop;
pub mod controller;
pub mod error;
pub mod executor;
pub mod listener;
pub mod measured;
pub mod registry;
pub mod sampled;
pub mod sensor;
pub mod signal;

pub use actuator::{Actuator, OUTPUT_UNIT};
pub use control_loop::ControlLoop;
pub use controller::{ControlBehaviour, ProportionalControl};
pub use error::{ControlError, ControlResult, RegisteredEntity};
pub use executor::{PeriodicExecutor, StartOutcome, StopOutcome};
pub use listener::{ListenerRef, SignalListener, SignalRecorder};
pub use measured::{Clock, ConstantMeasurement, MeasurementBehaviour, SampledMeasurement};
pub use registry::ControlLoopRegistry;
pub use sampled::SampleClock;
pub use sensor::Sensor;
pub use signal::Signal;
