//! Query helpers for summarising the recordings of a plant run.

use std::time::Duration;

use cf_controls::Signal;
use cf_core::{IntervalStats, SignalUnit};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metrics::{LoopMetrics, compute_loop_metrics};
use crate::plant::Plant;

/// Summary of a finished plant run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub plant: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub sensors: Vec<InstrumentSummary>,
    pub actuators: Vec<InstrumentSummary>,
    pub loops: Vec<LoopSummary>,
}

/// What one instrument's recorder saw.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentSummary {
    pub id: String,
    pub unit: SignalUnit,
    pub samples: usize,
    pub last_value: Option<f64>,
    /// Mean gap between consecutive signals; `None` with fewer than two.
    pub mean_interval_ms: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoopSummary {
    pub id: String,
    pub sensor_id: String,
    pub actuator_id: String,
    pub set_point: f64,
    /// Ticks executed, including ones skipped for lack of a reading.
    pub updates: u64,
    pub metrics: LoopMetrics,
}

impl RunSummary {
    pub fn sensor(&self, id: &str) -> Option<&InstrumentSummary> {
        self.sensors.iter().find(|s| s.id == id)
    }

    pub fn actuator(&self, id: &str) -> Option<&InstrumentSummary> {
        self.actuators.iter().find(|a| a.id == id)
    }

    pub fn control_loop(&self, id: &str) -> Option<&LoopSummary> {
        self.loops.iter().find(|l| l.id == id)
    }
}

/// Convert signals to `(seconds since first signal, quantity)` pairs.
pub fn signal_series(signals: &[Signal]) -> Vec<(f64, f64)> {
    let Some(first) = signals.first() else {
        return Vec::new();
    };
    signals
        .iter()
        .map(|s| {
            let offset = s.timestamp.signed_duration_since(first.timestamp);
            let seconds = offset
                .num_microseconds()
                .map_or(f64::NAN, |us| us as f64 / 1e6);
            (seconds, s.quantity)
        })
        .collect()
}

pub fn summarise_instrument(id: &str, unit: SignalUnit, signals: &[Signal]) -> InstrumentSummary {
    let timestamps: Vec<_> = signals.iter().map(|s| s.timestamp).collect();
    InstrumentSummary {
        id: id.to_string(),
        unit,
        samples: signals.len(),
        last_value: signals.last().map(|s| s.quantity),
        mean_interval_ms: IntervalStats::from_timestamps(&timestamps).map(|stats| stats.mean_ms),
    }
}

/// Summarise everything a plant's recorders captured.
pub fn summarise_plant(plant: &Plant, started_at: DateTime<Utc>, duration: Duration) -> RunSummary {
    let sensors = plant
        .sensors()
        .iter()
        .map(|s| {
            summarise_instrument(
                s.device.instrument_id().as_str(),
                s.device.unit(),
                &s.recorder.signals(),
            )
        })
        .collect();

    let actuators = plant
        .actuators()
        .iter()
        .map(|a| {
            summarise_instrument(
                a.device.instrument_id().as_str(),
                cf_controls::OUTPUT_UNIT,
                &a.recorder.signals(),
            )
        })
        .collect();

    let loops = plant
        .loops()
        .iter()
        .map(|control_loop| {
            let sensor_id = control_loop.sensor().instrument_id().as_str();
            let actuator_id = control_loop.actuator().instrument_id().as_str();
            let measured = plant
                .sensor(sensor_id)
                .map(|s| signal_series(&s.recorder.signals()))
                .unwrap_or_default();
            let output = plant
                .actuator(actuator_id)
                .map(|a| signal_series(&a.recorder.signals()))
                .unwrap_or_default();
            let set_point = control_loop.set_point();

            LoopSummary {
                id: control_loop.loop_id().to_string(),
                sensor_id: sensor_id.to_string(),
                actuator_id: actuator_id.to_string(),
                set_point,
                updates: control_loop.update_count(),
                metrics: compute_loop_metrics(&measured, set_point, &output),
            }
        })
        .collect();

    RunSummary {
        plant: plant.name().to_string(),
        started_at,
        duration_ms: duration.as_millis() as u64,
        sensors,
        actuators,
        loops,
    }
}
