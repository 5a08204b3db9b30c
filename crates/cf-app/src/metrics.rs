//! Control loop performance metrics analysis.
//!
//! Computes tracking and output metrics (steady-state error, settling time,
//! overshoot, output range) from recorded sensor and actuator series. Series
//! are `(time_s, value)` pairs with time measured from the first sample.

use serde::{Deserialize, Serialize};

/// Fractional band used for settling time.
pub const SETTLING_BAND: f64 = 0.02;

/// Control loop performance metrics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LoopMetrics {
    /// Final measured value minus set point.
    pub steady_state_error: Option<f64>,
    /// Last output applied to the actuator.
    pub final_output: Option<f64>,
    /// Time for the output to enter the ±2% band around its final value and
    /// stay there (seconds).
    pub output_settling_time_s: Option<f64>,
    /// Peak output above its final value, in percent of the final value.
    pub output_overshoot_pct: Option<f64>,
    pub min_output: Option<f64>,
    pub max_output: Option<f64>,
}

impl LoopMetrics {
    /// Returns true if at least some metrics were computed
    pub fn has_data(&self) -> bool {
        self.steady_state_error.is_some() || self.final_output.is_some()
    }
}

/// Compute metrics for a loop from its sensor series, set point and actuator
/// output series. Fields that cannot be computed are left `None`.
pub fn compute_loop_metrics(
    measured_series: &[(f64, f64)],
    set_point: f64,
    output_series: &[(f64, f64)],
) -> LoopMetrics {
    let mut metrics = LoopMetrics::default();

    if let Some((_, final_measured)) = measured_series.last() {
        metrics.steady_state_error = Some(final_measured - set_point);
    }

    let Some(&(_, final_output)) = output_series.last() else {
        return metrics;
    };
    metrics.final_output = Some(final_output);

    let (min, max) = output_series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
            (lo.min(*v), hi.max(*v))
        });
    metrics.min_output = Some(min);
    metrics.max_output = Some(max);

    if final_output.abs() > 1e-9 {
        let overshoot = (max - final_output) / final_output.abs() * 100.0;
        if overshoot > 0.0 {
            metrics.output_overshoot_pct = Some(overshoot);
        }
    }
    metrics.output_settling_time_s = settling_time(output_series, final_output, SETTLING_BAND);

    metrics
}

/// Time of the first sample after which every sample stays within
/// `tolerance` of `final_val`. A zero final value uses an absolute band.
fn settling_time(series: &[(f64, f64)], final_val: f64, tolerance: f64) -> Option<f64> {
    let half_width = if final_val.abs() < 1e-9 {
        tolerance
    } else {
        final_val.abs() * tolerance
    };

    let outside = |v: f64| (v - final_val).abs() > half_width;
    match series.iter().rposition(|(_, v)| outside(*v)) {
        None => series.first().map(|(t, _)| *t),
        Some(last_outside) => series.get(last_outside + 1).map(|(t, _)| *t),
    }
}
