//! Control behaviours.
//!
//! A control behaviour maps (set point, measured value) to an actuator
//! command. Behaviours are pure: no side effects, no failure modes beyond
//! construction-time validation. Control loops hold them behind an `Arc` so a
//! running loop can swap behaviour atomically.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{ControlError, ControlResult};

/// Computes actuator output from the set point and the measured value.
pub trait ControlBehaviour: Debug + Send + Sync {
    fn compute_output(&self, set_point: f64, measured_value: f64) -> f64;
}

/// Proportional control: `output = gain * (set_point - measured_value)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProportionalControl {
    gain: f64,
}

impl ProportionalControl {
    /// Create a proportional controller.
    ///
    /// # Errors
    ///
    /// A gain of exactly zero produces no corrective action and is rejected
    /// with [`ControlError::InvalidGain`], as is a non-finite gain.
    pub fn new(gain: f64) -> ControlResult<Self> {
        if gain == 0.0 || !gain.is_finite() {
            error!(gain, "cannot create a proportional controller with this gain");
            return Err(ControlError::InvalidGain { gain });
        }
        Ok(Self { gain })
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }
}

impl ControlBehaviour for ProportionalControl {
    fn compute_output(&self, set_point: f64, measured_value: f64) -> f64 {
        // Error: e = sp - pv (positive error means PV is below setpoint)
        self.gain * (set_point - measured_value)
    }
}

impl<'de> Deserialize<'de> for ProportionalControl {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            gain: f64,
        }
        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.gain).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_gain_rejected() {
        assert_eq!(
            ProportionalControl::new(0.0),
            Err(ControlError::InvalidGain { gain: 0.0 })
        );
        assert!(ProportionalControl::new(-0.0).is_err());
        assert!(ProportionalControl::new(f64::NAN).is_err());
    }

    #[test]
    fn proportional_examples() {
        let p = ProportionalControl::new(2.0).unwrap();
        assert_eq!(p.compute_output(2.0, 0.0), 4.0);

        let p = ProportionalControl::new(1.0).unwrap();
        assert_eq!(p.compute_output(0.0, 1.0), -1.0);
    }

    #[test]
    fn negative_gain_allowed() {
        let p = ProportionalControl::new(-0.5).unwrap();
        assert_eq!(p.compute_output(4.0, 2.0), -1.0);
    }

    #[test]
    fn deserialize_validates_gain() {
        let ok: ProportionalControl = serde_json::from_str(r#"{"gain": 1.5}"#).unwrap();
        assert_eq!(ok.gain(), 1.5);
        assert!(serde_json::from_str::<ProportionalControl>(r#"{"gain": 0.0}"#).is_err());
    }

    proptest! {
        #[test]
        fn proportional_law(
            gain in (-1e3f64..1e3).prop_filter("non-zero", |g| *g != 0.0),
            sp in -1e3f64..1e3,
            mv in -1e3f64..1e3,
        ) {
            let p = ProportionalControl::new(gain).unwrap();
            prop_assert_eq!(p.compute_output(sp, mv), gain * (sp - mv));
        }
    }
}
