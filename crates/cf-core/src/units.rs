// cf-core/src/units.rs

use core::fmt;

/// Physical property a signal unit measures. Metadata only; ctrlflow never
/// converts between units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PhysicalProperty {
    Temperature,
    VolumetricFlow,
    Output,
}

/// Unit attached to every Signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SignalUnit {
    Celsius,
    Fahrenheit,
    #[cfg_attr(feature = "serde", serde(rename = "m3_per_hour"))]
    M3PerHour,
    /// Actuator output, 0-100 %.
    Percentage,
}

impl SignalUnit {
    pub const fn physical_property(self) -> PhysicalProperty {
        match self {
            Self::Celsius | Self::Fahrenheit => PhysicalProperty::Temperature,
            Self::M3PerHour => PhysicalProperty::VolumetricFlow,
            Self::Percentage => PhysicalProperty::Output,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
            Self::M3PerHour => "m³/h",
            Self::Percentage => "%",
        }
    }
}

impl fmt::Display for SignalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
