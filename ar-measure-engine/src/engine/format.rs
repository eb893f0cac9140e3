use constants::units::{
    CENTIMETERS_PER_METER, IMPERIAL_INCH_THRESHOLD, INCHES_PER_FOOT, INCHES_PER_METER,
    METRIC_CENTIMETER_THRESHOLD,
};
use serde::{Deserialize, Serialize};

/// Unit system used for distance labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Convert string identifier to unit system for RPC compatibility.
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "metric" => Some(Self::Metric),
            "imperial" => Some(Self::Imperial),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }
}

/// Render a distance in meters as a readout label.
///
/// Metric: below 1 m as centimeters with one decimal ("50.0 cm"), otherwise
/// meters with two decimals ("1.50 m"). Imperial: below 12 in as inches with
/// one decimal ("7.9 in"), otherwise feet with two decimals ("3.28 ft").
pub fn format_distance(meters: f32, units: UnitSystem) -> String {
    let meters = f64::from(meters);
    match units {
        UnitSystem::Metric => {
            if meters < METRIC_CENTIMETER_THRESHOLD {
                format!("{:.1} cm", meters * CENTIMETERS_PER_METER)
            } else {
                format!("{meters:.2} m")
            }
        }
        UnitSystem::Imperial => {
            let inches = meters * INCHES_PER_METER;
            if inches < IMPERIAL_INCH_THRESHOLD {
                format!("{inches:.1} in")
            } else {
                format!("{:.2} ft", inches / INCHES_PER_FOOT)
            }
        }
    }
}
