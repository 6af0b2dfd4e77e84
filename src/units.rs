//! Display unit conversion.
//!
//! Geometry and slope math is always metric; these helpers only format
//! values for presentation.

use serde::{Deserialize, Serialize};

const METERS_PER_MILE: f64 = 1_609.344;
const FEET_PER_METER: f64 = 3.280_84;

/// User display preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Format a path distance given in meters ("12.3 km" / "7.6 mi").
    pub fn format_distance(&self, meters: f64) -> String {
        match self {
            UnitSystem::Metric => format!("{:.1} km", meters / 1000.0),
            UnitSystem::Imperial => format!("{:.1} mi", meters / METERS_PER_MILE),
        }
    }

    /// Format a route length stored in kilometers.
    pub fn format_length_km(&self, km: f64) -> String {
        self.format_distance(km * 1000.0)
    }

    /// Format an elevation or ascent given in meters ("1345 m" / "4413 ft").
    pub fn format_elevation(&self, meters: f64) -> String {
        match self {
            UnitSystem::Metric => format!("{:.0} m", meters),
            UnitSystem::Imperial => format!("{:.0} ft", meters * FEET_PER_METER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric() {
        assert_eq!(UnitSystem::Metric.format_distance(12_345.0), "12.3 km");
        assert_eq!(UnitSystem::Metric.format_elevation(1345.0), "1345 m");
        assert_eq!(UnitSystem::Metric.format_length_km(12.0), "12.0 km");
    }

    #[test]
    fn test_imperial() {
        assert_eq!(UnitSystem::Imperial.format_distance(1_609.344), "1.0 mi");
        assert_eq!(UnitSystem::Imperial.format_elevation(1345.0), "4413 ft");
    }
}
