//! Geographic and numeric primitives.
//!
//! All functions are pure. Inputs are degrees and meters; nothing here knows
//! about display units.

use geo::{Distance, Haversine, Point};

use crate::GpsPoint;

/// Mean Earth radius in meters, for the planar approximation.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Upper bound for a slope value in percent.
pub const MAX_SLOPE_PERCENT: f64 = 45.0;

/// Great-circle distance in meters using the haversine formula.
///
/// # Example
/// ```
/// use munro_map::geo_utils::distance_meters;
///
/// // Ben Nevis to Carn Mor Dearg, roughly 1.4 km
/// let d = distance_meters(56.7969, -5.0036, 56.8050, -4.9870);
/// assert!(d > 1_200.0 && d < 1_600.0);
/// ```
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Haversine::distance(Point::new(lon1, lat1), Point::new(lon2, lat2))
}

/// Haversine distance between two points in meters.
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    distance_meters(p1.latitude, p1.longitude, p2.latitude, p2.longitude)
}

/// Flat-earth (equirectangular) distance in meters. Only accurate over
/// short distances; used for camera drift.
pub fn planar_distance_meters(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let mean_lat = ((p1.latitude + p2.latitude) / 2.0).to_radians();
    let x = (p2.longitude - p1.longitude).to_radians() * mean_lat.cos();
    let y = (p2.latitude - p1.latitude).to_radians();
    EARTH_RADIUS_M * (x * x + y * y).sqrt()
}

/// Absolute slope in percent, clamped to [`MAX_SLOPE_PERCENT`].
///
/// Callers must not use this for pairs closer than the configured minimum
/// distance; they reuse the previous slope instead.
pub fn slope_percent(elevation_delta: f64, distance_m: f64) -> f64 {
    if distance_m <= 0.0 {
        return 0.0;
    }
    ((elevation_delta / distance_m).abs() * 100.0).min(MAX_SLOPE_PERCENT)
}

/// Weighted moving average with weight `1 / (1 + |i - j|)` for every
/// neighbor `j` within `radius` of `i`.
///
/// The output has the same length as the input. Windows are truncated at
/// the ends rather than padded.
///
/// # Example
/// ```
/// use munro_map::geo_utils::weighted_smooth;
///
/// let smoothed = weighted_smooth(&[0.0, 10.0, 0.0], 1);
/// assert!(smoothed[1] > 0.0 && smoothed[1] < 10.0);
/// ```
pub fn weighted_smooth(values: &[f64], radius: usize) -> Vec<f64> {
    let n = values.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = i.saturating_add(radius).min(n.saturating_sub(1));

            let mut weighted_sum = 0.0;
            let mut weight_total = 0.0;
            for (j, value) in values.iter().enumerate().take(hi + 1).skip(lo) {
                let weight = 1.0 / (1.0 + i.abs_diff(j) as f64);
                weighted_sum += weight * value;
                weight_total += weight;
            }
            weighted_sum / weight_total
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_zero() {
        assert_eq!(distance_meters(56.8, -5.0, 56.8, -5.0), 0.0);
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        // One degree of latitude is ~111.2 km on the mean sphere
        let d = distance_meters(56.0, -5.0, 57.0, -5.0);
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
    }

    #[test]
    fn test_planar_close_to_haversine_at_short_range() {
        let a = GpsPoint::new(56.7969, -5.0036);
        let b = GpsPoint::new(56.7975, -5.0020);
        let exact = haversine_distance(&a, &b);
        let planar = planar_distance_meters(&a, &b);
        assert!((exact - planar).abs() < 0.5, "{} vs {}", exact, planar);
    }

    #[test]
    fn test_slope_percent() {
        assert_eq!(slope_percent(10.0, 100.0), 10.0);
        assert_eq!(slope_percent(-10.0, 100.0), 10.0);
        assert_eq!(slope_percent(100.0, 100.0), MAX_SLOPE_PERCENT);
        assert_eq!(slope_percent(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_smooth_zeros() {
        assert_eq!(weighted_smooth(&[0.0; 5], 2), vec![0.0; 5]);
    }

    #[test]
    fn test_smooth_spike_is_damped() {
        let smoothed = weighted_smooth(&[0.0, 10.0, 0.0], 1);
        assert_eq!(smoothed.len(), 3);
        assert!(smoothed[1] > 0.0 && smoothed[1] < 10.0);
        // Center weight 1, neighbors 0.5 each: 10 / 2
        assert!((smoothed[1] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_smooth_constant_preserved() {
        let smoothed = weighted_smooth(&[7.5; 12], 5);
        assert!(smoothed.iter().all(|v| (v - 7.5).abs() < 1e-12));
    }

    #[test]
    fn test_smooth_radius_zero_is_identity() {
        let values = [1.0, 4.0, 2.0];
        assert_eq!(weighted_smooth(&values, 0), values.to_vec());
    }

    #[test]
    fn test_smooth_huge_radius_averages_everything() {
        let smoothed = weighted_smooth(&[0.0, 10.0, 0.0], usize::MAX);
        assert_eq!(smoothed.len(), 3);
        assert!((smoothed[1] - 5.0).abs() < 1e-12);
        // End points see both neighbors: (0 + 0.5 * 10 + 0) / (1 + 0.5 + 1/3)
        assert!((smoothed[0] - 5.0 / (11.0 / 6.0)).abs() < 1e-12);
    }

    #[test]
    fn test_smooth_empty() {
        assert!(weighted_smooth(&[], 5).is_empty());
    }
}
