//! Slope-annotated segments for gradient rendering.
//!
//! Raw per-pair slopes are noisy: GPS elevation jitters by several meters
//! and closely spaced samples turn that into huge spikes. Pairs closer than
//! `min_pair_distance_m` therefore reuse the previous slope, and the whole
//! sequence is smoothed before being attached to segments.

use crate::config::GradientConfig;
use crate::geo_utils::{distance_meters, slope_percent, weighted_smooth};
use crate::{Segment, Trace};

/// Raw (unsmoothed) slope for each consecutive sample pair.
///
/// Length is `trace.len() - 1` for traces with at least two samples.
pub fn raw_slopes(trace: &Trace, config: &GradientConfig) -> Vec<f64> {
    let mut previous = 0.0;
    trace
        .points
        .windows(2)
        .map(|pair| {
            let (a, b) = (&pair[0], &pair[1]);
            let distance = distance_meters(a.latitude, a.longitude, b.latitude, b.longitude);
            if distance >= config.min_pair_distance_m {
                previous = slope_percent(b.elevation - a.elevation, distance)
                    .min(config.max_slope_percent);
            }
            previous
        })
        .collect()
}

/// Compute render-ready segments for a trace.
///
/// Each consecutive sample pair becomes one [`Segment`] carrying the
/// smoothed slope at its position, so `segments.len() == trace.len() - 1`.
/// A trace with fewer than two samples yields a single zero-slope segment
/// instead of an error. The output is deterministic.
///
/// # Example
/// ```
/// use munro_map::{compute_segments, GradientConfig, Trace, TracePoint};
///
/// let trace = Trace::new("one-point", vec![TracePoint::new(-5.0, 56.8, 900.0)]);
/// let segments = compute_segments(&trace, &GradientConfig::default());
/// assert_eq!(segments.len(), 1);
/// assert_eq!(segments[0].slope_percent, 0.0);
/// ```
pub fn compute_segments(trace: &Trace, config: &GradientConfig) -> Vec<Segment> {
    if trace.len() < 2 {
        let at = trace.points.first().map(|p| p.lng_lat()).unwrap_or([0.0, 0.0]);
        return vec![Segment {
            from: at,
            to: at,
            slope_percent: 0.0,
        }];
    }

    let smoothed = weighted_smooth(&raw_slopes(trace, config), config.smoothing_radius);

    trace
        .points
        .windows(2)
        .zip(smoothed)
        .map(|(pair, slope)| Segment {
            from: pair[0].lng_lat(),
            to: pair[1].lng_lat(),
            slope_percent: slope.clamp(0.0, config.max_slope_percent),
        })
        .collect()
}
