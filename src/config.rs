//! Engine configuration.
//!
//! Every threshold the engine uses lives here with its production default.
//! Hosts may load overrides from JSON; missing fields keep their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};
use crate::geo_utils::MAX_SLOPE_PERCENT;

/// Configuration for slope computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientConfig {
    /// Sample pairs closer than this reuse the previous slope instead of
    /// computing a new one. Default: 5.0 meters
    pub min_pair_distance_m: f64,

    /// Neighbors on each side averaged by the weighted smoother.
    /// Default: 5
    pub smoothing_radius: usize,

    /// Upper clamp for slope values, at most 45. Default: 45.0 percent
    pub max_slope_percent: f64,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            min_pair_distance_m: 5.0,
            smoothing_radius: 5,
            max_slope_percent: 45.0,
        }
    }
}

/// Configuration for camera following.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Zoom level the camera eases to when a summit is targeted.
    /// Default: 13.0
    pub target_zoom: f64,

    /// Duration of the ease animation. Default: 1200 ms
    pub ease_duration_ms: u32,

    /// Center drift beyond which the camera counts as off-center.
    /// Default: 50.0 meters
    pub off_center_distance_m: f64,

    /// Zoom drift beyond which the camera counts as off-center.
    /// Default: 0.5
    pub off_center_zoom_delta: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            target_zoom: 13.0,
            ease_duration_ms: 1200,
            off_center_distance_m: 50.0,
            off_center_zoom_delta: 0.5,
        }
    }
}

/// Configuration for summit markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Viewports narrower than this are treated as touch devices and get no
    /// hover behavior. Default: 768.0 px
    pub touch_breakpoint_px: f64,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            touch_breakpoint_px: 768.0,
        }
    }
}

/// Paint style for a flat-mode route line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineStyle {
    /// CSS color string. Default: "#3b82f6"
    pub color: String,
    /// Line width in pixels. Default: 4.0
    pub width: f64,
    /// Line opacity. Default: 0.9
    pub opacity: f64,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: "#3b82f6".to_string(),
            width: 4.0,
            opacity: 0.9,
        }
    }
}

/// Aggregate configuration for a map session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub gradient: GradientConfig,
    pub camera: CameraConfig,
    pub markers: MarkerConfig,
    pub route_style: LineStyle,
}

impl MapConfig {
    /// Parse a (possibly partial) JSON document and validate it.
    ///
    /// # Example
    /// ```
    /// use munro_map::MapConfig;
    ///
    /// let config = MapConfig::from_json(r#"{"camera": {"target_zoom": 12.0}}"#).unwrap();
    /// assert_eq!(config.camera.target_zoom, 12.0);
    /// assert_eq!(config.gradient.smoothing_radius, 5);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: MapConfig = serde_json::from_str(json).map_err(|e| MapError::Config {
            message: format!("Invalid JSON: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (
                self.gradient.min_pair_distance_m > 0.0,
                "gradient.min_pair_distance_m must be positive",
            ),
            (
                self.gradient.max_slope_percent > 0.0,
                "gradient.max_slope_percent must be positive",
            ),
            (
                self.gradient.max_slope_percent <= MAX_SLOPE_PERCENT,
                "gradient.max_slope_percent must not exceed 45",
            ),
            (
                self.camera.off_center_distance_m > 0.0,
                "camera.off_center_distance_m must be positive",
            ),
            (
                self.camera.off_center_zoom_delta >= 0.0,
                "camera.off_center_zoom_delta must not be negative",
            ),
            (
                self.camera.target_zoom.is_finite(),
                "camera.target_zoom must be finite",
            ),
            (
                self.route_style.width > 0.0,
                "route_style.width must be positive",
            ),
        ];

        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, message)) => Err(MapError::Config {
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MapConfig::default();
        assert_eq!(config.gradient.min_pair_distance_m, 5.0);
        assert_eq!(config.gradient.smoothing_radius, 5);
        assert_eq!(config.gradient.max_slope_percent, 45.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = MapConfig::from_json(r#"{"gradient": {"smoothing_radius": 3}}"#).unwrap();
        assert_eq!(config.gradient.smoothing_radius, 3);
        assert_eq!(config.gradient.min_pair_distance_m, 5.0);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = MapConfig::from_json(r#"{"camera": {"off_center_distance_m": 0}}"#);
        assert!(matches!(result, Err(MapError::Config { .. })));

        let result = MapConfig::from_json(r#"{"gradient": {"max_slope_percent": 60}}"#);
        assert!(matches!(result, Err(MapError::Config { .. })));

        let result = MapConfig::from_json("not json");
        assert!(matches!(result, Err(MapError::Config { .. })));
    }
}
