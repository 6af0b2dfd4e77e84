//! # Munro Map
//!
//! Interactive map engine for a hill-walking companion.
//!
//! This library turns route track files and summit records into a live,
//! continuously updated map:
//! - Geodesic distance, slope and smoothing over noisy elevation samples
//! - Session-scoped trace caching with in-flight de-duplication
//! - Idempotent flat/gradient route layers on a rendering surface
//! - Animated summit marker lifecycle with hover and popups
//! - Camera following with settle tracking and off-center detection
//! - Multi-criteria summit filtering over routes and social bagging data
//!
//! The rendering surface, record store and track source are collaborators
//! behind traits ([`MapSurface`], [`RecordStore`], [`TrackSource`]); the
//! engine owns no persistent storage.
//!
//! ## Features
//!
//! - **`http`** - Enable an HTTP [`TrackSource`] for raw track files
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use munro_map::{compute_segments, GradientConfig, Trace, TracePoint};
//!
//! let trace = Trace::new(
//!     "ben-nevis-pony-track",
//!     vec![
//!         TracePoint::new(-5.0500, 56.7900, 100.0),
//!         TracePoint::new(-5.0450, 56.7920, 180.0),
//!         TracePoint::new(-5.0400, 56.7940, 300.0),
//!     ],
//! );
//!
//! let segments = compute_segments(&trace, &GradientConfig::default());
//! assert_eq!(segments.len(), 2);
//! assert!(segments.iter().all(|s| s.slope_percent <= 45.0));
//! ```

use geo::{BoundingRect, Coord, LineString};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{MapError, OptionExt, Result};

// Configuration with production defaults
pub mod config;
pub use config::{CameraConfig, GradientConfig, LineStyle, MapConfig, MarkerConfig};

// Geographic utilities (distance, slope, smoothing)
pub mod geo_utils;

// Display unit conversion
pub mod units;
pub use units::UnitSystem;

// Raw track decoding (GeoJSON / GPX)
pub mod track;
pub use track::decode_track;

// Slope-annotated segments
pub mod gradient;
pub use gradient::compute_segments;

// Slope color ramp
pub mod palette;
pub use palette::{slope_color, Rgb};

// Collaborator interfaces
pub mod store;
pub use store::{BaggedSets, RecordStore, TrackSource};

// Session-scoped trace cache
pub mod trace_cache;
pub use trace_cache::{CacheStats, TraceCache};

// Rendering surface abstraction
pub mod surface;
pub use surface::{MapSurface, SurfaceEvent};

// Route layer synchronization
pub mod route_layer;
pub use route_layer::{RouteLayerManager, RouteRender};

// Summit marker lifecycle
pub mod markers;
pub use markers::{FormFactor, MarkerLifecycleManager, MarkerPhase, MarkerState, NavigationRequest};

// Camera following
pub mod camera;
pub use camera::{CameraController, CameraIntent};

// Summit filtering
pub mod filter;
pub use filter::{apply_filter, FilterCriteria, NumericRange, SocialFilter, SocialMode};

// Spatial index for viewport queries
pub mod poi_index;
pub use poi_index::PoiIndex;

// Shared view state
pub mod view_state;
pub use view_state::{ViewSnapshot, ViewState};

// Map session wiring
pub mod session;
pub use session::{Catalog, Liveness, MapSession};

// HTTP module for raw track fetching
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::HttpTrackSource;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use munro_map::GpsPoint;
/// let point = GpsPoint::new(56.7969, -5.0036); // Ben Nevis
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Check whether a point lies inside (edges inclusive).
    pub fn contains(&self, point: &GpsPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// A summit (point of interest). Owned by the record store; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters
    pub elevation: f64,
    pub region: String,
    /// URL slug used for the detail view
    pub slug: String,
}

impl Poi {
    /// Position of the summit.
    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// Route shape classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteStyle {
    Linear,
    CircularLoop,
    OutAndBack,
}

/// Route difficulty grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
    Expert,
}

/// A walking route. One route may visit many summits through [`Link`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub id: String,
    pub name: String,
    /// Key of the raw track file, resolved by a [`TrackSource`]
    pub track_ref: String,
    /// Route length in kilometers
    pub length_km: f64,
    /// Total ascent in meters
    pub ascent_m: f64,
    pub style: RouteStyle,
    pub difficulty: Difficulty,
    /// Estimated walking time in hours
    pub estimated_hours: f64,
}

/// Many-to-many association between a route and a summit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub route_id: String,
    pub poi_id: String,
}

/// One decoded track sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub longitude: f64,
    pub latitude: f64,
    /// Elevation in meters
    pub elevation: f64,
}

impl TracePoint {
    pub fn new(longitude: f64, latitude: f64, elevation: f64) -> Self {
        Self {
            longitude,
            latitude,
            elevation,
        }
    }

    /// `[longitude, latitude]`, GeoJSON order.
    pub fn lng_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// Decoded coordinate + elevation sequence for one route's track file.
///
/// Samples are ordered along the path. Well-formed tracks have at least two
/// samples; a single-sample trace is tolerated and renders as a degenerate
/// segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub route_id: String,
    pub points: Vec<TracePoint>,
}

impl Trace {
    pub fn new(route_id: &str, points: Vec<TracePoint>) -> Self {
        Self {
            route_id: route_id.to_string(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total path length in meters.
    pub fn length_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| {
                geo_utils::distance_meters(
                    pair[0].latitude,
                    pair[0].longitude,
                    pair[1].latitude,
                    pair[1].longitude,
                )
            })
            .sum()
    }

    /// Sum of positive elevation changes in meters.
    pub fn total_ascent_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| (pair[1].elevation - pair[0].elevation).max(0.0))
            .sum()
    }

    /// Bounding box of the trace, `None` when empty.
    pub fn bounds(&self) -> Option<Bounds> {
        let line: LineString<f64> = self
            .points
            .iter()
            .map(|p| Coord {
                x: p.longitude,
                y: p.latitude,
            })
            .collect();
        line.bounding_rect().map(|rect| Bounds {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lng: rect.min().x,
            max_lng: rect.max().x,
        })
    }
}

/// One edge of a trace annotated with its smoothed slope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// `[longitude, latitude]`
    pub from: [f64; 2],
    /// `[longitude, latitude]`
    pub to: [f64; 2],
    /// Slope in percent, within `[0, max_slope_percent]`
    pub slope_percent: f64,
}

/// How a route path is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// Single caller-supplied color
    Flat,
    /// Color encodes slope
    Gradient,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trace() -> Trace {
        Trace::new(
            "r1",
            vec![
                TracePoint::new(-5.0036, 56.7969, 1345.0),
                TracePoint::new(-5.0100, 56.8000, 1200.0),
                TracePoint::new(-5.0200, 56.8050, 1250.0),
            ],
        )
    }

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(56.7969, -5.0036).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_trace_summary() {
        let trace = sample_trace();
        assert_eq!(trace.len(), 3);
        assert!(trace.length_m() > 0.0);
        assert!((trace.total_ascent_m() - 50.0).abs() < 1e-9);

        let bounds = trace.bounds().unwrap();
        assert_eq!(bounds.min_lng, -5.0200);
        assert_eq!(bounds.max_lat, 56.8050);
        assert!(bounds.contains(&bounds.center()));
    }

    #[test]
    fn test_empty_trace_has_no_bounds() {
        let trace = Trace::new("empty", vec![]);
        assert!(trace.is_empty());
        assert!(trace.bounds().is_none());
        assert_eq!(trace.length_m(), 0.0);
    }

    #[test]
    fn test_route_style_serde() {
        let json = serde_json::to_string(&RouteStyle::CircularLoop).unwrap();
        assert_eq!(json, "\"circular-loop\"");
        let d: Difficulty = serde_json::from_str("\"moderate\"").unwrap();
        assert_eq!(d, Difficulty::Moderate);
    }
}
