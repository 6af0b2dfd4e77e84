//! # Route Layers
//!
//! Keeps exactly one source + line layer on the surface for every shown
//! route. Per route the only states are absent, shown flat and shown
//! gradient; `show` always replaces whatever was painted before.
//!
//! Surfaces drop custom layers when their base style reloads, so the
//! manager remembers what it considers shown and repaints on
//! [`SurfaceEvent::StyleLoad`](crate::SurfaceEvent::StyleLoad). A `show`
//! issued before the style has loaded is painted at the next style load.

use std::collections::HashMap;
use std::sync::Arc;

use geojson::{Feature, FeatureCollection, GeoJson, Geometry};
use log::debug;

use crate::config::LineStyle;
use crate::palette::{slope_color, SLOPE_STOPS};
use crate::surface::{LineLayer, LinePaint, MapSurface};
use crate::{RenderMode, Segment, Trace};

/// Geometry ready to be painted for one route.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteRender {
    /// Whole path in one color
    Flat(Arc<Trace>),
    /// Slope-colored segments
    Gradient(Arc<Vec<Segment>>),
}

impl RouteRender {
    pub fn mode(&self) -> RenderMode {
        match self {
            RouteRender::Flat(_) => RenderMode::Flat,
            RouteRender::Gradient(_) => RenderMode::Gradient,
        }
    }

    /// GeoJSON source data for this render.
    pub fn to_geojson(&self) -> serde_json::Value {
        let document = match self {
            RouteRender::Flat(trace) => {
                let line = trace
                    .points
                    .iter()
                    .map(|p| vec![p.longitude, p.latitude, p.elevation])
                    .collect();
                let mut feature = Feature::from(Geometry::new(geojson::Value::LineString(line)));
                feature.set_property("route_id", trace.route_id.clone());
                GeoJson::Feature(feature)
            }
            RouteRender::Gradient(segments) => {
                let collection: FeatureCollection = segments
                    .iter()
                    .map(|s| {
                        let line = vec![s.from.to_vec(), s.to.to_vec()];
                        let mut feature = Feature::from(Geometry::new(geojson::Value::LineString(line)));
                        feature.set_property("slope", s.slope_percent);
                        feature.set_property("color", slope_color(s.slope_percent).to_hex());
                        feature
                    })
                    .collect();
                GeoJson::FeatureCollection(collection)
            }
        };
        serde_json::Value::from(document)
    }

    fn paint(&self, style: &LineStyle) -> LinePaint {
        match self {
            RouteRender::Flat(_) => LinePaint::Flat {
                color: style.color.clone(),
                width: style.width,
                opacity: style.opacity,
            },
            RouteRender::Gradient(_) => LinePaint::Gradient {
                stops: SLOPE_STOPS
                    .iter()
                    .map(|(slope, color)| (*slope, color.to_hex()))
                    .collect(),
                width: style.width,
                opacity: style.opacity,
            },
        }
    }
}

/// Surface source id for a route.
pub fn source_id(route_id: &str) -> String {
    format!("route-{}", route_id)
}

/// Surface layer id for a route.
pub fn layer_id(route_id: &str) -> String {
    format!("route-{}-line", route_id)
}

#[derive(Debug, Clone)]
struct ShownRoute {
    render: RouteRender,
    style: LineStyle,
}

/// Synchronizes route renders onto the surface.
#[derive(Debug, Default)]
pub struct RouteLayerManager {
    shown: HashMap<String, ShownRoute>,
}

impl RouteLayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a route, replacing any previous render of it.
    ///
    /// The render's variant selects the mode; flat mode paints with
    /// `style.color`, gradient mode ignores it.
    pub fn show<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        route_id: &str,
        render: RouteRender,
        style: &LineStyle,
    ) {
        let shown = ShownRoute {
            render,
            style: style.clone(),
        };

        if surface.is_style_loaded() {
            Self::paint(surface, route_id, &shown);
        } else {
            debug!("[RouteLayers] Style not loaded, deferring '{}'", route_id);
        }

        self.shown.insert(route_id.to_string(), shown);
    }

    /// Remove a route's layer and source. No-op when absent.
    pub fn hide<S: MapSurface + ?Sized>(&mut self, surface: &mut S, route_id: &str) {
        Self::remove_from_surface(surface, route_id);
        if self.shown.remove(route_id).is_some() {
            debug!("[RouteLayers] Hid '{}'", route_id);
        }
    }

    /// Remove every route this manager painted.
    pub fn hide_all<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        for route_id in self.shown.keys() {
            Self::remove_from_surface(surface, route_id);
        }
        self.shown.clear();
    }

    /// Repaint everything after a (re)loaded base style.
    pub fn handle_style_load<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        if self.shown.is_empty() {
            return;
        }
        debug!("[RouteLayers] Style loaded, repainting {} routes", self.shown.len());
        for (route_id, shown) in &self.shown {
            Self::paint(surface, route_id, shown);
        }
    }

    /// Current mode of a route, `None` when absent.
    pub fn mode(&self, route_id: &str) -> Option<RenderMode> {
        self.shown.get(route_id).map(|s| s.render.mode())
    }

    /// Ids of all shown routes.
    pub fn shown_routes(&self) -> Vec<String> {
        self.shown.keys().cloned().collect()
    }

    fn paint<S: MapSurface + ?Sized>(surface: &mut S, route_id: &str, shown: &ShownRoute) {
        Self::remove_from_surface(surface, route_id);

        let source = source_id(route_id);
        surface.add_source(&source, shown.render.to_geojson());
        surface.add_layer(LineLayer {
            id: layer_id(route_id),
            source,
            paint: shown.render.paint(&shown.style),
        });
    }

    fn remove_from_surface<S: MapSurface + ?Sized>(surface: &mut S, route_id: &str) {
        // Layer first: a source cannot be removed while a layer uses it
        let layer = layer_id(route_id);
        if surface.has_layer(&layer) {
            surface.remove_layer(&layer);
        }
        let source = source_id(route_id);
        if surface.has_source(&source) {
            surface.remove_source(&source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GradientConfig;
    use crate::gradient::compute_segments;
    use crate::surface::headless::HeadlessSurface;
    use crate::TracePoint;

    fn trace() -> Arc<Trace> {
        Arc::new(Trace::new(
            "r1",
            vec![
                TracePoint::new(-5.0, 56.800, 100.0),
                TracePoint::new(-5.0, 56.801, 115.0),
                TracePoint::new(-5.0, 56.802, 140.0),
            ],
        ))
    }

    fn flat() -> RouteRender {
        RouteRender::Flat(trace())
    }

    fn gradient() -> RouteRender {
        RouteRender::Gradient(Arc::new(compute_segments(&trace(), &GradientConfig::default())))
    }

    #[test]
    fn test_show_twice_leaves_one_layer() {
        let mut surface = HeadlessSurface::new();
        let mut layers = RouteLayerManager::new();

        layers.show(&mut surface, "r1", flat(), &LineStyle::default());
        layers.show(&mut surface, "r1", flat(), &LineStyle::default());

        assert_eq!(surface.layers.len(), 1);
        assert_eq!(surface.sources.len(), 1);
        assert_eq!(surface.conflicts, 0);
    }

    #[test]
    fn test_switch_mode_replaces_render() {
        let mut surface = HeadlessSurface::new();
        let mut layers = RouteLayerManager::new();

        layers.show(&mut surface, "r1", flat(), &LineStyle::default());
        assert_eq!(layers.mode("r1"), Some(RenderMode::Flat));

        layers.show(&mut surface, "r1", gradient(), &LineStyle::default());
        assert_eq!(layers.mode("r1"), Some(RenderMode::Gradient));
        assert_eq!(surface.layers.len(), 1);
        assert!(matches!(
            surface.layer(&layer_id("r1")).unwrap().paint,
            LinePaint::Gradient { .. }
        ));

        let data = &surface.sources[&source_id("r1")];
        assert_eq!(data["type"], "FeatureCollection");
        assert_eq!(data["features"].as_array().unwrap().len(), 2);
        assert!(data["features"][0]["properties"]["color"].is_string());

        layers.show(&mut surface, "r1", flat(), &LineStyle::default());
        assert_eq!(layers.mode("r1"), Some(RenderMode::Flat));
        assert_eq!(surface.conflicts, 0);
    }

    #[test]
    fn test_flat_source_is_linestring_feature() {
        let data = flat().to_geojson();
        let feature = match serde_json::from_value::<GeoJson>(data).unwrap() {
            GeoJson::Feature(feature) => feature,
            other => panic!("unexpected document {:?}", other),
        };

        assert_eq!(feature.property("route_id").unwrap(), "r1");
        match feature.geometry.unwrap().value {
            geojson::Value::LineString(line) => {
                assert_eq!(line.len(), trace().len());
                assert_eq!(line[0].len(), 3);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_flat_uses_caller_color() {
        let mut surface = HeadlessSurface::new();
        let mut layers = RouteLayerManager::new();
        let style = LineStyle {
            color: "#ff00ff".to_string(),
            ..LineStyle::default()
        };

        layers.show(&mut surface, "r1", flat(), &style);

        match &surface.layers[0].paint {
            LinePaint::Flat { color, .. } => assert_eq!(color, "#ff00ff"),
            other => panic!("unexpected paint {:?}", other),
        }
    }

    #[test]
    fn test_hide_is_idempotent() {
        let mut surface = HeadlessSurface::new();
        let mut layers = RouteLayerManager::new();

        layers.hide(&mut surface, "never-shown");
        layers.show(&mut surface, "r1", flat(), &LineStyle::default());
        layers.hide(&mut surface, "r1");
        layers.hide(&mut surface, "r1");

        assert!(surface.layers.is_empty());
        assert!(surface.sources.is_empty());
        assert_eq!(layers.mode("r1"), None);
    }

    #[test]
    fn test_deferred_until_style_load() {
        let mut surface = HeadlessSurface::loading();
        let mut layers = RouteLayerManager::new();

        layers.show(&mut surface, "r1", gradient(), &LineStyle::default());
        assert!(surface.layers.is_empty());
        assert_eq!(layers.mode("r1"), Some(RenderMode::Gradient));

        surface.reload_style();
        layers.handle_style_load(&mut surface);
        assert_eq!(surface.layers.len(), 1);
    }

    #[test]
    fn test_style_switch_repaints() {
        let mut surface = HeadlessSurface::new();
        let mut layers = RouteLayerManager::new();
        layers.show(&mut surface, "r1", flat(), &LineStyle::default());
        layers.show(&mut surface, "r2", gradient(), &LineStyle::default());

        surface.reload_style();
        assert!(surface.layers.is_empty());

        layers.handle_style_load(&mut surface);
        assert_eq!(surface.layers.len(), 2);
        assert_eq!(surface.conflicts, 0);

        layers.hide_all(&mut surface);
        assert!(surface.layers.is_empty());
        assert!(layers.shown_routes().is_empty());
    }
}
