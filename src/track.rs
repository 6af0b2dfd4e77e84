//! Raw track decoding.
//!
//! Track files arrive either as GeoJSON (`LineString`, `MultiLineString`,
//! `GeometryCollection`, `Feature` or `FeatureCollection`, coordinates
//! `[lon, lat, ele?]`) or as GPX. The format is sniffed from the first non-whitespace byte.

use geojson::{Feature, GeoJson};
use log::debug;

use crate::error::{MapError, Result};
use crate::{GpsPoint, Trace, TracePoint};

/// Decode raw track bytes into a [`Trace`].
///
/// Invalid coordinates are dropped. A missing elevation repeats the previous
/// sample's elevation (0 for the first). Zero usable samples is an error;
/// a single sample is returned as a degenerate trace.
pub fn decode_track(route_id: &str, bytes: &[u8]) -> Result<Trace> {
    let first = bytes.iter().find(|b| !b.is_ascii_whitespace());

    let raw: Vec<(f64, f64, Option<f64>)> = match first {
        None => return Err(MapError::decode(route_id, "empty track file")),
        Some(b'<') => decode_gpx(route_id, bytes)?,
        Some(_) => decode_geojson(route_id, bytes)?,
    };

    let mut last_elevation = 0.0;
    let points: Vec<TracePoint> = raw
        .into_iter()
        .filter(|(lon, lat, _)| GpsPoint::new(*lat, *lon).is_valid())
        .map(|(lon, lat, ele)| {
            let elevation = ele.filter(|e| e.is_finite()).unwrap_or(last_elevation);
            last_elevation = elevation;
            TracePoint::new(lon, lat, elevation)
        })
        .collect();

    if points.is_empty() {
        return Err(MapError::decode(route_id, "no valid coordinates"));
    }

    debug!(
        "[Track] Decoded '{}' with {} samples",
        route_id,
        points.len()
    );

    Ok(Trace::new(route_id, points))
}

fn decode_gpx(route_id: &str, bytes: &[u8]) -> Result<Vec<(f64, f64, Option<f64>)>> {
    let gpx_data: gpx::Gpx =
        gpx::read(bytes).map_err(|e| MapError::decode(route_id, format!("GPX parse error: {}", e)))?;

    let mut points: Vec<(f64, f64, Option<f64>)> = gpx_data
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .map(|wp| (wp.point().x(), wp.point().y(), wp.elevation))
        .collect();

    // Planned routes carry <rte> instead of <trk>
    if points.is_empty() {
        points = gpx_data
            .routes
            .iter()
            .flat_map(|route| route.points.iter())
            .map(|wp| (wp.point().x(), wp.point().y(), wp.elevation))
            .collect();
    }

    Ok(points)
}

fn decode_geojson(route_id: &str, bytes: &[u8]) -> Result<Vec<(f64, f64, Option<f64>)>> {
    let document: GeoJson = serde_json::from_slice(bytes)
        .map_err(|e| MapError::decode(route_id, format!("GeoJSON parse error: {}", e)))?;

    let mut points = Vec::new();
    match &document {
        GeoJson::FeatureCollection(collection) => {
            for feature in &collection.features {
                collect_feature(feature, &mut points);
            }
        }
        GeoJson::Feature(feature) => collect_feature(feature, &mut points),
        GeoJson::Geometry(geometry) => collect_geometry(&geometry.value, &mut points),
    }
    Ok(points)
}

fn collect_feature(feature: &Feature, out: &mut Vec<(f64, f64, Option<f64>)>) {
    if let Some(geometry) = &feature.geometry {
        collect_geometry(&geometry.value, out);
    }
}

fn collect_geometry(value: &geojson::Value, out: &mut Vec<(f64, f64, Option<f64>)>) {
    match value {
        geojson::Value::LineString(line) => out.extend(line.iter().filter_map(|p| position(p))),
        geojson::Value::MultiLineString(lines) => {
            out.extend(lines.iter().flatten().filter_map(|p| position(p)))
        }
        geojson::Value::GeometryCollection(members) => {
            for member in members {
                collect_geometry(&member.value, out);
            }
        }
        // Start/summit points and areas carry no path
        geojson::Value::Point(_)
        | geojson::Value::MultiPoint(_)
        | geojson::Value::Polygon(_)
        | geojson::Value::MultiPolygon(_) => {}
    }
}

/// `[lon, lat, ele?]`. Positions with fewer than two values are dropped.
fn position(position: &[f64]) -> Option<(f64, f64, Option<f64>)> {
    match position {
        [lon, lat, rest @ ..] => Some((*lon, *lat, rest.first().copied())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Schiehallion</name>
    <trkseg>
      <trkpt lat="56.6660" lon="-4.1000"><ele>330</ele></trkpt>
      <trkpt lat="56.6670" lon="-4.0950"><ele>420</ele></trkpt>
      <trkpt lat="56.6680" lon="-4.0900"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn test_decode_gpx_track() {
        let trace = decode_track("schiehallion", GPX.as_bytes()).unwrap();
        assert_eq!(trace.route_id, "schiehallion");
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.points[0].elevation, 330.0);
        assert_eq!(trace.points[1].longitude, -4.0950);
        // Missing elevation carries the previous value
        assert_eq!(trace.points[2].elevation, 420.0);
    }

    #[test]
    fn test_decode_geojson_feature_collection() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [0, 0]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "LineString", "coordinates": [[-5.0, 56.8, 100], [-5.01, 56.81, 150.5]]}}
            ]
        }"#;
        let trace = decode_track("r1", json.as_bytes()).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.points[1].elevation, 150.5);
    }

    #[test]
    fn test_decode_multilinestring_without_elevation() {
        let json = r#"{"type": "MultiLineString", "coordinates": [[[-5.0, 56.8]], [[-5.1, 56.9]]]}"#;
        let trace = decode_track("r2", json.as_bytes()).unwrap();
        assert_eq!(trace.len(), 2);
        assert!(trace.points.iter().all(|p| p.elevation == 0.0));
    }

    #[test]
    fn test_invalid_coordinates_dropped() {
        let json = r#"{"type": "LineString", "coordinates": [[-5.0, 56.8, 10], [500.0, 56.8, 10], [-5.1, 56.9, 20]]}"#;
        let trace = decode_track("r3", json.as_bytes()).unwrap();
        assert_eq!(trace.len(), 2);
    }

    #[test]
    fn test_short_positions_dropped() {
        let json = r#"{"type": "Feature", "properties": null,
            "geometry": {"type": "LineString", "coordinates": [[-5.0], [-5.1, 56.9, 20]]}}"#;
        let trace = decode_track("r5", json.as_bytes()).unwrap();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace.points[0].elevation, 20.0);
    }

    #[test]
    fn test_single_sample_is_not_an_error() {
        let json = r#"{"type": "LineString", "coordinates": [[-5.0, 56.8, 10]]}"#;
        let trace = decode_track("r4", json.as_bytes()).unwrap();
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(matches!(
            decode_track("bad", b"   "),
            Err(MapError::Decode { .. })
        ));
        assert!(matches!(
            decode_track("bad", b"{\"type\": \"LineString\""),
            Err(MapError::Decode { .. })
        ));
        assert!(matches!(
            decode_track("bad", b"<gpx><trk>"),
            Err(MapError::Decode { .. })
        ));
        assert!(matches!(
            decode_track("bad", br#"{"type": "LineString", "coordinates": []}"#),
            Err(MapError::Decode { .. })
        ));
        assert!(matches!(
            decode_track("bad", br#"{"type": "Circle"}"#),
            Err(MapError::Decode { .. })
        ));
    }
}
