//! GeoJSON boundary I/O: street network source, area outline source, and the
//! geographic data sink.
//!
//! All GeoJSON coordinates are geographic (lng, lat) degrees; conversion to
//! and from the local planar CRS happens here, never inside the geometric
//! core. Malformed coordinates are rejected at ingestion so NaN can never
//! reach a coverage ratio.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use geo::{LineString, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use log::{info, warn};
use serde_json::json;

use crate::geo_utils::LocalProjection;
use crate::pipeline::RegionSummary;
use crate::{Result, Street, StreetMatchError, Track};

/// Read a street network from a GeoJSON feature collection of LineStrings.
///
/// The area label is taken from `area_property`; the street id from a
/// `street_id` property when present and from the feature's position in the
/// collection otherwise. Features that are not LineStrings or have no area
/// label are skipped with a warning; non-finite coordinates and zero-length
/// geometries are hard errors.
pub fn read_streets(
    geojson: &str,
    area_property: &str,
    projection: &LocalProjection,
) -> Result<Vec<Street>> {
    let collection = parse_collection(geojson)?;
    let mut streets = Vec::new();

    for (index, feature) in collection.features.iter().enumerate() {
        let Some(Geometry {
            value: Value::LineString(coords),
            ..
        }) = &feature.geometry
        else {
            warn!("[GeoData] Skipping non-LineString street feature {}", index);
            continue;
        };

        let Some(area) = prop_str(feature, area_property) else {
            warn!(
                "[GeoData] Skipping street feature {} without '{}' property",
                index, area_property
            );
            continue;
        };

        let id = prop_u64(feature, "street_id").unwrap_or(index as u64);
        let line = project_positions(coords, projection);
        streets.push(Street::new(id, area, line)?);
    }

    info!("[GeoData] Read {} streets", streets.len());
    Ok(streets)
}

/// Read area outlines from a GeoJSON feature collection of Polygons or
/// MultiPolygons, labeled by `area_property`.
///
/// A MultiPolygon yields one entry per member polygon under the same label.
pub fn read_outlines(
    geojson: &str,
    area_property: &str,
    projection: &LocalProjection,
) -> Result<Vec<(String, Polygon<f64>)>> {
    let collection = parse_collection(geojson)?;
    let mut outlines = Vec::new();

    for (index, feature) in collection.features.iter().enumerate() {
        let Some(area) = prop_str(feature, area_property) else {
            warn!(
                "[GeoData] Skipping outline feature {} without '{}' property",
                index, area_property
            );
            continue;
        };

        match &feature.geometry {
            Some(Geometry {
                value: Value::Polygon(rings),
                ..
            }) => outlines.push((area.to_string(), project_polygon(area, rings, projection)?)),
            Some(Geometry {
                value: Value::MultiPolygon(polygons),
                ..
            }) => {
                for rings in polygons {
                    outlines.push((area.to_string(), project_polygon(area, rings, projection)?));
                }
            }
            _ => {
                warn!("[GeoData] Skipping non-Polygon outline feature {}", index);
            }
        }
    }

    info!("[GeoData] Read {} area outlines", outlines.len());
    Ok(outlines)
}

/// Sink for named pipeline outputs: geometry collections in geographic
/// coordinates and per-area summary tables.
pub trait GeoSink {
    /// Persist a feature collection under the given name.
    fn write(&mut self, name: &str, collection: FeatureCollection) -> Result<()>;

    /// Persist region summaries under the given name.
    fn write_summaries(&mut self, name: &str, summaries: &[RegionSummary]) -> Result<()>;
}

/// Sink that writes `<name>.geojson` files into a directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl GeoSink for FileSink {
    fn write(&mut self, name: &str, collection: FeatureCollection) -> Result<()> {
        let path = self.dir.join(format!("{}.geojson", name));
        let body = GeoJson::FeatureCollection(collection).to_string();
        fs::write(&path, body).map_err(|e| StreetMatchError::GeoJsonError {
            message: format!("failed to write {}: {}", path.display(), e),
        })?;
        info!("[GeoData] Saved {}", path.display());
        Ok(())
    }

    /// Summaries are plain tables, not geometries, so they land in
    /// `<name>.json` rather than a feature collection.
    fn write_summaries(&mut self, name: &str, summaries: &[RegionSummary]) -> Result<()> {
        let path = self.dir.join(format!("{}.json", name));
        let body = serde_json::to_string_pretty(summaries).map_err(|e| {
            StreetMatchError::GeoJsonError {
                message: format!("failed to serialize summaries: {}", e),
            }
        })?;
        fs::write(&path, body).map_err(|e| StreetMatchError::GeoJsonError {
            message: format!("failed to write {}: {}", path.display(), e),
        })?;
        info!("[GeoData] Saved {}", path.display());
        Ok(())
    }
}

/// Convert streets back to a geographic feature collection.
///
/// When a completed set is supplied, each feature carries a `completed`
/// property; subsetting to only completed streets is the caller's choice.
pub fn streets_to_features(
    streets: &[Street],
    completed: Option<&BTreeSet<u64>>,
    projection: &LocalProjection,
) -> FeatureCollection {
    let features = streets
        .iter()
        .map(|street| {
            let mut properties = JsonObject::new();
            properties.insert("street_id".to_string(), json!(street.id));
            properties.insert("area".to_string(), json!(street.area));
            properties.insert("length".to_string(), json!(street.length));
            if let Some(completed) = completed {
                properties.insert("completed".to_string(), json!(completed.contains(&street.id)));
            }
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(unproject_line(&street.line, projection))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Convert tracks to a geographic feature collection.
pub fn tracks_to_features(tracks: &[Track], projection: &LocalProjection) -> FeatureCollection {
    let features = tracks
        .iter()
        .map(|track| {
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), json!(track.id));
            properties.insert("type".to_string(), json!(track.activity_type));
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(unproject_line(&track.line, projection))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn parse_collection(geojson: &str) -> Result<FeatureCollection> {
    let parsed: GeoJson = geojson
        .parse()
        .map_err(|e| StreetMatchError::GeoJsonError {
            message: format!("parse failure: {}", e),
        })?;
    match parsed {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        _ => Err(StreetMatchError::GeoJsonError {
            message: "expected a FeatureCollection".to_string(),
        }),
    }
}

fn prop_str<'a>(feature: &'a Feature, key: &str) -> Option<&'a str> {
    feature
        .properties
        .as_ref()
        .and_then(|p| p.get(key))
        .and_then(|v| v.as_str())
}

fn prop_u64(feature: &Feature, key: &str) -> Option<u64> {
    feature
        .properties
        .as_ref()
        .and_then(|p| p.get(key))
        .and_then(|v| v.as_u64())
}

/// Truncated or non-numeric positions project to NaN, which downstream
/// validation rejects as malformed geometry.
fn project_positions(coords: &[Vec<f64>], projection: &LocalProjection) -> LineString<f64> {
    LineString::new(
        coords
            .iter()
            .map(|pos| {
                let lng = pos.first().copied().unwrap_or(f64::NAN);
                let lat = pos.get(1).copied().unwrap_or(f64::NAN);
                projection.to_planar(lng, lat)
            })
            .collect(),
    )
}

fn project_polygon(
    area: &str,
    rings: &[Vec<Vec<f64>>],
    projection: &LocalProjection,
) -> Result<Polygon<f64>> {
    let mut projected = rings
        .iter()
        .map(|ring| project_positions(ring, projection));
    let exterior = projected.next().ok_or_else(|| StreetMatchError::GeoJsonError {
        message: format!("outline '{}' has no rings", area),
    })?;
    let polygon = Polygon::new(exterior, projected.collect());

    let finite = polygon
        .exterior()
        .0
        .iter()
        .chain(polygon.interiors().iter().flat_map(|r| r.0.iter()))
        .all(|c| c.x.is_finite() && c.y.is_finite());
    if !finite {
        return Err(StreetMatchError::malformed(area, "non-finite coordinate"));
    }
    Ok(polygon)
}

fn unproject_line(line: &LineString<f64>, projection: &LocalProjection) -> Value {
    Value::LineString(
        projection
            .unproject_line(line)
            .into_iter()
            .map(|(lng, lat)| vec![lng, lat])
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    fn projection() -> LocalProjection {
        LocalProjection::new(42.39, -71.10)
    }

    fn streets_geojson() -> String {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"TOWN": "SOMERVILLE", "street_id": 17},
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[-71.10, 42.39], [-71.099, 42.39]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"TOWN": "SOMERVILLE"},
                    "geometry": {
                        "type": "Point",
                        "coordinates": [-71.10, 42.39]
                    }
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn test_read_streets() {
        let streets = read_streets(&streets_geojson(), "TOWN", &projection()).unwrap();
        // The Point feature is skipped.
        assert_eq!(streets.len(), 1);
        assert_eq!(streets[0].id, 17);
        assert_eq!(streets[0].area, "SOMERVILLE");
        // ~0.001 degrees of longitude at 42.39N is ~82 m
        assert!(streets[0].length > 50.0 && streets[0].length < 120.0);
    }

    #[test]
    fn test_read_streets_rejects_parse_failure() {
        let result = read_streets("not json", "TOWN", &projection());
        assert!(matches!(
            result,
            Err(StreetMatchError::GeoJsonError { .. })
        ));
    }

    #[test]
    fn test_read_outlines_multipolygon() {
        let geojson = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"TOWN": "BOSTON"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[-71.11, 42.38], [-71.09, 42.38], [-71.09, 42.40], [-71.11, 42.40], [-71.11, 42.38]]],
                        [[[-71.15, 42.38], [-71.13, 42.38], [-71.13, 42.40], [-71.15, 42.40], [-71.15, 42.38]]]
                    ]
                }
            }]
        })
        .to_string();

        let outlines = read_outlines(&geojson, "TOWN", &projection()).unwrap();
        assert_eq!(outlines.len(), 2);
        assert!(outlines.iter().all(|(area, _)| area == "BOSTON"));
    }

    #[test]
    fn test_streets_round_trip_through_features() {
        let proj = projection();
        let streets = read_streets(&streets_geojson(), "TOWN", &proj).unwrap();
        let completed: BTreeSet<u64> = [17].into_iter().collect();

        let collection = streets_to_features(&streets, Some(&completed), &proj);
        assert_eq!(collection.features.len(), 1);
        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props.get("completed"), Some(&json!(true)));
        assert_eq!(props.get("street_id"), Some(&json!(17)));

        // Coordinates come back out in geographic degrees.
        let Some(Geometry {
            value: Value::LineString(coords),
            ..
        }) = &collection.features[0].geometry
        else {
            panic!("expected LineString geometry");
        };
        assert!((coords[0][0] - -71.10).abs() < 1e-6);
        assert!((coords[0][1] - 42.39).abs() < 1e-6);
    }

    #[test]
    fn test_file_sink_writes_named_collection() {
        let proj = projection();
        let track = Track::new(
            "run-1",
            "Run",
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
        )
        .unwrap();
        let collection = tracks_to_features(&[track], &proj);

        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path());
        sink.write("filtered_activities", collection).unwrap();

        let written = fs::read_to_string(dir.path().join("filtered_activities.geojson")).unwrap();
        assert!(written.contains("\"FeatureCollection\""));
        assert!(written.contains("run-1"));
    }

    #[test]
    fn test_file_sink_writes_summaries_as_json() {
        let summaries = vec![
            RegionSummary {
                area: "CAMBRIDGE".to_string(),
                completed_length: 50.0,
                total_length: 200.0,
                percent: 0.25,
            },
            RegionSummary {
                area: "SOMERVILLE".to_string(),
                completed_length: 0.0,
                total_length: 0.0,
                percent: 0.0,
            },
        ];

        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path());
        sink.write_summaries("summary", &summaries).unwrap();

        let written = fs::read_to_string(dir.path().join("summary.json")).unwrap();
        let parsed: Vec<RegionSummary> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, summaries);
    }
}
