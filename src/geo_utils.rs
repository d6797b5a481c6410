//! Geographic utilities: planar measures, envelopes, and the local CRS
//! projection used at the boundary.
//!
//! The geometric core works entirely in a local projected CRS with meter
//! units. Geographic (lat/lng) coordinates only appear when reading from or
//! writing to external collaborators; [`LocalProjection`] owns that
//! conversion.

use geo::{Coord, EuclideanLength, LineString};
use rstar::AABB;

/// Mean Earth radius in meters (spherical model, matches haversine usage).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Total planar length of a linestring in meters.
///
/// Empty or single-point lines have length 0.0.
pub fn planar_length(line: &LineString<f64>) -> f64 {
    line.euclidean_length()
}

/// Euclidean distance between two planar coordinates.
#[inline]
pub fn planar_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Axis-aligned bounding box of a linestring, for R-tree indexing.
///
/// Returns `None` for an empty linestring.
pub fn line_envelope(line: &LineString<f64>) -> Option<AABB<[f64; 2]>> {
    let mut coords = line.0.iter();
    let first = coords.next()?;
    let mut min_x = first.x;
    let mut max_x = first.x;
    let mut min_y = first.y;
    let mut max_y = first.y;

    for c in coords {
        min_x = min_x.min(c.x);
        max_x = max_x.max(c.x);
        min_y = min_y.min(c.y);
        max_y = max_y.max(c.y);
    }

    Some(AABB::from_corners([min_x, min_y], [max_x, max_y]))
}

/// Bounding box of a point expanded by `margin` meters in all directions.
#[inline]
pub fn expanded_point_envelope(point: Coord<f64>, margin: f64) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [point.x - margin, point.y - margin],
        [point.x + margin, point.y + margin],
    )
}

/// Equirectangular projection about a reference point.
///
/// Maps geographic (lng, lat) degrees to planar meters and back. Accurate to
/// well under a meter over the few-kilometer extents this pipeline works
/// with, which is far below the snap tolerance.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    ref_lat: f64,
    ref_lng: f64,
    cos_ref_lat: f64,
}

impl LocalProjection {
    /// Create a projection centered on the given geographic point.
    pub fn new(ref_lat: f64, ref_lng: f64) -> Self {
        Self {
            ref_lat,
            ref_lng,
            cos_ref_lat: ref_lat.to_radians().cos(),
        }
    }

    /// Project geographic (lng, lat) degrees to planar meters.
    #[inline]
    pub fn to_planar(&self, lng: f64, lat: f64) -> Coord<f64> {
        Coord {
            x: EARTH_RADIUS_M * (lng - self.ref_lng).to_radians() * self.cos_ref_lat,
            y: EARTH_RADIUS_M * (lat - self.ref_lat).to_radians(),
        }
    }

    /// Inverse projection: planar meters back to geographic (lng, lat) degrees.
    #[inline]
    pub fn to_geographic(&self, c: Coord<f64>) -> (f64, f64) {
        let lng = self.ref_lng + (c.x / (EARTH_RADIUS_M * self.cos_ref_lat)).to_degrees();
        let lat = self.ref_lat + (c.y / EARTH_RADIUS_M).to_degrees();
        (lng, lat)
    }

    /// Project a sequence of geographic (lng, lat) pairs into a planar linestring.
    pub fn project_line(&self, coords: &[(f64, f64)]) -> LineString<f64> {
        LineString::new(
            coords
                .iter()
                .map(|&(lng, lat)| self.to_planar(lng, lat))
                .collect(),
        )
    }

    /// Inverse-project a planar linestring to geographic (lng, lat) pairs.
    pub fn unproject_line(&self, line: &LineString<f64>) -> Vec<(f64, f64)> {
        line.0.iter().map(|&c| self.to_geographic(c)).collect()
    }
}
