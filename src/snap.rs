//! Spatial snapping of densified track points onto street centerlines.
//!
//! Candidate streets are found with an R-tree over street bounding boxes:
//! each point's envelope is expanded by `candidate_margin` and intersected
//! with the index, bounding the search without exact distance computation on
//! every street. Exact planar distance and arc-length projection are then
//! computed only for the candidates.

use std::collections::HashMap;

use geo::{EuclideanDistance, LineLocatePoint, Point};
use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rstar::{RTree, RTreeObject, AABB};

use crate::extract::TrackPoint;
use crate::geo_utils::{expanded_point_envelope, line_envelope};
use crate::{SnapRecord, Street};

/// Street bounds wrapper for R-tree indexing.
#[derive(Debug, Clone)]
struct IndexedStreet {
    street_id: u64,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedStreet {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index over street bounding boxes.
///
/// Exposes only envelope-intersection candidate queries, so the indexing
/// strategy can change without touching the snapping logic.
#[derive(Debug)]
pub struct StreetIndex {
    tree: RTree<IndexedStreet>,
}

impl StreetIndex {
    /// Bulk-load an index from a street set.
    pub fn build(streets: &[Street]) -> Self {
        let entries: Vec<IndexedStreet> = streets
            .iter()
            .filter_map(|street| {
                line_envelope(&street.line).map(|envelope| IndexedStreet {
                    street_id: street.id,
                    envelope,
                })
            })
            .collect();

        debug!("[StreetIndex] Indexed {} streets", entries.len());
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Ids of streets whose bounding box intersects the point's envelope
    /// expanded by `margin` meters.
    pub fn candidates(
        &self,
        point: geo::Coord<f64>,
        margin: f64,
    ) -> impl Iterator<Item = u64> + '_ {
        self.tree
            .locate_in_envelope_intersecting(&expanded_point_envelope(point, margin))
            .map(|entry| entry.street_id)
    }
}

/// Snap points onto streets within `tolerance` meters.
///
/// Each retained (point, street) pair yields a [`SnapRecord`] carrying the
/// exact planar distance and the arc-length position of the point's closest
/// location along the street. With `single_match` a point keeps only its
/// closest street, ties broken by lowest street id; otherwise a point may
/// snap to several streets (intersections, parallel paths). Points with no
/// street within tolerance are silently dropped.
///
/// `candidate_margin` must be >= `tolerance`, or the envelope prefilter can
/// miss true matches; [`crate::CoverageConfig::validate`] enforces this for
/// pipeline callers.
pub fn snap_points(
    points: &[TrackPoint],
    streets: &[Street],
    index: &StreetIndex,
    tolerance: f64,
    candidate_margin: f64,
    single_match: bool,
) -> Vec<SnapRecord> {
    let by_id = streets_by_id(streets);

    let records: Vec<SnapRecord> = points
        .iter()
        .flat_map(|point| snap_one(point, &by_id, index, tolerance, candidate_margin, single_match))
        .collect();

    debug!(
        "[Snapper] {} points produced {} snap records",
        points.len(),
        records.len()
    );
    records
}

/// Parallel variant of [`snap_points`].
///
/// Streets and points are read-only during the pass and record concatenation
/// is order-independent, so the retained set is identical to the serial one.
#[cfg(feature = "parallel")]
pub fn snap_points_parallel(
    points: &[TrackPoint],
    streets: &[Street],
    index: &StreetIndex,
    tolerance: f64,
    candidate_margin: f64,
    single_match: bool,
) -> Vec<SnapRecord> {
    let by_id = streets_by_id(streets);

    let records: Vec<SnapRecord> = points
        .par_iter()
        .flat_map_iter(|point| {
            snap_one(point, &by_id, index, tolerance, candidate_margin, single_match)
        })
        .collect();

    debug!(
        "[Snapper] {} points produced {} snap records (parallel)",
        points.len(),
        records.len()
    );
    records
}

fn streets_by_id(streets: &[Street]) -> HashMap<u64, &Street> {
    streets.iter().map(|s| (s.id, s)).collect()
}

fn snap_one(
    point: &TrackPoint,
    streets: &HashMap<u64, &Street>,
    index: &StreetIndex,
    tolerance: f64,
    candidate_margin: f64,
    single_match: bool,
) -> Vec<SnapRecord> {
    let pt = Point::from(point.coord);

    let mut records: Vec<SnapRecord> = index
        .candidates(point.coord, candidate_margin)
        .filter_map(|street_id| streets.get(&street_id))
        .filter_map(|street| {
            let snap_distance = pt.euclidean_distance(&street.line);
            if snap_distance > tolerance {
                return None;
            }
            // Fraction of total length where the closest location falls;
            // None only for degenerate lines, which ingestion rejects.
            let fraction = street.line.line_locate_point(&pt)?;
            let projected_distance = (fraction * street.length).clamp(0.0, street.length);
            Some(SnapRecord {
                street_id: street.id,
                track_id: point.track_id.clone(),
                line_length: street.length,
                projected_distance,
                snap_distance,
            })
        })
        .collect();

    if single_match && records.len() > 1 {
        let best = records
            .iter()
            .min_by(|a, b| {
                a.snap_distance
                    .total_cmp(&b.snap_distance)
                    .then_with(|| a.street_id.cmp(&b.street_id))
            })
            .cloned();
        records.clear();
        records.extend(best);
    }

    records
}
