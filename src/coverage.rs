//! Per-street coverage aggregation and completion classification.
//!
//! Snapped projections are pooled across all tracks per street for the
//! completion decision: a street counts as complete if the combined
//! projections ever covered it, matching "have I ever run the whole street"
//! semantics. Per-(street, track) statistics are computed separately as
//! diagnostic output.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::SnapRecord;

/// Coverage statistics for one (street, track) group.
///
/// `track_id` is `None` for records produced from untagged points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetCoverage {
    pub street_id: u64,
    pub track_id: Option<String>,
    pub line_length: f64,
    /// Covered fraction of the street, `(max - min) / line_length`, in [0, 1]
    pub coverage_ratio: f64,
    /// Largest gap between consecutive sorted projections, meters
    pub max_gap: f64,
    /// Number of snapped projections in the group
    pub samples: usize,
}

/// Streets whose pooled projections satisfy both thresholds.
///
/// Classification is inclusive on both sides: a street exactly at
/// `coverage_threshold` with a gap exactly at `gap_limit` is complete.
/// Single-projection streets have ratio 0 and gap 0, so they only complete
/// under a degenerate threshold.
pub fn complete_streets(
    records: &[SnapRecord],
    coverage_threshold: f64,
    gap_limit: f64,
) -> BTreeSet<u64> {
    let mut pooled: BTreeMap<u64, (f64, Vec<f64>)> = BTreeMap::new();
    for record in records {
        let entry = pooled
            .entry(record.street_id)
            .or_insert_with(|| (record.line_length, Vec::new()));
        entry.1.push(record.projected_distance);
    }

    let complete: BTreeSet<u64> = pooled
        .into_iter()
        .filter_map(|(street_id, (line_length, mut projections))| {
            let (coverage_ratio, max_gap) = group_stats(&mut projections, line_length);
            (coverage_ratio >= coverage_threshold && max_gap <= gap_limit).then_some(street_id)
        })
        .collect();

    debug!(
        "[Coverage] {} records classified {} streets complete",
        records.len(),
        complete.len()
    );
    complete
}

/// Per-(street, track) coverage statistics, for diagnostic output.
///
/// Sorted by street id then track id for deterministic output.
pub fn per_track_coverage(records: &[SnapRecord]) -> Vec<StreetCoverage> {
    let mut groups: BTreeMap<(u64, Option<String>), (f64, Vec<f64>)> = BTreeMap::new();
    for record in records {
        let entry = groups
            .entry((record.street_id, record.track_id.clone()))
            .or_insert_with(|| (record.line_length, Vec::new()));
        entry.1.push(record.projected_distance);
    }

    groups
        .into_iter()
        .map(|((street_id, track_id), (line_length, mut projections))| {
            let samples = projections.len();
            let (coverage_ratio, max_gap) = group_stats(&mut projections, line_length);
            StreetCoverage {
                street_id,
                track_id,
                line_length,
                coverage_ratio,
                max_gap,
                samples,
            }
        })
        .collect()
}

/// Coverage ratio and maximum gap for a projection group. Sorts in place.
fn group_stats(projections: &mut [f64], line_length: f64) -> (f64, f64) {
    if projections.len() < 2 {
        return (0.0, 0.0);
    }
    projections.sort_by(f64::total_cmp);

    let min = projections[0];
    let max = projections[projections.len() - 1];
    let coverage_ratio = (max - min) / line_length;

    let max_gap = projections
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(0.0, f64::max);

    (coverage_ratio, max_gap)
}
