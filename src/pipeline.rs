//! Pipeline orchestration: region filter -> densify -> snap -> aggregate ->
//! per-area summary.
//!
//! The whole pipeline is one synchronous batch over in-memory data. Fetching
//! tracks from a remote API is a sequential prerequisite owned by the caller
//! (see the `http` module); by the time the pipeline runs, everything is
//! local and immutable.

use std::collections::{BTreeMap, BTreeSet};

use geo::Polygon;
use log::info;
use serde::{Deserialize, Serialize};

use crate::coverage::{complete_streets, per_track_coverage, StreetCoverage};
use crate::extract::extract_batch_points;
use crate::region::{filter_streets, filter_tracks_by_type, tracks_intersecting};
use crate::snap::StreetIndex;
use crate::{CoverageConfig, Result, Street, Track};

/// Completed vs. total street length for one administrative area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub area: String,
    pub completed_length: f64,
    pub total_length: f64,
    /// `completed_length / total_length`, 0.0 for an area with no streets
    pub percent: f64,
}

/// Output of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Streets classified complete from pooled projections
    pub completed_street_ids: BTreeSet<u64>,
    /// Per-(street, track) diagnostic statistics
    pub per_track_coverage: Vec<StreetCoverage>,
    /// Per-area completion summary, sorted by area name
    pub summaries: Vec<RegionSummary>,
}

/// Run the full coverage pipeline over a batch of streets and tracks.
///
/// Streets and tracks are restricted to the configured areas and activity
/// types, tracks are joined against the area outlines, densified, snapped
/// against the street set, and aggregated into a completed-street set and
/// per-area summaries. Zero tracks or zero streets in an area report 0%
/// completion rather than failing.
pub fn run_pipeline(
    streets: &[Street],
    outlines: &[(String, Polygon<f64>)],
    tracks: &[Track],
    config: &CoverageConfig,
) -> Result<PipelineResult> {
    config.validate()?;

    let streets = filter_streets(streets, &config.areas);
    let outlines: Vec<(String, Polygon<f64>)> = if config.areas.is_empty() {
        outlines.to_vec()
    } else {
        outlines
            .iter()
            .filter(|(area, _)| config.areas.contains(area))
            .cloned()
            .collect()
    };

    let tracks = filter_tracks_by_type(tracks, &config.activity_types);
    let tracks: Vec<Track> = tracks_intersecting(&tracks, &outlines)
        .into_iter()
        .map(|(track, _)| track)
        .collect();

    info!(
        "[Pipeline] {} streets, {} tracks after region filtering",
        streets.len(),
        tracks.len()
    );

    let points = extract_batch_points(&tracks, config.max_segment_length);

    let index = StreetIndex::build(&streets);
    #[cfg(feature = "parallel")]
    let records = crate::snap::snap_points_parallel(
        &points,
        &streets,
        &index,
        config.tolerance,
        config.candidate_margin,
        config.single_match,
    );
    #[cfg(not(feature = "parallel"))]
    let records = crate::snap::snap_points(
        &points,
        &streets,
        &index,
        config.tolerance,
        config.candidate_margin,
        config.single_match,
    );

    let completed_street_ids =
        complete_streets(&records, config.coverage_threshold, config.gap_limit);
    let per_track = per_track_coverage(&records);

    let summaries = summarize(&streets, &completed_street_ids, &config.areas);

    info!(
        "[Pipeline] {} of {} streets complete across {} areas",
        completed_street_ids.len(),
        streets.len(),
        summaries.len()
    );

    Ok(PipelineResult {
        completed_street_ids,
        per_track_coverage: per_track,
        summaries,
    })
}

/// Per-area completed/total lengths. Configured areas appear even when they
/// contain no streets; with no configured areas, the street set decides.
fn summarize(
    streets: &[Street],
    completed: &BTreeSet<u64>,
    areas: &[String],
) -> Vec<RegionSummary> {
    let mut totals: BTreeMap<String, (f64, f64)> = areas
        .iter()
        .map(|area| (area.clone(), (0.0, 0.0)))
        .collect();

    for street in streets {
        let entry = totals.entry(street.area.clone()).or_insert((0.0, 0.0));
        entry.1 += street.length;
        if completed.contains(&street.id) {
            entry.0 += street.length;
        }
    }

    totals
        .into_iter()
        .map(|(area, (completed_length, total_length))| RegionSummary {
            area,
            completed_length,
            total_length,
            percent: if total_length > 0.0 {
                completed_length / total_length
            } else {
                0.0
            },
        })
        .collect()
}
