//! Region filtering: area-label filters and the track/outline spatial join.
//!
//! Filtering happens upstream of snapping so the working set stays bounded to
//! the target areas.

use std::collections::HashSet;

use geo::{Intersects, Polygon};
use log::debug;

use crate::{Street, Track};

/// Streets whose area label is one of `areas`. An empty list keeps everything.
pub fn filter_streets(streets: &[Street], areas: &[String]) -> Vec<Street> {
    if areas.is_empty() {
        return streets.to_vec();
    }
    streets
        .iter()
        .filter(|s| areas.iter().any(|a| a == &s.area))
        .cloned()
        .collect()
}

/// Tracks whose activity type is one of `activity_types`. An empty list keeps
/// everything.
pub fn filter_tracks_by_type(tracks: &[Track], activity_types: &[String]) -> Vec<Track> {
    if activity_types.is_empty() {
        return tracks.to_vec();
    }
    tracks
        .iter()
        .filter(|t| activity_types.iter().any(|a| a == &t.activity_type))
        .cloned()
        .collect()
}

/// Tracks that intersect at least one area outline, each paired with the
/// first intersecting outline's label.
///
/// De-duplicated by track id after the outline test, input order preserved:
/// the first *intersecting* occurrence of an id wins.
pub fn tracks_intersecting(
    tracks: &[Track],
    outlines: &[(String, Polygon<f64>)],
) -> Vec<(Track, String)> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut kept = Vec::new();

    for track in tracks {
        if seen.contains(track.id.as_str()) {
            continue;
        }
        if let Some((area, _)) = outlines
            .iter()
            .find(|(_, outline)| track.line.intersects(outline))
        {
            // Only intersecting occurrences consume an id, so a stray
            // out-of-area duplicate cannot shadow a later in-area one.
            seen.insert(track.id.as_str());
            kept.push((track.clone(), area.clone()));
        }
    }

    debug!(
        "[Region] {} of {} tracks intersect {} outlines",
        kept.len(),
        tracks.len(),
        outlines.len()
    );
    kept
}
