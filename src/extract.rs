//! Point extraction from lines, single tracks, or track batches.
//!
//! Each variant densifies the geometry and tags the resulting points with
//! their owning track id where one exists. The variants are a sum type with
//! one function each, so supplying an invalid combination of inputs is
//! impossible rather than a runtime check.

use geo::{Coord, LineString};

use crate::densify::densify;
use crate::Track;

/// A densified point, tagged with its owning track where applicable.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    /// Owning track id; `None` for points extracted from a bare line
    pub track_id: Option<String>,
    pub coord: Coord<f64>,
}

/// Input variants for point extraction.
#[derive(Debug, Clone)]
pub enum PointSource<'a> {
    /// A bare line with no owning activity
    Line(&'a LineString<f64>),
    /// A single track; points keep its id
    Track(&'a Track),
    /// A batch of tracks; points keep their respective ids
    Batch(&'a [Track]),
}

/// Extract densified points from any source variant.
pub fn extract_points(source: PointSource<'_>, max_segment_length: f64) -> Vec<TrackPoint> {
    match source {
        PointSource::Line(line) => extract_line_points(line, max_segment_length),
        PointSource::Track(track) => extract_track_points(track, max_segment_length),
        PointSource::Batch(tracks) => extract_batch_points(tracks, max_segment_length),
    }
}

/// Extract densified, untagged points from a bare line.
pub fn extract_line_points(line: &LineString<f64>, max_segment_length: f64) -> Vec<TrackPoint> {
    densify(&line.0, max_segment_length)
        .into_iter()
        .map(|coord| TrackPoint {
            track_id: None,
            coord,
        })
        .collect()
}

/// Extract densified points from one track, tagged with its id.
pub fn extract_track_points(track: &Track, max_segment_length: f64) -> Vec<TrackPoint> {
    densify(&track.line.0, max_segment_length)
        .into_iter()
        .map(|coord| TrackPoint {
            track_id: Some(track.id.clone()),
            coord,
        })
        .collect()
}

/// Extract densified points from a batch of tracks, tagged per track.
pub fn extract_batch_points(tracks: &[Track], max_segment_length: f64) -> Vec<TrackPoint> {
    tracks
        .iter()
        .flat_map(|track| extract_track_points(track, max_segment_length))
        .collect()
}
