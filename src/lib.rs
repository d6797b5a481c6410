//! # Street Matcher
//!
//! GPS street coverage matching: determines which streets in a region have
//! been completed by recorded outdoor activities (runs/rides).
//!
//! This library provides:
//! - Track densification so sparse GPS sampling never skips a street
//! - R-tree accelerated snapping of track points onto street centerlines
//! - Per-street coverage aggregation with gap and ratio thresholds
//! - Region filtering and per-area completion summaries
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel snapping with rayon
//! - **`http`** - Enable HTTP client for activity fetching
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use geo::{line_string, polygon};
//! use street_matcher::{run_pipeline, CoverageConfig, Street, Track};
//!
//! let streets = vec![
//!     Street::new(1, "SOMERVILLE", line_string![
//!         (x: 0.0, y: 0.0),
//!         (x: 100.0, y: 0.0),
//!     ]).unwrap(),
//! ];
//! let outlines = vec![(
//!     "SOMERVILLE".to_string(),
//!     polygon![
//!         (x: -50.0, y: -50.0),
//!         (x: 150.0, y: -50.0),
//!         (x: 150.0, y: 50.0),
//!         (x: -50.0, y: 50.0),
//!     ],
//! )];
//! let tracks = vec![
//!     Track::new("run-1", "Run", line_string![
//!         (x: 0.0, y: 2.0),
//!         (x: 100.0, y: 2.0),
//!     ]).unwrap(),
//! ];
//!
//! let config = CoverageConfig {
//!     areas: vec!["SOMERVILLE".to_string()],
//!     activity_types: vec!["Run".to_string()],
//!     ..CoverageConfig::default()
//! };
//!
//! let result = run_pipeline(&streets, &outlines, &tracks, &config).unwrap();
//! assert!(result.completed_street_ids.contains(&1));
//! ```

use geo::LineString;
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, StreetMatchError};

// Track densification (guarantees maximum segment length)
pub mod densify;
pub use densify::densify;

// Point extraction from lines, tracks, or track batches
pub mod extract;
pub use extract::{
    extract_batch_points, extract_line_points, extract_points, extract_track_points, PointSource,
    TrackPoint,
};

// Spatial snapping of points onto street centerlines
pub mod snap;
#[cfg(feature = "parallel")]
pub use snap::snap_points_parallel;
pub use snap::{snap_points, StreetIndex};

// Per-street coverage aggregation and completion classification
pub mod coverage;
pub use coverage::{complete_streets, per_track_coverage, StreetCoverage};

// Region filtering (area labels and outline intersection)
pub mod region;
pub use region::{filter_streets, filter_tracks_by_type, tracks_intersecting};

// Pipeline orchestration and per-area summaries
pub mod pipeline;
pub use pipeline::{run_pipeline, PipelineResult, RegionSummary};

// Geographic utilities (planar lengths, bounds, local CRS projection)
pub mod geo_utils;
pub use geo_utils::LocalProjection;

// GeoJSON sources and sink (boundary I/O in geographic coordinates)
pub mod geodata;
pub use geodata::{read_outlines, read_streets, FileSink, GeoSink};

// HTTP module for activity fetching
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ActivityFetcher, RawActivity};

// ============================================================================
// Core Types
// ============================================================================

/// One recorded activity as an ordered polyline in the local projected CRS.
///
/// Immutable after construction; construction rejects non-finite coordinates.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique identifier for the activity
    pub id: String,
    /// Activity category (e.g. "Run", "Ride")
    pub activity_type: String,
    /// Ordered points in planar meters
    pub line: LineString<f64>,
}

impl Track {
    /// Create a track, validating that every coordinate is finite.
    pub fn new(
        id: impl Into<String>,
        activity_type: impl Into<String>,
        line: LineString<f64>,
    ) -> Result<Self> {
        let id = id.into();
        if line.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(StreetMatchError::malformed(&id, "non-finite coordinate"));
        }
        Ok(Self {
            id,
            activity_type: activity_type.into(),
            line,
        })
    }
}

/// One street centerline segment in the local projected CRS.
///
/// Immutable after construction. `length` is precomputed planar length in
/// meters; zero-length streets are rejected so coverage ratios stay defined.
#[derive(Debug, Clone)]
pub struct Street {
    /// Stable integer identifier
    pub id: u64,
    /// Administrative-area label (e.g. town name)
    pub area: String,
    /// Centerline geometry in planar meters
    pub line: LineString<f64>,
    /// Planar length in meters, always > 0
    pub length: f64,
}

impl Street {
    /// Create a street, validating finite coordinates and positive length.
    pub fn new(id: u64, area: impl Into<String>, line: LineString<f64>) -> Result<Self> {
        if line.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(StreetMatchError::malformed(
                format!("street-{}", id),
                "non-finite coordinate",
            ));
        }
        let length = geo_utils::planar_length(&line);
        if length <= 0.0 {
            return Err(StreetMatchError::malformed(
                format!("street-{}", id),
                "zero-length geometry",
            ));
        }
        Ok(Self {
            id,
            area: area.into(),
            line,
            length,
        })
    }
}

/// One snapped (point, street) pair within tolerance.
///
/// `projected_distance` is the arc-length position along the street where the
/// point's perpendicular foot falls, in `[0, line_length]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapRecord {
    pub street_id: u64,
    /// Owning track, if the point came from a track rather than a bare line
    pub track_id: Option<String>,
    pub line_length: f64,
    pub projected_distance: f64,
    pub snap_distance: f64,
}

/// Configuration for the coverage pipeline.
///
/// An explicit value object rather than module-level constants, so tests can
/// run across regions and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Administrative areas to include (empty = no area filtering)
    pub areas: Vec<String>,
    /// Activity categories to include (empty = all categories)
    pub activity_types: Vec<String>,
    /// Maximum segment length after densification, meters.
    /// Default: 15.0
    pub max_segment_length: f64,
    /// Maximum snap distance from point to street, meters.
    /// Default: 10.0
    pub tolerance: f64,
    /// Bounding-box expansion for candidate lookup, meters. Must be >= tolerance
    /// or the envelope prefilter can miss true matches.
    /// Default: 15.0
    pub candidate_margin: f64,
    /// Snap each point only to its closest street within tolerance.
    /// Default: false (a point may snap to several streets at intersections)
    pub single_match: bool,
    /// Minimum covered fraction of a street's length, in (0, 1].
    /// Default: 0.55
    pub coverage_threshold: f64,
    /// Maximum gap between consecutive projections, meters.
    /// Default: 40.0
    pub gap_limit: f64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            areas: Vec::new(),
            activity_types: Vec::new(),
            max_segment_length: 15.0,
            tolerance: 10.0,
            candidate_margin: 15.0,
            single_match: false,
            coverage_threshold: 0.55,
            gap_limit: 40.0,
        }
    }
}

impl CoverageConfig {
    /// Validate the configuration.
    ///
    /// Rejects `candidate_margin < tolerance` (the envelope prefilter would
    /// silently drop true matches), non-positive lengths and limits, and
    /// coverage thresholds outside `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.max_segment_length <= 0.0 {
            return Err(StreetMatchError::config("max_segment_length must be > 0"));
        }
        if self.tolerance <= 0.0 {
            return Err(StreetMatchError::config("tolerance must be > 0"));
        }
        if self.candidate_margin < self.tolerance {
            return Err(StreetMatchError::config(format!(
                "candidate_margin ({}) must be >= tolerance ({})",
                self.candidate_margin, self.tolerance
            )));
        }
        if !(self.coverage_threshold > 0.0 && self.coverage_threshold <= 1.0) {
            return Err(StreetMatchError::config(
                "coverage_threshold must be in (0, 1]",
            ));
        }
        if self.gap_limit <= 0.0 {
            return Err(StreetMatchError::config("gap_limit must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    #[test]
    fn test_street_rejects_zero_length() {
        let line = line_string![(x: 5.0, y: 5.0), (x: 5.0, y: 5.0)];
        let result = Street::new(1, "BOSTON", line);
        assert!(matches!(
            result,
            Err(StreetMatchError::MalformedGeometry { .. })
        ));
    }

    #[test]
    fn test_street_rejects_non_finite() {
        let line = line_string![(x: 0.0, y: 0.0), (x: f64::NAN, y: 10.0)];
        assert!(Street::new(2, "BOSTON", line).is_err());
    }

    #[test]
    fn test_street_precomputes_length() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 30.0, y: 40.0)];
        let street = Street::new(3, "BOSTON", line).unwrap();
        assert!((street.length - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_track_rejects_non_finite() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: f64::INFINITY)];
        assert!(Track::new("a", "Run", line).is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(CoverageConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_margin_below_tolerance() {
        let config = CoverageConfig {
            tolerance: 10.0,
            candidate_margin: 5.0,
            ..CoverageConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StreetMatchError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_config_rejects_bad_threshold() {
        let config = CoverageConfig {
            coverage_threshold: 0.0,
            ..CoverageConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CoverageConfig {
            coverage_threshold: 1.5,
            ..CoverageConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
