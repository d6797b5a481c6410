//! Track densification.
//!
//! Raw GPS tracks are sampled at whatever rate the recording device used, so
//! consecutive points can be tens of meters apart and step right over a cross
//! street. Densifying before snapping guarantees the snapper sees a point at
//! least every `max_segment_length` meters along the track.

use geo::Coord;

use crate::geo_utils::planar_distance;

/// Insert evenly spaced intermediate points so that no segment of the output
/// is longer than `max_segment_length`.
///
/// For each consecutive pair more than `max_segment_length` apart,
/// `floor(distance / max_segment_length)` points are inserted by linear
/// interpolation. Every input point is preserved, in order; inputs with fewer
/// than two points are returned unchanged.
///
/// This is a pure function; `max_segment_length` must be positive.
///
/// # Example
/// ```
/// use geo::Coord;
/// use street_matcher::densify;
///
/// let sparse = vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 47.0, y: 0.0 }];
/// let dense = densify(&sparse, 15.0);
/// // 3 intermediate points -> 4 segments of 11.75 m
/// assert_eq!(dense.len(), 5);
/// ```
pub fn densify(points: &[Coord<f64>], max_segment_length: f64) -> Vec<Coord<f64>> {
    debug_assert!(max_segment_length > 0.0);

    if points.len() < 2 {
        return points.to_vec();
    }

    let mut out = Vec::with_capacity(points.len());
    out.push(points[0]);

    for pair in points.windows(2) {
        let (p1, p2) = (pair[0], pair[1]);
        let segment_length = planar_distance(p1, p2);

        if segment_length > max_segment_length {
            let intermediate = (segment_length / max_segment_length).floor() as usize;
            let x_step = (p2.x - p1.x) / (intermediate + 1) as f64;
            let y_step = (p2.y - p1.y) / (intermediate + 1) as f64;
            for j in 1..=intermediate {
                out.push(Coord {
                    x: p1.x + j as f64 * x_step,
                    y: p1.y + j as f64 * y_step,
                });
            }
        }
        out.push(p2);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(pairs: &[(f64, f64)]) -> Vec<Coord<f64>> {
        pairs.iter().map(|&(x, y)| Coord { x, y }).collect()
    }

    fn max_segment(points: &[Coord<f64>]) -> f64 {
        points
            .windows(2)
            .map(|w| planar_distance(w[0], w[1]))
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_two_points_47m_apart() {
        let input = coords(&[(0.0, 0.0), (47.0, 0.0)]);
        let result = densify(&input, 15.0);

        // floor(47 / 15) = 3 intermediate points, 4 segments of 11.75
        assert_eq!(result.len(), 5);
        for (i, c) in result.iter().enumerate() {
            assert!((c.x - i as f64 * 11.75).abs() < 1e-9);
            assert_eq!(c.y, 0.0);
        }
    }

    #[test]
    fn test_no_segment_exceeds_maximum() {
        let input = coords(&[(0.0, 0.0), (100.0, 0.0), (100.0, 33.0), (0.0, 80.0)]);
        let result = densify(&input, 15.0);
        assert!(max_segment(&result) <= 15.0 + 1e-9);
    }

    #[test]
    fn test_original_points_preserved_in_order() {
        let input = coords(&[(0.0, 0.0), (40.0, 0.0), (40.0, 40.0)]);
        let result = densify(&input, 15.0);

        let mut last_found = 0;
        for original in &input {
            let pos = result[last_found..]
                .iter()
                .position(|c| c == original)
                .expect("original point missing from densified output");
            last_found += pos;
        }
    }

    #[test]
    fn test_already_dense_is_noop() {
        let input = coords(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        assert_eq!(densify(&input, 15.0), input);
    }

    #[test]
    fn test_exactly_at_maximum_is_noop() {
        let input = coords(&[(0.0, 0.0), (15.0, 0.0)]);
        assert_eq!(densify(&input, 15.0), input);
    }

    #[test]
    fn test_degenerate_inputs_unchanged() {
        let empty: Vec<Coord<f64>> = vec![];
        assert_eq!(densify(&empty, 15.0), empty);

        let single = coords(&[(3.0, 4.0)]);
        assert_eq!(densify(&single, 15.0), single);
    }

    #[test]
    fn test_interpolation_is_linear_in_both_axes() {
        let input = coords(&[(0.0, 0.0), (30.0, 40.0)]); // 50 m diagonal
        let result = densify(&input, 15.0);

        // floor(50 / 15) = 3 intermediate points
        assert_eq!(result.len(), 5);
        assert!((result[1].x - 7.5).abs() < 1e-9);
        assert!((result[1].y - 10.0).abs() < 1e-9);
        assert!((result[3].x - 22.5).abs() < 1e-9);
        assert!((result[3].y - 30.0).abs() < 1e-9);
    }
}
