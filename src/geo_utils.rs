//! Geographic utilities: great-circle distance, initial bearing and helpers.
//!
//! All functions are pure. NaN inputs propagate; validation is the caller's job.

use geo::{Bearing, Distance, Haversine, Point};

use crate::{Coordinate, Waypoint};

fn to_point(c: &Coordinate) -> Point<f64> {
    Point::new(c.longitude, c.latitude)
}

/// Great-circle distance in meters (haversine, mean earth radius).
///
/// Symmetric, and zero when both coordinates share a lat/lon.
///
/// # Example
/// ```
/// use backtrack_core::{distance, Coordinate};
/// let london = Coordinate::new(51.5074, -0.1278, 0);
/// let paris = Coordinate::new(48.8566, 2.3522, 0);
/// let km = distance(&london, &paris) / 1000.0;
/// assert!((km - 343.5).abs() < 2.0);
/// ```
pub fn distance(from: &Coordinate, to: &Coordinate) -> f64 {
    Haversine::distance(to_point(from), to_point(to))
}

/// Initial great-circle bearing from `from` to `to`, in degrees `[0, 360)`.
///
/// Compass convention: 0 = north, 90 = east. Coincident points yield 0.
pub fn bearing(from: &Coordinate, to: &Coordinate) -> f64 {
    normalize_degrees(Haversine::bearing(to_point(from), to_point(to)))
}

/// Wrap any angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Total distance along a sequence of waypoints, in meters.
pub fn path_length<W: Waypoint>(points: &[W]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance(pair[0].coordinate(), pair[1].coordinate()))
        .sum()
}

/// Human-readable distance: whole meters below 1 km, two decimals above.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{} m", meters.round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathVertex;

    fn at(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon, 0)
    }

    #[test]
    fn test_distance_symmetry_and_identity() {
        let pairs = [
            (at(0.0, 0.0), at(0.0, 0.00005)),
            (at(51.5074, -0.1278), at(48.8566, 2.3522)),
            (at(-33.8688, 151.2093), at(40.7128, -74.0060)),
            (at(89.9, 10.0), at(-89.9, -170.0)),
        ];
        for (a, b) in &pairs {
            let ab = distance(a, b);
            let ba = distance(b, a);
            assert!((ab - ba).abs() < 1e-9, "{} vs {}", ab, ba);
            assert_eq!(distance(a, a), 0.0);
            assert!(ab > 0.0);
        }
    }

    #[test]
    fn test_distance_small_offsets() {
        // 0.00005 degrees of longitude on the equator is ~5.56 m
        let d = distance(&at(0.0, 0.0), &at(0.0, 0.00005));
        assert!((d - 5.56).abs() < 0.05, "got {}", d);

        // 0.001 degrees of latitude is ~111 m anywhere
        let d = distance(&at(51.5074, -0.1278), &at(51.5084, -0.1278));
        assert!((d - 111.2).abs() < 0.5, "got {}", d);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = at(0.0, 0.0);
        assert!(bearing(&origin, &at(1.0, 0.0)).abs() < 1e-9);
        assert!((bearing(&origin, &at(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing(&origin, &at(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing(&origin, &at(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_range_and_degenerate() {
        let here = at(51.5074, -0.1278);
        assert_eq!(bearing(&here, &here), 0.0);

        for i in 0..36 {
            let angle = (i as f64 * 10.0).to_radians();
            let target = at(51.5074 + 0.01 * angle.cos(), -0.1278 + 0.01 * angle.sin());
            let b = bearing(&here, &target);
            assert!((0.0..360.0).contains(&b), "bearing {} out of range", b);
        }
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(370.0), 10.0);
        assert_eq!(normalize_degrees(-10.0), 350.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert!(normalize_degrees(-1e-20) < 360.0);
    }

    #[test]
    fn test_path_length() {
        let vertices: Vec<PathVertex> = (0..4)
            .map(|i| PathVertex::from_sample(&at(0.0, i as f64 * 0.001)))
            .collect();
        let total = path_length(&vertices);
        let direct = distance(vertices[0].coordinate(), vertices[3].coordinate());
        assert!((total - direct).abs() < 1e-6);
        assert_eq!(path_length::<PathVertex>(&[]), 0.0);
        assert_eq!(path_length(&vertices[..1]), 0.0);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(4.6), "5 m");
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(1000.0), "1.00 km");
        assert_eq!(format_distance(12_346.0), "12.35 km");
    }
}
