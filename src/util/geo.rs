use std::f64::consts::PI;

use crate::data_types::common::Coordinate;

pub struct GeoUtils;

impl GeoUtils {
    pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

    /// Haversine great-circle distance in meters.
    pub fn distance(p1: &Coordinate, p2: &Coordinate) -> f64 {
        let lat1 = GeoUtils::deg2rad(p1.lat);
        let lat2 = GeoUtils::deg2rad(p2.lat);
        let delta_lat = GeoUtils::deg2rad(p2.lat - p1.lat);
        let delta_lon = GeoUtils::deg2rad(p2.lon - p1.lon);

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let chord = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        GeoUtils::EARTH_RADIUS_M * chord
    }

    pub fn deg2rad(deg: f64) -> f64 {
        deg * PI / 180.0
    }

    /// Linear interpolation in lat/lon space, not along the great circle.
    /// Ratios 0.0 and 1.0 return the endpoints exactly.
    pub fn lerp(start: &Coordinate, end: &Coordinate, ratio: f64) -> Coordinate {
        if ratio <= 0.0 {
            return *start;
        }
        if ratio >= 1.0 {
            return *end;
        }

        Coordinate::new(
            start.lat + (end.lat - start.lat) * ratio,
            start.lon + (end.lon - start.lon) * ratio,
        )
    }

    /// `num_points` evenly spread coordinates from `start` to `end`.
    /// A single point is `start`, never the midpoint.
    pub fn interpolate(start: &Coordinate, end: &Coordinate, num_points: usize) -> Vec<Coordinate> {
        match num_points {
            0 => Vec::new(),
            1 => vec![*start],
            n => (0..n)
                .map(|i| GeoUtils::lerp(start, end, i as f64 / (n - 1) as f64))
                .collect(),
        }
    }

    /// Round half away from zero to `decimals` places.
    pub fn round_to(value: f64, decimals: i32) -> f64 {
        let factor = 10_f64.powi(decimals);
        (value * factor).round() / factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_distance_same_point() {
        let p = Coordinate::new(55.7558, 37.6176);
        assert_eq!(GeoUtils::distance(&p, &p), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (Coordinate::new(55.7558, 37.6176), Coordinate::new(55.7568, 37.6186)),
            (Coordinate::new(-33.86, 151.2), Coordinate::new(51.5, -0.12)),
            (Coordinate::new(0.0, 179.9), Coordinate::new(0.0, -179.9)),
        ];

        for (a, b) in pairs {
            assert_eq!(GeoUtils::distance(&a, &b), GeoUtils::distance(&b, &a));
        }
    }

    #[test]
    fn test_distance_known_value() {
        let london = Coordinate::new(51.5074, -0.1278);
        let paris = Coordinate::new(48.8566, 2.3522);

        assert!(approx_eq(GeoUtils::distance(&london, &paris), 343_560.0, 2_000.0));
    }

    #[test]
    fn test_distance_one_degree_of_longitude_at_equator() {
        let d = GeoUtils::distance(&Coordinate::new(0.0, 0.0), &Coordinate::new(0.0, 1.0));
        assert!(approx_eq(d, 111_194.9, 1.0));
    }

    #[test]
    fn test_interpolate_edge_counts() {
        let start = Coordinate::new(10.0, 20.0);
        let end = Coordinate::new(11.0, 22.0);

        assert!(GeoUtils::interpolate(&start, &end, 0).is_empty());
        assert_eq!(GeoUtils::interpolate(&start, &end, 1), vec![start]);
    }

    #[test]
    fn test_interpolate_hits_endpoints_exactly() {
        let start = Coordinate::new(55.7558, 37.6176);
        let end = Coordinate::new(55.7568, 37.6186);

        for n in 2..50 {
            let points = GeoUtils::interpolate(&start, &end, n);
            assert_eq!(points.len(), n);
            assert_eq!(points[0], start);
            assert_eq!(points[n - 1], end);
        }
    }

    #[test]
    fn test_interpolate_midpoint() {
        let points = GeoUtils::interpolate(&Coordinate::new(0.0, 0.0), &Coordinate::new(2.0, 4.0), 3);
        assert_eq!(points[1], Coordinate::new(1.0, 2.0));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(GeoUtils::round_to(123.456, 2), 123.46);
        assert_eq!(GeoUtils::round_to(66.66666, 1), 66.7);
        assert_eq!(GeoUtils::round_to(0.25, 1), 0.3);
    }
}
