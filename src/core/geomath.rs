//! Stateless geodesy helpers used by the tracker and the sync policy.
//!
//! All functions are pure and deterministic. Distances are in meters,
//! angles in degrees and timestamps in milliseconds.

use crate::core::constants::{EARTH_RADIUS_M, METERS_PER_DEGREE};
use crate::core::geo::{Coordinate, LocationReading};
use crate::traits::Lerp;

/// Great-circle distance between two coordinates using the Haversine formula.
/// Altitude is ignored.
pub fn distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial bearing from `a` to `b`, in degrees within [0, 360).
pub fn bearing(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Ground speed in m/s between two readings.
///
/// Returns 0 for duplicate or out-of-order timestamps.
pub fn speed(from: &LocationReading, to: &LocationReading) -> f64 {
    match to.timestamp.checked_sub(from.timestamp) {
        Some(elapsed_ms) if elapsed_ms > 0 => {
            distance(&from.coordinate, &to.coordinate) / (elapsed_ms as f64 / 1000.0)
        }
        _ => 0.0,
    }
}

/// Planar distance approximation for early rejection.
///
/// Returns `None` (the "far" sentinel) when the approximation exceeds
/// `max_distance`. A `Some` value is NOT a trustworthy distance; callers must
/// fall back to [`distance`] in that case.
///
/// Δlng is scaled by the cosine of the more poleward latitude, so nearby
/// pairs are never overestimated at any latitude.
pub fn fast_distance(a: &Coordinate, b: &Coordinate, max_distance: Option<f64>) -> Option<f64> {
    let delta_lat = b.lat - a.lat;
    let poleward = a.lat.abs().max(b.lat.abs()).min(90.0);
    let delta_lng = Coordinate::wrap_lng(b.lng - a.lng) * poleward.to_radians().cos();
    let approx = (delta_lat * delta_lat + delta_lng * delta_lng).sqrt() * METERS_PER_DEGREE;

    match max_distance {
        Some(max) if approx > max => None,
        _ => Some(approx),
    }
}

/// Linear interpolation between two coordinates (t in [0, 1]).
pub fn interpolate(a: &Coordinate, b: &Coordinate, t: f64) -> Coordinate {
    a.lerp(b, t.clamp(0.0, 1.0))
}

/// Exponentially weighted average over the last `window_size` readings.
///
/// The i-th reading of the window (oldest first) is weighted `2^i`, so the
/// newest fix dominates. Only lat/lng/accuracy are averaged; everything else
/// is taken from the newest reading. Longitudes are averaged as offsets from
/// the newest fix so a window straddling ±180° stays on the same side.
pub fn smooth(readings: &[LocationReading], window_size: usize) -> Option<LocationReading> {
    let latest = *readings.last()?;
    if window_size <= 1 || readings.len() < window_size {
        return Some(latest);
    }

    let window = &readings[readings.len() - window_size..];
    let mut total_weight = 0.0;
    let mut lat = 0.0;
    let mut lng_offset = 0.0;
    let mut accuracy = 0.0;

    for (i, reading) in window.iter().enumerate() {
        let weight = 2_f64.powi(i as i32);
        total_weight += weight;
        lat += reading.coordinate.lat * weight;
        lng_offset += Coordinate::wrap_lng(reading.coordinate.lng - latest.coordinate.lng) * weight;
        accuracy += reading.accuracy * weight;
    }

    let mut smoothed = latest;
    smoothed.coordinate.lat = lat / total_weight;
    smoothed.coordinate.lng = Coordinate::wrap_lng(latest.coordinate.lng + lng_offset / total_weight);
    smoothed.accuracy = accuracy / total_weight;
    Some(smoothed)
}

pub fn is_accurate(reading: &LocationReading, max_accuracy: f64) -> bool {
    reading.accuracy <= max_accuracy
}

/// Whether moving from `from` to `to` covers at least `threshold_m` meters.
pub fn has_significant_movement(from: &Coordinate, to: &Coordinate, threshold_m: f64) -> bool {
    if fast_distance(from, to, Some(threshold_m * 2.0)).is_none() {
        return true;
    }
    distance(from, to) >= threshold_m
}

/// Point reached after travelling `distance_m` along `bearing_deg` from `origin`.
pub fn destination(origin: &Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let angular = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = origin.lat.to_radians();
    let lng1 = origin.lng.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * theta.cos()).asin();
    let lng2 = lng1
        + (theta.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    Coordinate::with_altitude(
        lat2.to_degrees(),
        Coordinate::wrap_lng(lng2.to_degrees()),
        origin.altitude,
    )
}

/// Normalizes an angle in degrees into [0, 360)
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(lat: f64, lng: f64, accuracy: f64, timestamp: u64) -> LocationReading {
        LocationReading::new(Coordinate::new(lat, lng), accuracy, timestamp)
    }

    #[test]
    fn test_distance_tokyo_osaka() {
        let tokyo = Coordinate::new(35.6812, 139.7671);
        let osaka = Coordinate::new(34.7025, 135.4959);

        // Roughly 403 km as the crow flies
        let d = distance(&tokyo, &osaka);
        assert!((d - 403_000.0).abs() < 3_000.0, "got {}", d);
    }

    #[test]
    fn test_distance_ignores_altitude() {
        let a = Coordinate::with_altitude(10.0, 10.0, 0.0);
        let b = Coordinate::with_altitude(10.0, 10.0, 500.0);
        assert_eq!(distance(&a, &b), 0.0);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = Coordinate::new(0.0, 0.0);
        assert!((bearing(&origin, &Coordinate::new(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((bearing(&origin, &Coordinate::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing(&origin, &Coordinate::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing(&origin, &Coordinate::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_range() {
        let a = Coordinate::new(35.0, 139.0);
        for (lat, lng) in [(35.1, 139.0), (34.9, 138.9), (35.0, 139.2), (34.5, 139.5)] {
            let b = bearing(&a, &Coordinate::new(lat, lng));
            assert!((0.0..360.0).contains(&b));
        }
    }

    #[test]
    fn test_speed() {
        let from = reading(35.0, 139.0, 5.0, 0);
        let to = reading(35.0009, 139.0, 5.0, 10_000);
        let s = speed(&from, &to);
        assert!((s - 10.0).abs() < 0.2, "got {}", s);
    }

    #[test]
    fn test_speed_guards_non_increasing_time() {
        let from = reading(35.0, 139.0, 5.0, 5_000);
        let to = reading(35.01, 139.0, 5.0, 5_000);
        assert_eq!(speed(&from, &to), 0.0);

        let earlier = reading(35.01, 139.0, 5.0, 1_000);
        assert_eq!(speed(&from, &earlier), 0.0);
    }

    #[test]
    fn test_fast_distance_sentinel() {
        let a = Coordinate::new(35.0, 139.0);
        let near = Coordinate::new(35.0001, 139.0);
        let far = Coordinate::new(36.0, 139.0);

        assert!(fast_distance(&a, &near, Some(100.0)).is_some());
        assert!(fast_distance(&a, &far, Some(100.0)).is_none());
        assert!(fast_distance(&a, &far, None).is_some());
    }

    #[test]
    fn test_fast_distance_wraps_antimeridian() {
        let a = Coordinate::new(0.0, 179.9999);
        let b = Coordinate::new(0.0, -179.9999);
        let approx = fast_distance(&a, &b, Some(1_000.0));
        assert!(approx.is_some());
        assert!(approx.unwrap() < 50.0);
    }

    #[test]
    fn test_fast_distance_never_overestimates_at_high_latitude() {
        // Tromsø: a short east-west step is still near in the planar metric
        let a = Coordinate::new(69.65, 18.96);
        let b = destination(&a, 90.0, 4.0);
        assert!(fast_distance(&a, &b, Some(10.0)).is_some());
        assert!(!has_significant_movement(&a, &b, 5.0));

        for lat in [-85.0, -70.0, 0.0, 64.1, 78.2, 85.0] {
            let a = Coordinate::new(lat, 10.0);
            for bearing_deg in [0.0, 45.0, 90.0, 135.0, 270.0] {
                let b = destination(&a, bearing_deg, 40.0);
                let approx = fast_distance(&a, &b, None).unwrap();
                assert!(approx <= distance(&a, &b), "lat={} bearing={}", lat, bearing_deg);
            }
        }
    }

    #[test]
    fn test_smooth_empty() {
        assert!(smooth(&[], 3).is_none());
    }

    #[test]
    fn test_smooth_short_history_returns_latest() {
        let readings = [reading(1.0, 1.0, 5.0, 0), reading(2.0, 2.0, 7.0, 1)];
        assert_eq!(smooth(&readings, 3), Some(readings[1]));
    }

    #[test]
    fn test_smooth_repeated_reading_is_identity() {
        let r = reading(35.0, 139.0, 5.0, 100);
        let smoothed = smooth(&[r, r, r], 3).unwrap();
        assert!((smoothed.lat() - r.lat()).abs() < 1e-12);
        assert!((smoothed.lng() - r.lng()).abs() < 1e-12);
        assert!((smoothed.accuracy - r.accuracy).abs() < 1e-12);
        assert_eq!(smoothed.timestamp, r.timestamp);
    }

    #[test]
    fn test_smooth_weights_newest_highest() {
        let readings = [
            reading(0.0, 0.0, 10.0, 0),
            reading(0.0, 0.0, 10.0, 1),
            reading(7.0, 7.0, 3.0, 2),
        ];
        // weights 1, 2, 4 -> 7 * 4 / 7 = 4
        let smoothed = smooth(&readings, 3).unwrap();
        assert!((smoothed.lat() - 4.0).abs() < 1e-12);
        assert!((smoothed.lng() - 4.0).abs() < 1e-12);
        assert!((smoothed.accuracy - 42.0 / 7.0).abs() < 1e-12);
        assert_eq!(smoothed.timestamp, 2);
    }

    #[test]
    fn test_smooth_only_uses_last_window() {
        let readings = [
            reading(50.0, 50.0, 5.0, 0),
            reading(1.0, 1.0, 5.0, 1),
            reading(1.0, 1.0, 5.0, 2),
        ];
        let smoothed = smooth(&readings, 2).unwrap();
        assert!((smoothed.lat() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_smooth_across_antimeridian() {
        let readings = [
            reading(-17.0, 179.99995, 5.0, 0),
            reading(-17.0, -179.99995, 5.0, 1_000),
            reading(-17.0, 179.99995, 5.0, 2_000),
        ];
        let smoothed = smooth(&readings, 3).unwrap();
        assert!(smoothed.lng().abs() > 179.9999, "got {}", smoothed.lng());
        assert!(distance(&smoothed.coordinate, &readings[2].coordinate) < 20.0);

        // offsets that cross the seam wrap back into range
        let readings = [
            reading(0.0, -179.9999, 5.0, 0),
            reading(0.0, -179.9999, 5.0, 1),
            reading(0.0, 179.9999, 5.0, 2),
        ];
        let smoothed = smooth(&readings, 3).unwrap();
        assert!((-180.0..=180.0).contains(&smoothed.lng()));
        assert!(distance(&smoothed.coordinate, &readings[2].coordinate) < 30.0);
    }

    #[test]
    fn test_is_accurate() {
        let r = reading(0.0, 0.0, 20.0, 0);
        assert!(is_accurate(&r, 20.0));
        assert!(is_accurate(&r, 50.0));
        assert!(!is_accurate(&r, 19.9));
    }

    #[test]
    fn test_significant_movement_scenarios() {
        let a = Coordinate::new(35.0, 139.0);
        let b = Coordinate::new(35.0009, 139.0);

        assert!(has_significant_movement(&a, &b, 5.0));
        assert!(!has_significant_movement(&a, &b, 200.0));
    }

    #[test]
    fn test_interpolate() {
        let a = Coordinate::with_altitude(0.0, 0.0, 0.0);
        let b = Coordinate::with_altitude(10.0, 20.0, 100.0);
        let mid = interpolate(&a, &b, 0.5);
        assert_eq!(mid, Coordinate::with_altitude(5.0, 10.0, 50.0));
        assert_eq!(interpolate(&a, &b, 2.0), b);
    }

    #[test]
    fn test_destination_round_trip_distance() {
        let origin = Coordinate::new(35.0, 139.0);
        let target = destination(&origin, 45.0, 1_000.0);
        assert!((distance(&origin, &target) - 1_000.0).abs() < 0.01);
        assert!((bearing(&origin, &target) - 45.0).abs() < 0.01);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
    }
}
