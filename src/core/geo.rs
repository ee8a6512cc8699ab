use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate with latitude, longitude and altitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
    /// Meters above the ellipsoid; absent altitudes are stored as 0
    #[serde(default)]
    pub altitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate on the ground plane
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            altitude: 0.0,
        }
    }

    /// Creates a new coordinate with an explicit altitude in meters
    pub fn with_altitude(lat: f64, lng: f64, altitude: f64) -> Self {
        Self { lat, lng, altitude }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0
            && self.lat <= 90.0
            && self.lng >= -180.0
            && self.lng <= 180.0
            && self.altitude.is_finite()
    }

    /// Wraps longitude to [-180, 180] range
    pub fn wrap_lng(lng: f64) -> f64 {
        let wrapped = lng % 360.0;
        if wrapped > 180.0 {
            wrapped - 360.0
        } else if wrapped < -180.0 {
            wrapped + 360.0
        } else {
            wrapped
        }
    }

    /// Clamps latitude to valid range
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-90.0, 90.0)
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A single fix reported by the device location provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationReading {
    pub coordinate: Coordinate,
    /// Radius of the 68% confidence circle, in meters
    pub accuracy: f64,
    /// Direction of travel in degrees clockwise from true north
    pub heading: Option<f64>,
    /// Ground speed in meters per second
    pub speed: Option<f64>,
    /// Monotonic timestamp in milliseconds
    pub timestamp: u64,
}

impl LocationReading {
    pub fn new(coordinate: Coordinate, accuracy: f64, timestamp: u64) -> Self {
        Self {
            coordinate,
            accuracy: accuracy.max(0.0),
            heading: None,
            speed: None,
            timestamp,
        }
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn lat(&self) -> f64 {
        self.coordinate.lat
    }

    pub fn lng(&self) -> f64 {
        self.coordinate.lng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_creation() {
        let coord = Coordinate::new(35.6812, 139.7671);
        assert_eq!(coord.lat, 35.6812);
        assert_eq!(coord.lng, 139.7671);
        assert_eq!(coord.altitude, 0.0);
        assert!(coord.is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
    }

    #[test]
    fn test_missing_altitude_defaults_to_ground() {
        let coord: Coordinate = serde_json::from_str(r#"{"lat": 1.5, "lng": 2.5}"#).unwrap();
        assert_eq!(coord, Coordinate::new(1.5, 2.5));
    }

    #[test]
    fn test_wrap_lng() {
        assert_eq!(Coordinate::wrap_lng(190.0), -170.0);
        assert_eq!(Coordinate::wrap_lng(-190.0), 170.0);
        assert_eq!(Coordinate::wrap_lng(45.0), 45.0);
    }

    #[test]
    fn test_negative_accuracy_is_clamped() {
        let reading = LocationReading::new(Coordinate::new(0.0, 0.0), -3.0, 0);
        assert_eq!(reading.accuracy, 0.0);
    }
}
