//! Sample types produced by the sensor and location collaborators

use geo::{HaversineDistance, Point};
use serde::{Deserialize, Serialize};

/// Tri-axial vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// One motion reading (10Hz)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Capture time (ms since Unix epoch)
    pub timestamp_ms: u64,
    /// Device-local acceleration with gravity removed (g)
    pub acceleration: Vector3,
    /// Rotation rate (rad/s)
    pub rotation_rate: Vector3,
}

impl MotionSample {
    pub fn new(timestamp_ms: u64, acceleration: Vector3, rotation_rate: Vector3) -> Self {
        Self {
            timestamp_ms,
            acceleration,
            rotation_rate,
        }
    }

    /// A reading with no acceleration and no rotation
    pub fn at_rest(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            ..Default::default()
        }
    }

    /// Acceleration magnitude (g)
    pub fn acceleration_magnitude(&self) -> f64 {
        self.acceleration.magnitude()
    }

    /// Rotation magnitude (rad/s)
    pub fn rotation_magnitude(&self) -> f64 {
        self.rotation_rate.magnitude()
    }
}

/// WGS84 coordinate in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in meters
    pub fn distance_m(&self, other: &Coordinate) -> f64 {
        self.to_point().haversine_distance(&other.to_point())
    }

    fn to_point(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// One location fix from the positioning collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Fix time (ms since Unix epoch)
    pub timestamp_ms: u64,
    pub coordinate: Coordinate,
    /// Ground speed (m/s)
    pub speed_mps: f64,
    /// Course over ground (degrees, 0-360), `None` while unknown
    #[serde(default)]
    pub bearing_deg: Option<f64>,
    /// Horizontal accuracy (m)
    #[serde(default)]
    pub accuracy_m: f64,
}

impl LocationFix {
    pub fn new(timestamp_ms: u64, coordinate: Coordinate, speed_mps: f64) -> Self {
        Self {
            timestamp_ms,
            coordinate,
            speed_mps,
            bearing_deg: None,
            accuracy_m: 0.0,
        }
    }

    pub fn with_bearing(mut self, bearing_deg: f64) -> Self {
        self.bearing_deg = Some(bearing_deg);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude() {
        let v = Vector3::new(3.0, 4.0, 0.0);
        assert!((v.magnitude() - 5.0).abs() < 1e-9);
        assert!(!Vector3::new(f64::NAN, 0.0, 0.0).is_finite());
    }

    #[test]
    fn test_distance_one_millidegree_latitude() {
        let a = Coordinate::new(37.0, -122.0);
        let b = Coordinate::new(37.001, -122.0);
        let d = a.distance_m(&b);
        // ~111 m per millidegree of latitude
        assert!((d - 111.2).abs() < 1.0, "distance was {}", d);
        assert!(a.distance_m(&a) < 1e-9);
    }
}
