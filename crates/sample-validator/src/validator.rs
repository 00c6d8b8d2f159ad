//! Range and finiteness checks applied at ingestion

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use signal_buffer::{LocationFix, MotionSample, Vector3};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Largest plausible acceleration magnitude (g)
    pub max_acceleration_g: f64,
    /// Largest plausible rotation magnitude (rad/s)
    pub max_rotation_rad_s: f64,
    /// Ground speed valid range (m/s)
    pub speed_range: (f64, f64),
    /// Horizontal accuracy valid range (m)
    pub accuracy_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_acceleration_g: 50.0,
            max_rotation_rad_s: 35.0,
            speed_range: (0.0, 120.0),
            accuracy_range: (0.0, 1000.0),
        }
    }
}

/// Validator for motion samples and location fixes
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFinite(field));
        }
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    fn validate_vector(
        &self,
        field: &'static str,
        vector: &Vector3,
        max_magnitude: f64,
    ) -> Result<(), ValidationError> {
        if !vector.is_finite() {
            return Err(ValidationError::NonFinite(field));
        }
        self.validate_range(field, vector.magnitude(), (0.0, max_magnitude))
    }

    /// Validate a motion sample
    pub fn validate_motion(&self, sample: &MotionSample) -> Result<(), ValidationError> {
        self.validate_vector("acceleration", &sample.acceleration, self.config.max_acceleration_g)?;
        self.validate_vector("rotation_rate", &sample.rotation_rate, self.config.max_rotation_rad_s)?;
        Ok(())
    }

    /// Validate a location fix
    pub fn validate_location(&self, fix: &LocationFix) -> Result<(), ValidationError> {
        self.validate_range("latitude", fix.coordinate.latitude, (-90.0, 90.0))?;
        self.validate_range("longitude", fix.coordinate.longitude, (-180.0, 180.0))?;
        self.validate_range("speed", fix.speed_mps, self.config.speed_range)?;
        self.validate_range("accuracy", fix.accuracy_m, self.config.accuracy_range)?;
        if let Some(bearing) = fix.bearing_deg {
            self.validate_range("bearing", bearing, (0.0, 360.0))?;
        }
        debug!("Location fix at {} passed validation", fix.timestamp_ms);
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_buffer::Coordinate;

    fn motion(accel: Vector3, rotation: Vector3) -> MotionSample {
        MotionSample::new(0, accel, rotation)
    }

    #[test]
    fn test_valid_motion() {
        let validator = Validator::default();
        assert!(validator.validate_motion(&MotionSample::at_rest(0)).is_ok());
        assert!(validator
            .validate_motion(&motion(Vector3::new(4.0, 1.0, 0.5), Vector3::new(0.0, 2.5, 0.0)))
            .is_ok());
    }

    #[test]
    fn test_nan_motion_rejected() {
        let validator = Validator::default();
        let err = validator
            .validate_motion(&motion(Vector3::new(f64::NAN, 0.0, 0.0), Vector3::default()))
            .unwrap_err();
        assert_eq!(err, ValidationError::NonFinite("acceleration"));

        assert!(validator
            .validate_motion(&motion(Vector3::default(), Vector3::new(0.0, f64::INFINITY, 0.0)))
            .is_err());
    }

    #[test]
    fn test_implausible_acceleration_rejected() {
        let validator = Validator::default();
        assert!(matches!(
            validator.validate_motion(&motion(Vector3::new(80.0, 0.0, 0.0), Vector3::default())),
            Err(ValidationError::OutOfRange { field: "acceleration", .. })
        ));
    }

    #[test]
    fn test_location_ranges() {
        let validator = Validator::default();
        let fix = LocationFix::new(0, Coordinate::new(37.77, -122.42), 20.0).with_bearing(90.0);
        assert!(validator.validate_location(&fix).is_ok());

        let bad_lat = LocationFix::new(0, Coordinate::new(91.0, 0.0), 0.0);
        assert!(validator.validate_location(&bad_lat).is_err());

        let negative_speed = LocationFix::new(0, Coordinate::new(0.0, 0.0), -1.0);
        assert!(validator.validate_location(&negative_speed).is_err());

        let bad_bearing = fix.with_bearing(400.0);
        assert!(validator.validate_location(&bad_bearing).is_err());
    }
}
