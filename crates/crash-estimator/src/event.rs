//! Crash event record

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use signal_buffer::{LocationFix, MotionSample};
use uuid::Uuid;

/// Number of motion samples kept with each event for audit/replay
pub const SNAPSHOT_LEN: usize = 20;

/// Classified motion pattern that opened an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusKind {
    SuddenImpact,
    SuddenDeceleration,
    SuddenRotation,
    /// Rider or operator pressed the emergency button
    Manual,
}

impl StimulusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StimulusKind::SuddenImpact => "sudden_impact",
            StimulusKind::SuddenDeceleration => "sudden_deceleration",
            StimulusKind::SuddenRotation => "sudden_rotation",
            StimulusKind::Manual => "manual",
        }
    }

    /// Human-readable label for messages
    pub fn label(&self) -> &'static str {
        match self {
            StimulusKind::SuddenImpact => "sudden impact",
            StimulusKind::SuddenDeceleration => "sudden deceleration",
            StimulusKind::SuddenRotation => "sudden rotation",
            StimulusKind::Manual => "manual emergency trigger",
        }
    }
}

/// A detected (or manually triggered) crash, immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub stimulus: StimulusKind,
    /// Acceleration (g) or rotation (rad/s) magnitude of the stimulus
    pub magnitude: f64,
    pub probability: f64,
    pub location: Option<LocationFix>,
    /// Last motion samples before detection, oldest first
    pub samples: Vec<MotionSample>,
}

impl CrashEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        stimulus: StimulusKind,
        magnitude: f64,
        probability: f64,
        location: Option<LocationFix>,
        samples: &[MotionSample],
    ) -> Self {
        let keep = samples.len().min(SNAPSHOT_LEN);
        Self {
            id: Uuid::new_v4(),
            timestamp,
            stimulus,
            magnitude,
            probability,
            location,
            samples: samples[samples.len() - keep..].to_vec(),
        }
    }

    /// Operator/rider triggered escalation; probability is fixed at 1.0
    pub fn manual(
        timestamp: DateTime<Utc>,
        location: Option<LocationFix>,
        samples: &[MotionSample],
    ) -> Self {
        Self::new(timestamp, StimulusKind::Manual, 0.0, 1.0, location, samples)
    }
}

/// Convert a sensor timestamp to UTC, falling back to now for out-of-range values
pub fn timestamp_from_millis(timestamp_ms: u64) -> DateTime<Utc> {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now)
}
