//! Hazard and report types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signal_buffer::Coordinate;
use uuid::Uuid;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    /// Severity for a detection confidence
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.9 {
            Severity::Critical
        } else if confidence >= 0.8 {
            Severity::High
        } else if confidence >= 0.6 {
            Severity::Moderate
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardType {
    PoorRoadSurface,
    SharpTurn,
    SuddenSpeedChange,
    Pothole,
    Debris,
    Construction,
    WetRoad,
    IcyRoad,
    Accident,
    Animal,
    Other,
}

impl HazardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardType::PoorRoadSurface => "poor_road_surface",
            HazardType::SharpTurn => "sharp_turn",
            HazardType::SuddenSpeedChange => "sudden_speed_change",
            HazardType::Pothole => "pothole",
            HazardType::Debris => "debris",
            HazardType::Construction => "construction",
            HazardType::WetRoad => "wet_road",
            HazardType::IcyRoad => "icy_road",
            HazardType::Accident => "accident",
            HazardType::Animal => "animal",
            HazardType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardSource {
    AiDetected,
    CrowdSourced,
    Official,
}

/// A road hazard in the active alert set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub id: Uuid,
    pub hazard_type: HazardType,
    pub location: Coordinate,
    /// Detection confidence (0-1)
    pub confidence: f64,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    pub severity: Severity,
    pub source: HazardSource,
}

impl Hazard {
    /// Hazard found by the pattern analyzer
    pub fn detected(
        hazard_type: HazardType,
        location: Coordinate,
        confidence: f64,
        description: impl Into<String>,
        detected_at: DateTime<Utc>,
    ) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        Self {
            id: Uuid::new_v4(),
            hazard_type,
            location,
            confidence,
            description: description.into(),
            detected_at,
            severity: Severity::from_confidence(confidence),
            source: HazardSource::AiDetected,
        }
    }

    /// Mirror of a crowd-sourced report; shares the report's id
    pub fn from_report(report: &CrowdSourcedReport, promoted_at: DateTime<Utc>) -> Self {
        let confidence = report.confidence.clamp(0.0, 1.0);
        Self {
            id: report.id,
            hazard_type: report.hazard_type,
            location: report.location,
            confidence,
            description: report.description.clone(),
            detected_at: promoted_at,
            severity: Severity::from_confidence(confidence),
            source: HazardSource::CrowdSourced,
        }
    }
}

/// Hazard observation submitted by a rider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrowdSourcedReport {
    pub id: Uuid,
    pub hazard_type: HazardType,
    pub location: Coordinate,
    pub description: String,
    pub reporter_id: String,
    pub reported_at: DateTime<Utc>,
    pub confidence: f64,
    pub votes: i32,
}

impl CrowdSourcedReport {
    pub fn new(
        hazard_type: HazardType,
        location: Coordinate,
        description: impl Into<String>,
        reporter_id: impl Into<String>,
        confidence: f64,
        reported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            hazard_type,
            location,
            description: description.into(),
            reporter_id: reporter_id.into(),
            reported_at,
            confidence,
            votes: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_confidence() {
        assert_eq!(Severity::from_confidence(0.95), Severity::Critical);
        assert_eq!(Severity::from_confidence(0.85), Severity::High);
        assert_eq!(Severity::from_confidence(0.7), Severity::Moderate);
        assert_eq!(Severity::from_confidence(0.3), Severity::Low);
        assert!(Severity::Low < Severity::Moderate);
    }

    #[test]
    fn test_report_mirror_shares_id() {
        let report = CrowdSourcedReport::new(
            HazardType::Pothole,
            Coordinate::new(37.0, -122.0),
            "Deep pothole in right lane",
            "rider-42",
            0.8,
            Utc::now(),
        );
        let hazard = Hazard::from_report(&report, Utc::now());
        assert_eq!(hazard.id, report.id);
        assert_eq!(hazard.source, HazardSource::CrowdSourced);
        assert_eq!(hazard.severity, Severity::High);
    }
}
