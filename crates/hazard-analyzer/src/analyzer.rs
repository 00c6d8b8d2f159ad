//! Hazard pattern detectors

use crate::geometry::{bearing_delta_deg, turn_radius_m, MPS_TO_MPH};
use crate::types::{CrowdSourcedReport, Hazard, HazardType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signal_buffer::{Coordinate, LocationFix};
use tracing::{debug, info};

/// Hazard analyzer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    /// Fixes examined for surface quality
    pub surface_window: usize,
    /// Average |speed delta| between fixes that counts as rough (m/s)
    pub surface_speed_variation: f64,
    /// Heading change that counts as a direction change (degrees)
    pub surface_bearing_change_deg: f64,
    /// Direction changes that must be exceeded
    pub surface_min_direction_changes: usize,
    pub surface_confidence_scale: f64,
    pub surface_confidence_cap: f64,
    /// Confidence that must be exceeded to emit a surface hazard
    pub surface_min_confidence: f64,

    /// Turn radius below which a turn is sharp (m)
    pub turn_max_radius_m: f64,
    /// Shorter hops between fixes carry no curvature information (m)
    pub turn_min_segment_m: f64,

    /// Fixes examined for speed changes
    pub speed_window: usize,
    /// Consecutive speed delta that counts as sudden (mph)
    pub speed_change_mph: f64,
    pub speed_confidence_scale: f64,
    pub speed_confidence_cap: f64,

    /// Crowd reports within this distance of the rider are promoted (m)
    pub promotion_radius_m: f64,
    /// Crowd report confidence that must be exceeded for promotion
    pub promotion_min_confidence: f64,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            surface_window: 10,
            surface_speed_variation: 5.0,
            surface_bearing_change_deg: 15.0,
            surface_min_direction_changes: 3,
            surface_confidence_scale: 10.0,
            surface_confidence_cap: 0.95,
            surface_min_confidence: 0.7,
            turn_max_radius_m: 50.0,
            turn_min_segment_m: 2.0,
            speed_window: 5,
            speed_change_mph: 15.0,
            speed_confidence_scale: 30.0,
            speed_confidence_cap: 0.9,
            promotion_radius_m: 1000.0,
            promotion_min_confidence: 0.6,
        }
    }
}

/// Road hazard analyzer
#[derive(Debug, Clone, Default)]
pub struct HazardAnalyzer {
    config: HazardConfig,
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

impl HazardAnalyzer {
    pub fn new(config: HazardConfig) -> Self {
        info!("Creating hazard analyzer with config: {:?}", config);
        Self { config }
    }

    pub fn config(&self) -> &HazardConfig {
        &self.config
    }

    /// Run every pattern detector over recent fixes (oldest first)
    pub fn analyze(&self, fixes: &[LocationFix], now: DateTime<Utc>) -> Vec<Hazard> {
        let hazards: Vec<Hazard> = [
            self.detect_poor_surface(fixes, now),
            self.detect_sharp_turn(fixes, now),
            self.detect_speed_change(fixes, now),
        ]
        .into_iter()
        .flatten()
        .collect();

        if !hazards.is_empty() {
            debug!("Pattern analysis found {} hazard(s)", hazards.len());
        }
        hazards
    }

    /// Rough surface: speed jitter combined with frequent heading changes
    pub fn detect_poor_surface(&self, fixes: &[LocationFix], now: DateTime<Utc>) -> Option<Hazard> {
        let window = tail(fixes, self.config.surface_window);
        if window.len() < 2 {
            return None;
        }

        let deltas = window.windows(2);
        let variation = deltas
            .clone()
            .map(|w| (w[1].speed_mps - w[0].speed_mps).abs())
            .sum::<f64>()
            / (window.len() - 1) as f64;

        let direction_changes = deltas
            .filter_map(|w| Some(bearing_delta_deg(w[0].bearing_deg?, w[1].bearing_deg?)))
            .filter(|delta| *delta > self.config.surface_bearing_change_deg)
            .count();

        if variation <= self.config.surface_speed_variation
            || direction_changes <= self.config.surface_min_direction_changes
        {
            return None;
        }

        let confidence =
            (variation / self.config.surface_confidence_scale).min(self.config.surface_confidence_cap);
        if confidence <= self.config.surface_min_confidence {
            return None;
        }

        let location = window.last()?.coordinate;
        Some(Hazard::detected(
            HazardType::PoorRoadSurface,
            location,
            confidence,
            format!(
                "Rough road surface (speed variation {:.1} m/s, {} direction changes)",
                variation, direction_changes
            ),
            now,
        ))
    }

    /// Sharp turn: circle through the last three fixes is tighter than the limit
    pub fn detect_sharp_turn(&self, fixes: &[LocationFix], now: DateTime<Utc>) -> Option<Hazard> {
        let [p1, p2, p3] = tail(fixes, 3) else {
            return None;
        };

        let radius = turn_radius_m(
            &p1.coordinate,
            &p2.coordinate,
            &p3.coordinate,
            self.config.turn_min_segment_m,
        );
        if radius >= self.config.turn_max_radius_m {
            return None;
        }

        let confidence = 1.0 - radius / self.config.turn_max_radius_m;
        Some(Hazard::detected(
            HazardType::SharpTurn,
            p2.coordinate,
            confidence,
            format!("Sharp turn (radius {:.0} m)", radius),
            now,
        ))
    }

    /// Sudden speed change between consecutive fixes
    pub fn detect_speed_change(&self, fixes: &[LocationFix], now: DateTime<Utc>) -> Option<Hazard> {
        let window = tail(fixes, self.config.speed_window);

        let (delta_mph, at) = window
            .windows(2)
            .map(|w| ((w[1].speed_mps - w[0].speed_mps).abs() * MPS_TO_MPH, w[1].coordinate))
            .max_by(|a, b| a.0.total_cmp(&b.0))?;

        if delta_mph <= self.config.speed_change_mph {
            return None;
        }

        let confidence =
            (delta_mph / self.config.speed_confidence_scale).min(self.config.speed_confidence_cap);
        Some(Hazard::detected(
            HazardType::SuddenSpeedChange,
            at,
            confidence,
            format!("Sudden speed change of {:.0} mph", delta_mph),
            now,
        ))
    }

    /// Promote nearby, trusted reports that are not mirrored in `active` yet
    pub fn promote_reports(
        &self,
        reports: &[CrowdSourcedReport],
        rider: &Coordinate,
        active: &[Hazard],
        now: DateTime<Utc>,
    ) -> Vec<Hazard> {
        reports
            .iter()
            .filter(|r| r.confidence > self.config.promotion_min_confidence)
            .filter(|r| r.location.distance_m(rider) <= self.config.promotion_radius_m)
            .filter(|r| !active.iter().any(|h| h.id == r.id))
            .map(|r| {
                debug!("Promoting crowd report {} ({})", r.id, r.hazard_type.as_str());
                Hazard::from_report(r, now)
            })
            .collect()
    }
}
