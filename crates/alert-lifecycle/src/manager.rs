//! Alert Manager Implementation

use crate::alerts::{RouteAlert, WeatherAlert};
use chrono::{DateTime, Duration, Utc};
use hazard_analyzer::{is_duplicate, CrowdSourcedReport, Hazard, Severity, DEFAULT_DEDUP_RADIUS_M};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Hazard lifetime (seconds, default: 1 hour)
    pub hazard_ttl_secs: u64,
    /// Crowd-sourced report lifetime (seconds, default: 24 hours)
    pub report_ttl_secs: u64,
    /// Weather alert lifetime (seconds)
    pub weather_ttl_secs: u64,
    /// Route alert lifetime (seconds)
    pub route_ttl_secs: u64,
    /// Same-type hazards closer than this are duplicates (meters)
    pub dedup_radius_m: f64,
    /// Weather alerts below this severity are not pushed
    pub weather_notify_min_severity: Severity,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            hazard_ttl_secs: 3600,
            report_ttl_secs: 24 * 3600,
            weather_ttl_secs: 3600,
            route_ttl_secs: 3600,
            dedup_radius_m: DEFAULT_DEDUP_RADIUS_M,
            weather_notify_min_severity: Severity::Moderate,
        }
    }
}

/// Push notification request for the notification collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertNotification {
    pub alert_id: Uuid,
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

/// Read-only view of the active alerts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveAlertSet {
    pub hazards: Vec<Hazard>,
    pub crowd_reports: Vec<CrowdSourcedReport>,
    pub weather_alerts: Vec<WeatherAlert>,
    pub route_alerts: Vec<RouteAlert>,
    pub generated_at: Option<DateTime<Utc>>,
}

/// Result of one analysis tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub inserted: usize,
    pub duplicates: usize,
    pub evicted: usize,
    pub notifications: Vec<AlertNotification>,
}

/// Owner of the active alert set
pub struct AlertManager {
    config: AlertConfig,
    hazards: Vec<Hazard>,
    reports: Vec<CrowdSourcedReport>,
    weather: Vec<WeatherAlert>,
    routes: Vec<RouteAlert>,
}

/// Lifetimes are clamped to ten years
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

fn expired(timestamp: DateTime<Utc>, now: DateTime<Utc>, ttl_secs: u64) -> bool {
    let ttl = Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64);
    now.signed_duration_since(timestamp) > ttl
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert manager with config: {:?}", config);
        Self {
            config,
            hazards: Vec::new(),
            reports: Vec::new(),
            weather: Vec::new(),
            routes: Vec::new(),
        }
    }

    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    pub fn reports(&self) -> &[CrowdSourcedReport] {
        &self.reports
    }

    /// Insert a hazard unless it repeats an active one. Returns whether it was kept.
    pub fn insert_hazard(&mut self, hazard: Hazard) -> bool {
        if is_duplicate(&self.hazards, &hazard, self.config.dedup_radius_m) {
            debug!(
                "Dropping duplicate {} hazard near ({:.5}, {:.5})",
                hazard.hazard_type.as_str(),
                hazard.location.latitude,
                hazard.location.longitude
            );
            metrics::counter!("safety_hazards_duplicate_total").increment(1);
            return false;
        }

        info!(
            "Hazard added: {} ({:.2}, {})",
            hazard.hazard_type.as_str(),
            hazard.confidence,
            hazard.severity.as_str()
        );
        metrics::counter!("safety_hazards_inserted_total", "type" => hazard.hazard_type.as_str())
            .increment(1);
        self.hazards.push(hazard);
        true
    }

    /// Store a crowd-sourced report. Reports with a known id are rejected.
    pub fn add_report(&mut self, report: CrowdSourcedReport) -> bool {
        if self.reports.iter().any(|r| r.id == report.id) {
            return false;
        }
        debug!("Crowd report {} from {}", report.id, report.reporter_id);
        self.reports.push(report);
        true
    }

    /// Up- or down-vote a report; returns the new vote count
    pub fn vote_report(&mut self, id: Uuid, up: bool) -> Option<i32> {
        let report = self.reports.iter_mut().find(|r| r.id == id)?;
        report.votes += if up { 1 } else { -1 };
        Some(report.votes)
    }

    /// Store a weather alert; a notification is returned only from moderate severity up
    pub fn add_weather_alert(&mut self, alert: WeatherAlert) -> Option<AlertNotification> {
        let notification = (alert.severity >= self.config.weather_notify_min_severity).then(|| {
            AlertNotification {
                alert_id: alert.id,
                title: format!("Weather alert: {:?}", alert.kind),
                body: alert.description.clone(),
                severity: alert.severity,
            }
        });
        if notification.is_none() {
            debug!("Weather alert {} below notification severity", alert.id);
        }
        self.weather.push(alert);
        notification
    }

    pub fn add_route_alert(&mut self, alert: RouteAlert) -> AlertNotification {
        let notification = AlertNotification {
            alert_id: alert.id,
            title: format!("Route alert: {:?}", alert.kind),
            body: alert.description.clone(),
            severity: Severity::Moderate,
        };
        self.routes.push(alert);
        notification
    }

    /// Drop every entry past its lifetime; returns how many were removed
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.len();
        let config = &self.config;

        self.hazards
            .retain(|h| !expired(h.detected_at, now, config.hazard_ttl_secs));
        self.reports
            .retain(|r| !expired(r.reported_at, now, config.report_ttl_secs));
        self.weather
            .retain(|w| !expired(w.issued_at, now, config.weather_ttl_secs));
        self.routes
            .retain(|r| !expired(r.issued_at, now, config.route_ttl_secs));

        let evicted = before - self.len();
        if evicted > 0 {
            debug!("Evicted {} expired alert(s)", evicted);
        }
        evicted
    }

    /// One analysis tick: expire old entries, then insert new hazards
    pub fn tick(&mut self, now: DateTime<Utc>, new_hazards: Vec<Hazard>) -> TickOutcome {
        let mut outcome = TickOutcome {
            evicted: self.evict_expired(now),
            ..Default::default()
        };

        for hazard in new_hazards {
            let notification = AlertNotification {
                alert_id: hazard.id,
                title: format!("Hazard ahead: {}", hazard.hazard_type.as_str().replace('_', " ")),
                body: hazard.description.clone(),
                severity: hazard.severity,
            };
            if self.insert_hazard(hazard) {
                outcome.inserted += 1;
                outcome.notifications.push(notification);
            } else {
                outcome.duplicates += 1;
            }
        }

        outcome
    }

    /// Copy of the current set with expired entries filtered out
    pub fn snapshot(&self, now: DateTime<Utc>) -> ActiveAlertSet {
        let config = &self.config;
        ActiveAlertSet {
            hazards: self
                .hazards
                .iter()
                .filter(|h| !expired(h.detected_at, now, config.hazard_ttl_secs))
                .cloned()
                .collect(),
            crowd_reports: self
                .reports
                .iter()
                .filter(|r| !expired(r.reported_at, now, config.report_ttl_secs))
                .cloned()
                .collect(),
            weather_alerts: self
                .weather
                .iter()
                .filter(|w| !expired(w.issued_at, now, config.weather_ttl_secs))
                .cloned()
                .collect(),
            route_alerts: self
                .routes
                .iter()
                .filter(|r| !expired(r.issued_at, now, config.route_ttl_secs))
                .cloned()
                .collect(),
            generated_at: Some(now),
        }
    }

    /// Total entries across all alert kinds
    pub fn len(&self) -> usize {
        self.hazards.len() + self.reports.len() + self.weather.len() + self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all alert state
    pub fn clear(&mut self) {
        self.hazards.clear();
        self.reports.clear();
        self.weather.clear();
        self.routes.clear();
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{RouteAlertKind, WeatherKind};
    use hazard_analyzer::HazardType;
    use signal_buffer::Coordinate;

    fn hazard_at(hazard_type: HazardType, lat: f64, detected_at: DateTime<Utc>) -> Hazard {
        Hazard::detected(hazard_type, Coordinate::new(lat, -122.0), 0.8, "test hazard", detected_at)
    }

    fn report_at(reported_at: DateTime<Utc>) -> CrowdSourcedReport {
        CrowdSourcedReport::new(
            HazardType::Pothole,
            Coordinate::new(37.0, -122.0),
            "Pothole",
            "rider-7",
            0.7,
            reported_at,
        )
    }

    #[test]
    fn test_deduplication_within_radius() {
        let mut manager = AlertManager::default();
        let now = Utc::now();

        let outcome = manager.tick(
            now,
            vec![
                hazard_at(HazardType::PoorRoadSurface, 37.0, now),
                // ~80 m away
                hazard_at(HazardType::PoorRoadSurface, 37.00072, now),
            ],
        );

        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.notifications.len(), 1);
        assert_eq!(manager.snapshot(now).hazards.len(), 1);
    }

    #[test]
    fn test_different_types_coexist() {
        let mut manager = AlertManager::default();
        let now = Utc::now();
        assert!(manager.insert_hazard(hazard_at(HazardType::PoorRoadSurface, 37.0, now)));
        assert!(manager.insert_hazard(hazard_at(HazardType::SharpTurn, 37.0, now)));
        assert_eq!(manager.hazards().len(), 2);
    }

    #[test]
    fn test_hazard_expiry() {
        let mut manager = AlertManager::default();
        let now = Utc::now();

        manager.insert_hazard(hazard_at(HazardType::SharpTurn, 37.0, now - Duration::minutes(61)));
        manager.insert_hazard(hazard_at(HazardType::Debris, 37.0, now - Duration::minutes(59)));

        let snapshot = manager.snapshot(now);
        assert_eq!(snapshot.hazards.len(), 1);
        assert_eq!(snapshot.hazards[0].hazard_type, HazardType::Debris);

        assert_eq!(manager.evict_expired(now), 1);
        assert_eq!(manager.hazards().len(), 1);
    }

    #[test]
    fn test_expired_hazard_does_not_block_new_one() {
        let mut manager = AlertManager::default();
        let now = Utc::now();
        manager.insert_hazard(hazard_at(HazardType::SharpTurn, 37.0, now - Duration::minutes(90)));

        let outcome = manager.tick(now, vec![hazard_at(HazardType::SharpTurn, 37.0, now)]);
        assert_eq!(outcome.evicted, 1);
        assert_eq!(outcome.inserted, 1);
    }

    #[test]
    fn test_report_expiry() {
        let mut manager = AlertManager::default();
        let now = Utc::now();

        let fresh = report_at(now - Duration::hours(23));
        let stale = report_at(now - Duration::hours(25));
        assert!(manager.add_report(fresh.clone()));
        assert!(manager.add_report(stale));

        manager.evict_expired(now);
        let snapshot = manager.snapshot(now);
        assert_eq!(snapshot.crowd_reports.len(), 1);
        assert_eq!(snapshot.crowd_reports[0].id, fresh.id);
    }

    #[test]
    fn test_duplicate_report_rejected_and_votes() {
        let mut manager = AlertManager::default();
        let report = report_at(Utc::now());
        assert!(manager.add_report(report.clone()));
        assert!(!manager.add_report(report.clone()));

        assert_eq!(manager.vote_report(report.id, true), Some(1));
        assert_eq!(manager.vote_report(report.id, true), Some(2));
        assert_eq!(manager.vote_report(report.id, false), Some(1));
        assert_eq!(manager.vote_report(Uuid::new_v4(), true), None);
    }

    #[test]
    fn test_minor_weather_kept_but_not_pushed() {
        let mut manager = AlertManager::default();
        let now = Utc::now();
        let location = Coordinate::new(37.0, -122.0);

        let drizzle = WeatherAlert::new(WeatherKind::Rain, Severity::Low, "Light drizzle", location, now);
        assert!(manager.add_weather_alert(drizzle).is_none());

        let ice = WeatherAlert::new(WeatherKind::Ice, Severity::High, "Black ice", location, now);
        let notification = manager.add_weather_alert(ice).expect("severe weather is pushed");
        assert_eq!(notification.severity, Severity::High);

        assert_eq!(manager.snapshot(now).weather_alerts.len(), 2);

        manager.evict_expired(now + Duration::minutes(61));
        assert!(manager.snapshot(now + Duration::minutes(61)).weather_alerts.is_empty());
    }

    #[test]
    fn test_route_alert_expiry() {
        let mut manager = AlertManager::default();
        let now = Utc::now();
        manager.add_route_alert(RouteAlert::new(
            RouteAlertKind::Closure,
            "Bridge closed",
            Coordinate::new(37.0, -122.0),
            now - Duration::minutes(30),
        ));

        assert_eq!(manager.snapshot(now).route_alerts.len(), 1);
        assert_eq!(manager.evict_expired(now + Duration::minutes(31)), 1);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_snapshot_serializes() {
        let manager = AlertManager::default();
        let json = serde_json::to_string(&manager.snapshot(Utc::now())).unwrap();
        assert!(json.contains("\"hazards\":[]"));
    }
}
