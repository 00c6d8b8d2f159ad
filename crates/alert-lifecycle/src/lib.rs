//! Alert Lifecycle
//!
//! Owns the active alert set: inserts hazards subject to the duplicate rule,
//! expires hazards, crowd reports, weather and route alerts, and decides
//! which alerts are worth a push notification.

mod alerts;
mod manager;

pub use alerts::{RouteAlert, RouteAlertKind, WeatherAlert, WeatherKind};
pub use manager::{ActiveAlertSet, AlertConfig, AlertManager, AlertNotification, TickOutcome};
