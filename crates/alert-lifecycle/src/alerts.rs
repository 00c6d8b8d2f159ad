//! Weather and route alerts supplied by external collaborators

use chrono::{DateTime, Utc};
use hazard_analyzer::Severity;
use serde::{Deserialize, Serialize};
use signal_buffer::Coordinate;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherKind {
    Rain,
    Snow,
    Ice,
    Fog,
    Wind,
    Storm,
    Heat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub id: Uuid,
    pub kind: WeatherKind,
    pub severity: Severity,
    pub description: String,
    pub location: Coordinate,
    pub issued_at: DateTime<Utc>,
}

impl WeatherAlert {
    pub fn new(
        kind: WeatherKind,
        severity: Severity,
        description: impl Into<String>,
        location: Coordinate,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            description: description.into(),
            location,
            issued_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAlertKind {
    Closure,
    Construction,
    Traffic,
    Detour,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAlert {
    pub id: Uuid,
    pub kind: RouteAlertKind,
    pub description: String,
    pub location: Coordinate,
    pub issued_at: DateTime<Utc>,
}

impl RouteAlert {
    pub fn new(
        kind: RouteAlertKind,
        description: impl Into<String>,
        location: Coordinate,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            description: description.into(),
            location,
            issued_at,
        }
    }
}
