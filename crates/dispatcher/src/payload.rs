//! Emergency payload

use chrono::{DateTime, Utc};
use crash_estimator::StimulusKind;
use serde::{Deserialize, Serialize};
use signal_buffer::Coordinate;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiderProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Default for RiderProfile {
    fn default() -> Self {
        Self {
            id: "unknown".to_string(),
            name: "Rider".to_string(),
            phone: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub relationship: Option<String>,
}

/// In Case of Emergency medical bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicalInfo {
    pub blood_type: Option<String>,
    pub allergies: Vec<String>,
    pub medications: Vec<String>,
    pub conditions: Vec<String>,
    pub notes: Option<String>,
}

impl MedicalInfo {
    pub fn is_empty(&self) -> bool {
        self.blood_type.is_none()
            && self.allergies.is_empty()
            && self.medications.is_empty()
            && self.conditions.is_empty()
            && self.notes.is_none()
    }

    /// One-line summary for message bodies
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(blood_type) = &self.blood_type {
            parts.push(format!("blood type {}", blood_type));
        }
        if !self.allergies.is_empty() {
            parts.push(format!("allergies: {}", self.allergies.join(", ")));
        }
        if !self.medications.is_empty() {
            parts.push(format!("medications: {}", self.medications.join(", ")));
        }
        if !self.conditions.is_empty() {
            parts.push(format!("conditions: {}", self.conditions.join(", ")));
        }
        if let Some(notes) = &self.notes {
            parts.push(format!("notes: {}", notes));
        }
        parts.join("; ")
    }
}

/// Structured emergency message handed to notification/calling/reporting sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchPayload {
    pub event_id: Uuid,
    pub stimulus: StimulusKind,
    pub probability: f64,
    pub timestamp: DateTime<Utc>,
    pub location: Option<Coordinate>,
    pub rider: RiderProfile,
    pub primary_contact: Option<EmergencyContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical: Option<MedicalInfo>,
    /// Human-readable text for SMS/voice collaborators
    pub message: String,
}

impl DispatchPayload {
    pub(crate) fn compose_message(&self, map_link_base: &str) -> String {
        let mut message = match self.stimulus {
            StimulusKind::Manual => format!(
                "EMERGENCY: {} triggered an emergency alert at {}.",
                self.rider.name,
                self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            stimulus => format!(
                "EMERGENCY: {} may have been in a motorcycle crash. Detected {} ({:.0}% confidence) at {}.",
                self.rider.name,
                stimulus.label(),
                self.probability * 100.0,
                self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            ),
        };

        match &self.location {
            Some(c) => message.push_str(&format!(
                " Location: {:.6}, {:.6} ({}{:.6},{:.6}).",
                c.latitude, c.longitude, map_link_base, c.latitude, c.longitude
            )),
            None => message.push_str(" Location unavailable."),
        }

        if let Some(medical) = self.medical.as_ref().filter(|m| !m.is_empty()) {
            message.push_str(&format!(" Medical: {}.", medical.summary()));
        }

        message
    }
}
