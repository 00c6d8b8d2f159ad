//! Emergency dispatcher

use crate::payload::{DispatchPayload, EmergencyContact, RiderProfile};
use crate::sink::{DispatchSink, MedicalInfoProvider};
use crate::DispatchError;
use crash_estimator::CrashEvent;
use serde::{Deserialize, Serialize};
use signal_buffer::LocationFix;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub rider: RiderProfile,
    pub primary_contact: Option<EmergencyContact>,
    /// Prefix for the map link appended to messages
    pub map_link_base: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            rider: RiderProfile::default(),
            primary_contact: None,
            map_link_base: "https://maps.google.com/?q=".to_string(),
        }
    }
}

/// Outcome of one dispatch
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub payload: DispatchPayload,
    /// Sinks that accepted the payload
    pub delivered: Vec<String>,
    /// Sinks that refused it; not retried here
    pub failed: Vec<DispatchError>,
}

/// Formats and hands off emergency payloads
pub struct EmergencyDispatcher {
    config: DispatcherConfig,
    sinks: Vec<Arc<dyn DispatchSink>>,
    medical: Option<Arc<dyn MedicalInfoProvider>>,
}

impl EmergencyDispatcher {
    pub fn new(
        config: DispatcherConfig,
        sinks: Vec<Arc<dyn DispatchSink>>,
        medical: Option<Arc<dyn MedicalInfoProvider>>,
    ) -> Self {
        info!("Emergency dispatcher ready with {} sink(s)", sinks.len());
        if config.primary_contact.is_none() {
            warn!("No primary emergency contact configured");
        }
        Self {
            config,
            sinks,
            medical,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Build the payload for `event`. Prefers the rider's current location
    /// over the one recorded at detection time.
    pub fn build_payload(
        &self,
        event: &CrashEvent,
        current_location: Option<&LocationFix>,
    ) -> DispatchPayload {
        let location = current_location
            .or(event.location.as_ref())
            .map(|fix| fix.coordinate);
        let medical = self
            .medical
            .as_ref()
            .and_then(|provider| provider.medical_info());

        let mut payload = DispatchPayload {
            event_id: event.id,
            stimulus: event.stimulus,
            probability: event.probability,
            timestamp: event.timestamp,
            location,
            rider: self.config.rider.clone(),
            primary_contact: self.config.primary_contact.clone(),
            medical,
            message: String::new(),
        };
        payload.message = payload.compose_message(&self.config.map_link_base);
        payload
    }

    /// Hand the event to every sink. Never waits for delivery, never retries.
    pub fn dispatch(
        &self,
        event: &CrashEvent,
        current_location: Option<&LocationFix>,
    ) -> DispatchReport {
        let payload = self.build_payload(event, current_location);
        let mut delivered = Vec::new();
        let mut failed = Vec::new();

        for sink in &self.sinks {
            match sink.deliver(&payload) {
                Ok(()) => delivered.push(sink.name().to_string()),
                Err(e) => {
                    error!("Dispatch hand-off to {} failed: {}", sink.name(), e);
                    metrics::counter!("safety_dispatch_failures_total").increment(1);
                    failed.push(e);
                }
            }
        }

        metrics::counter!("safety_dispatch_total").increment(1);
        info!(
            "Emergency {} dispatched to {}/{} sink(s)",
            event.id,
            delivered.len(),
            self.sinks.len()
        );

        DispatchReport {
            payload,
            delivered,
            failed,
        }
    }
}
