//! Escalation Dispatcher
//!
//! Boundary between the escalation machine and the outside world. Builds the
//! emergency payload (stimulus, probability, location, rider, contact,
//! optional medical/ICE data) and hands it to every registered sink without
//! waiting for delivery. Retries and transport belong to the sinks.

mod dispatcher;
mod payload;
mod sink;

pub use dispatcher::{DispatchReport, DispatcherConfig, EmergencyDispatcher};
pub use payload::{DispatchPayload, EmergencyContact, MedicalInfo, RiderProfile};
pub use sink::{ChannelSink, DispatchSink, MedicalInfoProvider, StaticMedicalInfo};

use thiserror::Error;

/// Dispatch hand-off errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Sink {0} is full")]
    SinkFull(String),

    #[error("Sink {0} is closed")]
    SinkClosed(String),

    #[error("Sink {sink} rejected payload: {reason}")]
    Rejected { sink: String, reason: String },
}
