//! Collaborator seams: payload sinks and the medical-info provider

use crate::payload::{DispatchPayload, MedicalInfo};
use crate::DispatchError;
use tokio::sync::mpsc;

/// Receiver of emergency payloads (notifications, calling, incident reporting).
///
/// `deliver` must not block; the dispatcher does not wait for acknowledgement.
pub trait DispatchSink: Send + Sync {
    fn name(&self) -> &str;

    fn deliver(&self, payload: &DispatchPayload) -> Result<(), DispatchError>;
}

/// Source of the rider's ICE bundle, queried at dispatch time
pub trait MedicalInfoProvider: Send + Sync {
    fn medical_info(&self) -> Option<MedicalInfo>;
}

/// Fixed medical info (e.g. loaded from the rider's profile at startup)
#[derive(Debug, Clone, Default)]
pub struct StaticMedicalInfo(pub Option<MedicalInfo>);

impl MedicalInfoProvider for StaticMedicalInfo {
    fn medical_info(&self) -> Option<MedicalInfo> {
        self.0.clone()
    }
}

/// Sink that forwards payloads on a tokio channel to an async collaborator
pub struct ChannelSink {
    name: String,
    sender: mpsc::Sender<DispatchPayload>,
}

impl ChannelSink {
    pub fn new(name: impl Into<String>, sender: mpsc::Sender<DispatchPayload>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }

    /// Create a sink and the receiver its collaborator reads from
    pub fn channel(
        name: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<DispatchPayload>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(name, tx), rx)
    }
}

impl DispatchSink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, payload: &DispatchPayload) -> Result<(), DispatchError> {
        self.sender.try_send(payload.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::SinkFull(self.name.clone()),
            mpsc::error::TrySendError::Closed(_) => DispatchError::SinkClosed(self.name.clone()),
        })
    }
}
