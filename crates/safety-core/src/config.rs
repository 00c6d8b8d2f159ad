//! Layered configuration (defaults, optional file, environment)

use crate::error::{Result, SafetyError};
use alert_lifecycle::AlertConfig;
use crash_estimator::EstimatorConfig;
use dispatcher::DispatcherConfig;
use escalation::EscalationConfig;
use hazard_analyzer::HazardConfig;
use sample_validator::ValidationConfig;
use serde::{Deserialize, Serialize};
use signal_buffer::DEFAULT_CAPACITY;
use tracing::info;

/// Environment variable prefix, e.g. `RIDER_SAFETY__ESCALATION__COUNTDOWN_SECS=40`
pub const ENV_PREFIX: &str = "RIDER_SAFETY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Samples kept per stream
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentConfig {
    /// Incidents retained before the oldest is dropped
    pub max_records: usize,
}

impl Default for IncidentConfig {
    fn default() -> Self {
        Self { max_records: 1000 }
    }
}

/// Periodic task settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Hazard analysis period (seconds)
    pub hazard_interval_secs: u64,
    /// Capacity of the countdown event queue and broadcast channels
    pub event_channel_capacity: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            hazard_interval_secs: 5,
            event_channel_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub buffer: BufferConfig,
    pub validation: ValidationConfig,
    pub estimator: EstimatorConfig,
    pub escalation: EscalationConfig,
    pub hazard: HazardConfig,
    pub alerts: AlertConfig,
    pub dispatcher: DispatcherConfig,
    pub incidents: IncidentConfig,
    pub tasks: TaskConfig,
    pub logging: LoggingConfig,
}

impl SafetyConfig {
    /// Load defaults, then `path` (if given and present), then environment overrides
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            info!("Loading configuration from {}", path);
            builder = builder.add_source(::config::File::with_name(path).required(false));
        }
        let loaded: SafetyConfig = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        self.escalation.validate()?;
        if self.buffer.capacity == 0 {
            return Err(SafetyError::InvalidConfig("buffer.capacity must be positive".into()));
        }
        if self.incidents.max_records == 0 {
            return Err(SafetyError::InvalidConfig(
                "incidents.max_records must be positive".into(),
            ));
        }
        if self.tasks.hazard_interval_secs == 0 {
            return Err(SafetyError::InvalidConfig(
                "tasks.hazard_interval_secs must be positive".into(),
            ));
        }
        if self.escalation.tick_interval_ms == 0 {
            return Err(SafetyError::InvalidConfig(
                "escalation.tick_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}
