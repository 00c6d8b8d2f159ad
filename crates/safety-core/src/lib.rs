//! Rider Safety Core
//!
//! Wires the signal buffer, crash estimator, escalation machine, hazard
//! analyzer, alert manager, dispatcher and incident log into one pipeline,
//! and runs the periodic tasks that drive it.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod tasks;

pub use config::{BufferConfig, IncidentConfig, LoggingConfig, SafetyConfig, TaskConfig};
pub use error::{Result, SafetyError};
pub use pipeline::SafetyPipeline;
pub use tasks::{spawn_tasks, PipelineTasks};

use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = Level::from_str(&config.level)
        .map_err(|_| SafetyError::InvalidConfig(format!("unknown log level {}", config.level)))?;

    let installed = if config.json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    installed.map_err(|e| SafetyError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_level_rejected() {
        let config = LoggingConfig {
            level: "chatty".to_string(),
            json: false,
        };
        assert!(matches!(init_logging(&config), Err(SafetyError::InvalidConfig(_))));
    }
}
