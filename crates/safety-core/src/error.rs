//! Pipeline error types

use escalation::EscalationError;
use incident_store::StorageError;
use sample_validator::ValidationError;
use thiserror::Error;

/// Safety pipeline errors
#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Escalation error: {0}")]
    Escalation(#[from] EscalationError),

    #[error("Rejected sample: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Logging error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, SafetyError>;
