//! Incident Store
//!
//! Keeps every crash event that opened a countdown, labelled with how the
//! cycle ended, so false positives can be replayed and used for tuning.

mod log;

pub use log::{FalsePositiveEntry, IncidentLog, IncidentOutcome, IncidentRecord};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Lock error: {0}")]
    Lock(String),
    #[error("Record not found")]
    NotFound,
    #[error("Serialization error: {0}")]
    Serialization(#[from] postcard::Error),
}
