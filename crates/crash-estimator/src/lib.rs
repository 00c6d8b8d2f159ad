//! Crash Probability Estimator
//!
//! Classifies each incoming motion sample into crash stimuli (impact,
//! deceleration, rotation), scores them with contextual bonuses from the
//! live location feed, and opens a [`CrashEvent`] when the score crosses
//! the trigger threshold.

mod estimator;
mod event;
mod statistics;

pub use estimator::{Assessment, CrashEstimator, EstimatorConfig, StimulusReading};
pub use event::{timestamp_from_millis, CrashEvent, StimulusKind, SNAPSHOT_LEN};
pub use statistics::std_dev;
