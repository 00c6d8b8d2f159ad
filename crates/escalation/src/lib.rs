//! Emergency Escalation
//!
//! Turns a crash event into a cancellable countdown that ends either in a
//! rider cancellation (logged false positive) or a single dispatch.
//!
//! - [`EscalationMachine`]: pure state machine, returns the events each
//!   transition emits
//! - [`spawn_countdown`]: the one periodic task that drives the countdown

mod machine;
mod timer;

pub use machine::{
    EscalationConfig, EscalationEvent, EscalationMachine, EscalationPhase, EscalationState,
    SharedMachine,
};
pub use timer::{spawn_countdown, CountdownHandle, CountdownSignal};

use thiserror::Error;

/// Escalation error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EscalationError {
    #[error("Countdown of {0}s is outside the allowed 30-45s window")]
    InvalidCountdown(u32),

    #[error("Cue interval must be non-zero")]
    InvalidCueInterval,
}
