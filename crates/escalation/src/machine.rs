//! Escalation state machine

use crate::EscalationError;
use chrono::Utc;
use crash_estimator::CrashEvent;
use serde::{Deserialize, Serialize};
use signal_buffer::{LocationFix, MotionSample};
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Allowed countdown durations (seconds)
pub const COUNTDOWN_RANGE: RangeInclusive<u32> = 30..=45;

/// Machine shared between the countdown ticker and rider-facing callers
pub type SharedMachine = Arc<Mutex<EscalationMachine>>;

/// Escalation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Countdown length before dispatch (30-45 seconds)
    pub countdown_secs: u32,
    /// Advisory cue period (seconds)
    pub cue_interval_secs: u32,
    /// Cue on every tick once remaining time is at or below this
    pub final_cue_secs: u32,
    /// Ticker period (milliseconds)
    pub tick_interval_ms: u64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            countdown_secs: 30,
            cue_interval_secs: 5,
            final_cue_secs: 10,
            tick_interval_ms: 1000,
        }
    }
}

impl EscalationConfig {
    pub fn validate(&self) -> Result<(), EscalationError> {
        if !COUNTDOWN_RANGE.contains(&self.countdown_secs) {
            return Err(EscalationError::InvalidCountdown(self.countdown_secs));
        }
        if self.cue_interval_secs == 0 {
            return Err(EscalationError::InvalidCueInterval);
        }
        Ok(())
    }
}

/// Escalation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationPhase {
    #[default]
    Idle,
    CountdownActive,
    /// Transient: reported in events, the machine returns to Idle at once
    Cancelled,
    Dispatched,
}

/// Per-session escalation state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EscalationState {
    pub phase: EscalationPhase,
    pub remaining_secs: u32,
    pub event: Option<CrashEvent>,
}

/// Events emitted by transitions, for UI countdown display and dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EscalationEvent {
    CountdownStarted { event: CrashEvent, seconds: u32 },
    Tick { remaining: u32 },
    /// Audible/haptic prompt to cancel
    Cue { remaining: u32 },
    /// Rider confirmed safety; the event is a false positive
    Cancelled { event: CrashEvent },
    /// Countdown exhausted; hand the event to the dispatcher
    Dispatched { event: CrashEvent },
    Reset,
}

/// Emergency escalation state machine
#[derive(Debug)]
pub struct EscalationMachine {
    config: EscalationConfig,
    state: EscalationState,
}

impl EscalationMachine {
    pub fn new(config: EscalationConfig) -> Result<Self, EscalationError> {
        config.validate()?;
        info!("Creating escalation machine with {}s countdown", config.countdown_secs);
        Ok(Self {
            config,
            state: EscalationState::default(),
        })
    }

    /// Wrap in the shared handle used by the ticker
    pub fn into_shared(self) -> SharedMachine {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    pub fn state(&self) -> &EscalationState {
        &self.state
    }

    pub fn phase(&self) -> EscalationPhase {
        self.state.phase
    }

    pub fn is_idle(&self) -> bool {
        self.state.phase == EscalationPhase::Idle
    }

    /// Start a countdown for `event`. Ignored unless Idle.
    pub fn open(&mut self, event: CrashEvent) -> Vec<EscalationEvent> {
        if !self.is_idle() {
            debug!(
                "Ignoring crash event {} while {:?}",
                event.id, self.state.phase
            );
            return Vec::new();
        }

        let seconds = self.config.countdown_secs;
        warn!(
            "Crash suspected ({}, probability {:.2}); countdown {}s",
            event.stimulus.as_str(),
            event.probability,
            seconds
        );
        self.state = EscalationState {
            phase: EscalationPhase::CountdownActive,
            remaining_secs: seconds,
            event: Some(event.clone()),
        };

        vec![EscalationEvent::CountdownStarted { event, seconds }]
    }

    /// Rider/operator emergency button; same countdown path as a detection
    pub fn trigger_manual(
        &mut self,
        location: Option<LocationFix>,
        samples: &[MotionSample],
    ) -> Vec<EscalationEvent> {
        info!("Manual emergency trigger");
        self.open(CrashEvent::manual(Utc::now(), location, samples))
    }

    /// One-second tick. Only meaningful while the countdown is active.
    pub fn tick(&mut self) -> Vec<EscalationEvent> {
        if self.state.phase != EscalationPhase::CountdownActive {
            return Vec::new();
        }

        self.state.remaining_secs = self.state.remaining_secs.saturating_sub(1);
        let remaining = self.state.remaining_secs;
        let mut events = vec![EscalationEvent::Tick { remaining }];

        if remaining > 0 {
            if remaining % self.config.cue_interval_secs == 0 || remaining <= self.config.final_cue_secs {
                events.push(EscalationEvent::Cue { remaining });
            }
            return events;
        }

        self.state.phase = EscalationPhase::Dispatched;
        if let Some(event) = self.state.event.clone() {
            warn!("Countdown expired; dispatching emergency for {}", event.id);
            events.push(EscalationEvent::Dispatched { event });
        }
        events
    }

    /// Rider confirms safety. Ignored unless the countdown is active.
    pub fn cancel(&mut self) -> Vec<EscalationEvent> {
        if self.state.phase != EscalationPhase::CountdownActive {
            debug!("Cancel ignored while {:?}", self.state.phase);
            return Vec::new();
        }

        let event = self.state.event.take();
        info!(
            "Countdown cancelled with {}s remaining",
            self.state.remaining_secs
        );
        self.state = EscalationState::default();

        event
            .map(|event| vec![EscalationEvent::Cancelled { event }])
            .unwrap_or_default()
    }

    /// Return from Dispatched to Idle. Ignored in any other phase.
    pub fn reset(&mut self) -> Vec<EscalationEvent> {
        if self.state.phase != EscalationPhase::Dispatched {
            debug!("Reset ignored while {:?}", self.state.phase);
            return Vec::new();
        }

        info!("Escalation reset to idle");
        self.state = EscalationState::default();
        vec![EscalationEvent::Reset]
    }
}

impl Default for EscalationMachine {
    fn default() -> Self {
        Self {
            config: EscalationConfig::default(),
            state: EscalationState::default(),
        }
    }
}
