//! Safety pipeline: ingestion, escalation, hazard analysis, and dispatch

use crate::config::SafetyConfig;
use crate::error::Result;
use alert_lifecycle::{
    ActiveAlertSet, AlertManager, AlertNotification, RouteAlert, TickOutcome, WeatherAlert,
};
use chrono::{DateTime, Utc};
use crash_estimator::{CrashEstimator, CrashEvent};
use dispatcher::{DispatchReport, DispatchSink, EmergencyDispatcher, MedicalInfoProvider};
use escalation::{
    CountdownSignal, EscalationEvent, EscalationMachine, EscalationState, SharedMachine,
};
use hazard_analyzer::{CrowdSourcedReport, HazardAnalyzer};
use incident_store::IncidentLog;
use sample_validator::Validator;
use signal_buffer::{LocationFix, MotionSample, SignalBuffer};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// The rider safety core.
///
/// Ingestion and rider commands are synchronous and never wait on I/O; the
/// periodic tasks in [`crate::tasks`] drive the countdown and hazard analysis.
pub struct SafetyPipeline {
    config: SafetyConfig,
    buffer: SignalBuffer,
    validator: Validator,
    estimator: Mutex<CrashEstimator>,
    machine: SharedMachine,
    countdown_signal: CountdownSignal,
    analyzer: HazardAnalyzer,
    alerts: Mutex<AlertManager>,
    dispatcher: EmergencyDispatcher,
    incidents: IncidentLog,
    events: broadcast::Sender<EscalationEvent>,
    notifications: broadcast::Sender<AlertNotification>,
}

impl SafetyPipeline {
    pub fn new(
        config: SafetyConfig,
        sinks: Vec<Arc<dyn DispatchSink>>,
        medical: Option<Arc<dyn MedicalInfoProvider>>,
    ) -> Result<Self> {
        config.validate()?;
        info!("Creating safety pipeline");

        let machine = EscalationMachine::new(config.escalation.clone())?.into_shared();
        let (events, _) = broadcast::channel(config.tasks.event_channel_capacity.max(1));
        let (notifications, _) = broadcast::channel(config.tasks.event_channel_capacity.max(1));

        Ok(Self {
            buffer: SignalBuffer::new(config.buffer.capacity),
            validator: Validator::new(config.validation.clone()),
            estimator: Mutex::new(CrashEstimator::new(config.estimator.clone())),
            machine,
            countdown_signal: CountdownSignal::new(),
            analyzer: HazardAnalyzer::new(config.hazard.clone()),
            alerts: Mutex::new(AlertManager::new(config.alerts.clone())),
            dispatcher: EmergencyDispatcher::new(config.dispatcher.clone(), sinks, medical),
            incidents: IncidentLog::new(config.incidents.max_records),
            events,
            notifications,
            config,
        })
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// Shared machine handle for the countdown ticker
    pub fn machine(&self) -> SharedMachine {
        self.machine.clone()
    }

    /// Raised whenever a countdown opens, so the ticker restarts its period
    pub fn countdown_signal(&self) -> CountdownSignal {
        self.countdown_signal.clone()
    }

    pub fn buffer(&self) -> &SignalBuffer {
        &self.buffer
    }

    pub fn incidents(&self) -> &IncidentLog {
        &self.incidents
    }

    /// Escalation events (countdown, cues, cancellation, dispatch) for UI collaborators
    pub fn subscribe(&self) -> broadcast::Receiver<EscalationEvent> {
        self.events.subscribe()
    }

    /// Push notification requests for new hazards and alerts
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<AlertNotification> {
        self.notifications.subscribe()
    }

    /// Validate, buffer and score one motion sample.
    ///
    /// Returns the crash event when the sample opened a countdown.
    pub fn ingest_motion(&self, sample: MotionSample) -> Result<Option<CrashEvent>> {
        if let Err(e) = self.validator.validate_motion(&sample) {
            debug!("Rejected motion sample at {}: {}", sample.timestamp_ms, e);
            metrics::counter!("safety_samples_rejected_total", "stream" => "motion").increment(1);
            return Err(e.into());
        }

        self.buffer.push_motion(sample);

        // Lock order: machine, then estimator
        let mut machine = lock(&self.machine);
        let mut estimator = lock(&self.estimator);
        if !machine.is_idle() {
            estimator.observe(&sample);
            return Ok(None);
        }

        let history = self.buffer.motion_snapshot(self.buffer.motion().capacity());
        let location = self.buffer.latest_location();
        let detected = estimator.evaluate(&sample, &history, location.as_ref());
        drop(estimator);
        let Some(event) = detected else {
            return Ok(None);
        };

        let emitted = machine.open(event.clone());
        if emitted.is_empty() {
            debug!("Escalation already in progress; crash event {} not opened", event.id);
            return Ok(None);
        }
        self.handle_events(emitted);
        Ok(Some(event))
    }

    /// Validate and buffer one location fix
    pub fn ingest_location(&self, fix: LocationFix) -> Result<()> {
        if let Err(e) = self.validator.validate_location(&fix) {
            debug!("Rejected location fix at {}: {}", fix.timestamp_ms, e);
            metrics::counter!("safety_samples_rejected_total", "stream" => "location")
                .increment(1);
            return Err(e.into());
        }
        self.buffer.push_location(fix);
        Ok(())
    }

    /// Rider confirms they are safe. Returns whether a countdown was cancelled.
    pub fn cancel(&self) -> bool {
        let mut machine = lock(&self.machine);
        let emitted = machine.cancel();
        let cancelled = !emitted.is_empty();
        self.handle_events(emitted);
        drop(machine);
        cancelled
    }

    /// Emergency button. Returns whether a countdown was started.
    pub fn trigger_manual(&self) -> bool {
        let samples = self.buffer.motion_snapshot(crash_estimator::SNAPSHOT_LEN);
        let location = self.buffer.latest_location();
        let mut machine = lock(&self.machine);
        let emitted = machine.trigger_manual(location, &samples);
        let started = !emitted.is_empty();
        self.handle_events(emitted);
        drop(machine);
        started
    }

    /// Operator reset after a dispatch. Returns whether the machine went back to idle.
    pub fn reset(&self) -> bool {
        let mut machine = lock(&self.machine);
        let emitted = machine.reset();
        let reset = !emitted.is_empty();
        self.handle_events(emitted);
        drop(machine);
        reset
    }

    pub fn escalation_state(&self) -> EscalationState {
        lock(&self.machine).state().clone()
    }

    /// Analyze recent fixes, promote nearby crowd reports, and update the alert set
    pub fn run_hazard_tick(&self, now: DateTime<Utc>) -> TickOutcome {
        let fixes = self.buffer.location_snapshot(self.buffer.location().capacity());
        let mut candidates = self.analyzer.analyze(&fixes, now);

        let mut alerts = lock(&self.alerts);
        if let Some(rider) = fixes.last() {
            candidates.extend(self.analyzer.promote_reports(
                alerts.reports(),
                &rider.coordinate,
                alerts.hazards(),
                now,
            ));
        }
        let outcome = alerts.tick(now, candidates);
        drop(alerts);

        if outcome.inserted > 0 || outcome.evicted > 0 {
            debug!(
                "Hazard tick: {} inserted, {} duplicate, {} evicted",
                outcome.inserted, outcome.duplicates, outcome.evicted
            );
        }
        for notification in &outcome.notifications {
            self.notify(notification.clone());
        }
        outcome
    }

    pub fn add_report(&self, report: CrowdSourcedReport) -> bool {
        lock(&self.alerts).add_report(report)
    }

    pub fn vote_report(&self, id: Uuid, up: bool) -> Option<i32> {
        lock(&self.alerts).vote_report(id, up)
    }

    pub fn add_weather_alert(&self, alert: WeatherAlert) -> Option<AlertNotification> {
        let notification = lock(&self.alerts).add_weather_alert(alert);
        if let Some(notification) = &notification {
            self.notify(notification.clone());
        }
        notification
    }

    pub fn add_route_alert(&self, alert: RouteAlert) -> AlertNotification {
        let notification = lock(&self.alerts).add_route_alert(alert);
        self.notify(notification.clone());
        notification
    }

    pub fn alerts_snapshot(&self, now: DateTime<Utc>) -> ActiveAlertSet {
        lock(&self.alerts).snapshot(now)
    }

    /// React to a machine transition, then re-broadcast it.
    ///
    /// Call with the machine lock held, in the order the machine emitted the
    /// events, so the incident log and subscribers never see a transition
    /// ahead of the one that preceded it. Never locks the machine itself.
    pub fn handle_event(&self, event: EscalationEvent) -> Option<DispatchReport> {
        let mut report = None;
        match &event {
            EscalationEvent::CountdownStarted { event: crash, .. } => {
                if let Err(e) = self.incidents.record(crash.clone()) {
                    warn!("Failed to record incident {}: {}", crash.id, e);
                }
                self.countdown_signal.countdown_started();
            }
            EscalationEvent::Cancelled { event: crash } => {
                if let Err(e) = self.incidents.mark_false_positive(crash.id) {
                    warn!("Failed to label incident {}: {}", crash.id, e);
                }
                lock(&self.estimator).reset();
            }
            EscalationEvent::Dispatched { event: crash } => {
                let current = self.buffer.latest_location();
                report = Some(self.dispatcher.dispatch(crash, current.as_ref()));
                if let Err(e) = self.incidents.mark_dispatched(crash.id) {
                    warn!("Failed to label incident {}: {}", crash.id, e);
                }
            }
            EscalationEvent::Reset => lock(&self.estimator).reset(),
            EscalationEvent::Tick { .. } | EscalationEvent::Cue { .. } => {}
        }

        // No subscribers is not an error
        let _ = self.events.send(event);
        report
    }

    /// [`Self::handle_event`] for each event, under the same locking rule
    pub fn handle_events(&self, events: Vec<EscalationEvent>) {
        for event in events {
            self.handle_event(event);
        }
    }

    fn notify(&self, notification: AlertNotification) {
        let _ = self.notifications.send(notification);
    }
}
