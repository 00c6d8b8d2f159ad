//! Countdown ticker task

use crate::machine::{EscalationEvent, EscalationPhase, SharedMachine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Wakes the ticker when a countdown opens so its first decrement lands one
/// full period later instead of on the ticker's running phase.
#[derive(Debug, Clone, Default)]
pub struct CountdownSignal(Arc<Notify>);

impl CountdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call after `open()` emitted `CountdownStarted`
    pub fn countdown_started(&self) {
        self.0.notify_one();
    }
}

/// Handle to the running countdown ticker
pub struct CountdownHandle {
    shutdown: Arc<AtomicBool>,
    signal: CountdownSignal,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    /// Ask the ticker to stop
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.signal.0.notify_one();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the ticker and wait for it to exit
    pub async fn stop(self) {
        self.shutdown();
        let _ = self.task.await;
    }
}

/// Spawn the single periodic task that drives the escalation countdown.
///
/// Each tick takes the machine lock for `tick()` and calls `on_events` with
/// the emitted events before releasing it. `cancel()` takes the same lock, so
/// a cancellation that lands first always wins, and callers that handle their
/// own transitions under the lock see one ordered stream. `on_events` must
/// not lock the machine again.
pub fn spawn_countdown<F>(
    machine: SharedMachine,
    period: Duration,
    signal: CountdownSignal,
    mut on_events: F,
) -> CountdownHandle
where
    F: FnMut(Vec<EscalationEvent>) + Send + 'static,
{
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();
    let wake = signal.clone();

    let task = tokio::spawn(async move {
        info!("Countdown ticker started ({:?} period)", period);
        let mut next = Instant::now() + period;
        let mut armed_for = None;

        loop {
            let woken = tokio::select! {
                _ = wake.0.notified() => true,
                _ = tokio::time::sleep_until(next) => false,
            };
            if shutdown_flag.load(Ordering::SeqCst) {
                break;
            }

            let mut machine = machine.lock().unwrap_or_else(|e| e.into_inner());
            let state = machine.state();
            let active = if state.phase == EscalationPhase::CountdownActive {
                state.event.as_ref().map(|e| e.id)
            } else {
                None
            };

            // A countdown opened since the last tick gets a full first period
            if active.is_some() && active != armed_for {
                armed_for = active;
                next = Instant::now() + period;
                debug!("Countdown armed; first tick in {:?}", period);
                continue;
            }
            if woken {
                continue;
            }

            let emitted = machine.tick();
            if !emitted.is_empty() {
                on_events(emitted);
            }
            drop(machine);

            next += period;
            let now = Instant::now();
            if next <= now {
                next = now + period;
            }
        }

        info!("Countdown ticker stopped");
    });

    CountdownHandle {
        shutdown,
        signal,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{EscalationMachine, EscalationPhase};
    use chrono::Utc;
    use crash_estimator::{CrashEvent, StimulusKind};
    use tokio::sync::mpsc;

    fn crash() -> CrashEvent {
        CrashEvent::new(Utc::now(), StimulusKind::SuddenImpact, 5.0, 0.9, None, &[])
    }

    fn start(
        machine: &SharedMachine,
        signal: &CountdownSignal,
    ) -> (CountdownHandle, mpsc::UnboundedReceiver<EscalationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_countdown(machine.clone(), Duration::from_secs(1), signal.clone(), move |events| {
            for event in events {
                let _ = tx.send(event);
            }
        });
        (handle, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<EscalationEvent>) -> Vec<EscalationEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn dispatches(events: &[EscalationEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, EscalationEvent::Dispatched { .. }))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_dispatches_after_countdown() {
        let machine = EscalationMachine::default().into_shared();
        let signal = CountdownSignal::new();
        let (handle, mut rx) = start(&machine, &signal);

        machine.lock().unwrap().open(crash());
        signal.countdown_started();

        tokio::time::sleep(Duration::from_millis(29_500)).await;
        assert_eq!(dispatches(&drain(&mut rx)), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(dispatches(&drain(&mut rx)), 1);
        assert_eq!(machine.lock().unwrap().phase(), EscalationPhase::Dispatched);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_countdown_wins() {
        let machine = EscalationMachine::default().into_shared();
        let signal = CountdownSignal::new();
        let (handle, mut rx) = start(&machine, &signal);

        machine.lock().unwrap().open(crash());
        signal.countdown_started();

        tokio::time::sleep(Duration::from_millis(12_500)).await;
        let cancelled = machine.lock().unwrap().cancel();
        assert_eq!(cancelled.len(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        let events = drain(&mut rx);
        assert_eq!(dispatches(&events), 0);
        assert!(machine.lock().unwrap().is_idle());

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_decrement_waits_full_period() {
        let machine = EscalationMachine::default().into_shared();
        let signal = CountdownSignal::new();
        let (handle, _rx) = start(&machine, &signal);

        // Open between two of the ticker's running ticks
        tokio::time::sleep(Duration::from_millis(600)).await;
        machine.lock().unwrap().open(crash());
        signal.countdown_started();

        // The running phase would have ticked at 1.0 s
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(machine.lock().unwrap().state().remaining_secs, 30);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(machine.lock().unwrap().state().remaining_secs, 29);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_without_signal_still_gets_full_period() {
        let machine = EscalationMachine::default().into_shared();
        let signal = CountdownSignal::new();
        let (handle, _rx) = start(&machine, &signal);

        tokio::time::sleep(Duration::from_millis(900)).await;
        machine.lock().unwrap().open(crash());

        // The tick at 1.0 s arms instead of decrementing
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(machine.lock().unwrap().state().remaining_secs, 30);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_ticker() {
        let machine = EscalationMachine::default().into_shared();
        let signal = CountdownSignal::new();
        let (handle, _rx) = start(&machine, &signal);

        handle.shutdown();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(handle.is_finished());
    }
}
