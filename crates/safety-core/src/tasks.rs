//! Periodic tasks: countdown ticker and hazard analysis

use crate::pipeline::SafetyPipeline;
use chrono::Utc;
use escalation::{spawn_countdown, CountdownHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Running pipeline tasks
pub struct PipelineTasks {
    shutdown: Arc<AtomicBool>,
    countdown: CountdownHandle,
    hazards: JoinHandle<()>,
}

impl PipelineTasks {
    /// Stop every task and wait for them to exit
    pub async fn stop(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.countdown.stop().await;
        self.hazards.abort();
        let _ = self.hazards.await;
        info!("Pipeline tasks stopped");
    }
}

/// Spawn the countdown ticker and the hazard analysis ticker.
///
/// The countdown ticker hands each transition to the pipeline while it still
/// holds the machine lock, the same way rider commands do, so escalation
/// events reach the incident log and subscribers in machine order.
pub fn spawn_tasks(pipeline: Arc<SafetyPipeline>) -> PipelineTasks {
    let config = pipeline.config().clone();
    let shutdown = Arc::new(AtomicBool::new(false));

    let ticker_pipeline = pipeline.clone();
    let countdown = spawn_countdown(
        pipeline.machine(),
        Duration::from_millis(config.escalation.tick_interval_ms),
        pipeline.countdown_signal(),
        move |events| {
            debug!("Countdown emitted {} event(s)", events.len());
            ticker_pipeline.handle_events(events);
        },
    );

    let hazard_shutdown = shutdown.clone();
    let period = Duration::from_secs(config.tasks.hazard_interval_secs);
    let hazards = tokio::spawn(async move {
        info!("Hazard analysis started ({:?} period)", period);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        while !hazard_shutdown.load(Ordering::SeqCst) {
            interval.tick().await;
            pipeline.run_hazard_tick(Utc::now());
        }
    });

    PipelineTasks {
        shutdown,
        countdown,
        hazards,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SafetyConfig;
    use dispatcher::ChannelSink;
    use escalation::{EscalationEvent, EscalationPhase};
    use signal_buffer::{Coordinate, LocationFix, MotionSample, Vector3};

    fn crash_sample() -> MotionSample {
        MotionSample::new(0, Vector3::new(6.0, 0.0, 0.0), Vector3::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ends_in_single_dispatch() {
        let (sink, mut payloads) = ChannelSink::channel("sms", 4);
        let pipeline =
            Arc::new(SafetyPipeline::new(SafetyConfig::default(), vec![Arc::new(sink)], None).unwrap());
        let mut events = pipeline.subscribe();
        let tasks = spawn_tasks(pipeline.clone());

        pipeline
            .ingest_location(LocationFix::new(0, Coordinate::new(37.77, -122.42), 20.0))
            .unwrap();
        let crash = pipeline.ingest_motion(crash_sample()).unwrap().unwrap();

        let payload = payloads.recv().await.unwrap();
        assert_eq!(payload.event_id, crash.id);
        assert_eq!(pipeline.escalation_state().phase, EscalationPhase::Dispatched);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(payloads.try_recv().is_err());

        let mut dispatched = 0;
        let mut cues = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                EscalationEvent::Dispatched { .. } => dispatched += 1,
                EscalationEvent::Cue { .. } => cues += 1,
                _ => {}
            }
        }
        assert_eq!(dispatched, 1);
        // 25, 20, 15, then every second from 10 down to 1
        assert_eq!(cues, 13);

        tasks.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_countdown_prevents_dispatch() {
        let (sink, mut payloads) = ChannelSink::channel("sms", 4);
        let pipeline =
            Arc::new(SafetyPipeline::new(SafetyConfig::default(), vec![Arc::new(sink)], None).unwrap());
        let tasks = spawn_tasks(pipeline.clone());

        assert!(pipeline.ingest_motion(crash_sample()).unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(12_500)).await;
        assert_eq!(pipeline.escalation_state().remaining_secs, 18);

        assert!(pipeline.cancel());
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(payloads.try_recv().is_err());
        assert_eq!(pipeline.escalation_state().phase, EscalationPhase::Idle);
        assert_eq!(pipeline.incidents().false_positives().unwrap().len(), 1);

        tasks.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_countdown_events_after_cancel() {
        let (sink, _payloads) = ChannelSink::channel("sms", 4);
        let pipeline =
            Arc::new(SafetyPipeline::new(SafetyConfig::default(), vec![Arc::new(sink)], None).unwrap());
        let mut events = pipeline.subscribe();
        let tasks = spawn_tasks(pipeline.clone());

        // Land the crash between two ticks of the running ticker
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(pipeline.ingest_motion(crash_sample()).unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(12_500)).await;
        assert!(pipeline.cancel());
        tokio::time::sleep(Duration::from_secs(5)).await;

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert!(matches!(received.first(), Some(EscalationEvent::CountdownStarted { .. })));
        let cancelled_at = received
            .iter()
            .position(|e| matches!(e, EscalationEvent::Cancelled { .. }))
            .unwrap();
        assert_eq!(cancelled_at, received.len() - 1);

        let remaining: Vec<u32> = received
            .iter()
            .filter_map(|e| match e {
                EscalationEvent::Tick { remaining } => Some(*remaining),
                _ => None,
            })
            .collect();
        assert_eq!(remaining, (18..30).rev().collect::<Vec<u32>>());

        tasks.stop().await;
    }
}
