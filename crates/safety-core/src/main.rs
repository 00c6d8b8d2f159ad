//! Rider Safety - feed replay entry point
//!
//! Replays a JSON-lines sensor feed through the safety pipeline and prints
//! escalation events and dispatch payloads as JSON lines on stdout.

use anyhow::{Context, Result};
use clap::Parser;
use dispatcher::ChannelSink;
use escalation::EscalationPhase;
use safety_core::{init_logging, spawn_tasks, SafetyConfig, SafetyPipeline};
use serde::Deserialize;
use signal_buffer::{LocationFix, MotionSample};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "rider-safety", version, about = "Replay a rider sensor feed through the safety core")]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON-lines feed of tagged motion/location records
    #[arg(short, long)]
    feed: PathBuf,

    /// Pace the replay by record timestamps
    #[arg(long)]
    realtime: bool,
}

/// One line of the replay feed
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum FeedRecord {
    Motion(MotionSample),
    Location(LocationFix),
    /// Rider pressed "I'm OK"
    Cancel { timestamp_ms: u64 },
}

impl FeedRecord {
    fn timestamp_ms(&self) -> u64 {
        match self {
            FeedRecord::Motion(sample) => sample.timestamp_ms,
            FeedRecord::Location(fix) => fix.timestamp_ms,
            FeedRecord::Cancel { timestamp_ms } => *timestamp_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = SafetyConfig::load(args.config.as_deref()).context("loading configuration")?;
    init_logging(&config.logging)?;

    info!("=== Rider Safety Core v{} ===", env!("CARGO_PKG_VERSION"));

    let tick = Duration::from_millis(config.escalation.tick_interval_ms);
    let (sink, mut payloads) = ChannelSink::channel("stdout", 16);
    let pipeline = Arc::new(SafetyPipeline::new(config, vec![Arc::new(sink)], None)?);

    let mut events = pipeline.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => emit("escalation", &event),
                    Err(RecvError::Lagged(skipped)) => warn!("Output lagged; {} event(s) skipped", skipped),
                    Err(RecvError::Closed) => break,
                },
                Some(payload) = payloads.recv() => emit("dispatch", &payload),
            }
        }
    });

    let tasks = spawn_tasks(pipeline.clone());

    tokio::select! {
        result = replay(&pipeline, &args.feed, args.realtime) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted during replay"),
    }

    // Let a running countdown finish (or be interrupted)
    tokio::select! {
        _ = settle(&pipeline, tick) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    tasks.stop().await;
    // Give the printer a moment to flush the final events
    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();

    let incidents = pipeline.incidents();
    info!(
        "Replay finished: {} incident(s), {} false positive(s)",
        incidents.len(),
        incidents
            .false_positives()?
            .iter()
            .filter(|entry| entry.cancelled)
            .count()
    );
    Ok(())
}

fn emit<T: serde::Serialize>(kind: &str, value: &T) {
    let line = serde_json::to_value(value).and_then(|value| {
        let mut object = serde_json::Map::new();
        object.insert(kind.to_string(), value);
        serde_json::to_string(&object)
    });
    match line {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Failed to serialize {} output: {}", kind, e),
    }
}

async fn replay(pipeline: &SafetyPipeline, path: &Path, realtime: bool) -> Result<()> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("opening feed {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut previous_ts: Option<u64> = None;
    let mut count = 0usize;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let record: FeedRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed feed line: {}", e);
                continue;
            }
        };

        let ts = record.timestamp_ms();
        if realtime {
            if let Some(prev) = previous_ts {
                tokio::time::sleep(Duration::from_millis(ts.saturating_sub(prev))).await;
            }
        }
        previous_ts = Some(ts);

        let ingested = match record {
            FeedRecord::Motion(sample) => pipeline.ingest_motion(sample).map(|_| ()),
            FeedRecord::Location(fix) => pipeline.ingest_location(fix),
            FeedRecord::Cancel { .. } => {
                pipeline.cancel();
                Ok(())
            }
        };
        if let Err(e) = ingested {
            debug!("Feed record at {} rejected: {}", ts, e);
        }
        count += 1;
    }

    info!("Replayed {} record(s) from {}", count, path.display());
    Ok(())
}

/// Wait until no countdown is running
async fn settle(pipeline: &SafetyPipeline, tick: Duration) {
    let mut interval = tokio::time::interval(tick);
    loop {
        interval.tick().await;
        match pipeline.escalation_state().phase {
            EscalationPhase::Idle | EscalationPhase::Dispatched => break,
            phase => debug!("Waiting for escalation to settle ({:?})", phase),
        }
    }
}
