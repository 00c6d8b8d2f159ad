//! In-memory incident log

use crate::StorageError;
use chrono::{DateTime, Utc};
use crash_estimator::CrashEvent;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// How an escalation cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentOutcome {
    /// Countdown still running
    Pending,
    /// Rider cancelled; logged as a false positive
    FalsePositive,
    Dispatched,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub event: CrashEvent,
    pub outcome: IncidentOutcome,
    pub updated_at: DateTime<Utc>,
}

/// False-positive log entry for model tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FalsePositiveEntry {
    pub event_id: Uuid,
    pub cancelled: bool,
}

/// Bounded incident log (oldest records dropped first)
pub struct IncidentLog {
    records: Mutex<VecDeque<IncidentRecord>>,
    max_records: usize,
}

impl IncidentLog {
    pub fn new(max_records: usize) -> Self {
        info!("Creating incident log (max {} records)", max_records);
        Self {
            records: Mutex::new(VecDeque::with_capacity(max_records.min(1024))),
            max_records: max_records.max(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, VecDeque<IncidentRecord>>, StorageError> {
        self.records
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    /// Record a new event as pending
    pub fn record(&self, event: CrashEvent) -> Result<(), StorageError> {
        let mut records = self.lock()?;

        // Enforce retention
        while records.len() >= self.max_records {
            records.pop_front();
        }

        debug!("Recorded incident {}", event.id);
        records.push_back(IncidentRecord {
            event,
            outcome: IncidentOutcome::Pending,
            updated_at: Utc::now(),
        });
        Ok(())
    }

    fn set_outcome(&self, id: Uuid, outcome: IncidentOutcome) -> Result<(), StorageError> {
        let mut records = self.lock()?;
        let record = records
            .iter_mut()
            .find(|r| r.event.id == id)
            .ok_or(StorageError::NotFound)?;
        record.outcome = outcome;
        record.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_false_positive(&self, id: Uuid) -> Result<(), StorageError> {
        info!("Incident {} labelled false positive", id);
        self.set_outcome(id, IncidentOutcome::FalsePositive)
    }

    pub fn mark_dispatched(&self, id: Uuid) -> Result<(), StorageError> {
        self.set_outcome(id, IncidentOutcome::Dispatched)
    }

    pub fn get(&self, id: Uuid) -> Result<IncidentRecord, StorageError> {
        self.lock()?
            .iter()
            .find(|r| r.event.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    /// Every resolved incident with its cancellation flag
    pub fn false_positives(&self) -> Result<Vec<FalsePositiveEntry>, StorageError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|r| r.outcome != IncidentOutcome::Pending)
            .map(|r| FalsePositiveEntry {
                event_id: r.event.id,
                cancelled: r.outcome == IncidentOutcome::FalsePositive,
            })
            .collect())
    }

    /// Most recent records first
    pub fn recent(&self, limit: usize) -> Result<Vec<IncidentRecord>, StorageError> {
        Ok(self.lock()?.iter().rev().take(limit).cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize all records with postcard for hand-off to persistence
    pub fn export(&self) -> Result<Vec<u8>, StorageError> {
        let records: Vec<IncidentRecord> = self.lock()?.iter().cloned().collect();
        Ok(postcard::to_allocvec(&records)?)
    }

    /// Load records previously produced by [`IncidentLog::export`]
    pub fn import(&self, bytes: &[u8]) -> Result<usize, StorageError> {
        let imported: Vec<IncidentRecord> = postcard::from_bytes(bytes)?;
        let count = imported.len();
        let mut records = self.lock()?;
        for record in imported {
            while records.len() >= self.max_records {
                records.pop_front();
            }
            records.push_back(record);
        }
        Ok(count)
    }
}

impl Default for IncidentLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crash_estimator::StimulusKind;
    use signal_buffer::{Coordinate, LocationFix, MotionSample, Vector3};

    fn event() -> CrashEvent {
        let samples: Vec<_> = (0..5)
            .map(|i| MotionSample::new(i * 100, Vector3::new(0.1, 0.0, 0.0), Vector3::default()))
            .collect();
        let fix = LocationFix::new(400, Coordinate::new(37.77, -122.42), 15.0).with_bearing(80.0);
        CrashEvent::new(Utc::now(), StimulusKind::SuddenImpact, 4.2, 0.8, Some(fix), &samples)
    }

    #[test]
    fn test_false_positive_labelling() {
        let log = IncidentLog::default();
        let cancelled = event();
        let dispatched = event();
        let pending = event();

        log.record(cancelled.clone()).unwrap();
        log.record(dispatched.clone()).unwrap();
        log.record(pending).unwrap();

        log.mark_false_positive(cancelled.id).unwrap();
        log.mark_dispatched(dispatched.id).unwrap();

        let entries = log.false_positives().unwrap();
        assert_eq!(
            entries,
            vec![
                FalsePositiveEntry { event_id: cancelled.id, cancelled: true },
                FalsePositiveEntry { event_id: dispatched.id, cancelled: false },
            ]
        );
        assert_eq!(log.get(cancelled.id).unwrap().outcome, IncidentOutcome::FalsePositive);
    }

    #[test]
    fn test_unknown_id() {
        let log = IncidentLog::default();
        assert!(matches!(log.mark_dispatched(Uuid::new_v4()), Err(StorageError::NotFound)));
    }

    #[test]
    fn test_retention() {
        let log = IncidentLog::new(2);
        let first = event();
        log.record(first.clone()).unwrap();
        log.record(event()).unwrap();
        log.record(event()).unwrap();

        assert_eq!(log.len(), 2);
        assert!(log.get(first.id).is_err());
        assert_eq!(log.recent(1).unwrap().len(), 1);
    }

    #[test]
    fn test_export_import() {
        let log = IncidentLog::default();
        let original = event();
        log.record(original.clone()).unwrap();
        log.mark_false_positive(original.id).unwrap();

        let bytes = log.export().unwrap();
        let restored = IncidentLog::default();
        assert_eq!(restored.import(&bytes).unwrap(), 1);

        let record = restored.get(original.id).unwrap();
        assert_eq!(record.event, original);
        assert_eq!(record.outcome, IncidentOutcome::FalsePositive);
    }
}
