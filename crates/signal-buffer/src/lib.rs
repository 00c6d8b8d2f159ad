//! Signal Buffer
//!
//! Bounded, insertion-ordered history of the rider's motion samples and
//! location fixes. Single writer (sensor ingestion), many readers (crash
//! estimator, hazard analyzer).

mod buffer;
mod sample;

pub use buffer::{RingBuffer, DEFAULT_CAPACITY};
pub use sample::{Coordinate, LocationFix, MotionSample, Vector3};

/// Motion and location history shared between ingestion and the analyzers.
pub struct SignalBuffer {
    motion: RingBuffer<MotionSample>,
    location: RingBuffer<LocationFix>,
}

impl SignalBuffer {
    /// Create a buffer holding the last `capacity` samples of each stream
    pub fn new(capacity: usize) -> Self {
        Self {
            motion: RingBuffer::new(capacity),
            location: RingBuffer::new(capacity),
        }
    }

    /// Create a buffer with default capacity (50 samples per stream)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    pub fn push_motion(&self, sample: MotionSample) {
        self.motion.push(sample);
    }

    pub fn push_location(&self, fix: LocationFix) {
        self.location.push(fix);
    }

    /// Most recent `last_k` motion samples, oldest first
    pub fn motion_snapshot(&self, last_k: usize) -> Vec<MotionSample> {
        self.motion.snapshot(last_k)
    }

    /// Most recent `last_k` location fixes, oldest first
    pub fn location_snapshot(&self, last_k: usize) -> Vec<LocationFix> {
        self.location.snapshot(last_k)
    }

    pub fn latest_location(&self) -> Option<LocationFix> {
        self.location.latest()
    }

    pub fn motion(&self) -> &RingBuffer<MotionSample> {
        &self.motion
    }

    pub fn location(&self) -> &RingBuffer<LocationFix> {
        &self.location
    }

    /// Drop all buffered samples (e.g. on ride end)
    pub fn clear(&self) {
        self.motion.clear();
        self.location.clear();
    }
}

impl Default for SignalBuffer {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streams_are_independent() {
        let buffer = SignalBuffer::new(4);

        for i in 0..6 {
            buffer.push_motion(MotionSample::at_rest(i * 100));
        }
        buffer.push_location(LocationFix::new(0, Coordinate::new(37.0, -122.0), 10.0));

        assert_eq!(buffer.motion().len(), 4);
        assert_eq!(buffer.location().len(), 1);
        assert_eq!(buffer.motion_snapshot(2)[1].timestamp_ms, 500);
        assert_eq!(buffer.latest_location().map(|f| f.speed_mps), Some(10.0));
    }

    #[test]
    fn test_clear() {
        let buffer = SignalBuffer::default();
        buffer.push_motion(MotionSample::at_rest(0));
        buffer.clear();
        assert!(buffer.motion().is_empty());
        assert!(buffer.latest_location().is_none());
    }
}
