//! Median Filter for Noise Reduction

/// Sliding window median filter.
///
/// The window starts filled with zeros (the at-rest value of gravity-removed
/// acceleration), so a single spike does not pass through until it persists
/// for more than half the window.
#[derive(Debug, Clone)]
pub struct MedianFilter {
    window: Vec<f64>,
    size: usize,
    position: usize,
}

impl MedianFilter {
    /// Create a new median filter; even sizes are rounded up to the next odd size
    pub fn new(size: usize) -> Self {
        let size = size.max(1) | 1;
        Self {
            window: vec![0.0; size],
            size,
            position: 0,
        }
    }

    /// Add a value and get the filtered output
    pub fn filter(&mut self, value: f64) -> f64 {
        self.window[self.position] = value;
        self.position = (self.position + 1) % self.size;

        let mut sorted = self.window.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted[self.size / 2]
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Reset the filter
    pub fn reset(&mut self) {
        self.window.fill(0.0);
        self.position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_isolated_spike_suppressed() {
        let mut filter = MedianFilter::new(3);
        assert_eq!(filter.filter(0.1), 0.0);
        assert!((filter.filter(4.2) - 0.1).abs() < 1e-9);
        assert!((filter.filter(0.2) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_sustained_value_passes() {
        let mut filter = MedianFilter::new(3);
        filter.filter(4.5);
        let result = filter.filter(4.6);
        assert!((result - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_removes_spike_from_steady_signal() {
        let mut filter = MedianFilter::new(5);
        for val in [10.0, 11.0, 10.0, 100.0, 10.0] {
            filter.filter(val);
        }
        let result = filter.filter(11.0);
        assert!(result < 20.0);
    }

    #[test]
    fn test_even_size_rounded_up() {
        assert_eq!(MedianFilter::new(4).size(), 5);
        assert_eq!(MedianFilter::new(0).size(), 1);
    }

    #[test]
    fn test_reset() {
        let mut filter = MedianFilter::new(3);
        filter.filter(5.0);
        filter.filter(5.0);
        filter.reset();
        assert_eq!(filter.filter(5.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_output_within_window_bounds(
            values in prop::collection::vec(0.0f64..100.0, 1..40),
            size in 1usize..8,
        ) {
            let mut filter = MedianFilter::new(size);
            let window = filter.size();
            for (i, value) in values.iter().enumerate() {
                let out = filter.filter(*value);
                let start = (i + 1).saturating_sub(window);
                let recent = &values[start..=i];
                let primed = i + 1 < window;
                let lo = recent.iter().copied().fold(if primed { 0.0 } else { f64::MAX }, f64::min);
                let hi = recent.iter().copied().fold(0.0, f64::max);
                prop_assert!(out >= lo && out <= hi);
            }
        }
    }
}
