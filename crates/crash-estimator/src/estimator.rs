//! Stimulus classification and crash probability

use crate::event::{timestamp_from_millis, CrashEvent, StimulusKind};
use crate::statistics::std_dev;
use sample_validator::MedianFilter;
use serde::{Deserialize, Serialize};
use signal_buffer::{LocationFix, MotionSample};
use tracing::{debug, info};

/// Estimator thresholds and weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Acceleration magnitude for sudden impact (g)
    pub impact_threshold_g: f64,
    pub impact_scale: f64,
    pub impact_cap: f64,
    /// Filtered acceleration magnitude for sudden deceleration (g)
    pub deceleration_threshold_g: f64,
    pub deceleration_scale: f64,
    pub deceleration_cap: f64,
    /// Rotation magnitude for sudden rotation (rad/s)
    pub rotation_threshold_rad_s: f64,
    pub rotation_scale: f64,
    pub rotation_cap: f64,
    /// Speed at or above which the speed bonus applies (m/s, ~30 mph)
    pub speed_bonus_threshold_mps: f64,
    pub speed_bonus: f64,
    /// Number of recent magnitudes in the variability window
    pub variability_window: usize,
    /// Std-dev of recent magnitudes above which the variability bonus applies (g)
    pub variability_threshold_g: f64,
    pub variability_bonus: f64,
    /// Hard ceiling on the final probability
    pub probability_ceiling: f64,
    /// Probability that must be exceeded to open an event
    pub trigger_threshold: f64,
    /// Median filter width for the filtered acceleration magnitude
    pub filter_window: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            impact_threshold_g: 3.5,
            impact_scale: 6.0,
            impact_cap: 0.90,
            deceleration_threshold_g: 4.0,
            deceleration_scale: 5.0,
            deceleration_cap: 0.80,
            rotation_threshold_rad_s: 2.0,
            rotation_scale: 3.0,
            rotation_cap: 0.70,
            speed_bonus_threshold_mps: 13.4,
            speed_bonus: 0.10,
            variability_window: 10,
            variability_threshold_g: 2.0,
            variability_bonus: 0.05,
            probability_ceiling: 0.95,
            trigger_threshold: 0.75,
            filter_window: 3,
        }
    }
}

/// One stimulus that fired on a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StimulusReading {
    pub kind: StimulusKind,
    pub magnitude: f64,
    pub base_probability: f64,
}

/// Result of scoring one sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assessment {
    /// Every stimulus that fired, in evaluation order
    pub stimuli: Vec<StimulusReading>,
    /// Additive contextual bonus
    pub bonus: f64,
    /// Final probability (0 when no stimulus fired)
    pub probability: f64,
}

impl Assessment {
    /// Stimulus with the largest base probability
    pub fn primary(&self) -> Option<&StimulusReading> {
        self.stimuli
            .iter()
            .max_by(|a, b| a.base_probability.total_cmp(&b.base_probability))
    }
}

/// Crash probability estimator
pub struct CrashEstimator {
    config: EstimatorConfig,
    filter: MedianFilter,
}

impl CrashEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        info!("Creating crash estimator with config: {:?}", config);
        Self {
            filter: MedianFilter::new(config.filter_window),
            config,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn impact_base_probability(&self, accel_g: f64) -> f64 {
        (accel_g / self.config.impact_scale).min(self.config.impact_cap)
    }

    pub fn deceleration_base_probability(&self, accel_g: f64) -> f64 {
        (accel_g / self.config.deceleration_scale).min(self.config.deceleration_cap)
    }

    pub fn rotation_base_probability(&self, rotation_rad_s: f64) -> f64 {
        (rotation_rad_s / self.config.rotation_scale).min(self.config.rotation_cap)
    }

    /// Score a newly pushed sample.
    ///
    /// `history` is the recent motion history, oldest first, normally ending
    /// with `sample`. Feeds the deceleration filter, so call once per sample.
    pub fn assess(
        &mut self,
        sample: &MotionSample,
        history: &[MotionSample],
        speed_mps: Option<f64>,
    ) -> Assessment {
        let accel = sample.acceleration_magnitude();
        let rotation = sample.rotation_magnitude();
        let filtered = self.filter.filter(accel);

        let mut stimuli = Vec::new();
        if accel > self.config.impact_threshold_g {
            stimuli.push(StimulusReading {
                kind: StimulusKind::SuddenImpact,
                magnitude: accel,
                base_probability: self.impact_base_probability(accel),
            });
        }
        // Sustained: the smoothed magnitude gates, the raw magnitude scores
        if filtered > self.config.deceleration_threshold_g {
            stimuli.push(StimulusReading {
                kind: StimulusKind::SuddenDeceleration,
                magnitude: accel,
                base_probability: self.deceleration_base_probability(accel),
            });
        }
        if rotation > self.config.rotation_threshold_rad_s {
            stimuli.push(StimulusReading {
                kind: StimulusKind::SuddenRotation,
                magnitude: rotation,
                base_probability: self.rotation_base_probability(rotation),
            });
        }

        if stimuli.is_empty() {
            return Assessment::default();
        }

        let bonus = self.contextual_bonus(sample, history, speed_mps);
        // Concurrent stimuli resolve to the strongest, never a sum
        let base = stimuli
            .iter()
            .map(|s| s.base_probability)
            .fold(0.0, f64::max);
        let probability = (base + bonus).min(self.config.probability_ceiling);

        debug!(
            "Stimuli {:?} base {:.3} bonus {:.2} -> probability {:.3}",
            stimuli.iter().map(|s| s.kind).collect::<Vec<_>>(),
            base,
            bonus,
            probability
        );

        Assessment {
            stimuli,
            bonus,
            probability,
        }
    }

    fn contextual_bonus(
        &self,
        sample: &MotionSample,
        history: &[MotionSample],
        speed_mps: Option<f64>,
    ) -> f64 {
        let mut bonus = 0.0;

        if speed_mps.is_some_and(|s| s >= self.config.speed_bonus_threshold_mps) {
            bonus += self.config.speed_bonus;
        }

        let window = if history.is_empty() {
            std::slice::from_ref(sample)
        } else {
            &history[history.len().saturating_sub(self.config.variability_window)..]
        };
        let magnitudes: Vec<f64> = window.iter().map(|s| s.acceleration_magnitude()).collect();
        if std_dev(&magnitudes) > self.config.variability_threshold_g {
            bonus += self.config.variability_bonus;
        }

        bonus
    }

    /// Score a sample and open a crash event if it crosses the trigger threshold.
    ///
    /// Speed for the contextual bonus comes from `location`, the latest live fix.
    pub fn evaluate(
        &mut self,
        sample: &MotionSample,
        history: &[MotionSample],
        location: Option<&LocationFix>,
    ) -> Option<CrashEvent> {
        let assessment = self.assess(sample, history, location.map(|l| l.speed_mps));
        if assessment.probability <= self.config.trigger_threshold {
            return None;
        }

        let primary = *assessment.primary()?;
        info!(
            "Crash event opened: {} ({:.2}) probability {:.2}",
            primary.kind.as_str(),
            primary.magnitude,
            assessment.probability
        );
        metrics::counter!("safety_crash_events_total", "stimulus" => primary.kind.as_str())
            .increment(1);

        Some(CrashEvent::new(
            timestamp_from_millis(sample.timestamp_ms),
            primary.kind,
            primary.magnitude,
            assessment.probability,
            location.copied(),
            history,
        ))
    }

    /// Feed a sample to the deceleration filter without scoring it.
    ///
    /// Used while an escalation is already running, so the smoothing window
    /// stays current without opening further events.
    pub fn observe(&mut self, sample: &MotionSample) {
        self.filter.filter(sample.acceleration_magnitude());
    }

    /// Clear filter state (e.g. after an escalation cycle ends)
    pub fn reset(&mut self) {
        self.filter.reset();
    }
}

impl Default for CrashEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}
