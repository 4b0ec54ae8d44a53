//! Thermal throttling detection from repeated benchmark timings.
//!
//! `hardware.timing_samples` is a series of durations of the same workload.
//! Slowdown of the last quarter against the first quarter is mapped into
//! [0, 1] so it can be weighed against the other indicators.

use super::{coefficient_of_variation, mean, Detection, Detector, Signals};
use crate::registry::{ENVIRONMENT, HARDWARE};
use crate::scorer;
use fingerprint_common::{ConfigError, DetectorConfig, IndicatorSet};

pub const DEFAULT_BANDS: &[(f64, &str)] = &[
    (0.0, "nominal"),
    (0.5, "throttled"),
    (0.8, "severe"),
];

/// Indicator names, also the keys of `[detectors.thermal.weights]`
pub const INDICATORS: &[&str] = &[
    "degradation",
    "variance_growth",
    "power_saving",
    "low_battery",
];

/// Fewer samples than this give no timing indicators at all
pub const MIN_SAMPLES: usize = 8;

/// Slowdown that counts as full-strength degradation (50%)
const FULL_DEGRADATION: f64 = 0.5;

pub struct ThermalDetector {
    config: DetectorConfig,
}

impl ThermalDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn indicators(&self, signals: &Signals<'_>) -> IndicatorSet {
        let samples = signals.numbers(HARDWARE, "timing_samples");
        let mut set = IndicatorSet::new();

        if samples.len() >= MIN_SAMPLES {
            let quarter = samples.len() / 4;
            let first = &samples[..quarter];
            let last = &samples[samples.len() - quarter..];

            if let Some(ratio) = slowdown(first, last) {
                set = set.weighted(
                    "degradation",
                    (ratio / FULL_DEGRADATION).clamp(0.0, 1.0),
                    self.config.weight("degradation", 3.0),
                );
            }

            if let (Some(before), Some(after)) =
                (coefficient_of_variation(first), coefficient_of_variation(last))
            {
                set = set.weighted(
                    "variance_growth",
                    after > before * 2.0 && after > 0.05,
                    self.config.weight("variance_growth", 1.0),
                );
            }
        }

        if let Some(saving) = signals.bool(ENVIRONMENT, "power_saving") {
            set = set.weighted("power_saving", saving, self.config.weight("power_saving", 1.0));
        }

        if let Some(level) = signals.f64(ENVIRONMENT, "battery_level") {
            let charging = signals.bool(ENVIRONMENT, "battery_charging").unwrap_or(false);
            set = set.weighted(
                "low_battery",
                level < 0.2 && !charging,
                self.config.weight("low_battery", 0.5),
            );
        }

        set
    }
}

/// Relative slowdown of `last` over `first`; negative means it got faster
fn slowdown(first: &[f64], last: &[f64]) -> Option<f64> {
    let before = mean(first)?;
    let after = mean(last)?;
    if before <= 0.0 {
        return None;
    }
    Some(after / before - 1.0)
}

impl Detector for ThermalDetector {
    fn name(&self) -> &'static str {
        "thermal"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.config.check_keys(self.name(), INDICATORS, &[])?;
        self.config.bands_or(DEFAULT_BANDS).map(|_| ())
    }

    fn detect(&self, signals: &Signals<'_>) -> Result<Detection, ConfigError> {
        self.validate()?;
        let bands = self.config.bands_or(DEFAULT_BANDS)?;
        let verdict = scorer::score(&self.indicators(signals), &bands)?;
        Ok(Detection::from_verdict(verdict))
    }
}
