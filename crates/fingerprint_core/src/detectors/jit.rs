//! JIT compiler detection from cold vs warm execution timings.

use super::{coefficient_of_variation, Detection, Detector, Signals};
use crate::registry::HARDWARE;
use crate::scorer;
use fingerprint_common::{ConfigError, DetectorConfig, IndicatorSet};

pub const DEFAULT_BANDS: &[(f64, &str)] = &[
    (0.0, "interpreted"),
    (0.4, "baseline"),
    (0.7, "optimizing"),
];

/// Indicator names, also the keys of `[detectors.jit.weights]`
pub const INDICATORS: &[&str] = &[
    "warm_speedup",
    "monotone_speedup",
    "stable_warm_runs",
];

/// Cold/warm ratio treated as a fully optimizing tier
const FULL_SPEEDUP: f64 = 5.0;

/// Tolerance when checking that iteration timings keep decreasing
const MONOTONE_SLACK: f64 = 1.05;

pub struct JitDetector {
    config: DetectorConfig,
}

impl JitDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn indicators(&self, signals: &Signals<'_>) -> IndicatorSet {
        let mut set = IndicatorSet::new();

        let cold = signals.f64(HARDWARE, "jit_cold_ms");
        let warm = signals.f64(HARDWARE, "jit_warm_ms");
        if let (Some(cold), Some(warm)) = (cold, warm) {
            if warm > 0.0 {
                set = set.weighted(
                    "warm_speedup",
                    ((cold / warm - 1.0) / (FULL_SPEEDUP - 1.0)).clamp(0.0, 1.0),
                    self.config.weight("warm_speedup", 3.0),
                );
            }
        }

        let iterations = signals.numbers(HARDWARE, "jit_iterations");
        if iterations.len() >= 4 {
            let steps = iterations.len() - 1;
            let non_increasing = iterations
                .windows(2)
                .filter(|w| w[1] <= w[0] * MONOTONE_SLACK)
                .count();
            set = set.weighted(
                "monotone_speedup",
                non_increasing as f64 / steps as f64,
                self.config.weight("monotone_speedup", 1.0),
            );

            let tail = &iterations[iterations.len() / 2..];
            if let Some(cv) = coefficient_of_variation(tail) {
                set = set.weighted(
                    "stable_warm_runs",
                    cv < 0.15,
                    self.config.weight("stable_warm_runs", 1.0),
                );
            }
        }

        set
    }
}

impl Detector for JitDetector {
    fn name(&self) -> &'static str {
        "jit"
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
