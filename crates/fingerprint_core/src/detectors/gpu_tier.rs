//! GPU tier estimation from WebGL capabilities.

use super::{contains_any, Detection, Detector, Signals};
use crate::registry::HARDWARE;
use crate::scorer;
use fingerprint_common::{ConfigError, DetectorConfig, IndicatorSet};

pub const DEFAULT_BANDS: &[(f64, &str)] = &[(0.0, "low"), (0.4, "mid"), (0.75, "high")];

/// Indicator names, also the keys of `[detectors.gpu_tier.weights]`
pub const INDICATORS: &[&str] = &[
    "renderer_high_end",
    "renderer_discrete",
    "hardware_accelerated",
    "max_texture_size",
    "max_viewport",
    "webgl2",
    "extensions",
];

const HIGH_END: &[&str] = &[
    "rtx",
    "radeon rx 6",
    "radeon rx 7",
    "radeon pro",
    "quadro",
    "apple m",
    "arc a7",
];

const INTEGRATED: &[&str] = &[
    "intel(r) hd",
    "intel(r) uhd",
    "intel hd",
    "intel uhd",
    "mali",
    "adreno",
    "powervr",
];

const SOFTWARE: &[&str] = &["swiftshader", "llvmpipe", "software", "basic render"];

pub struct GpuTierDetector {
    config: DetectorConfig,
}

impl GpuTierDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn indicators(&self, signals: &Signals<'_>) -> IndicatorSet {
        let renderer = signals.lower(HARDWARE, "webgl_renderer");
        let mut set = IndicatorSet::new();

        if let Some(renderer) = renderer {
            let software = contains_any(&renderer, SOFTWARE);
            set = set
                .weighted(
                    "renderer_high_end",
                    contains_any(&renderer, HIGH_END),
                    self.config.weight("renderer_high_end", 3.0),
                )
                .weighted(
                    "renderer_discrete",
                    !software && !contains_any(&renderer, INTEGRATED),
                    self.config.weight("renderer_discrete", 1.0),
                )
                .weighted(
                    "hardware_accelerated",
                    !software,
                    self.config.weight("hardware_accelerated", 1.0),
                );
        }

        if let Some(size) = signals.f64(HARDWARE, "max_texture_size") {
            set = set.weighted(
                "max_texture_size",
                texture_score(size),
                self.config.weight("max_texture_size", 2.0),
            );
        }

        let viewport = signals.numbers(HARDWARE, "max_viewport_dims");
        if let Some(largest) = viewport.iter().copied().reduce(f64::max) {
            set = set.weighted(
                "max_viewport",
                viewport_score(largest),
                self.config.weight("max_viewport", 1.0),
            );
        }

        if let Some(webgl2) = signals.bool(HARDWARE, "webgl2") {
            set = set.weighted("webgl2", webgl2, self.config.weight("webgl2", 1.0));
        }

        if let Some(count) = signals.f64(HARDWARE, "webgl_extensions") {
            set = set.weighted(
                "extensions",
                (count / 40.0).clamp(0.0, 1.0),
                self.config.weight("extensions", 1.0),
            );
        }

        set
    }
}

/// 4096 or less -> 0, 8192 -> 0.5, 16384 or more -> 1
fn texture_score(size: f64) -> f64 {
    if size <= 0.0 {
        return 0.0;
    }
    ((size.log2() - 12.0) / 2.0).clamp(0.0, 1.0)
}

fn viewport_score(largest: f64) -> f64 {
    if largest >= 32_767.0 {
        1.0
    } else if largest >= 16_384.0 {
        0.5
    } else {
        0.0
    }
}

impl Detector for GpuTierDetector {
    fn name(&self) -> &'static str {
        "gpu_tier"
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
