//! CPU vendor detection.
//!
//! Each vendor gets its own indicator set; candidates are ranked by
//! confidence and the best non-zero one becomes the label.

use super::{contains_any, Detection, Detector, Signals};
use crate::registry::{BROWSER, HARDWARE};
use crate::scorer;
use fingerprint_common::{ConfigError, DetectorConfig, IndicatorSet};

pub const DEFAULT_BANDS: &[(f64, &str)] = &[
    (0.0, "weak"),
    (0.5, "probable"),
    (0.8, "confident"),
];

/// Indicator names, also the keys of `[detectors.cpu_vendor.weights]`.
/// An indicator shared by several vendors takes one weight for all of them.
pub const INDICATORS: &[&str] = &[
    "gpu_intel",
    "gpu_amd",
    "gpu_apple",
    "gpu_mobile",
    "x86_platform",
    "apple_platform",
    "arm_platform",
    "x86_arch",
    "arm_arch",
];

pub const INTEL: &str = "intel";
pub const AMD: &str = "amd";
pub const APPLE: &str = "apple";
pub const ARM: &str = "arm";

const X86_PLATFORMS: &[&str] = &["win32", "win64", "x86_64", "i686", "macintel"];
const ARM_PLATFORMS: &[&str] = &["arm", "aarch64", "iphone", "ipad"];
const MOBILE_GPUS: &[&str] = &["mali", "adreno", "powervr", "videocore"];

/// Lowercased raw signals shared by every candidate
struct Hints {
    platform: String,
    gpu: String,
    user_agent: String,
    architecture: Option<String>,
}

impl Hints {
    fn read(signals: &Signals<'_>) -> Self {
        let renderer = signals.lower(HARDWARE, "webgl_renderer").unwrap_or_default();
        let vendor = signals.lower(HARDWARE, "webgl_vendor").unwrap_or_default();
        Self {
            platform: signals.lower(BROWSER, "platform").unwrap_or_default(),
            gpu: format!("{} {}", vendor, renderer),
            user_agent: signals.lower(BROWSER, "user_agent").unwrap_or_default(),
            architecture: signals.lower(HARDWARE, "architecture"),
        }
    }

    fn x86_platform(&self) -> bool {
        contains_any(&self.platform, X86_PLATFORMS)
    }

    fn arm_platform(&self) -> bool {
        contains_any(&self.platform, ARM_PLATFORMS)
    }

    fn arch_is(&self, arch: &str) -> bool {
        self.architecture.as_deref() == Some(arch)
    }
}

pub struct CpuVendorDetector {
    config: DetectorConfig,
}

impl CpuVendorDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// GPU evidence counts double unless overridden
    fn w(&self, indicator: &str) -> f64 {
        let default = if indicator.starts_with("gpu_") { 2.0 } else { 1.0 };
        self.config.weight(indicator, default)
    }

    pub fn candidates(&self, signals: &Signals<'_>) -> Vec<(&'static str, IndicatorSet)> {
        let hints = Hints::read(signals);
        let x86_ua = contains_any(&hints.user_agent, &["x86_64", "win64; x64", "wow64"]);
        let arm_ua = contains_any(&hints.user_agent, &["arm64", "aarch64", "armv8", "armv7"]);

        let intel = IndicatorSet::new()
            .weighted("gpu_intel", hints.gpu.contains("intel"), self.w("gpu_intel"))
            .weighted("x86_platform", hints.x86_platform(), self.w("x86_platform"))
            .weighted("x86_arch", hints.arch_is("x86") || x86_ua, self.w("x86_arch"));

        let amd = IndicatorSet::new()
            .weighted(
                "gpu_amd",
                contains_any(&hints.gpu, &["amd", "radeon"]),
                self.w("gpu_amd"),
            )
            .weighted("x86_platform", hints.x86_platform(), self.w("x86_platform"))
            .weighted("x86_arch", hints.arch_is("x86") || x86_ua, self.w("x86_arch"));

        let apple = IndicatorSet::new()
            .weighted("gpu_apple", hints.gpu.contains("apple"), self.w("gpu_apple"))
            .weighted(
                "apple_platform",
                contains_any(&hints.platform, &["mac", "iphone", "ipad"]),
                self.w("apple_platform"),
            )
            .weighted("arm_arch", hints.arch_is("arm"), self.w("arm_arch"));

        let arm = IndicatorSet::new()
            .weighted(
                "gpu_mobile",
                contains_any(&hints.gpu, MOBILE_GPUS),
                self.w("gpu_mobile"),
            )
            .weighted("arm_platform", hints.arm_platform(), self.w("arm_platform"))
            .weighted("arm_arch", hints.arch_is("arm") || arm_ua, self.w("arm_arch"));

        vec![(INTEL, intel), (AMD, amd), (APPLE, apple), (ARM, arm)]
    }
}

impl Detector for CpuVendorDetector {
    fn name(&self) -> &'static str {
        "cpu_vendor"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.config.check_keys(self.name(), INDICATORS, &[])?;
        self.config.bands_or(DEFAULT_BANDS).map(|_| ())
    }

    fn detect(&self, signals: &Signals<'_>) -> Result<Detection, ConfigError> {
        self.validate()?;
        let bands = self.config.bands_or(DEFAULT_BANDS)?;
        let ranking = scorer::rank(&self.candidates(signals), &bands)?;

        let best = ranking
            .first()
            .filter(|r| r.verdict.confidence > 0.0)
            .cloned();

        let (verdict, label) = match best {
            Some(best) => (best.verdict, Some(best.label)),
            None => (scorer::score(&IndicatorSet::new(), &bands)?, None),
        };

        Ok(Detection {
            verdict,
            label,
            components: Default::default(),
            ranking,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::groups;
    use super::*;
    use serde_json::json;

    fn detect(entries: &[(&str, &str, serde_json::Value)]) -> Detection {
        let collected = groups(entries);
        CpuVendorDetector::new(DetectorConfig::default())
            .detect(&Signals::new(&collected))
            .unwrap()
    }

    #[test]
    fn test_apple_silicon() {
        let d = detect(&[
            ("browser", "platform", json!("MacIntel")),
            ("hardware", "webgl_vendor", json!("Apple Inc.")),
            ("hardware", "webgl_renderer", json!("Apple M2")),
            ("hardware", "architecture", json!("arm")),
        ]);
        assert_eq!(d.label.as_deref(), Some(APPLE));
        assert_eq!(d.verdict.confidence, 1.0);
        assert_eq!(d.verdict.category, "confident");
        assert_eq!(d.ranking.len(), 4);
    }

    #[test]
    fn test_intel_windows() {
        let d = detect(&[
            ("browser", "platform", json!("Win32")),
            ("browser", "user_agent", json!("Mozilla/5.0 (Windows NT 10.0; Win64; x64)")),
            ("hardware", "webgl_renderer", json!("ANGLE (Intel(R) UHD Graphics 630)")),
        ]);
        assert_eq!(d.label.as_deref(), Some(INTEL));
        assert_eq!(d.ranking[0].label, INTEL);
        // AMD shares the platform evidence but not the GPU
        assert_eq!(d.ranking[1].label, AMD);
        assert!((d.ranking[1].verdict.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_android_arm() {
        let d = detect(&[
            ("browser", "platform", json!("Linux armv8l")),
            ("browser", "user_agent", json!("Mozilla/5.0 (Linux; Android 14) AppleWebKit")),
            ("hardware", "webgl_renderer", json!("Adreno (TM) 740")),
        ]);
        assert_eq!(d.label.as_deref(), Some(ARM));
    }

    #[test]
    fn test_indicator_weight_override_applies() {
        let mut config = DetectorConfig::default();
        config.weights.insert("gpu_intel".to_string(), 0.0);
        let collected = groups(&[
            ("browser", "platform", json!("Win32")),
            ("hardware", "webgl_renderer", json!("Intel(R) UHD Graphics 630")),
        ]);
        let d = CpuVendorDetector::new(config)
            .detect(&Signals::new(&collected))
            .unwrap();
        let intel = d.ranking.iter().find(|r| r.label == INTEL).unwrap();
        // gpu_intel no longer counts: x86_platform 1 of (0 + 1 + 1)
        assert!((intel.verdict.confidence - 0.5).abs() < 1e-12);

        let default = detect(&[
            ("browser", "platform", json!("Win32")),
            ("hardware", "webgl_renderer", json!("Intel(R) UHD Graphics 630")),
        ]);
        let intel = default.ranking.iter().find(|r| r.label == INTEL).unwrap();
        // 2 + 1 of 2 + 1 + 1
        assert!((intel.verdict.confidence - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_shared_weight_keys_are_rejected() {
        let mut config = DetectorConfig::default();
        config.weights.insert("gpu".to_string(), 0.0);
        let detector = CpuVendorDetector::new(config);
        let err = detector.validate().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownWeight { ref key, .. } if key == "gpu"));
        let collected = groups(&[]);
        assert!(detector.detect(&Signals::new(&collected)).is_err());
    }

    #[test]
    fn test_no_signals_has_no_label() {
        let d = detect(&[]);
        assert_eq!(d.label, None);
        assert_eq!(d.verdict.confidence, 0.0);
        assert_eq!(d.verdict.category, "weak");
    }
}
