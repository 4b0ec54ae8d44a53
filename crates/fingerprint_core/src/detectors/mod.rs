//! Built-in detectors.
//!
//! A detector reads probe results, builds one or more indicator sets and
//! scores them. Thresholds and weights come from `DetectorConfig`; the
//! values in each module are only defaults. Only probes that finished `ok`
//! feed indicators: a fallback value never counts as evidence.

pub mod cpu_vendor;
pub mod gpu_tier;
pub mod headless;
pub mod jit;
pub mod thermal;

use fingerprint_common::{ConfigError, DetectorsConfig, ProbeGroupResult, RankedVerdict, Verdict};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub use cpu_vendor::CpuVendorDetector;
pub use gpu_tier::GpuTierDetector;
pub use headless::HeadlessDetector;
pub use jit::JitDetector;
pub use thermal::ThermalDetector;

/// Detector output: the overall verdict plus optional detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub verdict: Verdict,
    /// Best candidate for ranking detectors, `None` when nothing matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Sub-verdicts a combined verdict was built from
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, Verdict>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranking: Vec<RankedVerdict>,
}

impl Detection {
    pub fn from_verdict(verdict: Verdict) -> Self {
        Self {
            verdict,
            label: None,
            components: BTreeMap::new(),
            ranking: Vec::new(),
        }
    }
}

pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check the configured bands and weight overrides without any signals.
    /// `detect` fails the same way, this only lets callers fail early.
    fn validate(&self) -> Result<(), ConfigError>;

    fn detect(&self, signals: &Signals<'_>) -> Result<Detection, ConfigError>;
}

/// Every built-in detector, configured
pub fn default_detectors(config: &DetectorsConfig) -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(HeadlessDetector::new(config.headless.clone())),
        Box::new(GpuTierDetector::new(config.gpu_tier.clone())),
        Box::new(ThermalDetector::new(config.thermal.clone())),
        Box::new(CpuVendorDetector::new(config.cpu_vendor.clone())),
        Box::new(JitDetector::new(config.jit.clone())),
    ]
}

// ============================================================================
// Signal access
// ============================================================================

/// Typed, read-only view over collected groups
#[derive(Debug, Clone, Copy)]
pub struct Signals<'a> {
    groups: &'a BTreeMap<String, ProbeGroupResult>,
}

impl<'a> Signals<'a> {
    pub fn new(groups: &'a BTreeMap<String, ProbeGroupResult>) -> Self {
        Self { groups }
    }

    /// Value of a probe that finished `ok`
    pub fn get(&self, group: &str, probe: &str) -> Option<&'a Value> {
        self.groups.get(group)?.ok_value(probe)
    }

    pub fn bool(&self, group: &str, probe: &str) -> Option<bool> {
        self.get(group, probe)?.as_bool()
    }

    pub fn f64(&self, group: &str, probe: &str) -> Option<f64> {
        self.get(group, probe)?.as_f64().filter(|v| v.is_finite())
    }

    pub fn str(&self, group: &str, probe: &str) -> Option<&'a str> {
        self.get(group, probe)?.as_str()
    }

    /// Lowercased string, for case-insensitive pattern checks
    pub fn lower(&self, group: &str, probe: &str) -> Option<String> {
        self.str(group, probe).map(str::to_lowercase)
    }

    pub fn array(&self, group: &str, probe: &str) -> Option<&'a Vec<Value>> {
        self.get(group, probe)?.as_array()
    }

    /// Numeric array, non-numeric entries dropped
    pub fn numbers(&self, group: &str, probe: &str) -> Vec<f64> {
        self.array(group, probe)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_f64)
                    .filter(|v| v.is_finite())
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub(crate) fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Coefficient of variation (stddev / mean)
pub(crate) fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m <= 0.0 {
        return None;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt() / m)
}
