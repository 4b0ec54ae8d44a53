//! Configuration management for fingerprint collection.
//!
//! Loads settings from /etc/fingerprint/config.toml, then the per-user
//! config dir, or uses defaults. Detector thresholds and weights are data:
//! a `[detectors.<name>]` table overrides the shipped defaults.

use crate::error::{ConfigError, Result};
use crate::evidence::{Band, BandTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// System-wide config file path
pub const CONFIG_PATH: &str = "/etc/fingerprint/config.toml";

/// Per-user config file, relative to the platform config dir
pub const USER_CONFIG_FILE: &str = "fingerprint/config.toml";

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Timeout applied to probes registered without one
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Emit a warning event for every timed-out or failed probe
    #[serde(default = "default_log_degraded")]
    pub log_degraded: bool,
}

fn default_timeout_ms() -> u64 {
    1_000
}

fn default_log_degraded() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            log_degraded: default_log_degraded(),
        }
    }
}

impl OrchestratorConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

/// Overrides for one detector. Anything left out keeps the detector's default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub bands: Option<BandTable>,

    /// Indicator weights, keyed by indicator name
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,

    /// Weights of sub-verdicts, for detectors that combine several
    #[serde(default)]
    pub components: BTreeMap<String, f64>,
}

impl DetectorConfig {
    pub fn weight(&self, indicator: &str, default: f64) -> f64 {
        self.weights.get(indicator).copied().unwrap_or(default)
    }

    pub fn component(&self, name: &str, default: f64) -> f64 {
        self.components.get(name).copied().unwrap_or(default)
    }

    /// Reject override keys the detector does not read.
    pub fn check_keys(
        &self,
        detector: &str,
        indicators: &[&str],
        components: &[&str],
    ) -> Result<()> {
        let sections = [
            ("weights", &self.weights, indicators),
            ("components", &self.components, components),
        ];
        for (section, overrides, known) in sections {
            if let Some(key) = overrides.keys().find(|k| !known.contains(&k.as_str())) {
                return Err(ConfigError::UnknownWeight {
                    detector: detector.to_string(),
                    section,
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }

    /// Configured band table, or one built from the detector's defaults.
    pub fn bands_or(&self, defaults: &[(f64, &str)]) -> Result<BandTable> {
        match &self.bands {
            Some(table) => Ok(table.clone()),
            None => BandTable::new(
                defaults
                    .iter()
                    .map(|(threshold, label)| Band::new(*threshold, *label))
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorsConfig {
    #[serde(default)]
    pub headless: DetectorConfig,

    #[serde(default)]
    pub gpu_tier: DetectorConfig,

    #[serde(default)]
    pub thermal: DetectorConfig,

    #[serde(default)]
    pub cpu_vendor: DetectorConfig,

    #[serde(default)]
    pub jit: DetectorConfig,
}

/// Full collector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FingerprintConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub detectors: DetectorsConfig,
}

impl FingerprintConfig {
    /// Load config from the first readable location, or return defaults
    pub fn load() -> Self {
        let mut candidates = vec![PathBuf::from(CONFIG_PATH)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join(USER_CONFIG_FILE));
        }

        for path in &candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_path(path) {
                Ok(config) => return config,
                Err(e) => warn!("Ignoring config {}: {}", path.display(), e),
            }
        }

        info!("No config file found, using defaults");
        Self::default()
    }

    /// Load config from a specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
