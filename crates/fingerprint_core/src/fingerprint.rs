//! Fingerprint assembly.
//!
//! One collection cycle: run every registered group, run every detector on
//! the results and merge it all into a single serializable document.
//! Sending it anywhere is up to the caller.

use crate::detectors::{default_detectors, Detection, Detector, Signals};
use crate::orchestrator::ProbeOrchestrator;
use crate::registry::ProbeRegistry;
use chrono::{DateTime, Utc};
use fingerprint_common::{ConfigError, FingerprintConfig, ProbeGroupResult, ProbeStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub collection_id: Uuid,
    pub collected_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub groups: BTreeMap<String, ProbeGroupResult>,
    pub detections: BTreeMap<String, Detection>,
}

impl Fingerprint {
    /// Run `detectors` over already collected groups and stamp the result
    pub fn assemble(
        groups: BTreeMap<String, ProbeGroupResult>,
        detectors: &[Box<dyn Detector>],
    ) -> Result<Self, ConfigError> {
        let signals = Signals::new(&groups);
        let mut detections = BTreeMap::new();
        for detector in detectors {
            detections.insert(detector.name().to_string(), detector.detect(&signals)?);
        }

        let duration_ms = groups
            .values()
            .map(|g| g.group_duration_ms)
            .max()
            .unwrap_or(0);

        Ok(Self {
            collection_id: Uuid::new_v4(),
            collected_at: Utc::now(),
            duration_ms,
            groups,
            detections,
        })
    }

    /// Flattened `{group: {probe: value}}` view
    pub fn signals(&self) -> BTreeMap<String, BTreeMap<String, Value>> {
        self.groups
            .iter()
            .map(|(name, group)| (name.clone(), group.values()))
            .collect()
    }

    /// `group.probe` names of every probe that fell back
    pub fn degraded(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|(name, group)| {
                group
                    .degraded()
                    .into_iter()
                    .map(move |probe| format!("{}.{}", name, probe))
            })
            .collect()
    }

    /// Full document, including per-probe status and timings
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Compact document: raw signals plus verdicts, the shape sent upstream
    pub fn payload(&self) -> Value {
        let verdicts: BTreeMap<&str, &Detection> = self
            .detections
            .iter()
            .map(|(name, detection)| (name.as_str(), detection))
            .collect();

        serde_json::json!({
            "collection_id": self.collection_id.to_string(),
            "collected_at": self.collected_at.to_rfc3339(),
            "signals": self.signals(),
            "verdicts": verdicts,
            "degraded": self.degraded(),
        })
    }

    pub fn count(&self, status: ProbeStatus) -> usize {
        self.groups.values().map(|g| g.count(status)).sum()
    }
}

/// Registry + orchestrator + detectors, ready to run collection cycles
pub struct Collector {
    orchestrator: ProbeOrchestrator,
    registry: ProbeRegistry,
    detectors: Vec<Box<dyn Detector>>,
}

impl Collector {
    pub fn new(
        orchestrator: ProbeOrchestrator,
        registry: ProbeRegistry,
        detectors: Vec<Box<dyn Detector>>,
    ) -> Self {
        Self {
            orchestrator,
            registry,
            detectors,
        }
    }

    /// Collector with the configured orchestrator and every built-in detector
    pub fn from_config(config: &FingerprintConfig, registry: ProbeRegistry) -> Self {
        Self::new(
            ProbeOrchestrator::from_config(&config.orchestrator),
            registry,
            default_detectors(&config.detectors),
        )
    }

    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    /// One full collection cycle
    pub async fn collect(&self) -> Result<Fingerprint, ConfigError> {
        let started = Instant::now();
        for detector in &self.detectors {
            detector.validate()?;
        }
        let groups = self.orchestrator.run_registry(&self.registry).await?;
        let mut fingerprint = Fingerprint::assemble(groups, &self.detectors)?;
        fingerprint.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            id = %fingerprint.collection_id,
            probes = self.registry.count(),
            ok = fingerprint.count(ProbeStatus::Ok),
            timeouts = fingerprint.count(ProbeStatus::Timeout),
            errors = fingerprint.count(ProbeStatus::Error),
            duration_ms = fingerprint.duration_ms,
            "Fingerprint collected"
        );
        Ok(fingerprint)
    }
}
