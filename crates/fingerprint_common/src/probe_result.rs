//! Probe result model.
//!
//! A `ProbeResult` is produced exactly once per registered probe by the
//! orchestrator and never mutated afterwards. A `ProbeGroupResult` is the
//! keyed collection of those results for one group.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Outcome of running one probe
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// Probe resolved before its deadline
    Ok,
    /// Orchestrator stopped waiting at the deadline
    Timeout,
    /// Probe returned an error or panicked
    Error,
}

impl ProbeStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeStatus::Ok)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Ok => "ok",
            ProbeStatus::Timeout => "timeout",
            ProbeStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running a single probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeResult {
    pub name: String,
    pub status: ProbeStatus,
    /// Probe value on `Ok`, the declared fallback otherwise
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ProbeResult {
    pub fn ok(name: impl Into<String>, value: Value, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: ProbeStatus::Ok,
            value,
            error: None,
            duration_ms,
        }
    }

    pub fn timeout(name: impl Into<String>, fallback: Value, duration_ms: u64) -> Self {
        let name = name.into();
        let error = format!("probe '{}' timed out after {}ms", name, duration_ms);
        Self {
            name,
            status: ProbeStatus::Timeout,
            value: fallback,
            error: Some(error),
            duration_ms,
        }
    }

    /// Failed probe. An empty reason is replaced so `error` is never blank.
    pub fn error(
        name: impl Into<String>,
        fallback: Value,
        reason: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        let reason = reason.into();
        let reason = if reason.trim().is_empty() {
            "probe failed without a reason".to_string()
        } else {
            reason
        };
        Self {
            name: name.into(),
            status: ProbeStatus::Error,
            value: fallback,
            error: Some(reason),
            duration_ms,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// All probe results of one group, keyed by probe name
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProbeGroupResult {
    pub group: String,
    pub results: BTreeMap<String, ProbeResult>,
    /// Wall clock for the whole group, not the sum of probe durations
    pub group_duration_ms: u64,
}

impl ProbeGroupResult {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            results: BTreeMap::new(),
            group_duration_ms: 0,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ProbeResult> {
        self.results.get(name)
    }

    /// Value regardless of status (fallback for degraded probes)
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.results.get(name).map(|r| &r.value)
    }

    /// Value only when the probe actually succeeded
    pub fn ok_value(&self, name: &str) -> Option<&Value> {
        self.results
            .get(name)
            .filter(|r| r.status.is_ok())
            .map(|r| &r.value)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn count(&self, status: ProbeStatus) -> usize {
        self.results.values().filter(|r| r.status == status).count()
    }

    /// Names of probes that timed out or failed
    pub fn degraded(&self) -> Vec<&str> {
        self.results
            .values()
            .filter(|r| !r.status.is_ok())
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Flatten to `{probe name: value}`, the shape merged into the fingerprint
    pub fn values(&self) -> BTreeMap<String, Value> {
        self.results
            .iter()
            .map(|(name, r)| (name.clone(), r.value.clone()))
            .collect()
    }
}
