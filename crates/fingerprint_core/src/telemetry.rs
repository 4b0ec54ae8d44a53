//! Telemetry sinks for degraded probes.
//!
//! The orchestrator is handed a sink at construction and calls it for every
//! result that is not `ok`, plus once per finished group. Probes themselves
//! never log their own failures.

use fingerprint_common::{ProbeGroupResult, ProbeResult, ProbeStatus};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub trait TelemetrySink: Send + Sync {
    /// Called once for each timed-out or failed probe
    fn probe_degraded(&self, group: &str, result: &ProbeResult);

    /// Called once per group after every probe has settled or timed out
    fn group_finished(&self, _result: &ProbeGroupResult) {}
}

/// Default sink: structured `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn probe_degraded(&self, group: &str, result: &ProbeResult) {
        warn!(
            group = %group,
            probe = %result.name,
            status = %result.status,
            duration_ms = result.duration_ms,
            error = result.error.as_deref().unwrap_or(""),
            "Probe degraded to fallback"
        );
    }

    fn group_finished(&self, result: &ProbeGroupResult) {
        let degraded = result.len() - result.count(ProbeStatus::Ok);
        if degraded == 0 {
            debug!(
                group = %result.group,
                probes = result.len(),
                duration_ms = result.group_duration_ms,
                "Probe group complete"
            );
        } else {
            info!(
                group = %result.group,
                probes = result.len(),
                timeouts = result.count(ProbeStatus::Timeout),
                errors = result.count(ProbeStatus::Error),
                duration_ms = result.group_duration_ms,
                "Probe group complete with degraded probes"
            );
        }
    }
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn probe_degraded(&self, _group: &str, _result: &ProbeResult) {}
}

/// A degraded probe as seen by `RecordingSink`
#[derive(Debug, Clone, PartialEq)]
pub struct DegradedProbe {
    pub group: String,
    pub probe: String,
    pub status: ProbeStatus,
    pub error: Option<String>,
}

/// In-memory sink for tests and diagnostics
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    degraded: Arc<Mutex<Vec<DegradedProbe>>>,
    groups: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn degraded(&self) -> Vec<DegradedProbe> {
        self.degraded.lock().map(|d| d.clone()).unwrap_or_default()
    }

    /// Names of finished groups, in completion order
    pub fn finished_groups(&self) -> Vec<String> {
        self.groups.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl TelemetrySink for RecordingSink {
    fn probe_degraded(&self, group: &str, result: &ProbeResult) {
        if let Ok(mut degraded) = self.degraded.lock() {
            degraded.push(DegradedProbe {
                group: group.to_string(),
                probe: result.name.clone(),
                status: result.status,
                error: result.error.clone(),
            });
        }
    }

    fn group_finished(&self, result: &ProbeGroupResult) {
        if let Ok(mut groups) = self.groups.lock() {
            groups.push(result.group.clone());
        }
    }
}
