//! Parallel probe orchestration.
//!
//! Every probe of a group runs on its own task and is raced against its
//! deadline. A timeout means the orchestrator stops waiting: the probe task
//! is detached and keeps running, its eventual outcome is ignored. Probes
//! that need a hard stop must build it into their own `run()`.
//!
//! Probe bodies must not block the runtime thread; blocking reads belong in
//! `tokio::task::spawn_blocking` inside the probe.

use crate::probe::{Probe, ProbeGroup};
use crate::registry::ProbeRegistry;
use crate::telemetry::{NullSink, TelemetrySink, TracingSink};
use fingerprint_common::{ConfigError, OrchestratorConfig, ProbeGroupResult, ProbeResult};
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};
use tokio::time::timeout;
use tracing::{debug, error};

/// Runs probe groups with per-probe isolation and bounded latency
#[derive(Clone)]
pub struct ProbeOrchestrator {
    sink: Arc<dyn TelemetrySink>,
}

impl ProbeOrchestrator {
    /// Orchestrator reporting degraded probes through `tracing`
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(sink: Arc<dyn TelemetrySink>) -> Self {
        Self { sink }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        if config.log_degraded {
            Self::new()
        } else {
            Self::with_sink(Arc::new(NullSink))
        }
    }

    /// Run one group. Only configuration problems are errors; probe failures
    /// are reported in-band through `ProbeResult::status`. Sink panics are
    /// contained the same way for one group and for many.
    pub async fn run_group(&self, group: &ProbeGroup) -> Result<ProbeGroupResult, ConfigError> {
        group.validate()?;
        Ok(self.collect(group).await)
    }

    /// Run several groups concurrently. Every group is validated before any
    /// probe starts.
    pub async fn run_groups(
        &self,
        groups: &[ProbeGroup],
    ) -> Result<BTreeMap<String, ProbeGroupResult>, ConfigError> {
        let mut names = HashSet::new();
        for group in groups {
            if !names.insert(group.name()) {
                return Err(ConfigError::DuplicateGroup(group.name().to_string()));
            }
            group.validate()?;
        }

        let started = Instant::now();
        let mut tasks = JoinSet::new();
        for group in groups {
            let orchestrator = self.clone();
            let group = group.clone();
            tasks.spawn(async move { orchestrator.collect(&group).await });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    results.insert(result.group.clone(), result);
                }
                Err(e) => error!("Probe group task failed: {}", e),
            }
        }

        // A group task only dies if the runtime cancels it; report it as
        // fully degraded rather than dropping the group.
        for group in groups {
            if !results.contains_key(group.name()) {
                let mut lost = ProbeGroupResult::new(group.name());
                fill_missing(&mut lost, group, "probe group task failed", elapsed_ms(started));
                lost.group_duration_ms = elapsed_ms(started);
                results.insert(group.name().to_string(), lost);
            }
        }

        Ok(results)
    }

    /// Run every group of a registry
    pub async fn run_registry(
        &self,
        registry: &ProbeRegistry,
    ) -> Result<BTreeMap<String, ProbeGroupResult>, ConfigError> {
        self.run_groups(registry.groups()).await
    }

    async fn collect(&self, group: &ProbeGroup) -> ProbeGroupResult {
        debug!(group = %group.name(), probes = group.len(), "Running probe group");

        let started = Instant::now();
        let mut waiters = JoinSet::new();
        for probe in group.probes() {
            let deadline = group.effective_timeout(probe.as_ref());
            waiters.spawn(run_probe(Arc::clone(probe), deadline));
        }

        let mut result = ProbeGroupResult::new(group.name());
        while let Some(joined) = waiters.join_next().await {
            match joined {
                Ok(probe_result) => {
                    result.results.insert(probe_result.name.clone(), probe_result);
                }
                Err(e) => error!(group = %group.name(), "Probe waiter failed: {}", e),
            }
        }
        fill_missing(&mut result, group, "probe waiter failed", elapsed_ms(started));
        result.group_duration_ms = elapsed_ms(started);

        self.report(&result);
        result
    }

    /// Hand a finished group to the sink. A panicking sink is logged and
    /// never costs the caller its results.
    fn report(&self, result: &ProbeGroupResult) {
        let reported = panic::catch_unwind(AssertUnwindSafe(|| {
            for probe_result in result.results.values() {
                if !probe_result.is_ok() {
                    self.sink.probe_degraded(&result.group, probe_result);
                }
            }
            self.sink.group_finished(result);
        }));
        if let Err(payload) = reported {
            error!(group = %result.group, "Telemetry sink panicked: {}", panic_message(payload));
        }
    }
}

impl Default for ProbeOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one probe on its own task and wait for it at most `deadline`.
async fn run_probe(probe: Arc<dyn Probe>, deadline: Duration) -> ProbeResult {
    let started = Instant::now();
    let name = probe.name().to_string();

    let task_probe = Arc::clone(&probe);
    let handle = tokio::spawn(async move { task_probe.run().await });

    match timeout(deadline, handle).await {
        Ok(Ok(Ok(value))) => ProbeResult::ok(name, value, elapsed_ms(started)),
        Ok(Ok(Err(e))) => {
            ProbeResult::error(name, probe.fallback(), format!("{:#}", e), elapsed_ms(started))
        }
        Ok(Err(e)) => {
            ProbeResult::error(name, probe.fallback(), join_failure(e), elapsed_ms(started))
        }
        // The JoinHandle is dropped with the timeout future, which detaches
        // the probe task instead of aborting it.
        Err(_) => ProbeResult::timeout(name, probe.fallback(), elapsed_ms(started)),
    }
}

fn fill_missing(result: &mut ProbeGroupResult, group: &ProbeGroup, reason: &str, duration_ms: u64) {
    for probe in group.probes() {
        if !result.results.contains_key(probe.name()) {
            result.results.insert(
                probe.name().to_string(),
                ProbeResult::error(probe.name(), probe.fallback(), reason, duration_ms),
            );
        }
    }
}

fn join_failure(e: JoinError) -> String {
    if e.is_panic() {
        format!("probe panicked: {}", panic_message(e.into_panic()))
    } else {
        "probe task cancelled".to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
