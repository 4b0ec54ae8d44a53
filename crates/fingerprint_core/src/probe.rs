//! Probe trait abstraction.
//!
//! A probe is one independent, possibly failing read of a signal. The
//! orchestrator only sees this trait, so the hundreds of concrete reads are
//! declared as `FnProbe` closures instead of hand-written wrappers each with
//! its own error handling.

use anyhow::Result;
use async_trait::async_trait;
use fingerprint_common::ConfigError;
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default per-probe timeout when neither the probe nor the group sets one
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1_000);

// ============================================================================
// Probe Trait
// ============================================================================

#[async_trait]
pub trait Probe: Send + Sync {
    /// Unique name within the probe's group
    fn name(&self) -> &str;

    /// Own deadline; `None` defers to the group default
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Value reported when the probe times out or fails
    fn fallback(&self) -> Value {
        Value::Null
    }

    async fn run(&self) -> Result<Value>;
}

// ============================================================================
// Closure Probe
// ============================================================================

/// Probe backed by an async closure.
///
/// ```rust,ignore
/// let cores = FnProbe::new("hardware_concurrency", || async { Ok(json!(8)) })
///     .with_timeout(Duration::from_millis(50))
///     .with_fallback(json!(0));
/// ```
pub struct FnProbe<F> {
    name: String,
    timeout: Option<Duration>,
    fallback: Value,
    run: F,
}

impl<F, Fut> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            name: name.into(),
            timeout: None,
            fallback: Value::Null,
            run,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_fallback(mut self, fallback: Value) -> Self {
        self.fallback = fallback;
        self
    }
}

#[async_trait]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn fallback(&self) -> Value {
        self.fallback.clone()
    }

    async fn run(&self) -> Result<Value> {
        (self.run)().await
    }
}

/// Probe that always resolves to a fixed value (static configuration, tests)
pub struct ValueProbe {
    name: String,
    value: Value,
}

impl ValueProbe {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[async_trait]
impl Probe for ValueProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<Value> {
        Ok(self.value.clone())
    }
}

// ============================================================================
// Probe Group
// ============================================================================

/// Named, ordered set of probes collected together
#[derive(Clone)]
pub struct ProbeGroup {
    name: String,
    default_timeout: Duration,
    probes: Vec<Arc<dyn Probe>>,
}

impl ProbeGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_timeout: DEFAULT_PROBE_TIMEOUT,
            probes: Vec::new(),
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probes.push(Arc::new(probe));
        self
    }

    pub fn push(&mut self, probe: Arc<dyn Probe>) {
        self.probes.push(probe);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn probes(&self) -> &[Arc<dyn Probe>] {
        &self.probes
    }

    pub fn contains(&self, probe: &str) -> bool {
        self.probes.iter().any(|p| p.name() == probe)
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Deadline actually applied to `probe`
    pub fn effective_timeout(&self, probe: &dyn Probe) -> Duration {
        probe.timeout().unwrap_or(self.default_timeout)
    }

    /// Check the group before anything runs: non-empty, unique names,
    /// non-zero deadlines.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.probes.is_empty() {
            return Err(ConfigError::EmptyGroup(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for probe in &self.probes {
            if !seen.insert(probe.name()) {
                return Err(ConfigError::DuplicateProbe {
                    group: self.name.clone(),
                    probe: probe.name().to_string(),
                });
            }
            if self.effective_timeout(probe.as_ref()).is_zero() {
                return Err(ConfigError::ZeroTimeout {
                    group: self.name.clone(),
                    probe: probe.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProbeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeGroup")
            .field("name", &self.name)
            .field("default_timeout", &self.default_timeout)
            .field(
                "probes",
                &self.probes.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
