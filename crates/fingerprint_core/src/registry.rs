//! Probe registry - static assignment of probes to named groups

use crate::probe::{Probe, ProbeGroup, DEFAULT_PROBE_TIMEOUT};
use fingerprint_common::{ConfigError, OrchestratorConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Well-known group names used by the collector
pub const HARDWARE: &str = "hardware";
pub const BROWSER: &str = "browser";
pub const NETWORK: &str = "network";
pub const ENVIRONMENT: &str = "environment";

/// Registry of probe groups, kept in registration order
pub struct ProbeRegistry {
    groups: Vec<ProbeGroup>,
    default_timeout: Duration,
}

impl ProbeRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            default_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Empty registry whose groups inherit the configured default timeout
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new().with_default_timeout(config.default_timeout())
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Register a probe into `group`, creating the group on first use.
    /// Probe names must be unique within their group.
    pub fn register(
        &mut self,
        group: &str,
        probe: impl Probe + 'static,
    ) -> Result<(), ConfigError> {
        self.register_arc(group, Arc::new(probe))
    }

    pub fn register_arc(&mut self, group: &str, probe: Arc<dyn Probe>) -> Result<(), ConfigError> {
        let default_timeout = self.default_timeout;
        let target = match self.groups.iter().position(|g| g.name() == group) {
            Some(index) => &mut self.groups[index],
            None => {
                self.groups
                    .push(ProbeGroup::new(group).with_default_timeout(default_timeout));
                let last = self.groups.len() - 1;
                &mut self.groups[last]
            }
        };

        if target.contains(probe.name()) {
            return Err(ConfigError::DuplicateProbe {
                group: group.to_string(),
                probe: probe.name().to_string(),
            });
        }

        debug!(group = %group, probe = %probe.name(), "Registered probe");
        target.push(probe);
        Ok(())
    }

    /// Get group by name
    pub fn group(&self, name: &str) -> Option<&ProbeGroup> {
        self.groups.iter().find(|g| g.name() == name)
    }

    pub fn groups(&self) -> &[ProbeGroup] {
        &self.groups
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name()).collect()
    }

    /// Count probes across all groups
    pub fn count(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
