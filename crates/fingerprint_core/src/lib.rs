//! Fingerprint Core - probe orchestration and evidence scoring
//!
//! Probes are registered into named groups and run concurrently with a
//! per-probe deadline. Every probe yields exactly one result: its value,
//! or its fallback when it failed or ran out of time. Detectors turn the
//! results into weighted indicators and score them into a banded verdict.

pub mod detectors;
pub mod fingerprint;
pub mod logging;
pub mod orchestrator;
pub mod probe;
pub mod registry;
pub mod scorer;
pub mod telemetry;

pub use detectors::{default_detectors, Detection, Detector, Signals};
pub use fingerprint::{Collector, Fingerprint};
pub use logging::init_logging;
pub use orchestrator::ProbeOrchestrator;
pub use probe::{FnProbe, Probe, ProbeGroup, ValueProbe, DEFAULT_PROBE_TIMEOUT};
pub use registry::ProbeRegistry;
pub use scorer::{combine, rank, score};
pub use telemetry::{NullSink, RecordingSink, TelemetrySink, TracingSink};

pub use fingerprint_common::*;
