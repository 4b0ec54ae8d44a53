//! Fingerprint Common - shared types for probe collection and evidence scoring.
//!
//! Plain serializable data only: the orchestrator and scorer live in
//! `fingerprint_core`.

pub mod config;
pub mod error;
pub mod evidence;
pub mod probe_result;

pub use config::*;
pub use error::*;
pub use evidence::*;
pub use probe_result::*;
