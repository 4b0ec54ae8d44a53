//! Error types for fingerprint collection.
//!
//! Probe failures never show up here: they are folded into
//! `ProbeResult::status`. Only malformed configuration is an error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Duplicate probe '{probe}' in group '{group}'")]
    DuplicateProbe { group: String, probe: String },

    #[error("Duplicate probe group '{0}'")]
    DuplicateGroup(String),

    #[error("Probe group '{0}' has no probes")]
    EmptyGroup(String),

    #[error("Probe '{probe}' in group '{group}' has a zero timeout")]
    ZeroTimeout { group: String, probe: String },

    #[error("Band table is empty")]
    EmptyBands,

    #[error("Band table must start at threshold 0, first threshold is {0}")]
    MissingZeroBand(f64),

    #[error("Band thresholds must be strictly ascending: {previous} then {next}")]
    UnsortedBands { previous: f64, next: f64 },

    #[error("Band '{label}' has threshold {threshold} outside [0, 1]")]
    ThresholdOutOfRange { label: String, threshold: f64 },

    #[error("Indicator '{name}' has invalid weight {weight}")]
    InvalidWeight { name: String, weight: f64 },

    #[error("Unknown key '{key}' in [detectors.{detector}.{section}]")]
    UnknownWeight {
        detector: String,
        section: &'static str,
        key: String,
    },

    #[error("Cannot combine an empty list of verdicts")]
    EmptyVerdicts,

    #[error("Got {weights} weights for {verdicts} verdicts")]
    WeightCountMismatch { verdicts: usize, weights: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Stable short code, used as a structured logging field.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::DuplicateProbe { .. } => "duplicate_probe",
            ConfigError::DuplicateGroup(_) => "duplicate_group",
            ConfigError::EmptyGroup(_) => "empty_group",
            ConfigError::ZeroTimeout { .. } => "zero_timeout",
            ConfigError::EmptyBands => "empty_bands",
            ConfigError::MissingZeroBand(_) => "missing_zero_band",
            ConfigError::UnsortedBands { .. } => "unsorted_bands",
            ConfigError::ThresholdOutOfRange { .. } => "threshold_out_of_range",
            ConfigError::InvalidWeight { .. } => "invalid_weight",
            ConfigError::UnknownWeight { .. } => "unknown_weight",
            ConfigError::EmptyVerdicts => "empty_verdicts",
            ConfigError::WeightCountMismatch { .. } => "weight_count_mismatch",
            ConfigError::Io(_) => "io",
            ConfigError::Parse(_) => "parse",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
