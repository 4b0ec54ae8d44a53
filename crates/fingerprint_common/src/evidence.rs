//! Evidence model: indicators, band tables and verdicts.
//!
//! These are the inputs and outputs of the scorer. Everything here is plain
//! data so verdicts can be shipped inside the fingerprint as-is.

use crate::error::{ConfigError, Result};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Indicators
// ============================================================================

/// How strongly a single indicator matched
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Match {
    Flag(bool),
    /// Fractional strength, clamped into [0, 1] when read
    Degree(f64),
}

impl Match {
    /// Contribution to the weighted confidence, always in [0, 1].
    pub fn strength(&self) -> f64 {
        match *self {
            Match::Flag(true) => 1.0,
            Match::Flag(false) => 0.0,
            Match::Degree(d) if d.is_nan() => 0.0,
            Match::Degree(d) => d.clamp(0.0, 1.0),
        }
    }

    /// Counts towards the unweighted match ratio
    pub fn is_match(&self) -> bool {
        match *self {
            Match::Flag(b) => b,
            Match::Degree(_) => self.strength() >= 0.5,
        }
    }
}

impl From<bool> for Match {
    fn from(b: bool) -> Self {
        Match::Flag(b)
    }
}

impl From<f64> for Match {
    fn from(d: f64) -> Self {
        Match::Degree(d)
    }
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub matched: Match,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Indicator {
    pub fn new(matched: impl Into<Match>, weight: f64) -> Self {
        Self {
            matched: matched.into(),
            weight,
        }
    }
}

/// Named, ordered collection of indicators.
///
/// Inserting a name that already exists replaces the earlier indicator, so
/// names are unique. Insertion order fixes the summation order used by the
/// scorer, which keeps results bit-for-bit reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    entries: Vec<(String, Indicator)>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, indicator: Indicator) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = indicator,
            None => self.entries.push((name, indicator)),
        }
    }

    /// Boolean indicator with the default weight of 1
    pub fn flag(mut self, name: impl Into<String>, matched: bool) -> Self {
        self.insert(name, Indicator::new(matched, default_weight()));
        self
    }

    pub fn weighted(
        mut self,
        name: impl Into<String>,
        matched: impl Into<Match>,
        weight: f64,
    ) -> Self {
        self.insert(name, Indicator::new(matched, weight));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Indicator> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, i)| i)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Indicator)> {
        self.entries.iter().map(|(n, i)| (n.as_str(), i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reject negative or non-finite weights.
    pub fn validate(&self) -> Result<()> {
        for (name, indicator) in &self.entries {
            if !indicator.weight.is_finite() || indicator.weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: name.clone(),
                    weight: indicator.weight,
                });
            }
        }
        Ok(())
    }
}

impl Serialize for IndicatorSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(n, i)| (n, i)))
    }
}

/// Keeps wire order and rejects repeated names
struct IndicatorSetVisitor;

impl<'de> Visitor<'de> for IndicatorSetVisitor {
    type Value = IndicatorSet;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of indicator name to {matched, weight}")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries: Vec<(String, Indicator)> = Vec::new();
        while let Some((name, indicator)) = access.next_entry::<String, Indicator>()? {
            if entries.iter().any(|(n, _)| *n == name) {
                return Err(de::Error::custom(format!("duplicate indicator '{}'", name)));
            }
            entries.push((name, indicator));
        }
        Ok(IndicatorSet { entries })
    }
}

impl<'de> Deserialize<'de> for IndicatorSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(IndicatorSetVisitor)
    }
}

// ============================================================================
// Bands
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub threshold: f64,
    pub label: String,
}

impl Band {
    pub fn new(threshold: f64, label: impl Into<String>) -> Self {
        Self {
            threshold,
            label: label.into(),
        }
    }
}

/// Validated band table: non-empty, strictly ascending, starting at 0.
///
/// Because the first band sits at 0 every confidence in [0, 1] maps to
/// exactly one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Band>", into = "Vec<Band>")]
pub struct BandTable {
    bands: Vec<Band>,
}

impl BandTable {
    pub fn new(bands: Vec<Band>) -> Result<Self> {
        let first = bands.first().ok_or(ConfigError::EmptyBands)?;
        for band in &bands {
            if !band.threshold.is_finite() || !(0.0..=1.0).contains(&band.threshold) {
                return Err(ConfigError::ThresholdOutOfRange {
                    label: band.label.clone(),
                    threshold: band.threshold,
                });
            }
        }
        if first.threshold != 0.0 {
            return Err(ConfigError::MissingZeroBand(first.threshold));
        }
        for pair in bands.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(ConfigError::UnsortedBands {
                    previous: pair[0].threshold,
                    next: pair[1].threshold,
                });
            }
        }
        Ok(Self { bands })
    }

    /// Shorthand for literal tables: `BandTable::from_pairs(&[(0.0, "low"), (0.5, "high")])`
    pub fn from_pairs(pairs: &[(f64, &str)]) -> Result<Self> {
        Self::new(pairs.iter().map(|(t, l)| Band::new(*t, *l)).collect())
    }

    /// Highest band whose threshold is at or below `confidence`.
    pub fn select(&self, confidence: f64) -> &Band {
        self.bands
            .iter()
            .rev()
            .find(|b| b.threshold <= confidence)
            .unwrap_or(&self.bands[0])
    }

    pub fn lowest(&self) -> &Band {
        &self.bands[0]
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.bands.iter().map(|b| b.label.as_str())
    }
}

impl TryFrom<Vec<Band>> for BandTable {
    type Error = ConfigError;

    fn try_from(bands: Vec<Band>) -> Result<Self> {
        BandTable::new(bands)
    }
}

impl From<BandTable> for Vec<Band> {
    fn from(table: BandTable) -> Self {
        table.bands
    }
}

// ============================================================================
// Verdicts
// ============================================================================

/// Scorer output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Unweighted matches / total, kept for diagnostics
    pub match_ratio: f64,
    /// Weighted match strength in [0, 1]
    pub confidence: f64,
    pub category: String,
    pub matched_indicators: Vec<String>,
}

/// One candidate of a ranking, e.g. a CPU vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedVerdict {
    pub label: String,
    pub verdict: Verdict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_strength_clamps() {
        assert_eq!(Match::Degree(1.7).strength(), 1.0);
        assert_eq!(Match::Degree(-0.3).strength(), 0.0);
        assert_eq!(Match::Degree(f64::NAN).strength(), 0.0);
        assert_eq!(Match::Flag(true).strength(), 1.0);
        assert!(Match::Degree(0.5).is_match());
        assert!(!Match::Degree(0.49).is_match());
    }

    #[test]
    fn test_insert_replaces_existing_name() {
        let set = IndicatorSet::new()
            .flag("webdriver", false)
            .flag("plugins", true)
            .flag("webdriver", true);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("webdriver").unwrap().matched, Match::Flag(true));
        let names: Vec<&str> = set.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["webdriver", "plugins"]);
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let set = IndicatorSet::new().weighted("x", true, -1.0);
        assert!(matches!(set.validate(), Err(ConfigError::InvalidWeight { .. })));
        let set = IndicatorSet::new().weighted("x", true, f64::INFINITY);
        assert!(set.validate().is_err());
    }

    #[test]
    fn test_indicator_set_wire_form() {
        let set: IndicatorSet =
            serde_json::from_str(r#"{"x": {"matched": true, "weight": 2}, "y": {"matched": 0.25}}"#)
                .unwrap();
        assert_eq!(set.get("x").unwrap().weight, 2.0);
        assert_eq!(set.get("y").unwrap().weight, 1.0);
        assert_eq!(set.get("y").unwrap().matched, Match::Degree(0.25));
    }

    #[test]
    fn test_indicator_set_json_keeps_order() {
        let set = IndicatorSet::new()
            .weighted("webdriver", true, 3.0)
            .weighted("automation", 0.75, 1.0)
            .flag("no_plugins", false);
        let text = serde_json::to_string(&set).unwrap();
        let back: IndicatorSet = serde_json::from_str(&text).unwrap();
        assert_eq!(back, set);
        let names: Vec<&str> = back.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["webdriver", "automation", "no_plugins"]);
    }

    #[test]
    fn test_indicator_set_rejects_repeated_name() {
        let parsed: std::result::Result<IndicatorSet, _> =
            serde_json::from_str(r#"{"x": {"matched": true}, "x": {"matched": false}}"#);
        let err = parsed.unwrap_err();
        assert!(err.to_string().contains("duplicate indicator 'x'"));
    }

    #[test]
    fn test_band_table_validation() {
        assert!(matches!(BandTable::new(vec![]), Err(ConfigError::EmptyBands)));
        assert!(matches!(
            BandTable::from_pairs(&[(0.1, "low")]),
            Err(ConfigError::MissingZeroBand(_))
        ));
        assert!(matches!(
            BandTable::from_pairs(&[(0.0, "low"), (0.6, "high"), (0.4, "mid")]),
            Err(ConfigError::UnsortedBands { .. })
        ));
        assert!(matches!(
            BandTable::from_pairs(&[(0.0, "low"), (0.5, "a"), (0.5, "b")]),
            Err(ConfigError::UnsortedBands { .. })
        ));
        assert!(matches!(
            BandTable::from_pairs(&[(0.0, "low"), (1.5, "high")]),
            Err(ConfigError::ThresholdOutOfRange { .. })
        ));
    }

    #[test]
    fn test_band_select_ties_go_up() {
        let table = BandTable::from_pairs(&[(0.0, "low"), (0.5, "mid"), (0.8, "high")]).unwrap();
        assert_eq!(table.select(0.0).label, "low");
        assert_eq!(table.select(0.49).label, "low");
        assert_eq!(table.select(0.5).label, "mid");
        assert_eq!(table.select(0.8).label, "high");
        assert_eq!(table.select(1.0).label, "high");
    }

    #[test]
    fn test_band_table_deserialize_validates() {
        let bad: std::result::Result<BandTable, _> =
            serde_json::from_str(r#"[{"threshold": 0.2, "label": "x"}]"#);
        assert!(bad.is_err());
        let good: BandTable = serde_json::from_str(
            r#"[{"threshold": 0, "label": "x"}, {"threshold": 0.5, "label": "y"}]"#,
        )
        .unwrap();
        assert_eq!(good.labels().collect::<Vec<_>>(), vec!["x", "y"]);
    }
}
