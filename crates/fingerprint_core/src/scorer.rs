//! Deterministic evidence scoring.
//!
//! Every "detect X from several weak signals" decision goes through these
//! functions. They are pure: the same inputs always give bit-identical
//! verdicts, independent of when or in which group the signals were read.

use fingerprint_common::{BandTable, ConfigError, IndicatorSet, RankedVerdict, Verdict};
use std::cmp::Ordering;

/// Reduce an indicator set to a verdict.
///
/// `confidence` is the weighted mean match strength. With a total weight of
/// zero (including an empty set) it is 0 and the lowest band is chosen.
pub fn score(indicators: &IndicatorSet, bands: &BandTable) -> Result<Verdict, ConfigError> {
    indicators.validate()?;

    let mut matched_indicators = Vec::new();
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for (name, indicator) in indicators.iter() {
        total_weight += indicator.weight;
        weighted_sum += indicator.weight * indicator.matched.strength();
        if indicator.matched.is_match() {
            matched_indicators.push(name.to_string());
        }
    }

    let match_ratio = if indicators.is_empty() {
        0.0
    } else {
        matched_indicators.len() as f64 / indicators.len() as f64
    };

    Ok(Verdict {
        match_ratio,
        confidence: weighted_mean(weighted_sum, total_weight),
        category: band_label(bands, weighted_sum, total_weight),
        matched_indicators,
    })
}

/// Weighted average of several verdicts, re-banded with `bands`.
///
/// `weights` defaults to equal weights. The combined `matched_indicators`
/// is the ordered union of the components'.
pub fn combine(
    verdicts: &[Verdict],
    weights: Option<&[f64]>,
    bands: &BandTable,
) -> Result<Verdict, ConfigError> {
    if verdicts.is_empty() {
        return Err(ConfigError::EmptyVerdicts);
    }

    let equal = vec![1.0; verdicts.len()];
    let weights = weights.unwrap_or(equal.as_slice());
    if weights.len() != verdicts.len() {
        return Err(ConfigError::WeightCountMismatch {
            verdicts: verdicts.len(),
            weights: weights.len(),
        });
    }

    let mut confidence_sum = 0.0;
    let mut ratio_sum = 0.0;
    let mut total_weight = 0.0;
    let mut matched_indicators: Vec<String> = Vec::new();

    for (index, (verdict, &weight)) in verdicts.iter().zip(weights).enumerate() {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ConfigError::InvalidWeight {
                name: format!("verdict[{}]", index),
                weight,
            });
        }
        total_weight += weight;
        confidence_sum += weight * verdict.confidence.clamp(0.0, 1.0);
        ratio_sum += weight * verdict.match_ratio.clamp(0.0, 1.0);
        for name in &verdict.matched_indicators {
            if !matched_indicators.contains(name) {
                matched_indicators.push(name.clone());
            }
        }
    }

    Ok(Verdict {
        match_ratio: weighted_mean(ratio_sum, total_weight),
        confidence: weighted_mean(confidence_sum, total_weight),
        category: band_label(bands, confidence_sum, total_weight),
        matched_indicators,
    })
}

/// Score labelled candidates and order them by descending confidence.
/// Ties keep their input order.
pub fn rank(
    candidates: &[(&str, IndicatorSet)],
    bands: &BandTable,
) -> Result<Vec<RankedVerdict>, ConfigError> {
    let mut ranked = candidates
        .iter()
        .map(|(label, indicators)| {
            Ok(RankedVerdict {
                label: label.to_string(),
                verdict: score(indicators, bands)?,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    ranked.sort_by(|a, b| {
        b.verdict
            .confidence
            .partial_cmp(&a.verdict.confidence)
            .unwrap_or(Ordering::Equal)
    });
    Ok(ranked)
}

fn weighted_mean(sum: f64, total_weight: f64) -> f64 {
    if total_weight > 0.0 && total_weight.is_finite() {
        let mean = sum / total_weight;
        if mean.is_finite() {
            return mean.clamp(0.0, 1.0);
        }
    }
    0.0
}

fn band_label(bands: &BandTable, sum: f64, total_weight: f64) -> String {
    if total_weight > 0.0 {
        bands.select(weighted_mean(sum, total_weight)).label.clone()
    } else {
        bands.lowest().label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn low_high() -> BandTable {
        BandTable::from_pairs(&[(0.0, "low"), (0.5, "high")]).unwrap()
    }

    fn verdict(confidence: f64) -> Verdict {
        Verdict {
            match_ratio: confidence,
            confidence,
            category: String::new(),
            matched_indicators: Vec::new(),
        }
    }

    #[test]
    fn test_weighted_score() {
        let indicators = IndicatorSet::new()
            .weighted("x", true, 2.0)
            .weighted("y", false, 1.0);
        let v = score(&indicators, &low_high()).unwrap();
        assert_relative_eq!(v.confidence, 2.0 / 3.0);
        assert_relative_eq!(v.match_ratio, 0.5);
        assert_eq!(v.category, "high");
        assert_eq!(v.matched_indicators, vec!["x"]);
    }

    #[test]
    fn test_fractional_indicator() {
        let indicators = IndicatorSet::new()
            .weighted("degradation", 0.25, 1.0)
            .weighted("variance", 0.75, 1.0);
        let v = score(&indicators, &low_high()).unwrap();
        assert_relative_eq!(v.confidence, 0.5);
        assert_relative_eq!(v.match_ratio, 0.5);
        assert_eq!(v.matched_indicators, vec!["variance"]);
        assert_eq!(v.category, "high");
    }

    #[test]
    fn test_zero_weight_edge_case() {
        let indicators = IndicatorSet::new()
            .weighted("a", true, 0.0)
            .weighted("b", true, 0.0);
        let v = score(&indicators, &low_high()).unwrap();
        assert_eq!(v.confidence, 0.0);
        assert_eq!(v.category, "low");
        assert_relative_eq!(v.match_ratio, 1.0);
    }

    #[test]
    fn test_empty_set_scores_zero() {
        let v = score(&IndicatorSet::new(), &low_high()).unwrap();
        assert_eq!(v.confidence, 0.0);
        assert_eq!(v.match_ratio, 0.0);
        assert_eq!(v.category, "low");
    }

    #[test]
    fn test_negative_weight_rejected() {
        let indicators = IndicatorSet::new().weighted("a", true, -0.5);
        assert!(matches!(
            score(&indicators, &low_high()),
            Err(ConfigError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_threshold_tie_goes_to_higher_band() {
        let indicators = IndicatorSet::new().flag("a", true).flag("b", false);
        let v = score(&indicators, &low_high()).unwrap();
        assert_eq!(v.confidence, 0.5);
        assert_eq!(v.category, "high");
    }

    #[test]
    fn test_combine_equal_weights() {
        let v = combine(&[verdict(0.2), verdict(0.8)], None, &low_high()).unwrap();
        assert_relative_eq!(v.confidence, 0.5);
        assert_relative_eq!(v.match_ratio, 0.5);

        let v = combine(&[verdict(0.25), verdict(0.75)], None, &low_high()).unwrap();
        assert_eq!(v.category, "high");
    }

    #[test]
    fn test_combine_explicit_weights() {
        let v = combine(&[verdict(0.0), verdict(1.0)], Some(&[3.0, 1.0][..]), &low_high()).unwrap();
        assert_relative_eq!(v.confidence, 0.25);
        assert_eq!(v.category, "low");
    }

    #[test]
    fn test_combine_errors() {
        assert!(matches!(
            combine(&[], None, &low_high()),
            Err(ConfigError::EmptyVerdicts)
        ));
        assert!(matches!(
            combine(&[verdict(0.5)], Some(&[1.0, 2.0][..]), &low_high()),
            Err(ConfigError::WeightCountMismatch { verdicts: 1, weights: 2 })
        ));
        assert!(matches!(
            combine(&[verdict(0.5)], Some(&[f64::NAN][..]), &low_high()),
            Err(ConfigError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_combine_zero_weights() {
        let v = combine(&[verdict(0.9), verdict(0.9)], Some(&[0.0, 0.0][..]), &low_high()).unwrap();
        assert_eq!(v.confidence, 0.0);
        assert_eq!(v.category, "low");
    }

    #[test]
    fn test_combine_unions_matched_indicators() {
        let mut a = verdict(1.0);
        a.matched_indicators = vec!["webdriver".into(), "plugins".into()];
        let mut b = verdict(1.0);
        b.matched_indicators = vec!["plugins".into(), "swiftshader".into()];
        let v = combine(&[a, b], None, &low_high()).unwrap();
        assert_eq!(v.matched_indicators, vec!["webdriver", "plugins", "swiftshader"]);
    }

    #[test]
    fn test_rank_orders_by_confidence_stable() {
        let candidates = vec![
            ("intel", IndicatorSet::new().flag("a", false)),
            ("amd", IndicatorSet::new().flag("a", true)),
            ("arm", IndicatorSet::new().flag("a", false)),
        ];
        let ranked = rank(&candidates, &low_high()).unwrap();
        let labels: Vec<&str> = ranked.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["amd", "intel", "arm"]);
    }
}
