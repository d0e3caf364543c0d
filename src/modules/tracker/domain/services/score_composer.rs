use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::modules::tracker::domain::value_objects::{LabelBands, ScoreBand};
use crate::shared::errors::{AppError, AppResult};

/// Normalized scoring inputs for one secondary key.
///
/// Numeric values are raw (e.g. liquidity in USD); each factor's reference
/// scale maps them into `[0, 1]`. Flags drive discrete adjustments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredFeatureSet {
    pub values: BTreeMap<String, f64>,
    pub flags: BTreeMap<String, bool>,
}

impl ScoredFeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: &str, value: f64) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn with_flag(mut self, name: &str, flag: bool) -> Self {
        self.flags.insert(name.to_string(), flag);
        self
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }
}

/// Weighted contribution of one numeric feature, in score points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorWeight {
    pub feature: String,
    pub weight: f64,
    pub reference_max: f64,
    /// Normalized level under which `low_reason` is reported.
    #[serde(default)]
    pub low_below: Option<f64>,
    #[serde(default)]
    pub low_reason: Option<String>,
    /// Normalized level at or above which `high_reason` is reported.
    #[serde(default)]
    pub high_at: Option<f64>,
    #[serde(default)]
    pub high_reason: Option<String>,
}

impl FactorWeight {
    pub fn new(feature: &str, weight: f64, reference_max: f64) -> Self {
        Self {
            feature: feature.to_string(),
            weight,
            reference_max,
            low_below: None,
            low_reason: None,
            high_at: None,
            high_reason: None,
        }
    }

    pub fn low(mut self, below: f64, reason: &str) -> Self {
        self.low_below = Some(below);
        self.low_reason = Some(reason.to_string());
        self
    }

    pub fn high(mut self, at: f64, reason: &str) -> Self {
        self.high_at = Some(at);
        self.high_reason = Some(reason.to_string());
        self
    }
}

/// Discrete bonus (positive) or penalty (negative) applied when a flag is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub flag: String,
    pub points: f64,
    pub reason: String,
}

impl Adjustment {
    pub fn new(flag: &str, points: f64, reason: &str) -> Self {
        Self {
            flag: flag.to_string(),
            points,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    pub factors: Vec<FactorWeight>,
    pub adjustments: Vec<Adjustment>,
    pub bands: LabelBands,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            factors: vec![
                FactorWeight::new("tx_count", 30.0, 500.0)
                    .low(0.1, "Low transaction activity")
                    .high(1.0, "High transaction activity"),
                FactorWeight::new("liquidity_usd", 25.0, 10_000.0)
                    .low(0.2, "Thin liquidity")
                    .high(1.0, "Deep liquidity"),
                FactorWeight::new("holders", 20.0, 1_000.0)
                    .low(0.05, "Few holders")
                    .high(1.0, "Broad holder base"),
            ],
            adjustments: vec![
                Adjustment::new("verified", 10.0, "Verified token"),
                Adjustment::new("recently_created", -15.0, "Recently created (under 7 days)"),
            ],
            bands: LabelBands::default(),
        }
    }
}

impl WeightTable {
    pub fn with_bands(mut self, bands: LabelBands) -> Self {
        self.bands = bands;
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        for factor in &self.factors {
            if !factor.weight.is_finite() {
                return Err(AppError::config(format!(
                    "Weight for '{}' must be finite",
                    factor.feature
                )));
            }
            if !factor.reference_max.is_finite() || factor.reference_max <= 0.0 {
                return Err(AppError::config(format!(
                    "Reference max for '{}' must be positive",
                    factor.feature
                )));
            }
        }
        if let Some(bad) = self.adjustments.iter().find(|a| !a.points.is_finite()) {
            return Err(AppError::config(format!(
                "Adjustment for '{}' must be finite",
                bad.flag
            )));
        }
        self.bands.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub value: u8,
    pub label: ScoreBand,
    pub reasons: Vec<String>,
    pub confidence: f32,
}

/// Pluggable scoring seam. Implementations must be pure.
pub trait RiskScorer: Send + Sync {
    fn score(&self, features: &ScoredFeatureSet) -> ScoreResult;
}

/// Maps a raw feature into `[0, 1]` against its reference scale.
pub fn normalize(raw: f64, reference_max: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 || reference_max <= 0.0 {
        return 0.0;
    }
    (raw / reference_max).min(1.0)
}

pub fn confidence(value: u8) -> f32 {
    match value {
        v if v > 85 => 0.95,
        v if v > 60 => 0.85,
        v if v > 40 => 0.7,
        _ => 0.5,
    }
}

/// Weighted score in `0..=100` with band label and ordered reasons.
pub fn score(features: &ScoredFeatureSet, weights: &WeightTable) -> ScoreResult {
    let mut total = 0.0;
    let mut reasons = Vec::new();

    for factor in &weights.factors {
        let Some(raw) = features.value(&factor.feature) else {
            reasons.push(format!("{} unavailable", factor.feature));
            continue;
        };

        let normalized = normalize(raw, factor.reference_max);
        total += factor.weight * normalized;

        match (factor.high_at, &factor.high_reason, factor.low_below, &factor.low_reason) {
            (Some(high), Some(reason), _, _) if normalized >= high => reasons.push(reason.clone()),
            (_, _, Some(low), Some(reason)) if normalized < low => reasons.push(reason.clone()),
            _ => {}
        }
    }

    for adjustment in &weights.adjustments {
        if features.flag(&adjustment.flag) == Some(true) {
            total += adjustment.points;
            reasons.push(adjustment.reason.clone());
        }
    }

    let value = if total.is_finite() {
        total.round().clamp(0.0, 100.0) as u8
    } else {
        0
    };

    ScoreResult {
        value,
        label: weights.bands.band_for(value),
        reasons,
        confidence: confidence(value),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoreComposer {
    weights: WeightTable,
}

impl ScoreComposer {
    pub fn new(weights: WeightTable) -> AppResult<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }
}

impl RiskScorer for ScoreComposer {
    fn score(&self, features: &ScoredFeatureSet) -> ScoreResult {
        score(features, &self.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_features() -> ScoredFeatureSet {
        ScoredFeatureSet::new()
            .with_value("tx_count", 1_000.0)
            .with_value("liquidity_usd", 50_000.0)
            .with_value("holders", 5_000.0)
            .with_flag("verified", true)
            .with_flag("recently_created", false)
    }

    #[test]
    fn test_saturated_features_hit_weight_ceiling() {
        let result = score(&full_features(), &WeightTable::default());
        // 30 + 25 + 20 + 10
        assert_eq!(result.value, 85);
        assert_eq!(result.label, ScoreBand::High);
        assert_eq!(
            result.reasons,
            vec![
                "High transaction activity",
                "Deep liquidity",
                "Broad holder base",
                "Verified token"
            ]
        );
        assert_eq!(result.confidence, 0.85);
    }

    #[test]
    fn test_recent_creation_penalty() {
        let features = ScoredFeatureSet::new()
            .with_value("tx_count", 250.0)
            .with_value("liquidity_usd", 5_000.0)
            .with_value("holders", 100.0)
            .with_flag("recently_created", true);

        let result = score(&features, &WeightTable::default());
        // 15 + 12.5 + 2 - 15 = 14.5 -> 15 (round half away from zero)
        assert_eq!(result.value, 15);
        assert_eq!(result.label, ScoreBand::Low);
        assert_eq!(result.reasons, vec!["Recently created (under 7 days)"]);
    }

    #[test]
    fn test_missing_features_are_reported_in_order() {
        let features = ScoredFeatureSet::new().with_value("holders", 0.0);
        let result = score(&features, &WeightTable::default());
        assert_eq!(result.value, 0);
        assert_eq!(
            result.reasons,
            vec!["tx_count unavailable", "liquidity_usd unavailable", "Few holders"]
        );
    }

    #[test]
    fn test_score_always_within_bounds() {
        let weights = WeightTable {
            factors: vec![FactorWeight::new("x", 80.0, 1.0)],
            adjustments: vec![
                Adjustment::new("boost", 60.0, "boost"),
                Adjustment::new("sink", -500.0, "sink"),
            ],
            bands: LabelBands::default(),
        };

        for raw in [f64::NEG_INFINITY, -10.0, 0.0, 0.5, 1.0, 1e12, f64::NAN] {
            for (boost, sink) in [(false, false), (true, false), (false, true), (true, true)] {
                let features = ScoredFeatureSet::new()
                    .with_value("x", raw)
                    .with_flag("boost", boost)
                    .with_flag("sink", sink);
                let result = score(&features, &weights);
                assert!(result.value <= 100, "raw={} value={}", raw, result.value);
            }
        }

        let capped = score(
            &ScoredFeatureSet::new().with_value("x", 2.0).with_flag("boost", true),
            &weights,
        );
        assert_eq!(capped.value, 100);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let composer = ScoreComposer::default();
        let first = composer.score(&full_features());
        for _ in 0..10 {
            assert_eq!(composer.score(&full_features()), first);
        }
    }

    #[test]
    fn test_invalid_tables_rejected() {
        let mut weights = WeightTable::default();
        weights.factors[0].reference_max = 0.0;
        assert!(ScoreComposer::new(weights).is_err());

        let weights = WeightTable::default().with_bands(LabelBands {
            medium_from: 80,
            high_from: 20,
        });
        assert!(ScoreComposer::new(weights).is_err());
    }

    #[test]
    fn test_normalize_and_confidence() {
        assert_eq!(normalize(250.0, 500.0), 0.5);
        assert_eq!(normalize(5_000.0, 500.0), 1.0);
        assert_eq!(normalize(-1.0, 500.0), 0.0);
        assert_eq!(normalize(f64::NAN, 500.0), 0.0);
        assert_eq!(confidence(90), 0.95);
        assert_eq!(confidence(41), 0.7);
        assert_eq!(confidence(10), 0.5);
    }
}
