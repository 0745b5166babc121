//! Scoring policy: the single place where reference ranges, weights, status
//! bands and insight thresholds live.
//!
//! The policy is plain data. It can be inspected in tests, tuned through the
//! TOML configuration file, and validated once before an engine uses it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::classifier::StatusBands;
use crate::error::PolicyError;
use crate::insights::InsightPolicy;
use crate::models::MetricKind;
use crate::normalizer::{BandCurve, ScoringCurve};

/// How one metric is scored and how much it counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPolicy {
    /// Relative importance in the composite score
    pub weight: f64,

    /// Mapping from raw value to sub-score
    pub curve: ScoringCurve,
}

impl MetricPolicy {
    pub fn new(weight: f64, curve: ScoringCurve) -> Self {
        MetricPolicy { weight, curve }
    }
}

/// Complete scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Trailing window used when the caller does not pick one
    pub default_window_days: u32,

    /// Per-metric weights and curves. Metrics absent from the map are not scored.
    pub metrics: BTreeMap<MetricKind, MetricPolicy>,

    /// Composite score to status thresholds
    pub bands: StatusBands,

    /// Insight and recommendation rule thresholds
    pub insights: InsightPolicy,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        let mut metrics = BTreeMap::new();

        metrics.insert(
            MetricKind::HeartRate,
            MetricPolicy::new(
                0.15,
                ScoringCurve::Band {
                    ideal_low: 60.0,
                    ideal_high: 100.0,
                    outer_span: 40.0,
                },
            ),
        );
        metrics.insert(
            MetricKind::BloodPressure,
            MetricPolicy::new(
                0.15,
                ScoringCurve::PairedBand {
                    primary: BandCurve::new(100.0, 120.0, 40.0),
                    secondary: BandCurve::new(65.0, 80.0, 25.0),
                },
            ),
        );
        metrics.insert(
            MetricKind::Steps,
            MetricPolicy::new(0.10, ScoringCurve::Ramp { target: 10_000.0 }),
        );
        metrics.insert(
            MetricKind::SleepDuration,
            MetricPolicy::new(
                0.20,
                ScoringCurve::Band {
                    ideal_low: 7.0,
                    ideal_high: 9.0,
                    outer_span: 4.0,
                },
            ),
        );
        metrics.insert(
            MetricKind::Stress,
            MetricPolicy::new(0.15, ScoringCurve::LowerIsBetter { min: 1.0, max: 10.0 }),
        );
        metrics.insert(
            MetricKind::Mood,
            MetricPolicy::new(0.15, ScoringCurve::HigherIsBetter { min: 1.0, max: 10.0 }),
        );
        metrics.insert(
            MetricKind::Anxiety,
            MetricPolicy::new(0.05, ScoringCurve::LowerIsBetter { min: 1.0, max: 10.0 }),
        );
        metrics.insert(
            MetricKind::Energy,
            MetricPolicy::new(0.05, ScoringCurve::HigherIsBetter { min: 1.0, max: 10.0 }),
        );

        ScoringPolicy {
            default_window_days: 14,
            metrics,
            bands: StatusBands::default(),
            insights: InsightPolicy::default(),
        }
    }
}

impl ScoringPolicy {
    pub fn metric(&self, kind: MetricKind) -> Option<&MetricPolicy> {
        self.metrics.get(&kind)
    }

    /// Weight of a metric, 0 when it is not scored
    pub fn weight(&self, kind: MetricKind) -> f64 {
        self.metric(kind).map(|m| m.weight).unwrap_or(0.0)
    }

    /// Ideal band of a banded metric, systolic for blood pressure
    ///
    /// Insight rules take their low/high split and quoted ranges from here.
    pub fn ideal_band(&self, kind: MetricKind) -> Option<(f64, f64)> {
        match self.metric(kind)?.curve {
            ScoringCurve::Band {
                ideal_low,
                ideal_high,
                ..
            } => Some((ideal_low, ideal_high)),
            ScoringCurve::PairedBand { primary, .. } => Some((primary.ideal_low, primary.ideal_high)),
            _ => None,
        }
    }

    /// Reject policies that cannot produce a meaningful score
    pub fn validate(&self) -> Result<(), PolicyError> {
        let mut total_weight = 0.0;

        for (kind, metric) in &self.metrics {
            if !metric.weight.is_finite() || metric.weight < 0.0 {
                return Err(PolicyError::InvalidWeight {
                    metric: kind.as_str().to_string(),
                    weight: metric.weight,
                });
            }
            if let Some(reason) = metric.curve.validation_error() {
                return Err(PolicyError::InvalidCurve {
                    metric: kind.as_str().to_string(),
                    reason,
                });
            }
            total_weight += metric.weight;
        }

        if total_weight <= 0.0 {
            return Err(PolicyError::NoWeight);
        }

        self.bands.validate()?;
        self.insights.validate()?;

        if self.default_window_days == 0 {
            return Err(PolicyError::InvalidInsightSetting {
                setting: "default_window_days".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.validate(), Ok(()));
        assert_eq!(policy.metrics.len(), MetricKind::ALL.len());

        let total: f64 = policy.metrics.values().map(|m| m.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut policy = ScoringPolicy::default();
        policy.metrics.get_mut(&MetricKind::Mood).unwrap().weight = -0.1;

        assert_eq!(
            policy.validate(),
            Err(PolicyError::InvalidWeight {
                metric: "mood".to_string(),
                weight: -0.1
            })
        );
    }

    #[test]
    fn test_rejects_all_zero_weights() {
        let mut policy = ScoringPolicy::default();
        for metric in policy.metrics.values_mut() {
            metric.weight = 0.0;
        }
        assert_eq!(policy.validate(), Err(PolicyError::NoWeight));
    }

    #[test]
    fn test_rejects_degenerate_curve() {
        let mut policy = ScoringPolicy::default();
        policy.metrics.insert(
            MetricKind::Steps,
            MetricPolicy::new(0.1, ScoringCurve::Ramp { target: -5.0 }),
        );
        assert!(matches!(
            policy.validate(),
            Err(PolicyError::InvalidCurve { .. })
        ));
    }

    #[test]
    fn test_ideal_bands() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.ideal_band(MetricKind::HeartRate), Some((60.0, 100.0)));
        assert_eq!(policy.ideal_band(MetricKind::SleepDuration), Some((7.0, 9.0)));
        assert_eq!(policy.ideal_band(MetricKind::Steps), None);
        assert_eq!(policy.weight(MetricKind::SleepDuration), 0.20);
    }

    #[test]
    fn test_policy_toml_roundtrip() {
        let policy = ScoringPolicy::default();
        let toml_str = toml::to_string(&policy).unwrap();
        let parsed: ScoringPolicy = toml::from_str(&toml_str).unwrap();
        assert_eq!(policy, parsed);
    }
}
