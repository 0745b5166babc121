//! Composite score to status classification

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PolicyError;

/// Discrete wellness status, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WellnessStatus {
    Critical,
    Fair,
    Moderate,
    Good,
    Excellent,
}

impl fmt::Display for WellnessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WellnessStatus::Critical => write!(f, "Critical"),
            WellnessStatus::Fair => write!(f, "Fair"),
            WellnessStatus::Moderate => write!(f, "Moderate"),
            WellnessStatus::Good => write!(f, "Good"),
            WellnessStatus::Excellent => write!(f, "Excellent"),
        }
    }
}

impl WellnessStatus {
    /// Classify with the default bands
    pub fn from_score(score: f64) -> Self {
        StatusBands::default().classify(score)
    }

    /// Get status description
    pub fn description(&self) -> &'static str {
        match self {
            WellnessStatus::Excellent => "All tracked signals are in healthy ranges",
            WellnessStatus::Good => "Mostly healthy with minor areas to watch",
            WellnessStatus::Moderate => "Several metrics are drifting from healthy ranges",
            WellnessStatus::Fair => "Multiple metrics need attention",
            WellnessStatus::Critical => "Metrics are far from healthy ranges, consider seeking support",
        }
    }
}

/// Closed lower bounds of each status band
///
/// `score >= excellent` is Excellent, `score >= good` is Good and so on;
/// anything below `fair` is Critical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusBands {
    pub excellent: f64,
    pub good: f64,
    pub moderate: f64,
    pub fair: f64,
}

impl Default for StatusBands {
    fn default() -> Self {
        StatusBands {
            excellent: 85.0,
            good: 70.0,
            moderate: 50.0,
            fair: 30.0,
        }
    }
}

impl StatusBands {
    /// Map a composite score to exactly one status
    ///
    /// Non-finite scores classify as Critical.
    pub fn classify(&self, score: f64) -> WellnessStatus {
        if score >= self.excellent {
            WellnessStatus::Excellent
        } else if score >= self.good {
            WellnessStatus::Good
        } else if score >= self.moderate {
            WellnessStatus::Moderate
        } else if score >= self.fair {
            WellnessStatus::Fair
        } else {
            WellnessStatus::Critical
        }
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        let ordered = [self.excellent, self.good, self.moderate, self.fair];
        let in_range = ordered.iter().all(|b| b.is_finite() && (0.0..=100.0).contains(b));
        let descending = ordered.windows(2).all(|pair| pair[0] > pair[1]);

        if in_range && descending {
            Ok(())
        } else {
            Err(PolicyError::UnorderedBands)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(WellnessStatus::from_score(100.0), WellnessStatus::Excellent);
        assert_eq!(WellnessStatus::from_score(85.0), WellnessStatus::Excellent);
        assert_eq!(WellnessStatus::from_score(84.999), WellnessStatus::Good);
        assert_eq!(WellnessStatus::from_score(70.0), WellnessStatus::Good);
        assert_eq!(WellnessStatus::from_score(69.999), WellnessStatus::Moderate);
        assert_eq!(WellnessStatus::from_score(50.0), WellnessStatus::Moderate);
        assert_eq!(WellnessStatus::from_score(49.999), WellnessStatus::Fair);
        assert_eq!(WellnessStatus::from_score(30.0), WellnessStatus::Fair);
        assert_eq!(WellnessStatus::from_score(29.999), WellnessStatus::Critical);
        assert_eq!(WellnessStatus::from_score(0.0), WellnessStatus::Critical);
    }

    #[test]
    fn test_nan_is_critical() {
        assert_eq!(WellnessStatus::from_score(f64::NAN), WellnessStatus::Critical);
    }

    #[test]
    fn test_band_validation() {
        assert!(StatusBands::default().validate().is_ok());

        let overlapping = StatusBands {
            good: 90.0,
            ..StatusBands::default()
        };
        assert_eq!(overlapping.validate(), Err(PolicyError::UnorderedBands));

        let out_of_range = StatusBands {
            excellent: 120.0,
            ..StatusBands::default()
        };
        assert!(out_of_range.validate().is_err());
    }

    #[test]
    fn test_status_serializes_by_name() {
        assert_eq!(
            serde_json::to_string(&WellnessStatus::Moderate).unwrap(),
            "\"Moderate\""
        );
        assert_eq!(WellnessStatus::Excellent.to_string(), "Excellent");
        assert!(WellnessStatus::Excellent > WellnessStatus::Good);
    }

    proptest! {
        #[test]
        fn test_classification_is_monotonic(a in 0.0f64..=100.0, b in 0.0f64..=100.0) {
            let bands = StatusBands::default();
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(bands.classify(low) <= bands.classify(high));
        }
    }
}
