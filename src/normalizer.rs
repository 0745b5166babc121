//! Metric normalization onto a common 0-100 sub-score
//!
//! Every raw measurement is mapped through a [`ScoringCurve`] where 100 is the
//! healthiest end of the metric's reference range. Curves are pure functions of
//! one value plus fixed parameters; which curve applies to which metric is
//! decided by the [`ScoringPolicy`](crate::policy::ScoringPolicy).
//!
//! # Reference ranges
//!
//! - **Heart rate**: 60-100 bpm ideal, linear decay to 0 at 40 bpm beyond either edge
//! - **Blood pressure**: systolic and diastolic bands around 120/80, worst of the two
//! - **Steps**: ramp from 0 to 100 at the daily target, capped above it
//! - **Sleep**: 7-9 hours ideal, symmetric decay outside
//! - **Stress / anxiety**: 1 → 100, 10 → 0
//! - **Mood / energy**: 1 → 0, 10 → 100
//!
//! This module also owns the valid domain of every raw field. Values outside it
//! are clamped to the nearest bound rather than rejected.

use serde::{Deserialize, Serialize};

use crate::models::{MentalRecord, MetricKind, PhysicalRecord, SleepRecord};
use crate::policy::ScoringPolicy;

/// Ideal band with linear decay outside it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandCurve {
    /// Lower edge of the ideal band (inclusive)
    pub ideal_low: f64,

    /// Upper edge of the ideal band (inclusive)
    pub ideal_high: f64,

    /// Distance beyond either edge at which the score reaches 0
    pub outer_span: f64,
}

impl BandCurve {
    pub fn new(ideal_low: f64, ideal_high: f64, outer_span: f64) -> Self {
        BandCurve {
            ideal_low,
            ideal_high,
            outer_span,
        }
    }

    pub fn score(&self, value: f64) -> f64 {
        let distance = if value < self.ideal_low {
            self.ideal_low - value
        } else if value > self.ideal_high {
            value - self.ideal_high
        } else {
            0.0
        };

        (100.0 * (1.0 - distance / self.outer_span)).clamp(0.0, 100.0)
    }

    fn is_valid(&self) -> bool {
        self.ideal_low.is_finite()
            && self.ideal_high.is_finite()
            && self.ideal_low <= self.ideal_high
            && self.outer_span.is_finite()
            && self.outer_span > 0.0
    }
}

/// Scoring function from a raw metric value to a 0-100 sub-score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoringCurve {
    /// Ideal band, penalized symmetrically on both sides
    Band {
        ideal_low: f64,
        ideal_high: f64,
        outer_span: f64,
    },
    /// 0 at zero, 100 at `target`, no bonus above it
    Ramp { target: f64 },
    /// `min` scores 100, `max` scores 0
    LowerIsBetter { min: f64, max: f64 },
    /// `min` scores 0, `max` scores 100
    HigherIsBetter { min: f64, max: f64 },
    /// Two bands scored independently, combined by taking the worse one
    PairedBand {
        primary: BandCurve,
        secondary: BandCurve,
    },
}

/// Raw input to a scoring curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Scalar(f64),
    /// Two-component measurement such as systolic/diastolic pressure
    Pair {
        primary: Option<f64>,
        secondary: Option<f64>,
    },
}

impl ScoringCurve {
    /// Score a reading. Returns `None` when the reading carries no usable value.
    pub fn score(&self, reading: Reading) -> Option<f64> {
        let score = match (self, reading) {
            (ScoringCurve::PairedBand { primary, secondary }, Reading::Pair { primary: a, secondary: b }) => {
                match (a.map(|v| primary.score(v)), b.map(|v| secondary.score(v))) {
                    (Some(x), Some(y)) => x.min(y),
                    (Some(x), None) => x,
                    (None, Some(y)) => y,
                    (None, None) => return None,
                }
            }
            (ScoringCurve::PairedBand { primary, .. }, Reading::Scalar(v)) => primary.score(v),
            (curve, Reading::Scalar(v)) => curve.score_scalar(v),
            (curve, Reading::Pair { primary: Some(v), .. }) => curve.score_scalar(v),
            (_, Reading::Pair { primary: None, .. }) => return None,
        };

        if score.is_finite() {
            Some(score.clamp(0.0, 100.0))
        } else {
            None
        }
    }

    fn score_scalar(&self, value: f64) -> f64 {
        match *self {
            ScoringCurve::Band {
                ideal_low,
                ideal_high,
                outer_span,
            } => BandCurve::new(ideal_low, ideal_high, outer_span).score(value),
            ScoringCurve::Ramp { target } => (value / target * 100.0).clamp(0.0, 100.0),
            ScoringCurve::LowerIsBetter { min, max } => {
                ((max - value) / (max - min) * 100.0).clamp(0.0, 100.0)
            }
            ScoringCurve::HigherIsBetter { min, max } => {
                ((value - min) / (max - min) * 100.0).clamp(0.0, 100.0)
            }
            ScoringCurve::PairedBand { primary, .. } => primary.score(value),
        }
    }

    /// Describe why the curve cannot produce scores, if it cannot
    pub fn validation_error(&self) -> Option<String> {
        match *self {
            ScoringCurve::Band {
                ideal_low,
                ideal_high,
                outer_span,
            } => {
                if BandCurve::new(ideal_low, ideal_high, outer_span).is_valid() {
                    None
                } else {
                    Some(format!(
                        "band {}..{} with span {} is degenerate",
                        ideal_low, ideal_high, outer_span
                    ))
                }
            }
            ScoringCurve::Ramp { target } => {
                if target.is_finite() && target > 0.0 {
                    None
                } else {
                    Some(format!("ramp target must be positive, got {}", target))
                }
            }
            ScoringCurve::LowerIsBetter { min, max } | ScoringCurve::HigherIsBetter { min, max } => {
                if min.is_finite() && max.is_finite() && min < max {
                    None
                } else {
                    Some(format!("scale {}..{} is empty", min, max))
                }
            }
            ScoringCurve::PairedBand { primary, secondary } => {
                if primary.is_valid() && secondary.is_valid() {
                    None
                } else {
                    Some("paired band has a degenerate component".to_string())
                }
            }
        }
    }
}

/// Maps raw readings to sub-scores using the curves of a scoring policy
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    policy: &'a ScoringPolicy,
}

impl<'a> Normalizer<'a> {
    pub fn new(policy: &'a ScoringPolicy) -> Self {
        Normalizer { policy }
    }

    /// Sub-score for a single scalar value
    pub fn normalize(&self, kind: MetricKind, value: f64) -> Option<f64> {
        self.normalize_reading(kind, Reading::Scalar(value))
    }

    /// Sub-score for systolic/diastolic pressure, the worse of the two
    pub fn normalize_blood_pressure(&self, systolic: Option<f64>, diastolic: Option<f64>) -> Option<f64> {
        self.normalize_reading(
            MetricKind::BloodPressure,
            Reading::Pair {
                primary: systolic,
                secondary: diastolic,
            },
        )
    }

    pub fn normalize_reading(&self, kind: MetricKind, reading: Reading) -> Option<f64> {
        self.policy.metric(kind)?.curve.score(reading)
    }
}

/// Valid range of a raw field; values outside are clamped
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueDomain {
    pub min: f64,
    pub max: f64,
}

pub const HEART_RATE_DOMAIN: ValueDomain = ValueDomain { min: 25.0, max: 250.0 };
pub const SYSTOLIC_DOMAIN: ValueDomain = ValueDomain { min: 60.0, max: 260.0 };
pub const DIASTOLIC_DOMAIN: ValueDomain = ValueDomain { min: 30.0, max: 160.0 };
pub const STEPS_DOMAIN: ValueDomain = ValueDomain { min: 0.0, max: 200_000.0 };
pub const CALORIES_DOMAIN: ValueDomain = ValueDomain { min: 0.0, max: 20_000.0 };
pub const TEMPERATURE_DOMAIN: ValueDomain = ValueDomain { min: 30.0, max: 45.0 };
pub const RATING_DOMAIN: ValueDomain = ValueDomain { min: 1.0, max: 10.0 };
pub const SLEEP_HOURS_DOMAIN: ValueDomain = ValueDomain { min: 0.0, max: 24.0 };

fn clamp_int(value: &mut Option<i32>, domain: ValueDomain) -> usize {
    match value {
        Some(v) if (*v as f64) < domain.min => {
            *v = domain.min as i32;
            1
        }
        Some(v) if (*v as f64) > domain.max => {
            *v = domain.max as i32;
            1
        }
        _ => 0,
    }
}

fn clamp_float(value: &mut Option<f64>, domain: ValueDomain) -> usize {
    match value {
        Some(v) if !v.is_finite() => {
            *value = None;
            1
        }
        Some(v) if *v < domain.min || *v > domain.max => {
            *v = v.clamp(domain.min, domain.max);
            1
        }
        _ => 0,
    }
}

/// Clamp every out-of-domain field in place, returning how many were adjusted
pub fn sanitize_physical(record: &mut PhysicalRecord) -> usize {
    clamp_int(&mut record.heart_rate, HEART_RATE_DOMAIN)
        + clamp_int(&mut record.bp_sys, SYSTOLIC_DOMAIN)
        + clamp_int(&mut record.bp_dia, DIASTOLIC_DOMAIN)
        + clamp_int(&mut record.steps, STEPS_DOMAIN)
        + clamp_int(&mut record.calories_burned, CALORIES_DOMAIN)
        + clamp_float(&mut record.temperature, TEMPERATURE_DOMAIN)
}

pub fn sanitize_mental(record: &mut MentalRecord) -> usize {
    clamp_int(&mut record.mood_score, RATING_DOMAIN)
        + clamp_int(&mut record.stress_level, RATING_DOMAIN)
        + clamp_int(&mut record.anxiety_level, RATING_DOMAIN)
        + clamp_int(&mut record.energy_level, RATING_DOMAIN)
        + clamp_int(&mut record.sleep_quality, RATING_DOMAIN)
}

pub fn sanitize_sleep(record: &mut SleepRecord) -> usize {
    let mut adjusted = clamp_int(&mut record.quality, RATING_DOMAIN);
    let mut duration = record.effective_duration_hours();
    adjusted += clamp_float(&mut duration, SLEEP_HOURS_DOMAIN);
    record.duration_hours = duration;
    adjusted
}
