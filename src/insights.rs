//! Rule-based insights and recommendations
//!
//! Rules are evaluated in a fixed priority order against the normalized
//! per-metric sub-scores, where each banded metric's readings sit relative to
//! its ideal band, the raw averages (for message text) and the half-window
//! trend directions. Reference ranges quoted in messages come from the scoring
//! policy. Each triggered rule emits one insight and at
//! most one recommendation; the output is truncated to the configured limits,
//! keeping the highest-priority rules. No rule firing means empty lists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregator::{MetricAverages, WindowRecords};
use crate::error::PolicyError;
use crate::models::MetricKind;
use crate::normalizer::{Reading, ScoringCurve};
use crate::policy::ScoringPolicy;
use crate::trends::{MetricTrend, TrendDirection};

/// Thresholds for the insight rule table
///
/// Sub-score thresholds are on the 0-100 scale: a rule about a "low" metric
/// fires when that metric's mean sub-score is strictly below the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightPolicy {
    /// Maximum number of insights returned
    pub max_insights: usize,

    /// Maximum number of recommendations returned
    pub max_recommendations: usize,

    /// Percent change between window halves that counts as a real trend
    pub trend_change_pct: f64,

    pub high_stress_score: f64,
    pub elevated_stress_score: f64,
    pub low_mood_score: f64,
    pub poor_sleep_score: f64,
    pub heart_rate_score: f64,
    pub blood_pressure_score: f64,
    pub low_activity_score: f64,
    pub high_anxiety_score: f64,
    pub low_energy_score: f64,

    /// Every present sub-score at or above this counts as balanced
    pub balanced_score: f64,

    /// Minimum number of scored metrics before declaring balance
    pub balanced_min_metrics: usize,
}

impl Default for InsightPolicy {
    fn default() -> Self {
        InsightPolicy {
            max_insights: 5,
            max_recommendations: 5,
            trend_change_pct: 15.0,
            high_stress_score: 25.0,
            elevated_stress_score: 50.0,
            low_mood_score: 35.0,
            poor_sleep_score: 80.0,
            heart_rate_score: 75.0,
            blood_pressure_score: 60.0,
            low_activity_score: 50.0,
            high_anxiety_score: 35.0,
            low_energy_score: 35.0,
            balanced_score: 75.0,
            balanced_min_metrics: 3,
        }
    }
}

impl InsightPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if !self.trend_change_pct.is_finite() || self.trend_change_pct <= 0.0 {
            return Err(PolicyError::InvalidInsightSetting {
                setting: "trend_change_pct".to_string(),
                reason: "must be a positive percentage".to_string(),
            });
        }

        let thresholds = [
            ("high_stress_score", self.high_stress_score),
            ("elevated_stress_score", self.elevated_stress_score),
            ("low_mood_score", self.low_mood_score),
            ("poor_sleep_score", self.poor_sleep_score),
            ("heart_rate_score", self.heart_rate_score),
            ("blood_pressure_score", self.blood_pressure_score),
            ("low_activity_score", self.low_activity_score),
            ("high_anxiety_score", self.high_anxiety_score),
            ("low_energy_score", self.low_energy_score),
            ("balanced_score", self.balanced_score),
        ];

        for (setting, value) in thresholds {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(PolicyError::InvalidInsightSetting {
                    setting: setting.to_string(),
                    reason: format!("{} is outside 0-100", value),
                });
            }
        }

        Ok(())
    }
}

/// Where the readings of a banded metric fall relative to its ideal band
///
/// Rules decide whether a metric runs low or high from this, not from the
/// raw average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPosition {
    pub ideal_low: f64,
    pub ideal_high: f64,

    /// Readings under the band
    pub below: usize,

    /// Readings over the band
    pub above: usize,

    pub readings: usize,

    /// Mean signed distance from the nearest band edge, negative under the band
    pub mean_offset: f64,
}

/// Side of the ideal band a metric leans towards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandSide {
    Below,
    Above,
}

const OFFSET_EPSILON: f64 = 1e-9;

impl BandPosition {
    pub fn from_values<I>((ideal_low, ideal_high): (f64, f64), values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut position = BandPosition {
            ideal_low,
            ideal_high,
            below: 0,
            above: 0,
            readings: 0,
            mean_offset: 0.0,
        };
        let mut total_offset = 0.0;

        for value in values.into_iter().filter(|v| v.is_finite()) {
            position.readings += 1;
            if value < ideal_low {
                position.below += 1;
                total_offset += value - ideal_low;
            } else if value > ideal_high {
                position.above += 1;
                total_offset += value - ideal_high;
            }
        }

        if position.readings == 0 {
            return None;
        }
        position.mean_offset = total_offset / position.readings as f64;
        Some(position)
    }

    /// `None` when every reading is in band or the two sides cancel out
    pub fn lean(&self) -> Option<BandSide> {
        if self.mean_offset < -OFFSET_EPSILON {
            Some(BandSide::Below)
        } else if self.mean_offset > OFFSET_EPSILON {
            Some(BandSide::Above)
        } else {
            None
        }
    }

    /// Readings fall on both sides of the band
    pub fn straddles(&self) -> bool {
        self.below > 0 && self.above > 0
    }

    fn label(&self) -> String {
        format!("{}-{}", self.ideal_low, self.ideal_high)
    }
}

/// Band positions of every metric scored against an ideal band
///
/// Blood pressure readings are pairs and are left out; its rule works from the
/// paired reference bands directly.
pub fn band_positions(
    policy: &ScoringPolicy,
    records: &WindowRecords,
) -> BTreeMap<MetricKind, BandPosition> {
    MetricKind::ALL
        .iter()
        .filter_map(|&kind| {
            let band = policy.ideal_band(kind)?;
            let values = records.readings(kind).into_iter().filter_map(|reading| match reading {
                Reading::Scalar(value) => Some(value),
                Reading::Pair { .. } => None,
            });
            BandPosition::from_values(band, values).map(|position| (kind, position))
        })
        .collect()
}

/// Everything a rule may look at
pub struct RuleContext<'a> {
    pub sub_scores: &'a BTreeMap<MetricKind, f64>,
    pub averages: &'a MetricAverages,
    pub trends: &'a BTreeMap<MetricKind, MetricTrend>,
    pub positions: &'a BTreeMap<MetricKind, BandPosition>,
    pub scoring: &'a ScoringPolicy,
    pub policy: &'a InsightPolicy,
}

impl RuleContext<'_> {
    fn score(&self, kind: MetricKind) -> Option<f64> {
        self.sub_scores.get(&kind).copied()
    }

    fn below(&self, kind: MetricKind, threshold: f64) -> bool {
        self.score(kind).map(|s| s < threshold).unwrap_or(false)
    }

    fn trend(&self, kind: MetricKind, direction: TrendDirection) -> Option<&MetricTrend> {
        self.trends.get(&kind).filter(|t| t.direction == direction)
    }

    /// Band position of a low-scoring metric whose readings lean to `side`
    fn leaning(&self, kind: MetricKind, threshold: f64, side: BandSide) -> Option<&BandPosition> {
        if !self.below(kind, threshold) {
            return None;
        }
        self.positions
            .get(&kind)
            .filter(|position| position.lean() == Some(side))
    }

    /// Band position of a low-scoring metric whose readings sit on both sides
    fn swinging(&self, kind: MetricKind, threshold: f64) -> Option<&BandPosition> {
        if !self.below(kind, threshold) {
            return None;
        }
        self.positions
            .get(&kind)
            .filter(|position| position.lean().is_none() && position.straddles())
    }
}

/// Output of a triggered rule
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub insight: String,
    pub recommendation: Option<String>,
}

impl RuleOutcome {
    fn new(insight: impl Into<String>, recommendation: Option<&str>) -> Self {
        RuleOutcome {
            insight: insight.into(),
            recommendation: recommendation.map(str::to_string),
        }
    }
}

/// One row of the rule table
pub struct InsightRule {
    pub id: &'static str,
    pub evaluate: fn(&RuleContext) -> Option<RuleOutcome>,
}

/// The rule table, highest priority first
pub const RULES: &[InsightRule] = &[
    InsightRule {
        id: "high_stress",
        evaluate: high_stress,
    },
    InsightRule {
        id: "low_mood",
        evaluate: low_mood,
    },
    InsightRule {
        id: "stress_sleep_link",
        evaluate: stress_sleep_link,
    },
    InsightRule {
        id: "short_sleep",
        evaluate: short_sleep,
    },
    InsightRule {
        id: "long_sleep",
        evaluate: long_sleep,
    },
    InsightRule {
        id: "irregular_sleep",
        evaluate: irregular_sleep,
    },
    InsightRule {
        id: "elevated_heart_rate",
        evaluate: elevated_heart_rate,
    },
    InsightRule {
        id: "variable_heart_rate",
        evaluate: variable_heart_rate,
    },
    InsightRule {
        id: "blood_pressure_out_of_range",
        evaluate: blood_pressure_out_of_range,
    },
    InsightRule {
        id: "low_activity",
        evaluate: low_activity,
    },
    InsightRule {
        id: "activity_declining",
        evaluate: activity_declining,
    },
    InsightRule {
        id: "stress_rising",
        evaluate: stress_rising,
    },
    InsightRule {
        id: "mood_declining",
        evaluate: mood_declining,
    },
    InsightRule {
        id: "high_anxiety",
        evaluate: high_anxiety,
    },
    InsightRule {
        id: "low_energy",
        evaluate: low_energy,
    },
    InsightRule {
        id: "elevated_stress",
        evaluate: elevated_stress,
    },
    InsightRule {
        id: "low_heart_rate",
        evaluate: low_heart_rate,
    },
    InsightRule {
        id: "sleep_declining",
        evaluate: sleep_declining,
    },
    InsightRule {
        id: "mood_improving",
        evaluate: mood_improving,
    },
    InsightRule {
        id: "activity_improving",
        evaluate: activity_improving,
    },
    InsightRule {
        id: "no_sleep_data",
        evaluate: no_sleep_data,
    },
    InsightRule {
        id: "no_activity_data",
        evaluate: no_activity_data,
    },
    InsightRule {
        id: "balanced",
        evaluate: balanced,
    },
];

fn high_stress(ctx: &RuleContext) -> Option<RuleOutcome> {
    if !ctx.below(MetricKind::Stress, ctx.policy.high_stress_score) {
        return None;
    }
    Some(RuleOutcome::new(
        "Stress levels are high. Prioritize relaxation and self-care.",
        Some("Try 15 minutes of meditation or deep breathing daily."),
    ))
}

fn low_mood(ctx: &RuleContext) -> Option<RuleOutcome> {
    if !ctx.below(MetricKind::Mood, ctx.policy.low_mood_score) {
        return None;
    }
    Some(RuleOutcome::new(
        "Your mood scores have been low recently. Consider talking to someone or seeking support.",
        Some("Consider speaking with a mental health professional or trusted friend."),
    ))
}

fn stress_sleep_link(ctx: &RuleContext) -> Option<RuleOutcome> {
    let stressed = ctx.below(MetricKind::Stress, ctx.policy.elevated_stress_score);
    let poor_sleep = ctx.below(MetricKind::SleepDuration, ctx.policy.poor_sleep_score);
    if !(stressed && poor_sleep) {
        return None;
    }
    Some(RuleOutcome::new(
        "Elevated stress is coinciding with poor sleep.",
        Some("Try relaxation techniques before bed, such as reading or a short breathing exercise."),
    ))
}

fn short_sleep(ctx: &RuleContext) -> Option<RuleOutcome> {
    let band = ctx.leaning(
        MetricKind::SleepDuration,
        ctx.policy.poor_sleep_score,
        BandSide::Below,
    )?;
    let insight = match ctx.averages.avg_sleep_duration.filter(|h| *h < band.ideal_low) {
        Some(hours) => format!(
            "You are averaging {:.1} hours of sleep, below the recommended {} hours.",
            hours,
            band.label()
        ),
        None => format!(
            "{} of your {} logged nights were shorter than the recommended {} hours.",
            band.below,
            band.readings,
            band.label()
        ),
    };
    let recommendation = format!(
        "Get at least {} hours of sleep. Try setting a consistent bedtime.",
        band.ideal_low
    );
    Some(RuleOutcome::new(insight, Some(&recommendation)))
}

fn long_sleep(ctx: &RuleContext) -> Option<RuleOutcome> {
    let band = ctx.leaning(
        MetricKind::SleepDuration,
        ctx.policy.poor_sleep_score,
        BandSide::Above,
    )?;
    let insight = match ctx.averages.avg_sleep_duration.filter(|h| *h > band.ideal_high) {
        Some(hours) => format!(
            "You are averaging {:.1} hours of sleep, more than the recommended {} hours.",
            hours,
            band.label()
        ),
        None => format!(
            "{} of your {} logged nights were longer than the recommended {} hours.",
            band.above,
            band.readings,
            band.label()
        ),
    };
    let recommendation = format!(
        "Try keeping sleep under {} hours with a regular wake-up time.",
        band.ideal_high
    );
    Some(RuleOutcome::new(insight, Some(&recommendation)))
}

fn irregular_sleep(ctx: &RuleContext) -> Option<RuleOutcome> {
    let band = ctx.swinging(MetricKind::SleepDuration, ctx.policy.poor_sleep_score)?;
    Some(RuleOutcome::new(
        format!(
            "Your sleep swings between too short and too long: {} nights under and {} over the recommended {} hours.",
            band.below,
            band.above,
            band.label()
        ),
        Some("Keep the same bedtime and wake-up time every day, weekends included."),
    ))
}

fn elevated_heart_rate(ctx: &RuleContext) -> Option<RuleOutcome> {
    let band = ctx.leaning(
        MetricKind::HeartRate,
        ctx.policy.heart_rate_score,
        BandSide::Above,
    )?;
    let insight = match ctx.averages.avg_heart_rate.filter(|bpm| *bpm > band.ideal_high) {
        Some(bpm) => format!("Your resting heart rate is elevated (average {:.0} bpm).", bpm),
        None => format!(
            "{} of your {} heart rate readings were above {} bpm.",
            band.above, band.readings, band.ideal_high
        ),
    };
    Some(RuleOutcome::new(
        insight,
        Some("Consider stress management techniques and check in with a doctor if it persists."),
    ))
}

fn variable_heart_rate(ctx: &RuleContext) -> Option<RuleOutcome> {
    let band = ctx.swinging(MetricKind::HeartRate, ctx.policy.heart_rate_score)?;
    Some(RuleOutcome::new(
        format!(
            "Your heart rate readings swing outside the {} bpm range in both directions.",
            band.label()
        ),
        Some("Measure your resting heart rate at the same time each day, ideally right after waking."),
    ))
}

fn low_heart_rate(ctx: &RuleContext) -> Option<RuleOutcome> {
    let band = ctx.leaning(
        MetricKind::HeartRate,
        ctx.policy.heart_rate_score,
        BandSide::Below,
    )?;
    let insight = match ctx.averages.avg_heart_rate.filter(|bpm| *bpm < band.ideal_low) {
        Some(bpm) => format!(
            "Your resting heart rate is quite low (average {:.0} bpm). This is normal if you are athletic.",
            bpm
        ),
        None => format!(
            "{} of your {} heart rate readings were below {} bpm. This is normal if you are athletic.",
            band.below, band.readings, band.ideal_low
        ),
    };
    Some(RuleOutcome::new(insight, None))
}

fn blood_pressure_out_of_range(ctx: &RuleContext) -> Option<RuleOutcome> {
    if !ctx.below(MetricKind::BloodPressure, ctx.policy.blood_pressure_score) {
        return None;
    }
    let reference = match ctx.scoring.metric(MetricKind::BloodPressure).map(|m| m.curve) {
        Some(ScoringCurve::PairedBand { primary, secondary }) => {
            format!(" {}/{}", primary.ideal_high, secondary.ideal_high)
        }
        _ => String::new(),
    };
    let reading = match (ctx.averages.avg_blood_pressure_sys, ctx.averages.avg_blood_pressure_dia) {
        (Some(sys), Some(dia)) => format!(" (average {:.0}/{:.0} mmHg)", sys, dia),
        _ => String::new(),
    };
    Some(RuleOutcome::new(
        format!(
            "Your blood pressure readings are away from the{} reference{}.",
            reference, reading
        ),
        Some("Monitor your blood pressure and discuss persistent readings with a clinician."),
    ))
}

fn low_activity(ctx: &RuleContext) -> Option<RuleOutcome> {
    if !ctx.below(MetricKind::Steps, ctx.policy.low_activity_score) {
        return None;
    }
    let steps = ctx.averages.avg_steps.unwrap_or_default();
    let recommendation = match ctx.scoring.metric(MetricKind::Steps).map(|m| m.curve) {
        Some(ScoringCurve::Ramp { target }) => format!(
            "Aim for {:.0} steps daily. Take short walks throughout the day.",
            target
        ),
        _ => "Take short walks throughout the day.".to_string(),
    };
    Some(RuleOutcome::new(
        format!("Physical activity is low (average {:.0} steps per day).", steps),
        Some(&recommendation),
    ))
}

fn activity_declining(ctx: &RuleContext) -> Option<RuleOutcome> {
    let trend = ctx.trend(MetricKind::Steps, TrendDirection::Decreasing)?;
    Some(RuleOutcome::new(
        format!(
            "Physical activity decreased by {:.0}% in the second half of this period.",
            trend.percent_change.abs()
        ),
        Some("Schedule short walks or active breaks to get back to your usual activity."),
    ))
}

fn stress_rising(ctx: &RuleContext) -> Option<RuleOutcome> {
    let trend = ctx.trend(MetricKind::Stress, TrendDirection::Increasing)?;
    Some(RuleOutcome::new(
        format!("Stress has increased by {:.0}% recently.", trend.percent_change),
        Some("Take time for yourself: block out short breaks during the day."),
    ))
}

fn mood_declining(ctx: &RuleContext) -> Option<RuleOutcome> {
    ctx.trend(MetricKind::Mood, TrendDirection::Decreasing)?;
    Some(RuleOutcome::new(
        "Your mood has declined compared to earlier in this period.",
        Some("Make time for activities that bring you joy."),
    ))
}

fn high_anxiety(ctx: &RuleContext) -> Option<RuleOutcome> {
    if !ctx.below(MetricKind::Anxiety, ctx.policy.high_anxiety_score) {
        return None;
    }
    Some(RuleOutcome::new(
        "Anxiety levels have been high.",
        Some("Try a grounding exercise when anxiety rises, such as naming five things you can see."),
    ))
}

fn low_energy(ctx: &RuleContext) -> Option<RuleOutcome> {
    if !ctx.below(MetricKind::Energy, ctx.policy.low_energy_score) {
        return None;
    }
    Some(RuleOutcome::new(
        "Your energy levels have been low.",
        Some("Check your sleep, hydration and meal timing; they are common causes of low energy."),
    ))
}

fn elevated_stress(ctx: &RuleContext) -> Option<RuleOutcome> {
    let moderate = ctx.below(MetricKind::Stress, ctx.policy.elevated_stress_score)
        && !ctx.below(MetricKind::Stress, ctx.policy.high_stress_score);
    if !moderate {
        return None;
    }
    Some(RuleOutcome::new(
        "Stress is above a comfortable level.",
        Some("Practice mindfulness: even 5 minutes a day helps reduce stress."),
    ))
}

fn sleep_declining(ctx: &RuleContext) -> Option<RuleOutcome> {
    let trend = ctx.trend(MetricKind::SleepDuration, TrendDirection::Decreasing)?;
    Some(RuleOutcome::new(
        format!(
            "Your sleep duration dropped by {:.0}% recently.",
            trend.percent_change.abs()
        ),
        None,
    ))
}

fn mood_improving(ctx: &RuleContext) -> Option<RuleOutcome> {
    ctx.trend(MetricKind::Mood, TrendDirection::Increasing)?;
    Some(RuleOutcome::new(
        "Your mood has improved significantly recently.",
        None,
    ))
}

fn activity_improving(ctx: &RuleContext) -> Option<RuleOutcome> {
    let trend = ctx.trend(MetricKind::Steps, TrendDirection::Increasing)?;
    Some(RuleOutcome::new(
        format!(
            "Great! Physical activity increased by {:.0}% recently.",
            trend.percent_change
        ),
        None,
    ))
}

fn no_sleep_data(ctx: &RuleContext) -> Option<RuleOutcome> {
    if ctx.score(MetricKind::SleepDuration).is_some() {
        return None;
    }
    Some(RuleOutcome::new(
        "No sleep data was logged in this period.",
        Some("Start tracking your sleep to get personalized recommendations."),
    ))
}

fn no_activity_data(ctx: &RuleContext) -> Option<RuleOutcome> {
    if ctx.score(MetricKind::Steps).is_some() {
        return None;
    }
    Some(RuleOutcome::new(
        "No step counts were logged in this period.",
        Some("Start tracking your steps to improve accountability."),
    ))
}

fn balanced(ctx: &RuleContext) -> Option<RuleOutcome> {
    let enough = ctx.sub_scores.len() >= ctx.policy.balanced_min_metrics;
    let all_healthy = ctx
        .sub_scores
        .values()
        .all(|score| *score >= ctx.policy.balanced_score);
    if !(enough && all_healthy) {
        return None;
    }
    Some(RuleOutcome::new(
        "Your health metrics look balanced. Keep maintaining good habits!",
        None,
    ))
}

/// Insights and recommendations selected for a summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsightReport {
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,

    /// Ids of every triggered rule in priority order, including truncated ones
    pub triggered: Vec<&'static str>,
}

/// Evaluates the rule table
pub struct InsightGenerator<'a> {
    scoring: &'a ScoringPolicy,
}

impl<'a> InsightGenerator<'a> {
    pub fn new(scoring: &'a ScoringPolicy) -> Self {
        InsightGenerator { scoring }
    }

    pub fn generate(
        &self,
        sub_scores: &BTreeMap<MetricKind, f64>,
        averages: &MetricAverages,
        trends: &BTreeMap<MetricKind, MetricTrend>,
        positions: &BTreeMap<MetricKind, BandPosition>,
    ) -> InsightReport {
        let policy = &self.scoring.insights;
        let ctx = RuleContext {
            sub_scores,
            averages,
            trends,
            positions,
            scoring: self.scoring,
            policy,
        };

        let mut report = InsightReport::default();

        for rule in RULES {
            let Some(outcome) = (rule.evaluate)(&ctx) else {
                continue;
            };
            report.triggered.push(rule.id);

            if report.insights.len() < policy.max_insights {
                report.insights.push(outcome.insight);
            }
            if let Some(recommendation) = outcome.recommendation {
                if report.recommendations.len() < policy.max_recommendations {
                    report.recommendations.push(recommendation);
                }
            }
        }

        report
    }
}
