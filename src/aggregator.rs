//! Trailing-window aggregation and composite scoring

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

use crate::models::{MentalRecord, MetricKind, PhysicalRecord, SleepRecord, TrailingWindow};
use crate::normalizer::{sanitize_mental, sanitize_physical, sanitize_sleep, Normalizer, Reading};
use crate::policy::ScoringPolicy;

/// Arithmetic mean, `None` for an empty slice
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().mean())
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Records inside a trailing window, time-ordered and clamped to valid domains
#[derive(Debug, Clone, Default)]
pub struct WindowRecords {
    pub physical: Vec<PhysicalRecord>,
    pub mental: Vec<MentalRecord>,
    pub sleep: Vec<SleepRecord>,

    /// Number of field values clamped into their valid domain
    pub adjusted_values: usize,
}

impl WindowRecords {
    /// Keep records inside `window`, sort them by timestamp and clamp bad values
    pub fn collect(
        window: &TrailingWindow,
        physical: &[PhysicalRecord],
        mental: &[MentalRecord],
        sleep: &[SleepRecord],
    ) -> Self {
        let mut adjusted_values = 0;

        let mut physical: Vec<PhysicalRecord> = physical
            .iter()
            .filter(|r| window.contains(r.timestamp))
            .cloned()
            .collect();
        physical.sort_by_key(|r| r.timestamp);
        for record in &mut physical {
            adjusted_values += sanitize_physical(record);
        }

        let mut mental: Vec<MentalRecord> = mental
            .iter()
            .filter(|r| window.contains(r.timestamp))
            .cloned()
            .collect();
        mental.sort_by_key(|r| r.timestamp);
        for record in &mut mental {
            adjusted_values += sanitize_mental(record);
        }

        let mut sleep: Vec<SleepRecord> = sleep
            .iter()
            .filter(|r| window.contains(r.timestamp))
            .cloned()
            .collect();
        sleep.sort_by_key(|r| r.timestamp);
        for record in &mut sleep {
            adjusted_values += sanitize_sleep(record);
        }

        WindowRecords {
            physical,
            mental,
            sleep,
            adjusted_values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.physical.is_empty() && self.mental.is_empty() && self.sleep.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.physical.len() + self.mental.len() + self.sleep.len()
    }

    /// Every reading of a scored metric in time order
    pub fn readings(&self, kind: MetricKind) -> Vec<Reading> {
        let scalar = |v: f64| Reading::Scalar(v);
        match kind {
            MetricKind::HeartRate => self
                .physical
                .iter()
                .filter_map(|r| r.heart_rate.map(|v| scalar(v as f64)))
                .collect(),
            MetricKind::BloodPressure => self
                .physical
                .iter()
                .filter(|r| r.bp_sys.is_some() || r.bp_dia.is_some())
                .map(|r| Reading::Pair {
                    primary: r.bp_sys.map(|v| v as f64),
                    secondary: r.bp_dia.map(|v| v as f64),
                })
                .collect(),
            MetricKind::Steps => self
                .physical
                .iter()
                .filter_map(|r| r.steps.map(|v| scalar(v as f64)))
                .collect(),
            MetricKind::SleepDuration => self
                .sleep
                .iter()
                .filter_map(|r| r.duration_hours.map(scalar))
                .collect(),
            MetricKind::Stress => self
                .mental
                .iter()
                .filter_map(|r| r.stress_level.map(|v| scalar(v as f64)))
                .collect(),
            MetricKind::Anxiety => self
                .mental
                .iter()
                .filter_map(|r| r.anxiety_level.map(|v| scalar(v as f64)))
                .collect(),
            MetricKind::Mood => self
                .mental
                .iter()
                .filter_map(|r| r.mood_score.map(|v| scalar(v as f64)))
                .collect(),
            MetricKind::Energy => self
                .mental
                .iter()
                .filter_map(|r| r.energy_level.map(|v| scalar(v as f64)))
                .collect(),
        }
    }
}

/// Plain averages of raw values over the window, in display units
///
/// A field is `None` when no record in the window carried that measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricAverages {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_heart_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_blood_pressure_sys: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_blood_pressure_dia: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_steps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_sleep_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_sleep_quality: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_stress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_mood: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_anxiety: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_energy: Option<f64>,
}

impl MetricAverages {
    pub fn from_records(records: &WindowRecords) -> Self {
        fn avg_int<T>(records: &[T], field: impl Fn(&T) -> Option<i32>) -> Option<f64> {
            let values: Vec<f64> = records.iter().filter_map(|r| field(r).map(f64::from)).collect();
            mean(&values)
        }

        let temperatures: Vec<f64> = records.physical.iter().filter_map(|r| r.temperature).collect();
        let durations: Vec<f64> = records.sleep.iter().filter_map(|r| r.duration_hours).collect();
        let qualities: Vec<f64> = records
            .sleep
            .iter()
            .filter_map(|r| r.quality)
            .chain(records.mental.iter().filter_map(|r| r.sleep_quality))
            .map(f64::from)
            .collect();

        MetricAverages {
            avg_heart_rate: avg_int(&records.physical, |r| r.heart_rate),
            avg_blood_pressure_sys: avg_int(&records.physical, |r| r.bp_sys),
            avg_blood_pressure_dia: avg_int(&records.physical, |r| r.bp_dia),
            avg_steps: avg_int(&records.physical, |r| r.steps),
            avg_calories: avg_int(&records.physical, |r| r.calories_burned),
            avg_temperature: mean(&temperatures),
            avg_sleep_duration: mean(&durations),
            avg_sleep_quality: mean(&qualities),
            avg_stress: avg_int(&records.mental, |r| r.stress_level),
            avg_mood: avg_int(&records.mental, |r| r.mood_score),
            avg_anxiety: avg_int(&records.mental, |r| r.anxiety_level),
            avg_energy: avg_int(&records.mental, |r| r.energy_level),
        }
    }

    /// Raw average backing a scored metric (systolic for blood pressure)
    pub fn for_metric(&self, kind: MetricKind) -> Option<f64> {
        match kind {
            MetricKind::HeartRate => self.avg_heart_rate,
            MetricKind::BloodPressure => self.avg_blood_pressure_sys,
            MetricKind::Steps => self.avg_steps,
            MetricKind::SleepDuration => self.avg_sleep_duration,
            MetricKind::Stress => self.avg_stress,
            MetricKind::Anxiety => self.avg_anxiety,
            MetricKind::Mood => self.avg_mood,
            MetricKind::Energy => self.avg_energy,
        }
    }

    /// Display rounding: counts to whole numbers, everything else to two decimals
    pub fn rounded(&self) -> Self {
        let two = |v: Option<f64>| v.map(|x| round_to(x, 2));
        let whole = |v: Option<f64>| v.map(|x| round_to(x, 0));

        MetricAverages {
            avg_heart_rate: two(self.avg_heart_rate),
            avg_blood_pressure_sys: two(self.avg_blood_pressure_sys),
            avg_blood_pressure_dia: two(self.avg_blood_pressure_dia),
            avg_steps: whole(self.avg_steps),
            avg_calories: whole(self.avg_calories),
            avg_temperature: two(self.avg_temperature),
            avg_sleep_duration: two(self.avg_sleep_duration),
            avg_sleep_quality: two(self.avg_sleep_quality),
            avg_stress: two(self.avg_stress),
            avg_mood: two(self.avg_mood),
            avg_anxiety: two(self.avg_anxiety),
            avg_energy: two(self.avg_energy),
        }
    }
}

/// Result of aggregating one window
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// Raw-unit averages for display
    pub averages: MetricAverages,

    /// Mean sub-score per metric that had data
    pub sub_scores: BTreeMap<MetricKind, f64>,

    /// Weighted composite over the present metrics, `None` if nothing was scorable
    pub composite: Option<f64>,
}

/// Computes averages, per-metric sub-scores and the weighted composite
pub struct Aggregator<'a> {
    policy: &'a ScoringPolicy,
}

impl<'a> Aggregator<'a> {
    pub fn new(policy: &'a ScoringPolicy) -> Self {
        Aggregator { policy }
    }

    pub fn aggregate(&self, records: &WindowRecords) -> Aggregate {
        let sub_scores = self.sub_scores(records);
        let composite = self.composite(&sub_scores);

        Aggregate {
            averages: MetricAverages::from_records(records),
            sub_scores,
            composite,
        }
    }

    /// Mean of per-record sub-scores for every metric with at least one reading
    pub fn sub_scores(&self, records: &WindowRecords) -> BTreeMap<MetricKind, f64> {
        let normalizer = Normalizer::new(self.policy);
        let mut sub_scores = BTreeMap::new();

        for kind in MetricKind::ALL {
            let scores: Vec<f64> = records
                .readings(kind)
                .into_iter()
                .filter_map(|reading| normalizer.normalize_reading(kind, reading))
                .collect();

            if let Some(avg) = mean(&scores) {
                sub_scores.insert(kind, avg);
            }
        }

        sub_scores
    }

    /// Weighted mean of the available sub-scores
    ///
    /// Weights are renormalized over the metrics that are present, so missing
    /// metrics neither count as zero nor dilute the score.
    pub fn composite(&self, sub_scores: &BTreeMap<MetricKind, f64>) -> Option<f64> {
        let (weighted_sum, total_weight) = sub_scores.iter().fold(
            (0.0, 0.0),
            |(sum, total), (kind, score)| {
                let weight = self.policy.weight(*kind);
                (sum + weight * score, total + weight)
            },
        );

        if total_weight > 0.0 {
            Some((weighted_sum / total_weight).clamp(0.0, 100.0))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn window() -> TrailingWindow {
        TrailingWindow::new(Utc.with_ymd_and_hms(2024, 5, 20, 20, 0, 0).unwrap(), 14)
    }

    fn mental(days_ago: i64, mood: i32, stress: i32) -> MentalRecord {
        MentalRecord {
            user_id: 1,
            timestamp: window().as_of - Duration::days(days_ago),
            mood_score: Some(mood),
            stress_level: Some(stress),
            ..MentalRecord::default()
        }
    }

    #[test]
    fn test_collect_filters_and_sorts() {
        let records = WindowRecords::collect(
            &window(),
            &[],
            &[mental(2, 6, 4), mental(20, 1, 10), mental(5, 8, 2)],
            &[],
        );

        assert_eq!(records.mental.len(), 2);
        assert!(records.mental[0].timestamp < records.mental[1].timestamp);
        assert_eq!(records.adjusted_values, 0);
    }

    #[test]
    fn test_missing_fields_are_excluded_from_averages() {
        let mut sparse = mental(1, 8, 3);
        sparse.stress_level = None;

        let records = WindowRecords::collect(&window(), &[], &[sparse, mental(2, 6, 5)], &[]);
        let averages = MetricAverages::from_records(&records);

        assert_eq!(averages.avg_mood, Some(7.0));
        assert_eq!(averages.avg_stress, Some(5.0));
        assert_eq!(averages.avg_heart_rate, None);
        assert_eq!(averages.avg_sleep_duration, None);
    }

    #[test]
    fn test_sleep_quality_combines_sources() {
        let mut with_quality = mental(1, 7, 3);
        with_quality.sleep_quality = Some(4);
        let sleep = SleepRecord {
            user_id: 1,
            timestamp: window().as_of - Duration::days(1),
            duration_hours: Some(7.5),
            quality: Some(8),
            ..SleepRecord::default()
        };

        let records = WindowRecords::collect(&window(), &[], &[with_quality], &[sleep]);
        let averages = MetricAverages::from_records(&records);
        assert_eq!(averages.avg_sleep_quality, Some(6.0));
        assert_eq!(averages.avg_sleep_duration, Some(7.5));
    }

    #[test]
    fn test_composite_redistributes_weight() {
        let policy = ScoringPolicy::default();
        let aggregator = Aggregator::new(&policy);

        let records = WindowRecords::collect(&window(), &[], &[mental(1, 8, 3)], &[]);
        let mut sub_scores = aggregator.sub_scores(&records);
        sub_scores.remove(&MetricKind::Anxiety);
        sub_scores.remove(&MetricKind::Energy);

        let stress = sub_scores[&MetricKind::Stress];
        let mood = sub_scores[&MetricKind::Mood];
        let expected = (0.15 * stress + 0.15 * mood) / 0.30;

        let composite = aggregator.composite(&sub_scores).unwrap();
        assert!((composite - expected).abs() < 1e-9);
    }

    #[test]
    fn test_composite_is_none_without_weighted_metrics() {
        let policy = ScoringPolicy::default();
        let aggregator = Aggregator::new(&policy);
        assert_eq!(aggregator.composite(&BTreeMap::new()), None);
    }

    #[test]
    fn test_sub_scores_average_per_record_scores() {
        let policy = ScoringPolicy::default();
        let aggregator = Aggregator::new(&policy);

        let physical = [2_000, 12_000].map(|steps| PhysicalRecord {
            user_id: 1,
            timestamp: window().as_of - Duration::days(1),
            steps: Some(steps),
            ..PhysicalRecord::default()
        });
        let records = WindowRecords::collect(&window(), &physical, &[], &[]);
        let sub_scores = aggregator.sub_scores(&records);

        // 20 and 100 (capped), not the score of the 7000-step average
        assert!((sub_scores[&MetricKind::Steps] - 60.0).abs() < 1e-9);
        assert_eq!(MetricAverages::from_records(&records).avg_steps, Some(7000.0));
    }

    #[test]
    fn test_rounding() {
        let averages = MetricAverages {
            avg_heart_rate: Some(71.666_666),
            avg_steps: Some(8_432.6),
            ..MetricAverages::default()
        }
        .rounded();

        assert_eq!(averages.avg_heart_rate, Some(71.67));
        assert_eq!(averages.avg_steps, Some(8_433.0));
    }
}
