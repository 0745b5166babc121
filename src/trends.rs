//! Daily trend series for charting and half-window trend direction

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregator::{mean, round_to, WindowRecords};
use crate::models::{MetricKind, TrailingWindow};

/// Calendar date format understood by the charting layer
pub const CHART_DATE_FORMAT: &str = "%Y-%m-%d";

/// One day of a trend series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub value: f64,
}

/// The four charting series
///
/// Series are sparse: days without data are omitted, never zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub sleep_trend: Vec<TrendPoint>,
    pub stress_trend: Vec<TrendPoint>,
    pub activity_trend: Vec<TrendPoint>,
    pub mood_trend: Vec<TrendPoint>,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.sleep_trend.is_empty()
            && self.stress_trend.is_empty()
            && self.activity_trend.is_empty()
            && self.mood_trend.is_empty()
    }
}

/// Buckets window records by UTC calendar day
pub struct TrendBuilder;

impl TrendBuilder {
    pub fn build(records: &WindowRecords) -> ChartData {
        ChartData {
            sleep_trend: Self::daily_series(
                records
                    .sleep
                    .iter()
                    .filter_map(|r| r.duration_hours.map(|v| (r.timestamp, v))),
            ),
            stress_trend: Self::daily_series(
                records
                    .mental
                    .iter()
                    .filter_map(|r| r.stress_level.map(|v| (r.timestamp, v as f64))),
            ),
            activity_trend: Self::daily_series(
                records
                    .physical
                    .iter()
                    .filter_map(|r| r.steps.map(|v| (r.timestamp, v as f64))),
            ),
            mood_trend: Self::daily_series(
                records
                    .mental
                    .iter()
                    .filter_map(|r| r.mood_score.map(|v| (r.timestamp, v as f64))),
            ),
        }
    }

    /// One point per day holding the mean of that day's values, ordered by date
    pub fn daily_series<I>(samples: I) -> Vec<TrendPoint>
    where
        I: IntoIterator<Item = (DateTime<Utc>, f64)>,
    {
        let mut days: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();

        for (timestamp, value) in samples {
            days.entry(timestamp.date_naive()).or_default().push(value);
        }

        days.into_iter()
            .filter_map(|(date, values)| {
                mean(&values).map(|value| TrendPoint {
                    date: date.format(CHART_DATE_FORMAT).to_string(),
                    value: round_to(value, 2),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

/// Change of a metric's raw mean between the earlier and the recent half of the window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    pub direction: TrendDirection,

    /// Percent change of the recent-half mean relative to the earlier-half mean
    pub percent_change: f64,

    pub earlier_mean: f64,
    pub recent_mean: f64,
}

impl MetricTrend {
    /// Compare two half-window means. `None` when the earlier mean is not positive.
    pub fn between(earlier_mean: f64, recent_mean: f64, threshold_pct: f64) -> Option<Self> {
        if earlier_mean <= 0.0 || !earlier_mean.is_finite() || !recent_mean.is_finite() {
            return None;
        }

        let percent_change = (recent_mean - earlier_mean) / earlier_mean * 100.0;
        let direction = if percent_change >= threshold_pct {
            TrendDirection::Increasing
        } else if percent_change <= -threshold_pct {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        Some(MetricTrend {
            direction,
            percent_change,
            earlier_mean,
            recent_mean,
        })
    }
}

/// Metrics whose direction feeds the insight rules
pub const TRACKED_TRENDS: [MetricKind; 5] = [
    MetricKind::Steps,
    MetricKind::Stress,
    MetricKind::Mood,
    MetricKind::SleepDuration,
    MetricKind::HeartRate,
];

/// Split the window at its midpoint and compare raw means of each tracked metric
///
/// A metric without data in both halves has no trend.
pub fn half_window_trends(
    records: &WindowRecords,
    window: &TrailingWindow,
    threshold_pct: f64,
) -> BTreeMap<MetricKind, MetricTrend> {
    let mut trends = BTreeMap::new();

    for kind in TRACKED_TRENDS {
        let samples: Vec<(DateTime<Utc>, f64)> = match kind {
            MetricKind::Steps => records
                .physical
                .iter()
                .filter_map(|r| r.steps.map(|v| (r.timestamp, v as f64)))
                .collect(),
            MetricKind::HeartRate => records
                .physical
                .iter()
                .filter_map(|r| r.heart_rate.map(|v| (r.timestamp, v as f64)))
                .collect(),
            MetricKind::Stress => records
                .mental
                .iter()
                .filter_map(|r| r.stress_level.map(|v| (r.timestamp, v as f64)))
                .collect(),
            MetricKind::Mood => records
                .mental
                .iter()
                .filter_map(|r| r.mood_score.map(|v| (r.timestamp, v as f64)))
                .collect(),
            MetricKind::SleepDuration => records
                .sleep
                .iter()
                .filter_map(|r| r.duration_hours.map(|v| (r.timestamp, v)))
                .collect(),
            _ => continue,
        };

        let (recent, earlier): (Vec<_>, Vec<_>) = samples
            .into_iter()
            .partition(|(timestamp, _)| window.is_recent_half(*timestamp));
        let earlier: Vec<f64> = earlier.into_iter().map(|(_, v)| v).collect();
        let recent: Vec<f64> = recent.into_iter().map(|(_, v)| v).collect();

        if let (Some(earlier_mean), Some(recent_mean)) = (mean(&earlier), mean(&recent)) {
            if let Some(trend) = MetricTrend::between(earlier_mean, recent_mean, threshold_pct) {
                trends.insert(kind, trend);
            }
        }
    }

    trends
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MentalRecord, PhysicalRecord};
    use chrono::{Duration, TimeZone};

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 14, 21, 0, 0).unwrap()
    }

    fn mood_at(timestamp: DateTime<Utc>, mood: i32) -> MentalRecord {
        MentalRecord {
            user_id: 7,
            timestamp,
            mood_score: Some(mood),
            stress_level: Some(11 - mood),
            ..MentalRecord::default()
        }
    }

    #[test]
    fn test_same_day_values_are_averaged() {
        let day = Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap();
        let series = TrendBuilder::daily_series(vec![
            (day, 4.0),
            (day + Duration::hours(10), 7.0),
            (day + Duration::days(1), 5.0),
        ]);

        assert_eq!(
            series,
            vec![
                TrendPoint {
                    date: "2024-06-10".to_string(),
                    value: 5.5
                },
                TrendPoint {
                    date: "2024-06-11".to_string(),
                    value: 5.0
                },
            ]
        );
    }

    #[test]
    fn test_series_is_sparse_and_ordered() {
        let window = TrailingWindow::new(as_of(), 14);
        let mental = vec![
            mood_at(as_of() - Duration::days(1), 7),
            mood_at(as_of() - Duration::days(9), 5),
            mood_at(as_of() - Duration::days(4), 6),
        ];
        let records = WindowRecords::collect(&window, &[], &mental, &[]);
        let chart = TrendBuilder::build(&records);

        assert_eq!(chart.mood_trend.len(), 3);
        assert_eq!(chart.stress_trend.len(), 3);
        assert!(chart.sleep_trend.is_empty());
        assert!(chart.activity_trend.is_empty());

        let dates: Vec<&str> = chart.mood_trend.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-06-05", "2024-06-10", "2024-06-13"]);
    }

    #[test]
    fn test_trend_direction_thresholds() {
        let up = MetricTrend::between(5000.0, 6000.0, 15.0).unwrap();
        assert_eq!(up.direction, TrendDirection::Increasing);
        assert!((up.percent_change - 20.0).abs() < 1e-9);

        let flat = MetricTrend::between(5000.0, 5500.0, 15.0).unwrap();
        assert_eq!(flat.direction, TrendDirection::Stable);

        let down = MetricTrend::between(8000.0, 6800.0, 15.0).unwrap();
        assert_eq!(down.direction, TrendDirection::Decreasing);

        assert!(MetricTrend::between(0.0, 10.0, 15.0).is_none());
    }

    #[test]
    fn test_half_window_trends_need_both_halves() {
        let window = TrailingWindow::new(as_of(), 14);
        let physical: Vec<PhysicalRecord> = [(12, 10_000), (10, 9_000), (3, 6_000), (1, 5_000)]
            .iter()
            .map(|&(days_ago, steps)| PhysicalRecord {
                user_id: 7,
                timestamp: as_of() - Duration::days(days_ago),
                steps: Some(steps),
                ..PhysicalRecord::default()
            })
            .collect();
        let mental = vec![mood_at(as_of() - Duration::days(2), 6)];

        let records = WindowRecords::collect(&window, &physical, &mental, &[]);
        let trends = half_window_trends(&records, &window, 15.0);

        let steps = trends[&MetricKind::Steps];
        assert_eq!(steps.direction, TrendDirection::Decreasing);
        assert!((steps.percent_change + (1.0 - 5_500.0 / 9_500.0) * 100.0).abs() < 1e-9);
        assert!(!trends.contains_key(&MetricKind::Mood));
        assert!(!trends.contains_key(&MetricKind::HeartRate));
    }
}
