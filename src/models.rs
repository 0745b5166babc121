use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the user who logged a record
pub type UserId = i64;

/// Metrics that contribute a sub-score to the composite wellness score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    HeartRate,
    BloodPressure,
    Steps,
    SleepDuration,
    Stress,
    Anxiety,
    Mood,
    Energy,
}

impl MetricKind {
    /// Every scored metric, in a fixed order
    pub const ALL: [MetricKind; 8] = [
        MetricKind::HeartRate,
        MetricKind::BloodPressure,
        MetricKind::Steps,
        MetricKind::SleepDuration,
        MetricKind::Stress,
        MetricKind::Anxiety,
        MetricKind::Mood,
        MetricKind::Energy,
    ];

    /// Stable machine name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::HeartRate => "heart_rate",
            MetricKind::BloodPressure => "blood_pressure",
            MetricKind::Steps => "steps",
            MetricKind::SleepDuration => "sleep_duration",
            MetricKind::Stress => "stress",
            MetricKind::Anxiety => "anxiety",
            MetricKind::Mood => "mood",
            MetricKind::Energy => "energy",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::HeartRate => write!(f, "Heart Rate"),
            MetricKind::BloodPressure => write!(f, "Blood Pressure"),
            MetricKind::Steps => write!(f, "Steps"),
            MetricKind::SleepDuration => write!(f, "Sleep Duration"),
            MetricKind::Stress => write!(f, "Stress"),
            MetricKind::Anxiety => write!(f, "Anxiety"),
            MetricKind::Mood => write!(f, "Mood"),
            MetricKind::Energy => write!(f, "Energy"),
        }
    }
}

/// Vitals and activity logged at a point in time
///
/// Records are immutable once stored; a newer record supersedes an older one
/// only by carrying a later timestamp. Every measurement is optional so that
/// partially filled logs and external syncs can be represented as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalRecord {
    /// Owner of the record
    pub user_id: UserId,

    /// When the measurement was logged
    pub timestamp: DateTime<Utc>,

    /// Resting heart rate in beats per minute
    pub heart_rate: Option<i32>,

    /// Systolic blood pressure in mmHg
    pub bp_sys: Option<i32>,

    /// Diastolic blood pressure in mmHg
    pub bp_dia: Option<i32>,

    /// Daily step count
    pub steps: Option<i32>,

    /// Active energy expenditure in kcal
    pub calories_burned: Option<i32>,

    /// Body temperature in °C
    pub temperature: Option<f64>,
}

/// Self-reported mental state on 1-10 scales
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MentalRecord {
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,

    /// 1 = very low, 10 = excellent
    pub mood_score: Option<i32>,

    /// 1 = calm, 10 = overwhelmed
    pub stress_level: Option<i32>,

    /// 1 = calm, 10 = severe
    pub anxiety_level: Option<i32>,

    /// 1 = exhausted, 10 = energetic
    pub energy_level: Option<i32>,

    /// Perceived sleep quality for the previous night
    pub sleep_quality: Option<i32>,

    /// Free-text journal entry, never analysed
    pub notes: Option<String>,
}

/// A night of sleep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepRecord {
    pub user_id: UserId,

    /// When the sleep entry was logged
    pub timestamp: DateTime<Utc>,

    /// Total sleep in hours
    pub duration_hours: Option<f64>,

    /// Perceived quality, 1-10
    pub quality: Option<i32>,

    pub bedtime: Option<DateTime<Utc>>,
    pub wake_time: Option<DateTime<Utc>>,
}

impl SleepRecord {
    /// Logged duration, or the bedtime to wake time span when only the times were logged
    pub fn effective_duration_hours(&self) -> Option<f64> {
        if self.duration_hours.is_some() {
            return self.duration_hours;
        }

        match (self.bedtime, self.wake_time) {
            (Some(bed), Some(wake)) if wake > bed => {
                Some((wake - bed).num_minutes() as f64 / 60.0)
            }
            _ => None,
        }
    }
}

/// The most recent `days` days ending at `as_of`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailingWindow {
    pub as_of: DateTime<Utc>,
    pub days: u32,
}

impl TrailingWindow {
    pub fn new(as_of: DateTime<Utc>, days: u32) -> Self {
        TrailingWindow { as_of, days }
    }

    /// Inclusive lower bound of the window
    pub fn start(&self) -> DateTime<Utc> {
        self.as_of - Duration::days(self.days as i64)
    }

    /// Boundary between the earlier and the recent half
    pub fn midpoint(&self) -> DateTime<Utc> {
        self.as_of - Duration::hours(self.days as i64 * 12)
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start() && timestamp <= self.as_of
    }

    pub fn is_recent_half(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.midpoint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_bounds() {
        let as_of = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let window = TrailingWindow::new(as_of, 14);

        assert_eq!(window.start(), Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        assert_eq!(window.midpoint(), Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap());
        assert!(window.contains(window.start()));
        assert!(window.contains(as_of));
        assert!(!window.contains(as_of + Duration::seconds(1)));
        assert!(!window.contains(window.start() - Duration::seconds(1)));
    }

    #[test]
    fn test_sleep_duration_from_times() {
        let bedtime = Utc.with_ymd_and_hms(2024, 3, 14, 23, 0, 0).unwrap();
        let record = SleepRecord {
            bedtime: Some(bedtime),
            wake_time: Some(bedtime + Duration::minutes(450)),
            ..SleepRecord::default()
        };
        assert_eq!(record.effective_duration_hours(), Some(7.5));

        let logged = SleepRecord {
            duration_hours: Some(6.0),
            ..record.clone()
        };
        assert_eq!(logged.effective_duration_hours(), Some(6.0));

        let reversed = SleepRecord {
            bedtime: record.wake_time,
            wake_time: record.bedtime,
            ..SleepRecord::default()
        };
        assert_eq!(reversed.effective_duration_hours(), None);
    }

    #[test]
    fn test_metric_kind_names() {
        for kind in MetricKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert_eq!(MetricKind::SleepDuration.to_string(), "Sleep Duration");
    }
}
