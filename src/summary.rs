//! Response values produced by the engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregator::MetricAverages;
use crate::classifier::WellnessStatus;
use crate::models::{MetricKind, UserId};
use crate::trends::{ChartData, MetricTrend};

/// Computed wellness summary, recomputed on every request and never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessSummary {
    /// Composite score in 0-100, rounded to two decimals
    pub wellness_score: f64,
    pub status: WellnessStatus,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub chart_data: ChartData,
    pub metrics: MetricAverages,

    /// Mean 0-100 sub-score of each metric that had data
    pub sub_scores: BTreeMap<MetricKind, f64>,

    /// Half-window direction of the tracked metrics
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub trends: BTreeMap<MetricKind, MetricTrend>,

    pub window_days: u32,

    /// Records that went into the summary
    pub record_count: usize,
}

/// Why no score could be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
    /// Nothing was logged in the window
    NoRecords,
    /// Records exist but none carried a scored measurement
    NoScorableMetrics,
}

/// Marker serialized as `"status": "no_data"`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataStatus {
    #[default]
    NoData,
}

/// Empty-state result rendered by callers instead of a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoDataReport {
    pub status: NoDataStatus,
    pub user_id: UserId,
    pub window_days: u32,
    pub reason: NoDataReason,
    pub message: String,
    pub recommendations: Vec<String>,
}

impl NoDataReport {
    pub fn new(user_id: UserId, window_days: u32, reason: NoDataReason) -> Self {
        let message = match reason {
            NoDataReason::NoRecords => format!(
                "No health data found in the last {} days. Start logging to see your wellness summary.",
                window_days
            ),
            NoDataReason::NoScorableMetrics => format!(
                "Records from the last {} days carry no measurements that can be scored.",
                window_days
            ),
        };

        NoDataReport {
            status: NoDataStatus::NoData,
            user_id,
            window_days,
            reason,
            message,
            recommendations: vec![
                "Log your physical health metrics such as heart rate, blood pressure and steps."
                    .to_string(),
                "Track your mood, stress and energy levels.".to_string(),
                "Record your sleep duration and quality.".to_string(),
            ],
        }
    }
}

/// Either a full summary or the empty state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SummaryOutcome {
    Summary(Box<WellnessSummary>),
    NoData(NoDataReport),
}

impl SummaryOutcome {
    pub fn summary(&self) -> Option<&WellnessSummary> {
        match self {
            SummaryOutcome::Summary(summary) => Some(&**summary),
            SummaryOutcome::NoData(_) => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, SummaryOutcome::NoData(_))
    }
}
