//! Wellness summary computation
//!
//! The engine holds only an immutable scoring policy. Every call reads a
//! snapshot of one user's records and recomputes the summary from scratch, so
//! a single engine can serve any number of concurrent callers.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use crate::aggregator::{round_to, Aggregator, WindowRecords};
use crate::config::AppConfig;
use crate::error::{Result, WellnessError};
use crate::insights::{band_positions, InsightGenerator};
use crate::models::{MentalRecord, PhysicalRecord, SleepRecord, TrailingWindow, UserId};
use crate::policy::ScoringPolicy;
use crate::store::RecordStore;
use crate::summary::{NoDataReason, NoDataReport, SummaryOutcome, WellnessSummary};
use crate::trends::{half_window_trends, TrendBuilder};

/// Largest trailing window accepted unless configured otherwise
pub const DEFAULT_MAX_WINDOW_DAYS: u32 = 365;

#[derive(Debug, Clone)]
pub struct WellnessEngine {
    policy: ScoringPolicy,
    max_window_days: u32,
}

impl Default for WellnessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl WellnessEngine {
    /// Engine with the built-in scoring policy
    pub fn new() -> Self {
        WellnessEngine {
            policy: ScoringPolicy::default(),
            max_window_days: DEFAULT_MAX_WINDOW_DAYS,
        }
    }

    /// Engine with a custom policy, rejected if it cannot produce meaningful scores
    pub fn with_policy(policy: ScoringPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(WellnessEngine {
            policy,
            max_window_days: DEFAULT_MAX_WINDOW_DAYS,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let engine = Self::with_policy(config.scoring.clone())?;
        engine.with_max_window_days(config.settings.max_window_days)
    }

    pub fn with_max_window_days(mut self, max_window_days: u32) -> Result<Self> {
        if max_window_days == 0 {
            return Err(WellnessError::Configuration(
                "max_window_days must be at least 1".to_string(),
            ));
        }
        self.max_window_days = max_window_days;
        Ok(self)
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn max_window_days(&self) -> u32 {
        self.max_window_days
    }

    /// Check a caller-supplied window length, falling back to the policy default
    pub fn resolve_window_days(&self, window_days: Option<i64>) -> Result<u32> {
        let days = window_days.unwrap_or(i64::from(self.policy.default_window_days));

        if days < 1 || days > i64::from(self.max_window_days) {
            return Err(WellnessError::InvalidWindow {
                days,
                max: self.max_window_days,
            });
        }

        Ok(days as u32)
    }

    /// Summary for the window ending now
    #[instrument(skip(self, store))]
    pub fn compute_summary<S>(
        &self,
        store: &S,
        user_id: UserId,
        window_days: Option<i64>,
    ) -> Result<SummaryOutcome>
    where
        S: RecordStore + ?Sized,
    {
        self.compute_summary_at(store, user_id, window_days, Utc::now())
    }

    /// Summary for the window ending at `as_of`
    pub fn compute_summary_at<S>(
        &self,
        store: &S,
        user_id: UserId,
        window_days: Option<i64>,
        as_of: DateTime<Utc>,
    ) -> Result<SummaryOutcome>
    where
        S: RecordStore + ?Sized,
    {
        let days = self.resolve_window_days(window_days)?;
        let window = TrailingWindow::new(as_of, days);
        let since = window.start();

        let physical = store.list_physical_records(user_id, since)?;
        let mental = store.list_mental_records(user_id, since)?;
        let sleep = store.list_sleep_records(user_id, since)?;

        debug!(
            user_id,
            physical = physical.len(),
            mental = mental.len(),
            sleep = sleep.len(),
            "Loaded records"
        );

        Ok(self.summarize(user_id, &physical, &mental, &sleep, &window))
    }

    /// Pure computation over already materialized records
    ///
    /// Records outside `window` are ignored, so callers may pass a superset.
    pub fn summarize(
        &self,
        user_id: UserId,
        physical: &[PhysicalRecord],
        mental: &[MentalRecord],
        sleep: &[SleepRecord],
        window: &TrailingWindow,
    ) -> SummaryOutcome {
        let records = WindowRecords::collect(window, physical, mental, sleep);

        if records.adjusted_values > 0 {
            warn!(
                user_id,
                adjusted = records.adjusted_values,
                "Clamped out-of-range values into their valid domain"
            );
        }

        if records.is_empty() {
            info!(user_id, window_days = window.days, "No records in window");
            return SummaryOutcome::NoData(NoDataReport::new(
                user_id,
                window.days,
                NoDataReason::NoRecords,
            ));
        }

        let aggregate = Aggregator::new(&self.policy).aggregate(&records);
        debug!(sub_scores = ?aggregate.sub_scores, "Aggregated sub-scores");

        let Some(composite) = aggregate.composite else {
            info!(user_id, "Records carry no scorable metrics");
            return SummaryOutcome::NoData(NoDataReport::new(
                user_id,
                window.days,
                NoDataReason::NoScorableMetrics,
            ));
        };

        let wellness_score = round_to(composite.clamp(0.0, 100.0), 2);
        let status = self.policy.bands.classify(wellness_score);

        let trends = half_window_trends(&records, window, self.policy.insights.trend_change_pct);
        let positions = band_positions(&self.policy, &records);
        let report = InsightGenerator::new(&self.policy).generate(
            &aggregate.sub_scores,
            &aggregate.averages,
            &trends,
            &positions,
        );
        debug!(rules = ?report.triggered, "Evaluated insight rules");

        let chart_data = TrendBuilder::build(&records);

        let sub_scores: BTreeMap<_, _> = aggregate
            .sub_scores
            .iter()
            .map(|(kind, score)| (*kind, round_to(*score, 2)))
            .collect();

        info!(
            user_id,
            score = wellness_score,
            status = %status,
            records = records.record_count(),
            "Wellness summary computed"
        );

        SummaryOutcome::Summary(Box::new(WellnessSummary {
            wellness_score,
            status,
            insights: report.insights,
            recommendations: report.recommendations,
            chart_data,
            metrics: aggregate.averages.rounded(),
            sub_scores,
            trends,
            window_days: window.days,
            record_count: records.record_count(),
        }))
    }
}
