//! Terminal and JSON rendering of summary outcomes

use colored::*;
use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

use crate::classifier::WellnessStatus;
use crate::models::MetricKind;
use crate::summary::{NoDataReport, SummaryOutcome, WellnessSummary};
use crate::trends::{ChartData, MetricTrend, TrendDirection, TrendPoint};

/// Output format of the `summary` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "table" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

pub fn render(outcome: &SummaryOutcome, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(outcome)),
        OutputFormat::Json => render_json(outcome),
    }
}

/// The response payload as pretty-printed JSON
pub fn render_json(outcome: &SummaryOutcome) -> serde_json::Result<String> {
    serde_json::to_string_pretty(outcome)
}

pub fn render_text(outcome: &SummaryOutcome) -> String {
    match outcome {
        SummaryOutcome::Summary(summary) => render_summary(summary),
        SummaryOutcome::NoData(report) => render_no_data(report),
    }
}

fn colored_status(status: WellnessStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        WellnessStatus::Excellent => label.green().bold(),
        WellnessStatus::Good => label.bright_green().bold(),
        WellnessStatus::Moderate => label.yellow().bold(),
        WellnessStatus::Fair => label.bright_red().bold(),
        WellnessStatus::Critical => label.red().bold(),
    }
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Average")]
    average: String,
    #[tabled(rename = "Sub-score")]
    sub_score: String,
    #[tabled(rename = "Trend")]
    trend: String,
}

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Sleep (h)")]
    sleep: String,
    #[tabled(rename = "Stress")]
    stress: String,
    #[tabled(rename = "Steps")]
    steps: String,
    #[tabled(rename = "Mood")]
    mood: String,
}

fn cell(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_else(|| "-".to_string())
}

fn trend_cell(trend: Option<&MetricTrend>) -> String {
    match trend {
        Some(t) => {
            let arrow = match t.direction {
                TrendDirection::Increasing => "↑",
                TrendDirection::Stable => "→",
                TrendDirection::Decreasing => "↓",
            };
            format!("{} {:+.0}%", arrow, t.percent_change)
        }
        None => "-".to_string(),
    }
}

fn metric_rows(summary: &WellnessSummary) -> Vec<MetricRow> {
    let m = &summary.metrics;
    let blood_pressure = match (m.avg_blood_pressure_sys, m.avg_blood_pressure_dia) {
        (Some(sys), Some(dia)) => Some(format!("{:.0}/{:.0} mmHg", sys, dia)),
        (Some(sys), None) => Some(format!("{:.0}/- mmHg", sys)),
        (None, Some(dia)) => Some(format!("-/{:.0} mmHg", dia)),
        (None, None) => None,
    };

    let scored = [
        (MetricKind::HeartRate, m.avg_heart_rate.map(|v| format!("{:.0} bpm", v))),
        (MetricKind::BloodPressure, blood_pressure),
        (MetricKind::Steps, m.avg_steps.map(|v| format!("{:.0}", v))),
        (MetricKind::SleepDuration, m.avg_sleep_duration.map(|v| format!("{:.1} h", v))),
        (MetricKind::Stress, m.avg_stress.map(|v| format!("{:.1} / 10", v))),
        (MetricKind::Anxiety, m.avg_anxiety.map(|v| format!("{:.1} / 10", v))),
        (MetricKind::Mood, m.avg_mood.map(|v| format!("{:.1} / 10", v))),
        (MetricKind::Energy, m.avg_energy.map(|v| format!("{:.1} / 10", v))),
    ];

    let mut rows: Vec<MetricRow> = scored
        .into_iter()
        .filter_map(|(kind, average)| {
            average.map(|average| MetricRow {
                metric: kind.to_string(),
                average,
                sub_score: cell(summary.sub_scores.get(&kind).copied(), 0),
                trend: trend_cell(summary.trends.get(&kind)),
            })
        })
        .collect();

    let unscored = [
        ("Calories", m.avg_calories.map(|v| format!("{:.0} kcal", v))),
        ("Temperature", m.avg_temperature.map(|v| format!("{:.1} °C", v))),
        ("Sleep Quality", m.avg_sleep_quality.map(|v| format!("{:.1} / 10", v))),
    ];
    rows.extend(unscored.into_iter().filter_map(|(label, average)| {
        average.map(|average| MetricRow {
            metric: label.to_string(),
            average,
            sub_score: "-".to_string(),
            trend: "-".to_string(),
        })
    }));

    rows
}

/// One row per day that has data in any series
fn day_rows(chart: &ChartData) -> Vec<DayRow> {
    let mut days: BTreeMap<&str, [Option<f64>; 4]> = BTreeMap::new();

    let series: [&[TrendPoint]; 4] = [
        &chart.sleep_trend,
        &chart.stress_trend,
        &chart.activity_trend,
        &chart.mood_trend,
    ];
    for (column, points) in series.iter().enumerate() {
        for point in points.iter() {
            days.entry(point.date.as_str()).or_default()[column] = Some(point.value);
        }
    }

    days.into_iter()
        .map(|(date, [sleep, stress, steps, mood])| DayRow {
            date: date.to_string(),
            sleep: cell(sleep, 1),
            stress: cell(stress, 1),
            steps: cell(steps, 0),
            mood: cell(mood, 1),
        })
        .collect()
}

fn render_summary(summary: &WellnessSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{}\n",
        format!("Wellness summary (last {} days)", summary.window_days).bold()
    ));
    out.push_str(&format!(
        "Score: {}  Status: {}\n",
        format!("{:.1}", summary.wellness_score).bold(),
        colored_status(summary.status)
    ));
    out.push_str(&format!("{}\n\n", summary.status.description().dimmed()));

    let rows = metric_rows(summary);
    if !rows.is_empty() {
        out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
        out.push('\n');
    }

    if !summary.insights.is_empty() {
        out.push_str(&format!("\n{}\n", "Insights".cyan().bold()));
        for insight in &summary.insights {
            out.push_str(&format!("  • {}\n", insight));
        }
    }

    if !summary.recommendations.is_empty() {
        out.push_str(&format!("\n{}\n", "Recommendations".yellow().bold()));
        for recommendation in &summary.recommendations {
            out.push_str(&format!("  → {}\n", recommendation));
        }
    }

    let days = day_rows(&summary.chart_data);
    if !days.is_empty() {
        out.push_str(&format!("\n{}\n", "Daily trends".blue().bold()));
        out.push_str(&Table::new(days).with(Style::rounded()).to_string());
        out.push('\n');
    }

    out
}

fn render_no_data(report: &NoDataReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "No wellness data yet".yellow().bold()));
    out.push_str(&format!("{}\n", report.message));
    for recommendation in &report.recommendations {
        out.push_str(&format!("  → {}\n", recommendation));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::MetricAverages;
    use crate::summary::NoDataReason;

    fn summary() -> WellnessSummary {
        let mut sub_scores = BTreeMap::new();
        sub_scores.insert(MetricKind::Mood, 77.78);
        sub_scores.insert(MetricKind::Steps, 90.0);

        WellnessSummary {
            wellness_score: 82.4,
            status: WellnessStatus::Good,
            insights: vec!["Your mood has improved significantly recently.".to_string()],
            recommendations: vec![],
            chart_data: ChartData {
                mood_trend: vec![TrendPoint {
                    date: "2024-05-02".to_string(),
                    value: 8.0,
                }],
                activity_trend: vec![
                    TrendPoint {
                        date: "2024-05-01".to_string(),
                        value: 9000.0,
                    },
                    TrendPoint {
                        date: "2024-05-02".to_string(),
                        value: 7000.0,
                    },
                ],
                ..ChartData::default()
            },
            metrics: MetricAverages {
                avg_mood: Some(8.0),
                avg_steps: Some(8000.0),
                avg_calories: Some(2100.0),
                ..MetricAverages::default()
            },
            sub_scores,
            trends: BTreeMap::new(),
            window_days: 14,
            record_count: 3,
        }
    }

    #[test]
    fn test_text_report_sections() {
        let text = render_text(&SummaryOutcome::Summary(Box::new(summary())));

        assert!(text.contains("82.4"));
        assert!(text.contains("Good"));
        assert!(text.contains("Mood"));
        assert!(text.contains("2100 kcal"));
        assert!(text.contains("Insights"));
        assert!(!text.contains("Recommendations"));
        assert!(text.contains("2024-05-01"));
    }

    #[test]
    fn test_day_rows_merge_series() {
        let rows = day_rows(&summary().chart_data);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].mood, "-");
        assert_eq!(rows[1].mood, "8.0");
        assert_eq!(rows[1].steps, "7000");
    }

    #[test]
    fn test_no_data_text() {
        let outcome = SummaryOutcome::NoData(NoDataReport::new(1, 14, NoDataReason::NoRecords));
        let text = render_text(&outcome);
        assert!(text.contains("No health data found in the last 14 days"));
    }

    #[test]
    fn test_json_is_payload() {
        let json = render(
            &SummaryOutcome::Summary(Box::new(summary())),
            OutputFormat::Json,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "Good");
        assert_eq!(value["chart_data"]["activity_trend"][1]["value"], 7000.0);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
    }
}
