//! Cross-day statistics
//!
//! `StatisticsSummary` is the fixed count/percentage table exported next to
//! the per-day results. The breakdown helpers feed the text report.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::day::{DayResult, NyStatus};
use super::direction::{Direction, SweepType};

/// `round(100 * count / total, 2)`; 0 when there are no days
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStat {
    pub metric: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub total_days: usize,
    pub metrics: Vec<MetricStat>,
}

impl StatisticsSummary {
    pub fn from_days(days: &[DayResult]) -> Self {
        let total = days.len();
        let count = |pred: fn(&DayResult) -> bool| days.iter().filter(|&d| pred(d)).count();

        let counts: Vec<(&str, usize)> = vec![
            ("Total Days", total),
            ("Frankfurt Sweep High", count(|d| d.frankfurt.swept_high())),
            ("Frankfurt Sweep Low", count(|d| d.frankfurt.swept_low())),
            ("London Sweep High", count(|d| d.london.swept_high())),
            ("London Sweep Low", count(|d| d.london.swept_low())),
            ("Continue", count(|d| d.sweep_type == SweepType::Continue)),
            (
                "Sweep and Reverse",
                count(|d| d.sweep_type == SweepType::SweepAndReverse),
            ),
            ("No Sweep", count(|d| d.sweep_type == SweepType::NoSweep)),
            ("Rebalance Yes", count(|d| d.rebalance)),
            (
                "London Long",
                count(|d| d.london_direction == Some(Direction::Long)),
            ),
            (
                "London Short",
                count(|d| d.london_direction == Some(Direction::Short)),
            ),
            ("Sweep PDH", count(|d| d.previous_day_sweep.swept_high())),
            ("Sweep PDL", count(|d| d.previous_day_sweep.swept_low())),
            ("Retest Sweep Level", count(|d| d.retests.level)),
            ("Asia Mid Retest", count(|d| d.retests.mid)),
            (
                "NY Support",
                count(|d| d.new_york.status == Some(NyStatus::Support)),
            ),
            (
                "NY Reverse",
                count(|d| d.new_york.status == Some(NyStatus::Reverse)),
            ),
        ];

        let metrics = counts
            .into_iter()
            .map(|(metric, count)| MetricStat {
                metric: metric.to_string(),
                count,
                percentage: percentage(count, total),
            })
            .collect();

        Self {
            total_days: total,
            metrics,
        }
    }

    pub fn get(&self, metric: &str) -> Option<&MetricStat> {
        self.metrics.iter().find(|m| m.metric == metric)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample standard deviation, 0 below two values
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Up to `n` days with the largest London extension, largest first
pub fn top_days_by_extension(days: &[DayResult], n: usize) -> Vec<&DayResult> {
    let mut sorted: Vec<&DayResult> = days.iter().collect();
    sorted.sort_by(|a, b| {
        b.extension
            .extension_pips
            .total_cmp(&a.extension.extension_pips)
    });
    sorted.truncate(n);
    sorted
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayBreakdown {
    pub weekday: Weekday,
    pub days: usize,
    pub mean_extension_pips: f64,
    pub mean_extension_percent: f64,
    pub continue_count: usize,
    pub long_count: usize,
}

/// Per-weekday figures, Monday first, weekdays without data omitted
pub fn weekday_breakdown(days: &[DayResult]) -> Vec<WeekdayBreakdown> {
    const WEEK: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    WEEK.iter()
        .filter_map(|&weekday| {
            let group: Vec<&DayResult> = days.iter().filter(|d| d.weekday == weekday).collect();
            if group.is_empty() {
                return None;
            }
            let pips: Vec<f64> = group.iter().map(|d| d.extension.extension_pips).collect();
            let percents: Vec<f64> = group.iter().map(|d| d.extension.extension_percent).collect();
            Some(WeekdayBreakdown {
                weekday,
                days: group.len(),
                mean_extension_pips: mean(&pips),
                mean_extension_percent: mean(&percents),
                continue_count: group
                    .iter()
                    .filter(|d| d.sweep_type == SweepType::Continue)
                    .count(),
                long_count: group
                    .iter()
                    .filter(|d| d.london_direction == Some(Direction::Long))
                    .count(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepTypeBreakdown {
    pub sweep_type: SweepType,
    pub days: usize,
    pub mean_extension_pips: f64,
    pub std_extension_pips: f64,
    pub rebalance_count: usize,
}

pub fn sweep_type_breakdown(days: &[DayResult]) -> Vec<SweepTypeBreakdown> {
    SweepType::ALL
        .iter()
        .filter_map(|&sweep_type| {
            let group: Vec<&DayResult> = days.iter().filter(|d| d.sweep_type == sweep_type).collect();
            if group.is_empty() {
                return None;
            }
            let pips: Vec<f64> = group.iter().map(|d| d.extension.extension_pips).collect();
            Some(SweepTypeBreakdown {
                sweep_type,
                days: group.len(),
                mean_extension_pips: mean(&pips),
                std_extension_pips: sample_std(&pips),
                rebalance_count: group.iter().filter(|d| d.rebalance).count(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionAverages {
    pub mean_asia_range_pips: f64,
    pub mean_extension_pips: f64,
    pub mean_reverse_pips: f64,
    /// Percentage of days with a rebalance
    pub rebalance_rate: f64,
    pub ny_support: usize,
    pub ny_reverse: usize,
}

pub fn session_averages(days: &[DayResult], pip_size: f64) -> SessionAverages {
    let ranges: Vec<f64> = days.iter().map(|d| d.asia_range() / pip_size).collect();
    let extensions: Vec<f64> = days.iter().map(|d| d.extension.extension_pips).collect();
    let reverses: Vec<f64> = days.iter().map(|d| d.extension.reverse_pips).collect();

    SessionAverages {
        mean_asia_range_pips: mean(&ranges),
        mean_extension_pips: mean(&extensions),
        mean_reverse_pips: mean(&reverses),
        rebalance_rate: percentage(days.iter().filter(|d| d.rebalance).count(), days.len()),
        ny_support: days
            .iter()
            .filter(|d| d.new_york.status == Some(NyStatus::Support))
            .count(),
        ny_reverse: days
            .iter()
            .filter(|d| d.new_york.status == Some(NyStatus::Reverse))
            .count(),
    }
}
