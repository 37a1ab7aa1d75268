//! Tabular export of analysis results
//!
//! Field names and the "Yes"/"No" flag values match the reports downstream
//! tooling already reads.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analysis::{DayResult, PeriodAnalysis, SkippedDay, StatisticsSummary};
use crate::config::AnalyzerConfig;

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn hhmm(time: Option<NaiveDateTime>) -> Option<String> {
    time.map(|t| t.format("%H:%M").to_string())
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// One exported row per analysed day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayRecord {
    pub date: String,
    pub day_of_week: String,
    pub asia_high: f64,
    pub asia_low: f64,
    pub asia_mid: f64,
    pub frankfurt_sweep_high: &'static str,
    pub frankfurt_sweep_low: &'static str,
    pub frankfurt_high_time: Option<String>,
    pub frankfurt_low_time: Option<String>,
    pub london_sweep_high: &'static str,
    pub london_sweep_low: &'static str,
    pub london_sweep_asia_high_time: Option<String>,
    pub london_sweep_asia_low_time: Option<String>,
    pub london_high_time: Option<String>,
    pub london_low_time: Option<String>,
    pub sweep_type: &'static str,
    pub london_direction: Option<&'static str>,
    pub rebalance: &'static str,
    pub extension_pips: f64,
    pub extension_percent: f64,
    pub max_time: Option<String>,
    pub min_time: Option<String>,
    pub reverse_pips: f64,
    pub reverse_percent: f64,
    pub retest_sweep_level: &'static str,
    pub asia_mid_retest: &'static str,
    pub pdh: Option<f64>,
    pub pdl: Option<f64>,
    pub sweep_pdh: &'static str,
    pub sweep_pdl: &'static str,
    pub pdh_time: Option<String>,
    pub pdl_time: Option<String>,
    pub ny_direction: Option<&'static str>,
    pub ny_status: Option<&'static str>,
    pub ny_up_extension_pips: f64,
    pub ny_up_extension_percent: f64,
    pub ny_down_extension_pips: f64,
    pub ny_down_extension_percent: f64,
    pub ny_max_high_time: Option<String>,
    pub ny_min_low_time: Option<String>,
}

impl DayRecord {
    pub fn from_result(day: &DayResult, price_precision: u32) -> Self {
        let price = |p: f64| round_to(p, price_precision);
        let pips = |p: f64| round_to(p, 1);
        let pct = |p: f64| round_to(p, 2);
        let london_window = day.london.window;
        let ny = &day.new_york.metrics;

        Self {
            date: day.date.format("%Y-%m-%d").to_string(),
            day_of_week: day.date.format("%A").to_string(),
            asia_high: price(day.asia.high),
            asia_low: price(day.asia.low),
            asia_mid: price(day.asia.mid),
            frankfurt_sweep_high: yes_no(day.frankfurt.swept_high()),
            frankfurt_sweep_low: yes_no(day.frankfurt.swept_low()),
            frankfurt_high_time: hhmm(day.frankfurt.high.map(|s| s.event_time)),
            frankfurt_low_time: hhmm(day.frankfurt.low.map(|s| s.event_time)),
            london_sweep_high: yes_no(day.london.swept_high()),
            london_sweep_low: yes_no(day.london.swept_low()),
            london_sweep_asia_high_time: hhmm(day.london.high.map(|s| s.event_time)),
            london_sweep_asia_low_time: hhmm(day.london.low.map(|s| s.event_time)),
            london_high_time: hhmm(london_window.map(|w| w.high_time)),
            london_low_time: hhmm(london_window.map(|w| w.low_time)),
            sweep_type: day.sweep_type.as_str(),
            london_direction: day.london_direction.map(|d| d.as_str()),
            rebalance: yes_no(day.rebalance),
            extension_pips: pips(day.extension.extension_pips),
            extension_percent: pct(day.extension.extension_percent),
            max_time: hhmm(day.extension.max_time),
            min_time: hhmm(day.extension.min_time),
            reverse_pips: pips(day.extension.reverse_pips),
            reverse_percent: pct(day.extension.reverse_percent),
            retest_sweep_level: yes_no(day.retests.level),
            asia_mid_retest: yes_no(day.retests.mid),
            pdh: day.previous_day.map(|pd| price(pd.high)),
            pdl: day.previous_day.map(|pd| price(pd.low)),
            sweep_pdh: yes_no(day.previous_day_sweep.swept_high()),
            sweep_pdl: yes_no(day.previous_day_sweep.swept_low()),
            pdh_time: hhmm(day.previous_day_sweep.high.map(|s| s.event_time)),
            pdl_time: hhmm(day.previous_day_sweep.low.map(|s| s.event_time)),
            ny_direction: day.new_york.direction.map(|d| d.as_str()),
            ny_status: day.new_york.status.map(|s| s.as_str()),
            ny_up_extension_pips: pips(ny.up_pips),
            ny_up_extension_percent: pct(ny.up_percent),
            ny_down_extension_pips: pips(ny.down_pips),
            ny_down_extension_percent: pct(ny.down_percent),
            ny_max_high_time: hhmm(ny.max_time),
            ny_min_low_time: hhmm(ny.min_time),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsRecord {
    #[serde(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Value")]
    pub value: usize,
    #[serde(rename = "Percentage")]
    pub percentage: f64,
}

pub fn statistics_records(summary: &StatisticsSummary) -> Vec<StatisticsRecord> {
    summary
        .metrics
        .iter()
        .map(|m| StatisticsRecord {
            metric: m.metric.clone(),
            value: m.count,
            percentage: m.percentage,
        })
        .collect()
}

pub fn day_records(analysis: &PeriodAnalysis, config: &AnalyzerConfig) -> Vec<DayRecord> {
    analysis
        .days
        .iter()
        .map(|d| DayRecord::from_result(d, config.price_precision))
        .collect()
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct AnalysisDocument<'a> {
    instrument: &'a str,
    timezone: String,
    pip_size: f64,
    records: &'a [DayRecord],
    statistics: &'a StatisticsSummary,
    skipped: &'a [SkippedDay],
}

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub results: PathBuf,
    pub statistics: PathBuf,
    pub json: PathBuf,
}

/// Write `<base>_results.csv`, `<base>_statistics.csv` and `<base>_analysis.json`
pub fn export_analysis(
    dir: &Path,
    base: &str,
    analysis: &PeriodAnalysis,
    config: &AnalyzerConfig,
) -> Result<ExportPaths> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {:?}", dir))?;

    let paths = ExportPaths {
        results: dir.join(format!("{}_results.csv", base)),
        statistics: dir.join(format!("{}_statistics.csv", base)),
        json: dir.join(format!("{}_analysis.json", base)),
    };

    let records = day_records(analysis, config);
    let summary = analysis.statistics();

    write_csv(&paths.results, &records)?;
    write_csv(&paths.statistics, &statistics_records(&summary))?;

    let document = AnalysisDocument {
        instrument: &config.instrument,
        timezone: config.timezone.to_string(),
        pip_size: config.pip_size,
        records: &records,
        statistics: &summary,
        skipped: &analysis.skipped,
    };
    let file = File::create(&paths.json)
        .with_context(|| format!("Failed to create {:?}", paths.json))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &document)?;

    info!("Saved {} day records to {:?}", records.len(), paths.results);
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::bars::test_support::*;
    use crate::analysis::LiquidityEngine;

    fn sample_analysis() -> PeriodAnalysis {
        let prev = day(2025, 5, 5);
        let d = day(2025, 5, 6);
        let mut bars = flat_run(at(prev, 12, 0), 2, 1.1012, 1.0995);
        bars.extend(flat_run(at(d, 2, 0), 30, 1.1010, 1.1000));
        bars.push(hl(at(d, 10, 0), 1.1008, 1.1004));
        bars.push(hl(at(d, 11, 0), 1.1014, 1.1006));
        bars.push(hl(at(d, 12, 0), 1.1025, 1.1012));
        bars.push(bar_at(at(d, 15, 0), 1.1020, 1.1024, 1.1018, 1.1022));
        bars.push(hl(at(d, 16, 0), 1.1030, 1.1020));
        bars.sort_by_key(|b| b.local_time());

        LiquidityEngine::new(AnalyzerConfig::default())
            .unwrap()
            .analyze_bars(bars)
            .unwrap()
    }

    #[test]
    fn test_day_record_fields() {
        let analysis = sample_analysis();
        let records = day_records(&analysis, &AnalyzerConfig::default());
        assert_eq!(records.len(), 1);
        let r = &records[0];

        assert_eq!(r.date, "2025-05-06");
        assert_eq!(r.day_of_week, "Tuesday");
        assert_eq!(r.asia_high, 1.101);
        assert_eq!(r.london_sweep_high, "Yes");
        assert_eq!(r.london_sweep_low, "No");
        assert_eq!(r.london_sweep_asia_high_time.as_deref(), Some("12:00"));
        assert_eq!(r.london_sweep_asia_low_time, None);
        assert_eq!(r.london_low_time.as_deref(), Some("10:00"));
        assert_eq!(r.sweep_type, "Continue");
        assert_eq!(r.london_direction, Some("Long"));
        assert_eq!(r.rebalance, "No");
        assert_eq!(r.pdh, Some(1.1012));
        assert_eq!(r.sweep_pdh, "Yes");
        assert_eq!(r.pdh_time.as_deref(), Some("12:00"));
        assert_eq!(r.ny_direction, Some("Long"));
        assert_eq!(r.ny_status, Some("Support"));
        assert_eq!(r.ny_max_high_time.as_deref(), Some("16:00"));
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to(12.345678, 1), 12.3);
        assert_eq!(round_to(1.1234567, 5), 1.12346);
    }

    #[test]
    fn test_export_writes_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let analysis = sample_analysis();
        let paths = export_analysis(dir.path(), "eurusd", &analysis, &AnalyzerConfig::default()).unwrap();

        let results = std::fs::read_to_string(&paths.results).unwrap();
        let header = results.lines().next().unwrap();
        assert!(header.starts_with("date,day_of_week,asia_high,asia_low,asia_mid,frankfurt_sweep_high"));
        assert!(header.ends_with("ny_max_high_time,ny_min_low_time"));
        assert_eq!(results.lines().count(), 2);

        let stats = std::fs::read_to_string(&paths.statistics).unwrap();
        assert!(stats.starts_with("Metric,Value,Percentage"));
        assert!(stats.contains("Continue,1,100.0"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.json).unwrap()).unwrap();
        assert_eq!(json["instrument"], "EURUSD");
        assert_eq!(json["records"][0]["sweep_type"], "Continue");
        assert_eq!(json["statistics"]["total_days"], 1);
        assert_eq!(json["skipped"].as_array().unwrap().len(), 1);
    }
}
