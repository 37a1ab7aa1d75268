//! Data-quality inspection of raw rows, ahead of analysis

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashSet;

use crate::config::ZoneConverter;
use crate::ingest::RawBar;

/// Gaps longer than this between consecutive rows are reported
const MAX_GAP_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub total_records: usize,
    pub missing_values: usize,
    pub invalid_ohlc: usize,
    pub duplicate_timestamps: usize,
    pub large_gaps: usize,
    pub trading_days: usize,
    /// Mean high-low range per bar
    pub avg_range_pips: f64,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// In the analysis calendar
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
}

impl DataQualityReport {
    pub fn inspect(rows: &[RawBar], zone: &ZoneConverter, pip_size: f64) -> Self {
        let missing_values = rows.iter().filter(|r| !r.is_complete()).count();

        let invalid_ohlc = rows
            .iter()
            .filter_map(|r| Some((r.open?, r.high?, r.low?, r.close?)))
            .filter(|&(o, h, l, c)| h < l || o > h || o < l || c > h || c < l)
            .count();

        let mut seen = HashSet::with_capacity(rows.len());
        let duplicate_timestamps = rows.iter().filter(|r| !seen.insert(r.utc)).count();

        let large_gaps = rows
            .windows(2)
            .filter(|w| w[1].utc - w[0].utc > Duration::minutes(MAX_GAP_MINUTES))
            .count();

        let local: Vec<NaiveDateTime> = rows
            .iter()
            .map(|r| zone.from_utc(r.utc).naive_local())
            .collect();
        let trading_days = local
            .iter()
            .map(NaiveDateTime::date)
            .collect::<HashSet<NaiveDate>>()
            .len();

        let ranges: Vec<f64> = rows
            .iter()
            .filter_map(|r| Some((r.high? - r.low?) / pip_size))
            .collect();
        let avg_range_pips = if ranges.is_empty() {
            0.0
        } else {
            ranges.iter().sum::<f64>() / ranges.len() as f64
        };

        let prices = rows
            .iter()
            .flat_map(|r| [r.open, r.high, r.low, r.close])
            .flatten();
        let (min_price, max_price) = prices.fold((None, None), |(lo, hi): (Option<f64>, Option<f64>), p| {
            (
                Some(lo.map_or(p, |lo| lo.min(p))),
                Some(hi.map_or(p, |hi| hi.max(p))),
            )
        });

        Self {
            total_records: rows.len(),
            missing_values,
            invalid_ohlc,
            duplicate_timestamps,
            large_gaps,
            trading_days,
            avg_range_pips,
            min_price,
            max_price,
            first_timestamp: local.iter().min().copied(),
            last_timestamp: local.iter().max().copied(),
        }
    }

    /// Human-readable problems, empty when the data is clean
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.total_records == 0 {
            issues.push("No records".to_string());
        }
        if self.missing_values > 0 {
            issues.push(format!("Missing values: {} rows", self.missing_values));
        }
        if self.invalid_ohlc > 0 {
            issues.push(format!("Invalid OHLC data: {} rows", self.invalid_ohlc));
        }
        if self.duplicate_timestamps > 0 {
            issues.push(format!("Duplicate timestamps: {} rows", self.duplicate_timestamps));
        }
        if self.large_gaps > 0 {
            issues.push(format!(
                "Large gaps in data (>{} min): {}",
                MAX_GAP_MINUTES, self.large_gaps
            ));
        }
        issues
    }

    pub fn is_clean(&self) -> bool {
        self.issues().is_empty()
    }
}
