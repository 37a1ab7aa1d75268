//! Price bars and the validated bar stream the engine consumes

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// One OHLC bar stamped in the analysis calendar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceBar {
    /// Wall-clock time in the analysis calendar
    pub fn local_time(&self) -> NaiveDateTime {
        self.timestamp.naive_local()
    }

    pub fn trading_date(&self) -> NaiveDate {
        self.local_time().date()
    }

    pub fn is_finite(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }

    /// low <= min(open, close) <= max(open, close) <= high
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open.min(self.close) && self.open.max(self.close) <= self.high
    }

    /// High or low lies within `tolerance` of `level`
    pub fn touches(&self, level: f64, tolerance: f64) -> bool {
        is_near_level(self.high, level, tolerance) || is_near_level(self.low, level, tolerance)
    }
}

/// Check if a price is within a tolerance of a level
pub fn is_near_level(price: f64, level: f64, tolerance: f64) -> bool {
    (price - level).abs() <= tolerance
}

/// Ordered, duplicate-free, non-empty bar stream.
///
/// Bars are strictly ascending by wall-clock time, which lets window lookups
/// binary-search instead of scanning the whole stream.
#[derive(Debug, Clone)]
pub struct BarSeries {
    bars: Vec<PriceBar>,
}

impl BarSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, DataError> {
        if bars.is_empty() {
            return Err(DataError::EmptyInput);
        }

        for (index, bar) in bars.iter().enumerate() {
            if !bar.is_finite() {
                return Err(DataError::NonFinite { index });
            }
            if !bar.is_consistent() {
                return Err(DataError::InvalidOhlc {
                    index,
                    timestamp: bar.local_time(),
                });
            }
        }

        if let Some(index) = bars
            .windows(2)
            .position(|pair| pair[1].local_time() <= pair[0].local_time())
        {
            return Err(DataError::Unsorted {
                index: index + 1,
                timestamp: bars[index + 1].local_time(),
                previous: bars[index].local_time(),
            });
        }

        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_time(&self) -> Option<NaiveDateTime> {
        self.bars.first().map(PriceBar::local_time)
    }

    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.bars.last().map(PriceBar::local_time)
    }

    /// Distinct calendar dates present, ascending
    pub fn trading_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.bars.iter().map(PriceBar::trading_date).collect();
        dates.dedup();
        dates
    }

    /// Bars with `start <= t < end`
    pub fn range(&self, start: NaiveDateTime, end: NaiveDateTime) -> &[PriceBar] {
        let lo = self.bars.partition_point(|b| b.local_time() < start);
        let hi = self.bars.partition_point(|b| b.local_time() < end);
        &self.bars[lo..hi.max(lo)]
    }

    /// Bars with `after < t <= until`
    pub fn after_until(&self, after: NaiveDateTime, until: NaiveDateTime) -> &[PriceBar] {
        let lo = self.bars.partition_point(|b| b.local_time() <= after);
        let hi = self.bars.partition_point(|b| b.local_time() <= until);
        &self.bars[lo..hi.max(lo)]
    }
}
