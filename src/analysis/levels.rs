//! Session extremes, Asia levels and previous-day high/low

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::bars::{BarSeries, PriceBar};
use super::session::extract_session;
use crate::config::SessionCatalogue;
use crate::error::DayError;

/// High/low/mid of one session window on one day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionExtremes {
    pub high: f64,
    pub low: f64,
    pub mid: f64,
    /// First bar reaching `high`
    pub high_time: NaiveDateTime,
    /// First bar reaching `low`
    pub low_time: NaiveDateTime,
    /// Open of the first bar in the window
    pub open: f64,
}

impl SessionExtremes {
    /// `None` for an empty window.
    ///
    /// Single stable pass; on equal extremes the earliest bar wins.
    pub fn from_bars(bars: &[PriceBar]) -> Option<Self> {
        let first = bars.first()?;
        let (high, high_time, low, low_time) = bars.iter().skip(1).fold(
            (first.high, first.local_time(), first.low, first.local_time()),
            |(high, high_time, low, low_time), bar| {
                let (high, high_time) = if bar.high > high {
                    (bar.high, bar.local_time())
                } else {
                    (high, high_time)
                };
                let (low, low_time) = if bar.low < low {
                    (bar.low, bar.local_time())
                } else {
                    (low, low_time)
                };
                (high, high_time, low, low_time)
            },
        );

        Some(Self {
            high,
            low,
            mid: (high + low) / 2.0,
            high_time,
            low_time,
            open: first.open,
        })
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn reference(&self) -> ReferenceLevels {
        ReferenceLevels {
            high: self.high,
            low: self.low,
        }
    }
}

/// A high/low pair other sessions are measured against (Asia range, PDH/PDL)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLevels {
    pub high: f64,
    pub low: f64,
}

/// Asia high/low/mid for `date`; `None` means the day has no Asia data
pub fn asia_levels(
    series: &BarSeries,
    date: NaiveDate,
    sessions: &SessionCatalogue,
) -> Result<Option<SessionExtremes>, DayError> {
    let bars = extract_session(series, date, &sessions.asia)?;
    Ok(SessionExtremes::from_bars(bars))
}

/// Previous calendar day's full-day extremes (PDH/PDL)
pub fn previous_day_levels(
    series: &BarSeries,
    date: NaiveDate,
    sessions: &SessionCatalogue,
) -> Result<Option<SessionExtremes>, DayError> {
    let Some(prev) = date.checked_sub_signed(Duration::days(1)) else {
        return Ok(None);
    };
    let bars = extract_session(series, prev, &sessions.previous_day)?;
    Ok(SessionExtremes::from_bars(bars))
}
