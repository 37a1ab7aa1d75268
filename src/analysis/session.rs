//! Session window extraction
//!
//! Slices the bar stream into the subset belonging to a named daily window.
//! Empty slices are a normal outcome for sparse data.

use chrono::{NaiveDate, NaiveDateTime};

use super::bars::{BarSeries, PriceBar};
use crate::config::SessionWindow;
use crate::error::DayError;

/// Bars of `window` on `date`, in time order
pub fn extract_session<'a>(
    series: &'a BarSeries,
    date: NaiveDate,
    window: &SessionWindow,
) -> Result<&'a [PriceBar], DayError> {
    let (start, end) = window.bounds(date)?;
    Ok(series.range(start, end))
}

/// Bars strictly after `anchor` up to and including `session_end`
pub fn bars_after<'a>(
    series: &'a BarSeries,
    anchor: NaiveDateTime,
    session_end: NaiveDateTime,
) -> &'a [PriceBar] {
    series.after_until(anchor, session_end)
}
