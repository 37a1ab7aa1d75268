//! Error taxonomy for the liquidity engine
//!
//! - `DataError`: structural problems with the input or configuration. Fatal
//!   for the whole file/run.
//! - `DayError`: a failure while analysing a single calendar day. The engine
//!   converts it into a skipped day and keeps going.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("input contains no price bars")]
    EmptyInput,

    #[error("bar {index} has a non-finite price")]
    NonFinite { index: usize },

    #[error("bar {index} at {timestamp} violates low <= open/close <= high")]
    InvalidOhlc {
        index: usize,
        timestamp: NaiveDateTime,
    },

    #[error("bar {index} at {timestamp} is not after previous bar at {previous}")]
    Unsorted {
        index: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },

    #[error("line {line}: cannot parse timestamp {value:?}")]
    InvalidTimestamp { line: usize, value: String },

    #[error("no supported timestamp format matches {0:?}")]
    UnknownTimestampFormat(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown time zone: {0}")]
    UnknownTimeZone(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DayError {
    #[error("session boundary for {date} (+{hours}h) is out of range")]
    BoundaryOverflow { date: NaiveDate, hours: u32 },
}
