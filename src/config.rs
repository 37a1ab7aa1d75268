//! Configuration for the liquidity analyzer
//!
//! Every instrument-specific constant (pip size, mid tolerance, session hours,
//! calendar zone) lives here and is threaded explicitly through the engine.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DataError, DayError};

/// A named daily window `[start_hour, end_hour)` in the analysis calendar.
/// `end_hour < start_hour` means the window runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl SessionWindow {
    pub const fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end_hour < self.start_hour
    }

    /// Absolute `[start, end)` bounds of this window on `date`
    pub fn bounds(&self, date: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime), DayError> {
        let midnight = date.and_time(NaiveTime::MIN);
        let offset = |hours: u32| {
            midnight
                .checked_add_signed(Duration::hours(hours as i64))
                .ok_or(DayError::BoundaryOverflow { date, hours })
        };

        let start = offset(self.start_hour)?;
        let end = if self.wraps_midnight() {
            offset(self.end_hour + 24)?
        } else {
            offset(self.end_hour)?
        };

        Ok((start, end))
    }

    fn validate(&self, name: &str) -> Result<(), DataError> {
        if self.start_hour > 23 || self.end_hour > 24 {
            return Err(DataError::InvalidConfig(format!(
                "{name} session hours {}..{} out of range",
                self.start_hour, self.end_hour
            )));
        }
        if self.start_hour == self.end_hour {
            return Err(DataError::InvalidConfig(format!(
                "{name} session has zero length"
            )));
        }
        Ok(())
    }
}

/// The fixed catalogue of daily windows the engine knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCatalogue {
    pub asia: SessionWindow,
    pub frankfurt: SessionWindow,
    pub london: SessionWindow,
    pub new_york: SessionWindow,
    pub previous_day: SessionWindow,
}

impl Default for SessionCatalogue {
    fn default() -> Self {
        Self {
            asia: SessionWindow::new(2, 10),
            frankfurt: SessionWindow::new(9, 10),
            london: SessionWindow::new(10, 15),
            new_york: SessionWindow::new(15, 19),
            previous_day: SessionWindow::new(0, 24),
        }
    }
}

impl SessionCatalogue {
    fn validate(&self) -> Result<(), DataError> {
        self.asia.validate("asia")?;
        self.frankfurt.validate("frankfurt")?;
        self.london.validate("london")?;
        self.new_york.validate("new_york")?;
        self.previous_day.validate("previous_day")
    }
}

/// How raw UTC timestamps are mapped onto the analysis calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeZoneStrategy {
    /// Constant offset from UTC, no daylight saving
    FixedOffset { hours: i32 },
    /// IANA zone with daylight-saving rules (e.g. "Europe/Kyiv")
    Named { zone: String },
}

impl Default for TimeZoneStrategy {
    fn default() -> Self {
        Self::FixedOffset { hours: 3 }
    }
}

impl std::fmt::Display for TimeZoneStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FixedOffset { hours } => write!(f, "UTC{:+}", hours),
            Self::Named { zone } => write!(f, "{}", zone),
        }
    }
}

impl TimeZoneStrategy {
    pub fn resolve(&self) -> Result<ZoneConverter, DataError> {
        match self {
            Self::FixedOffset { hours } => {
                if hours.abs() > 23 {
                    return Err(DataError::InvalidConfig(format!(
                        "utc offset {hours}h out of range"
                    )));
                }
                FixedOffset::east_opt(hours * 3600)
                    .map(ZoneConverter::Fixed)
                    .ok_or_else(|| DataError::InvalidConfig(format!("bad utc offset {hours}h")))
            }
            Self::Named { zone } => zone
                .parse::<Tz>()
                .map(ZoneConverter::Named)
                .map_err(|_| DataError::UnknownTimeZone(zone.clone())),
        }
    }
}

/// Resolved form of a `TimeZoneStrategy`
#[derive(Debug, Clone, Copy)]
pub enum ZoneConverter {
    Fixed(FixedOffset),
    Named(Tz),
}

impl ZoneConverter {
    pub fn from_utc(&self, utc: NaiveDateTime) -> DateTime<FixedOffset> {
        match self {
            Self::Fixed(offset) => offset.from_utc_datetime(&utc),
            Self::Named(tz) => tz.from_utc_datetime(&utc).fixed_offset(),
        }
    }
}

/// Analyzer configuration value object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Instrument label (e.g. "EURUSD")
    pub instrument: String,

    /// Minimum meaningful price increment; breach and tolerance unit
    pub pip_size: f64,

    /// Band around the Asia mid counted as a touch, in pips
    pub mid_tolerance_pips: f64,

    /// Decimal places used when exporting prices
    pub price_precision: u32,

    pub sessions: SessionCatalogue,

    pub timezone: TimeZoneStrategy,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            instrument: "EURUSD".to_string(),
            pip_size: 0.00010,
            mid_tolerance_pips: 3.0,
            price_precision: 5,
            sessions: SessionCatalogue::default(),
            timezone: TimeZoneStrategy::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Preset for a currency pair; JPY crosses quote to two decimals
    pub fn for_pair(pair: &str) -> Self {
        let pair = pair.to_ascii_uppercase();
        if pair.ends_with("JPY") {
            Self {
                instrument: pair,
                pip_size: 0.01,
                price_precision: 3,
                ..Default::default()
            }
        } else {
            Self {
                instrument: pair,
                ..Default::default()
            }
        }
    }

    /// Calendar-aware variant converting UTC to Europe/Kyiv
    pub fn with_kyiv_calendar(self) -> Self {
        Self {
            timezone: TimeZoneStrategy::Named {
                zone: "Europe/Kyiv".to_string(),
            },
            ..self
        }
    }

    /// Mid tolerance in price units
    pub fn mid_tolerance(&self) -> f64 {
        self.mid_tolerance_pips * self.pip_size
    }

    pub fn to_pips(&self, distance: f64) -> f64 {
        distance / self.pip_size
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if !self.pip_size.is_finite() || self.pip_size <= 0.0 {
            return Err(DataError::InvalidConfig(format!(
                "pip size must be positive, got {}",
                self.pip_size
            )));
        }
        if !self.mid_tolerance_pips.is_finite() || self.mid_tolerance_pips < 0.0 {
            return Err(DataError::InvalidConfig(format!(
                "mid tolerance must be non-negative, got {}",
                self.mid_tolerance_pips
            )));
        }
        self.sessions.validate()?;
        self.timezone.resolve()?;
        Ok(())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_catalogue() {
        let sessions = SessionCatalogue::default();
        assert_eq!(sessions.asia, SessionWindow::new(2, 10));
        assert_eq!(sessions.frankfurt, SessionWindow::new(9, 10));
        assert_eq!(sessions.london, SessionWindow::new(10, 15));
        assert_eq!(sessions.new_york, SessionWindow::new(15, 19));
        assert_eq!(sessions.previous_day, SessionWindow::new(0, 24));
    }

    #[test]
    fn test_window_bounds() {
        let d = date(2025, 5, 6);
        let (start, end) = SessionWindow::new(10, 15).bounds(d).unwrap();
        assert_eq!(start, d.and_hms_opt(10, 0, 0).unwrap());
        assert_eq!(end, d.and_hms_opt(15, 0, 0).unwrap());

        let (start, end) = SessionWindow::new(0, 24).bounds(d).unwrap();
        assert_eq!(start, d.and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(end, date(2025, 5, 7).and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_window_wraps_midnight() {
        let d = date(2025, 5, 6);
        let window = SessionWindow::new(22, 3);
        assert!(window.wraps_midnight());
        let (start, end) = window.bounds(d).unwrap();
        assert_eq!(start, d.and_hms_opt(22, 0, 0).unwrap());
        assert_eq!(end, date(2025, 5, 7).and_hms_opt(3, 0, 0).unwrap());
    }

    #[test]
    fn test_window_bounds_overflow() {
        // the last representable day has no next midnight
        for window in [SessionWindow::new(0, 24), SessionWindow::new(22, 3)] {
            let err = window.bounds(NaiveDate::MAX).unwrap_err();
            assert!(matches!(err, DayError::BoundaryOverflow { hours, .. } if hours >= 24));
        }
        assert!(SessionWindow::new(2, 10).bounds(NaiveDate::MAX).is_ok());
    }

    #[test]
    fn test_pair_presets() {
        let eur = AnalyzerConfig::for_pair("eurusd");
        assert_eq!(eur.instrument, "EURUSD");
        assert_eq!(eur.pip_size, 0.0001);
        assert!((eur.mid_tolerance() - 0.0003).abs() < 1e-12);

        let jpy = AnalyzerConfig::for_pair("USDJPY");
        assert_eq!(jpy.pip_size, 0.01);
        assert_eq!(jpy.price_precision, 3);
        assert!((jpy.mid_tolerance() - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AnalyzerConfig::default();
        config.pip_size = 0.0;
        assert!(matches!(config.validate(), Err(DataError::InvalidConfig(_))));

        let mut config = AnalyzerConfig::default();
        config.sessions.london = SessionWindow::new(10, 10);
        assert!(matches!(config.validate(), Err(DataError::InvalidConfig(_))));

        let mut config = AnalyzerConfig::default();
        config.timezone = TimeZoneStrategy::Named {
            zone: "Mars/Olympus".to_string(),
        };
        assert!(matches!(config.validate(), Err(DataError::UnknownTimeZone(_))));

        assert!(AnalyzerConfig::default().validate().is_ok());
        assert!(AnalyzerConfig::default().with_kyiv_calendar().validate().is_ok());
    }

    #[test]
    fn test_zone_conversion() {
        let utc = date(2025, 7, 1).and_hms_opt(0, 0, 0).unwrap();

        let fixed = TimeZoneStrategy::FixedOffset { hours: 3 }.resolve().unwrap();
        assert_eq!(
            fixed.from_utc(utc).naive_local(),
            date(2025, 7, 1).and_hms_opt(3, 0, 0).unwrap()
        );

        // Kyiv is UTC+3 in summer, UTC+2 in winter
        let kyiv = TimeZoneStrategy::Named {
            zone: "Europe/Kyiv".to_string(),
        }
        .resolve()
        .unwrap();
        assert_eq!(
            kyiv.from_utc(utc).naive_local(),
            date(2025, 7, 1).and_hms_opt(3, 0, 0).unwrap()
        );
        let winter = date(2025, 1, 15).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(
            kyiv.from_utc(winter).naive_local(),
            date(2025, 1, 15).and_hms_opt(2, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_config_json_roundtrip_with_partial_fields() {
        let json = r#"{"instrument":"GBPUSD","mid_tolerance_pips":2.0,
            "timezone":{"kind":"named","zone":"Europe/Kyiv"}}"#;
        let config: AnalyzerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.instrument, "GBPUSD");
        assert_eq!(config.pip_size, 0.0001);
        assert_eq!(config.mid_tolerance_pips, 2.0);
        assert_eq!(config.sessions, SessionCatalogue::default());
        assert_eq!(config.timezone.to_string(), "Europe/Kyiv");
    }
}
