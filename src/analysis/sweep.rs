//! Sweep detection
//!
//! A sweep is a session extreme that runs through a reference level (Asia
//! high/low, PDH/PDL) by at least one pip. The event time is the first bar in
//! the window that printed the session extreme.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::bars::PriceBar;
use super::levels::{ReferenceLevels, SessionExtremes};

/// Which side of the reference range was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SweepSide {
    High,
    Low,
}

impl std::fmt::Display for SweepSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweepSide::High => write!(f, "High"),
            SweepSide::Low => write!(f, "Low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepEvent {
    pub side: SweepSide,
    /// The level that was swept
    pub reference_price: f64,
    pub event_time: NaiveDateTime,
    /// Session extreme that breached the level
    pub extreme: f64,
}

/// Outcome of checking one window against one reference pair
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SweepCheck {
    /// Extremes of the checked window, `None` when it had no bars
    pub window: Option<SessionExtremes>,
    pub high: Option<SweepEvent>,
    pub low: Option<SweepEvent>,
}

impl SweepCheck {
    pub fn swept_high(&self) -> bool {
        self.high.is_some()
    }

    pub fn swept_low(&self) -> bool {
        self.low.is_some()
    }

    pub fn any(&self) -> bool {
        self.swept_high() || self.swept_low()
    }

    /// The sweep carried forward when both sides were taken: the earlier one.
    /// Same-bar ties resolve to the high side.
    pub fn effective(&self) -> Option<SweepEvent> {
        match (self.high, self.low) {
            (Some(high), Some(low)) => {
                if high.event_time <= low.event_time {
                    Some(high)
                } else {
                    Some(low)
                }
            }
            (Some(high), None) => Some(high),
            (None, Some(low)) => Some(low),
            (None, None) => None,
        }
    }
}

/// Check whether the window's extremes breach `reference` by at least one pip.
/// Missing reference levels mean no sweep can be declared.
pub fn detect_sweep(
    window_bars: &[PriceBar],
    reference: Option<ReferenceLevels>,
    pip_size: f64,
) -> SweepCheck {
    let window = SessionExtremes::from_bars(window_bars);
    let (Some(ext), Some(reference)) = (window, reference) else {
        return SweepCheck {
            window,
            ..Default::default()
        };
    };

    let high = (ext.high >= reference.high + pip_size).then_some(SweepEvent {
        side: SweepSide::High,
        reference_price: reference.high,
        event_time: ext.high_time,
        extreme: ext.high,
    });
    let low = (ext.low <= reference.low - pip_size).then_some(SweepEvent {
        side: SweepSide::Low,
        reference_price: reference.low,
        event_time: ext.low_time,
        extreme: ext.low,
    });

    SweepCheck { window, high, low }
}
