//! Extension and reverse magnitudes
//!
//! Two anchor modes:
//! - Sweep: measured from the swept level over the bars after the sweep
//!   through the end of the session.
//! - Open: measured from the first bar's open over the whole session.
//!
//! A sweep printed on the session's last extreme bar leaves nothing after it
//! to measure, so the session falls back to the open anchor.
//!
//! Magnitudes are reported in pips and as a percentage of the Asia range.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::bars::{BarSeries, PriceBar};
use super::direction::{AnchoredMove, Direction};
use super::sweep::SweepEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorMode {
    Sweep,
    Open,
}

/// The bars and excursion a session is measured over
#[derive(Debug, Clone, Copy)]
pub struct SessionMove<'a> {
    pub mode: AnchorMode,
    /// Bars after the anchor event, scanned for rebalance and retests
    pub bars: &'a [PriceBar],
    pub movement: Option<AnchoredMove>,
}

impl SessionMove<'_> {
    pub fn direction(&self) -> Option<Direction> {
        self.movement.map(|mv| mv.direction())
    }
}

/// Pick the anchor for a session: the sweep when bars follow it, else the open
pub fn session_move<'a>(
    series: &'a BarSeries,
    session_bars: &'a [PriceBar],
    session_end: NaiveDateTime,
    sweep: Option<&SweepEvent>,
) -> SessionMove<'a> {
    let from_open = || {
        session_bars
            .first()
            .and_then(|first| AnchoredMove::measure(first.open, session_bars))
    };

    match sweep {
        Some(sweep) => {
            let bars = series.after_until(sweep.event_time, session_end);
            match AnchoredMove::measure(sweep.reference_price, bars) {
                Some(movement) => SessionMove {
                    mode: AnchorMode::Sweep,
                    bars,
                    movement: Some(movement),
                },
                None => SessionMove {
                    mode: AnchorMode::Open,
                    bars,
                    movement: from_open(),
                },
            }
        }
        None => SessionMove {
            mode: AnchorMode::Open,
            bars: session_bars,
            movement: from_open(),
        },
    }
}

/// Percentage of `range`; 0 when the range is empty
pub fn percent_of_range(distance: f64, range: f64) -> f64 {
    if range > 0.0 {
        distance / range * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtensionMetrics {
    /// Move in the dominant direction
    pub extension_pips: f64,
    pub extension_percent: f64,
    /// Move against the dominant direction
    pub reverse_pips: f64,
    pub reverse_percent: f64,
    pub up_pips: f64,
    pub up_percent: f64,
    pub down_pips: f64,
    pub down_percent: f64,
    pub max_time: Option<NaiveDateTime>,
    pub min_time: Option<NaiveDateTime>,
}

impl ExtensionMetrics {
    /// Excursions are clamped at zero so both magnitudes stay non-negative
    /// even when the anchor lies outside the measured bars' range.
    pub fn from_move(mv: &AnchoredMove, dominant: Direction, reference_range: f64, pip_size: f64) -> Self {
        let up = mv.up_move().max(0.0);
        let down = mv.down_move().max(0.0);
        let (extension, reverse) = match dominant {
            Direction::Long => (up, down),
            Direction::Short => (down, up),
        };

        Self {
            extension_pips: extension / pip_size,
            extension_percent: percent_of_range(extension, reference_range),
            reverse_pips: reverse / pip_size,
            reverse_percent: percent_of_range(reverse, reference_range),
            up_pips: up / pip_size,
            up_percent: percent_of_range(up, reference_range),
            down_pips: down / pip_size,
            down_percent: percent_of_range(down, reference_range),
            max_time: Some(mv.max_time),
            min_time: Some(mv.min_time),
        }
    }

    /// Metrics for a session move, zeroed when nothing could be measured
    pub fn for_session(session: &SessionMove<'_>, reference_range: f64, pip_size: f64) -> Self {
        match session.movement {
            Some(mv) => Self::from_move(&mv, mv.direction(), reference_range, pip_size),
            None => Self::default(),
        }
    }
}
