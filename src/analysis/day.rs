//! Day orchestrator
//!
//! Runs levels, sweeps, direction, rebalance/retests and extension for one
//! calendar date and packs the outcome into an immutable `DayResult`.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use super::bars::BarSeries;
use super::direction::{classify_sweep_type, Direction, SweepType};
use super::extension::{session_move, AnchorMode, ExtensionMetrics};
use super::levels::{asia_levels, previous_day_levels, ReferenceLevels, SessionExtremes};
use super::retest::{check_rebalance, check_retests, RetestOutcome};
use super::session::extract_session;
use super::sweep::{detect_sweep, SweepCheck};
use crate::config::AnalyzerConfig;
use crate::error::DayError;

/// New York relative to London
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NyStatus {
    /// Same direction as London
    Support,
    Reverse,
}

impl NyStatus {
    pub fn from_directions(london: Option<Direction>, new_york: Option<Direction>) -> Option<Self> {
        match (london, new_york) {
            (Some(l), Some(n)) if l == n => Some(Self::Support),
            (Some(_), Some(_)) => Some(Self::Reverse),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Support => "Support",
            Self::Reverse => "Reverse",
        }
    }
}

impl std::fmt::Display for NyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// New York session, always measured from its own open
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NySession {
    pub direction: Option<Direction>,
    pub status: Option<NyStatus>,
    /// `up_*` / `down_*` and the extreme times are the fields used
    pub metrics: ExtensionMetrics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayResult {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub asia: SessionExtremes,
    /// Frankfurt window against the Asia range
    pub frankfurt: SweepCheck,
    /// London window against the Asia range
    pub london: SweepCheck,
    pub sweep_type: SweepType,
    pub london_direction: Option<Direction>,
    pub anchor: AnchorMode,
    pub rebalance: bool,
    pub extension: ExtensionMetrics,
    pub retests: RetestOutcome,
    pub previous_day: Option<ReferenceLevels>,
    /// London window against PDH/PDL
    pub previous_day_sweep: SweepCheck,
    pub new_york: NySession,
}

impl DayResult {
    pub fn asia_range(&self) -> f64 {
        self.asia.range()
    }

    /// Time the effective London sweep happened
    pub fn sweep_time(&self) -> Option<NaiveDateTime> {
        self.london.effective().map(|s| s.event_time)
    }
}

/// Analyse one calendar date. `Ok(None)` when the day has no Asia data.
pub fn analyze_day(
    series: &BarSeries,
    date: NaiveDate,
    config: &AnalyzerConfig,
) -> Result<Option<DayResult>, DayError> {
    let sessions = &config.sessions;
    let pip = config.pip_size;

    let Some(asia) = asia_levels(series, date, sessions)? else {
        return Ok(None);
    };
    let asia_ref = Some(asia.reference());

    let frankfurt_bars = extract_session(series, date, &sessions.frankfurt)?;
    let frankfurt = detect_sweep(frankfurt_bars, asia_ref, pip);

    let london_bars = extract_session(series, date, &sessions.london)?;
    let (_, london_end) = sessions.london.bounds(date)?;
    let london = detect_sweep(london_bars, asia_ref, pip);
    let effective = london.effective();

    let london_move = session_move(series, london_bars, london_end, effective.as_ref());
    let london_direction = london_move.direction();
    let sweep_type = classify_sweep_type(&london, london_direction);

    let tolerance = config.mid_tolerance();
    let rebalance = check_rebalance(
        london_move.bars,
        sweep_type,
        london_direction,
        asia.mid,
        tolerance,
        pip,
    );
    let retests = check_retests(london_move.bars, effective.as_ref(), asia.mid, tolerance);
    let extension = ExtensionMetrics::for_session(&london_move, asia.range(), pip);

    let previous_day = previous_day_levels(series, date, sessions)?.map(|pd| pd.reference());
    let previous_day_sweep = detect_sweep(london_bars, previous_day, pip);

    let ny_bars = extract_session(series, date, &sessions.new_york)?;
    let (_, ny_end) = sessions.new_york.bounds(date)?;
    let ny_move = session_move(series, ny_bars, ny_end, None);
    let ny_direction = ny_move.direction();
    let new_york = NySession {
        direction: ny_direction,
        status: NyStatus::from_directions(london_direction, ny_direction),
        metrics: ExtensionMetrics::for_session(&ny_move, asia.range(), pip),
    };

    Ok(Some(DayResult {
        date,
        weekday: date.weekday(),
        asia,
        frankfurt,
        london,
        sweep_type,
        london_direction,
        anchor: london_move.mode,
        rebalance,
        extension,
        retests,
        previous_day,
        previous_day_sweep,
        new_york,
    }))
}
