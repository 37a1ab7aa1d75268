//! Session liquidity analysis engine
//!
//! Pure and I/O free. For each calendar day in a validated `BarSeries`:
//! - `session`: slice the named daily windows
//! - `levels`: Asia high/low/mid and previous-day high/low
//! - `sweep`: Frankfurt/London breaches of those levels
//! - `direction`: dominant move and sweep type
//! - `retest`: rebalance and retests after a sweep
//! - `extension`: move magnitudes in pips and % of the Asia range
//! - `day`: one `DayResult` per day
//!
//! `engine` runs all days and `stats` aggregates across them.

pub mod bars;
pub mod day;
pub mod direction;
pub mod engine;
pub mod extension;
pub mod levels;
pub mod retest;
pub mod session;
pub mod stats;
pub mod sweep;

pub use bars::{is_near_level, BarSeries, PriceBar};
pub use day::{analyze_day, DayResult, NySession, NyStatus};
pub use direction::{classify_direction, classify_sweep_type, AnchoredMove, Direction, SweepType};
pub use engine::{DayOutcome, LiquidityEngine, PeriodAnalysis, SkipReason, SkippedDay};
pub use extension::{percent_of_range, session_move, AnchorMode, ExtensionMetrics, SessionMove};
pub use levels::{asia_levels, previous_day_levels, ReferenceLevels, SessionExtremes};
pub use retest::{check_rebalance, check_retests, RetestOutcome};
pub use session::{bars_after, extract_session};
pub use stats::{
    percentage, session_averages, sweep_type_breakdown, top_days_by_extension, weekday_breakdown,
    MetricStat, SessionAverages, StatisticsSummary, SweepTypeBreakdown, WeekdayBreakdown,
};
pub use sweep::{detect_sweep, SweepCheck, SweepEvent, SweepSide};
