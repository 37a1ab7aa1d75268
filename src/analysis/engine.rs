//! Whole-stream runner
//!
//! Days are independent once the bar stream is built, so dates are analysed
//! in parallel and re-sorted afterwards. Per-day failures become skipped days;
//! only input-contract violations abort the run.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::bars::{BarSeries, PriceBar};
use super::day::{analyze_day, DayResult};
use super::stats::StatisticsSummary;
use crate::config::AnalyzerConfig;
use crate::error::DataError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    NoAsiaData,
    Failed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAsiaData => write!(f, "no Asia session data"),
            Self::Failed(reason) => write!(f, "{}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDay {
    pub date: NaiveDate,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub enum DayOutcome {
    Analyzed(Box<DayResult>),
    Skipped(SkippedDay),
}

/// Results of one run, both lists ascending by date
#[derive(Debug, Clone, Default)]
pub struct PeriodAnalysis {
    pub days: Vec<DayResult>,
    pub skipped: Vec<SkippedDay>,
}

impl PeriodAnalysis {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn statistics(&self) -> StatisticsSummary {
        StatisticsSummary::from_days(&self.days)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.last().map(|d| d.date)
    }
}

pub struct LiquidityEngine {
    config: AnalyzerConfig,
}

impl LiquidityEngine {
    pub fn new(config: AnalyzerConfig) -> Result<Self, DataError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze_day(&self, series: &BarSeries, date: NaiveDate) -> DayOutcome {
        match analyze_day(series, date, &self.config) {
            Ok(Some(result)) => DayOutcome::Analyzed(Box::new(result)),
            Ok(None) => DayOutcome::Skipped(SkippedDay {
                date,
                reason: SkipReason::NoAsiaData,
            }),
            Err(e) => DayOutcome::Skipped(SkippedDay {
                date,
                reason: SkipReason::Failed(e.to_string()),
            }),
        }
    }

    /// Analyse every calendar date present in the stream
    pub fn analyze(&self, series: &BarSeries) -> PeriodAnalysis {
        let dates = series.trading_dates();

        let outcomes: Vec<DayOutcome> = dates
            .par_iter()
            .map(|&date| self.analyze_day(series, date))
            .collect();

        let mut analysis = PeriodAnalysis::default();
        for outcome in outcomes {
            match outcome {
                DayOutcome::Analyzed(result) => analysis.days.push(*result),
                DayOutcome::Skipped(skipped) => {
                    match &skipped.reason {
                        SkipReason::NoAsiaData => debug!("Skipping {}: {}", skipped.date, skipped.reason),
                        SkipReason::Failed(_) => warn!("Skipping {}: {}", skipped.date, skipped.reason),
                    }
                    analysis.skipped.push(skipped);
                }
            }
        }
        analysis.days.sort_by_key(|d| d.date);
        analysis.skipped.sort_by_key(|s| s.date);

        info!(
            "{}: analyzed {} days, skipped {} ({} dates in input)",
            self.config.instrument,
            analysis.days.len(),
            analysis.skipped_count(),
            dates.len()
        );

        analysis
    }

    /// Validate raw bars into a stream, then analyse it
    pub fn analyze_bars(&self, bars: Vec<PriceBar>) -> Result<PeriodAnalysis, DataError> {
        let series = BarSeries::new(bars)?;
        Ok(self.analyze(&series))
    }
}

#[cfg(test)]
mod tests {
    use super::super::bars::test_support::*;
    use super::super::direction::{Direction, SweepType};
    use super::*;
    use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Asia window spanning [1.10000, 1.10100], mid 1.10050
    fn asia(d: NaiveDate) -> Vec<PriceBar> {
        let mut bars = flat_run(at(d, 2, 0), 60, 1.1008, 1.1002);
        bars.push(hl(at(d, 5, 0), 1.1010, 1.1003));
        bars.push(hl(at(d, 7, 0), 1.1004, 1.1000));
        bars
    }

    fn engine() -> LiquidityEngine {
        LiquidityEngine::new(AnalyzerConfig::default()).unwrap()
    }

    #[test]
    fn test_scenario_continue() {
        let d = day(2025, 5, 6);
        let mut bars = asia(d);
        bars.push(hl(at(d, 10, 0), 1.1008, 1.1004));
        bars.push(hl(at(d, 11, 0), 1.1012, 1.1006));
        bars.push(hl(at(d, 12, 0), 1.1016, 1.1010));
        bars.push(hl(at(d, 13, 0), 1.1022, 1.1014));
        bars.push(hl(at(d, 14, 30), 1.1030, 1.1020));

        let analysis = engine().analyze_bars(bars).unwrap();
        assert_eq!(analysis.days.len(), 1);
        let r = &analysis.days[0];
        assert!(r.london.swept_high());
        assert!(!r.london.swept_low());
        assert_eq!(r.sweep_type, SweepType::Continue);
        assert_eq!(r.london_direction, Some(Direction::Long));
        assert!(!r.rebalance);
    }

    #[test]
    fn test_scenario_new_highs_until_session_end() {
        let d = day(2025, 5, 6);
        let mut bars = asia(d);
        bars.push(hl(at(d, 10, 0), 1.1008, 1.1004));
        // sweep at 11:00, then a fresh high every minute through 14:59
        let sweep_start = at(d, 11, 0);
        for minute in 0..240 {
            let high = 1.1012 + minute as f64 * 0.00001;
            bars.push(hl(sweep_start + Duration::minutes(minute), high, high - 0.0004));
        }

        let analysis = engine().analyze_bars(bars).unwrap();
        let r = &analysis.days[0];
        assert!(r.london.swept_high());
        assert!(!r.london.swept_low());
        assert_eq!(r.sweep_time(), Some(at(d, 14, 59)));
        assert_eq!(r.london_direction, Some(Direction::Long));
        assert_eq!(r.sweep_type, SweepType::Continue);
        assert!(!r.rebalance);
        assert!(r.extension.extension_pips > r.extension.reverse_pips);
    }

    #[test]
    fn test_scenario_sweep_and_reverse_with_rebalance() {
        let d = day(2025, 5, 6);
        let mut bars = asia(d);
        bars.push(hl(at(d, 10, 0), 1.1008, 1.1004));
        bars.push(hl(at(d, 11, 0), 1.1012, 1.1006));
        // reverse down to the mid
        bars.push(hl(at(d, 11, 30), 1.1009, 1.1006));
        bars.push(hl(at(d, 12, 0), 1.1006, 1.1004));
        // then through it
        bars.push(hl(at(d, 13, 0), 1.1003, 1.0996));
        bars.push(hl(at(d, 14, 59), 1.0998, 1.0994));

        let analysis = engine().analyze_bars(bars).unwrap();
        let r = &analysis.days[0];
        assert!(r.london.swept_high());
        assert_eq!(r.london_direction, Some(Direction::Short));
        assert_eq!(r.sweep_type, SweepType::SweepAndReverse);
        assert!(r.rebalance);
        assert!(r.retests.mid);
    }

    #[test]
    fn test_day_without_asia_is_skipped() {
        let d1 = day(2025, 5, 5);
        let d2 = day(2025, 5, 6);
        let mut bars = asia(d1);
        bars.extend(flat_run(at(d1, 10, 0), 5, 1.1008, 1.1002));
        // d2 only trades in London
        bars.extend(flat_run(at(d2, 10, 0), 5, 1.1008, 1.1002));

        let analysis = engine().analyze_bars(bars).unwrap();
        assert_eq!(analysis.days.len(), 1);
        assert_eq!(analysis.days[0].date, d1);
        assert_eq!(analysis.skipped_count(), 1);
        assert_eq!(
            analysis.skipped[0],
            SkippedDay {
                date: d2,
                reason: SkipReason::NoAsiaData
            }
        );
    }

    #[test]
    fn test_unsorted_input_is_fatal() {
        let d = day(2025, 5, 6);
        let bars = vec![hl(at(d, 3, 0), 1.1, 1.0), hl(at(d, 2, 0), 1.1, 1.0)];
        assert!(matches!(
            engine().analyze_bars(bars),
            Err(DataError::Unsorted { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalyzerConfig {
            pip_size: -1.0,
            ..Default::default()
        };
        assert!(LiquidityEngine::new(config).is_err());
    }

    fn random_walk(seed: u64, days: i64) -> Vec<PriceBar> {
        let mut rng = StdRng::seed_from_u64(seed);
        let start: NaiveDateTime = at(day(2025, 3, 3), 0, 0);
        let mut price = 1.1000;
        let mut bars = Vec::new();
        for minute in (0..days * 24 * 60).step_by(5) {
            // the 7th only trades from London onwards
            let t = start + Duration::minutes(minute);
            if t.day() == 7 && t.hour() < 10 {
                continue;
            }
            let open = price;
            price += rng.gen_range(-0.0004..0.0004);
            let wick = rng.gen_range(0.0..0.0003);
            bars.push(bar_at(
                t,
                open,
                open.max(price) + wick,
                open.min(price) - wick,
                price,
            ));
        }
        bars
    }

    #[test]
    fn test_random_streams_hold_invariants() {
        for seed in 0..5 {
            let analysis = engine().analyze_bars(random_walk(seed, 10)).unwrap();
            assert!(!analysis.days.is_empty());
            assert_eq!(analysis.skipped_count(), 1);
            assert!(analysis.days.windows(2).all(|w| w[0].date < w[1].date));

            for r in &analysis.days {
                assert_eq!(r.asia.mid, (r.asia.high + r.asia.low) / 2.0);
                assert!(r.extension.extension_pips >= 0.0);
                assert!(r.extension.reverse_pips >= 0.0);
                assert!(r.new_york.metrics.up_pips >= 0.0);
                assert!(r.new_york.metrics.down_pips >= 0.0);
                if !r.london.any() {
                    assert_eq!(r.sweep_type, SweepType::NoSweep);
                    assert!(!r.rebalance);
                }
            }
        }
    }

    #[test]
    fn test_flat_asia_gives_zero_percent() {
        let d = day(2025, 5, 6);
        let mut bars = flat_run(at(d, 2, 0), 10, 1.1000, 1.1000);
        bars.push(bar_at(at(d, 10, 0), 1.1000, 1.1004, 1.1000, 1.1003));
        bars.push(hl(at(d, 11, 0), 1.1008, 1.1002));
        bars.push(hl(at(d, 12, 0), 1.1006, 1.1001));

        let analysis = engine().analyze_bars(bars).unwrap();
        let r = &analysis.days[0];
        assert_eq!(r.asia_range(), 0.0);
        assert!(r.extension.extension_pips > 0.0);
        assert_eq!(r.extension.extension_percent, 0.0);
        assert_eq!(r.extension.reverse_percent, 0.0);
    }
}
