//! Plain-text summary of a period analysis

use std::fmt::Write;

use crate::analysis::{
    session_averages, sweep_type_breakdown, top_days_by_extension, weekday_breakdown, DayResult,
    PeriodAnalysis,
};
use crate::config::AnalyzerConfig;

const TOP_DAYS: usize = 5;

fn or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn write_best_day(out: &mut String, day: &DayResult, precision: usize) -> std::fmt::Result {
    writeln!(out, "Date:             {} ({})", day.date, day.date.format("%A"))?;
    writeln!(out, "Asia High:        {:.*}", precision, day.asia.high)?;
    writeln!(out, "Asia Low:         {:.*}", precision, day.asia.low)?;
    writeln!(out, "Asia Mid:         {:.*}", precision, day.asia.mid)?;
    writeln!(
        out,
        "London Sweep:     High={}, Low={}",
        yes_no(day.london.swept_high()),
        yes_no(day.london.swept_low())
    )?;
    writeln!(out, "Sweep Type:       {}", day.sweep_type)?;
    writeln!(out, "London Direction: {}", or_dash(day.london_direction))?;
    writeln!(
        out,
        "Extension:        {:.1} pips ({:.1}%)",
        day.extension.extension_pips, day.extension.extension_percent
    )?;
    writeln!(out, "Rebalance:        {}", yes_no(day.rebalance))?;
    writeln!(out, "NY Direction:     {}", or_dash(day.new_york.direction))?;
    writeln!(out, "NY Status:        {}", or_dash(day.new_york.status))
}

fn write_summary(out: &mut String, analysis: &PeriodAnalysis, config: &AnalyzerConfig) -> std::fmt::Result {
    let days = &analysis.days;

    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "LIQUIDITY ANALYSIS: {} ({})", config.instrument, config.timezone)?;
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(
        out,
        "Period:        {} - {}",
        or_dash(analysis.first_date()),
        or_dash(analysis.last_date())
    )?;
    writeln!(out, "Days analyzed: {}", days.len())?;
    writeln!(out, "Days skipped:  {}", analysis.skipped_count())?;
    writeln!(out)?;

    if days.is_empty() {
        return writeln!(out, "No days with Asia session data.");
    }

    writeln!(out, "STATISTICS")?;
    writeln!(out, "{}", "-".repeat(40))?;
    for m in &analysis.statistics().metrics {
        writeln!(out, "{:<25}: {:>4} ({:>6.1}%)", m.metric, m.count, m.percentage)?;
    }
    writeln!(out)?;

    writeln!(out, "TOP {} DAYS BY EXTENSION", TOP_DAYS)?;
    writeln!(out, "{}", "-".repeat(40))?;
    for day in top_days_by_extension(days, TOP_DAYS) {
        writeln!(
            out,
            "{} ({:<9}): {:>6.1} pips ({:>6.1}%) - {}",
            day.date,
            day.date.format("%A").to_string(),
            day.extension.extension_pips,
            day.extension.extension_percent,
            day.sweep_type
        )?;
    }
    writeln!(out)?;

    writeln!(out, "BY WEEKDAY")?;
    writeln!(out, "{}", "-".repeat(40))?;
    for w in weekday_breakdown(days) {
        writeln!(
            out,
            "{:<4}: {:>2} days, extension {:>6.1} pips ({:>6.1}%), Continue: {}, Long: {}",
            w.weekday.to_string(),
            w.days,
            w.mean_extension_pips,
            w.mean_extension_percent,
            w.continue_count,
            w.long_count
        )?;
    }
    writeln!(out)?;

    writeln!(out, "BY SWEEP TYPE")?;
    writeln!(out, "{}", "-".repeat(40))?;
    for s in sweep_type_breakdown(days) {
        writeln!(
            out,
            "{:<17}: {:>2} days, {:>6.1}±{:>5.1} pips, Rebalance: {}",
            s.sweep_type.as_str(),
            s.days,
            s.mean_extension_pips,
            s.std_extension_pips,
            s.rebalance_count
        )?;
    }
    writeln!(out)?;

    let averages = session_averages(days, config.pip_size);
    let total = days.len() as f64;
    writeln!(out, "LONDON vs NEW YORK")?;
    writeln!(out, "{}", "-".repeat(40))?;
    writeln!(
        out,
        "NY Support London: {} ({:.1}%)",
        averages.ny_support,
        averages.ny_support as f64 / total * 100.0
    )?;
    writeln!(
        out,
        "NY Reverse London: {} ({:.1}%)",
        averages.ny_reverse,
        averages.ny_reverse as f64 / total * 100.0
    )?;
    writeln!(out)?;

    writeln!(out, "AVERAGES")?;
    writeln!(out, "{}", "-".repeat(40))?;
    writeln!(out, "Asia range:     {:.1} pips", averages.mean_asia_range_pips)?;
    writeln!(out, "Extension:      {:.1} pips", averages.mean_extension_pips)?;
    writeln!(out, "Reverse:        {:.1} pips", averages.mean_reverse_pips)?;
    writeln!(out, "Rebalance rate: {:.1}%", averages.rebalance_rate)?;
    writeln!(out)?;

    if let Some(best) = top_days_by_extension(days, 1).first() {
        writeln!(out, "BEST DAY")?;
        writeln!(out, "{}", "-".repeat(40))?;
        write_best_day(out, best, config.price_precision as usize)?;
    }
    Ok(())
}

pub fn render_summary(analysis: &PeriodAnalysis, config: &AnalyzerConfig) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_summary(&mut out, analysis, config);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::bars::test_support::*;
    use crate::analysis::LiquidityEngine;

    #[test]
    fn test_summary_sections() {
        let d = day(2025, 5, 6);
        let mut bars = flat_run(at(d, 2, 0), 10, 1.1010, 1.1000);
        bars.push(hl(at(d, 11, 0), 1.1014, 1.1006));
        bars.push(hl(at(d, 12, 0), 1.1008, 1.1001));
        bars.push(hl(at(d, 13, 0), 1.1030, 1.1012));

        let config = AnalyzerConfig::default();
        let analysis = LiquidityEngine::new(config.clone())
            .unwrap()
            .analyze_bars(bars)
            .unwrap();
        let text = render_summary(&analysis, &config);

        assert!(text.contains("LIQUIDITY ANALYSIS: EURUSD (UTC+3)"));
        assert!(text.contains("Days analyzed: 1"));
        assert!(text.contains("TOP 5 DAYS BY EXTENSION"));
        assert!(text.contains("2025-05-06 (Tuesday  )"));
        assert!(text.contains("Asia High:        1.10100"));
        assert!(text.contains("Rebalance rate:"));
    }

    #[test]
    fn test_empty_summary() {
        let analysis = PeriodAnalysis::default();
        let text = render_summary(&analysis, &AnalyzerConfig::default());
        assert!(text.contains("Days analyzed: 0"));
        assert!(text.contains("No days with Asia session data."));
    }
}
