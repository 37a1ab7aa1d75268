use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use session_liquidity::analysis::LiquidityEngine;
use session_liquidity::batch::{BatchRunner, InstrumentInfo};
use session_liquidity::config::{AnalyzerConfig, TimeZoneStrategy};
use session_liquidity::export::export_analysis;
use session_liquidity::ingest::{load_bars, read_raw};
use session_liquidity::quality::DataQualityReport;
use session_liquidity::report::render_summary;

#[derive(Parser, Debug)]
#[command(name = "session-liquidity")]
#[command(about = "Session sweep/extension analysis for minute FX bars")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// JSON analyzer configuration
    #[arg(long, global = true, env = "LIQUIDITY_CONFIG")]
    config: Option<PathBuf>,

    /// Currency pair preset (EURUSD, GBPUSD, USDJPY, ...)
    #[arg(long, global = true)]
    pair: Option<String>,

    /// Override the pip size
    #[arg(long, global = true)]
    pip_size: Option<f64>,

    /// Asia mid touch tolerance in pips
    #[arg(long, global = true)]
    tolerance_pips: Option<f64>,

    /// Fixed UTC offset of the analysis calendar, in hours
    #[arg(long, global = true, allow_negative_numbers = true)]
    utc_offset: Option<i32>,

    /// IANA zone for the analysis calendar (e.g. Europe/Kyiv); wins over --utc-offset
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Print verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze one data file, export the results and print a summary
    Analyze {
        /// CSV or CSV.zst file with minute bars
        file: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output_dir: PathBuf,

        /// Only print the summary
        #[arg(long)]
        no_export: bool,
    },

    /// Analyze every data file in a directory
    Batch {
        /// Directory with input files
        #[arg(long, default_value = "files")]
        files_dir: PathBuf,

        /// Output directory for results
        #[arg(long, default_value = "results")]
        results_dir: PathBuf,
    },

    /// Check a data file for quality problems
    Validate {
        /// CSV or CSV.zst file with minute bars
        file: PathBuf,
    },
}

fn build_config(args: &Args) -> Result<AnalyzerConfig> {
    let mut config = match &args.config {
        Some(path) => AnalyzerConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => AnalyzerConfig::default(),
    };

    if let Some(pair) = &args.pair {
        let preset = AnalyzerConfig::for_pair(pair);
        config.instrument = preset.instrument;
        config.pip_size = preset.pip_size;
        config.price_precision = preset.price_precision;
    }
    if let Some(pip_size) = args.pip_size {
        config.pip_size = pip_size;
    }
    if let Some(tolerance) = args.tolerance_pips {
        config.mid_tolerance_pips = tolerance;
    }
    if let Some(zone) = &args.timezone {
        config.timezone = TimeZoneStrategy::Named { zone: zone.clone() };
    } else if let Some(hours) = args.utc_offset {
        config.timezone = TimeZoneStrategy::FixedOffset { hours };
    }

    config.validate()?;
    Ok(config)
}

fn run_analyze(file: &Path, output_dir: &Path, no_export: bool, mut config: AnalyzerConfig, pair_given: bool) -> Result<()> {
    let info = InstrumentInfo::from_path(file);
    if !pair_given && info.pair != "UNKNOWN" {
        config.instrument = info.pair.clone();
    }

    let loaded = load_bars(file, &config.timezone)
        .with_context(|| format!("Failed to load {:?}", file))?;
    let engine = LiquidityEngine::new(config)?;
    let analysis = engine.analyze_bars(loaded.into_bars())?;

    println!("{}", render_summary(&analysis, engine.config()));

    if !no_export {
        let paths = export_analysis(output_dir, &info.stem, &analysis, engine.config())?;
        println!("Results:    {}", paths.results.display());
        println!("Statistics: {}", paths.statistics.display());
        println!("JSON:       {}", paths.json.display());
    }
    Ok(())
}

fn run_batch(files_dir: PathBuf, results_dir: PathBuf, config: AnalyzerConfig, presets: bool) -> Result<()> {
    let report = BatchRunner::new(files_dir, results_dir, config)
        .with_per_pair_presets(presets)
        .run()?;

    println!("\n{}", "=".repeat(60));
    println!("BATCH SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Processed: {} files", report.processed.len());
    println!("Failed:    {} files", report.failed.len());
    if !report.processed.is_empty() {
        println!("M1 records:   {}", report.total_records());
        println!("Trading days: {}", report.total_days());
    }
    for failed in &report.failed {
        println!("  FAILED {}: {}", failed.input_file, failed.error);
    }
    if let Some(path) = &report.summary_path {
        println!("Summary: {}", path.display());
    }
    Ok(())
}

fn run_validate(file: &Path, config: &AnalyzerConfig) -> Result<()> {
    let table = read_raw(file).with_context(|| format!("Failed to read {:?}", file))?;
    let zone = config.timezone.resolve()?;
    let report = DataQualityReport::inspect(&table.rows, &zone, config.pip_size);

    println!("File:            {}", file.display());
    println!("Timestamp format: {}", table.timestamp_format);
    println!("Header row:      {}", if table.has_header { "yes" } else { "no" });
    println!("Records:         {}", report.total_records);
    if let (Some(first), Some(last)) = (report.first_timestamp, report.last_timestamp) {
        println!("Period:          {} - {} ({})", first, last, config.timezone);
    }
    println!("Trading days:    {}", report.trading_days);
    println!("Avg bar range:   {:.1} pips", report.avg_range_pips);
    if let (Some(min), Some(max)) = (report.min_price, report.max_price) {
        println!(
            "Price range:     {:.*} - {:.*}",
            config.price_precision as usize, min, config.price_precision as usize, max
        );
    }

    let issues = report.issues();
    if issues.is_empty() {
        println!("Data quality OK");
    } else {
        println!("Data quality problems:");
        for issue in issues {
            println!("  - {}", issue);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("session_liquidity={}", level).parse()?),
        )
        .init();

    let config = build_config(&args)?;
    info!(
        "Config: {} pip={} tolerance={} pips calendar={}",
        config.instrument, config.pip_size, config.mid_tolerance_pips, config.timezone
    );

    match args.command {
        Commands::Analyze { ref file, ref output_dir, no_export } => {
            run_analyze(file, output_dir, no_export, config, args.pair.is_some())?;
        }
        Commands::Batch { ref files_dir, ref results_dir } => {
            let presets = args.pair.is_none() && args.pip_size.is_none() && args.config.is_none();
            run_batch(files_dir.clone(), results_dir.clone(), config, presets)?;
        }
        Commands::Validate { ref file } => {
            run_validate(file, &config)?;
        }
    }

    Ok(())
}
